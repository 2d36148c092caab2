//! A streaming, schema-driven XML-to-tree parser.
//!
//! A [`Schema`] describes the elements a document may contain: their
//! attributes (with typed coercions), their named children and their
//! content model. Compiling the schema builds perfect-hash dispatch
//! tables; parsing then walks the document in a single pass, driven by an
//! explicit element stack, and produces an immutable tree of [`Value`]s.
//! Recoverable problems (unknown elements or attributes) are warnings
//! routed through a [`WarningPolicy`]; structural violations are errors
//! that carry the offending line.
//!
//! ```
//! use arbor_xml::{ElementDef, Schema, TreeParser};
//!
//! let schema = Schema::builder()
//!     .root("doc", "doc")
//!     .element(
//!         "doc",
//!         ElementDef::new()
//!             .attribute("id", "#string")
//!             .child("title", "#text"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut parser = TreeParser::new(&schema);
//! let root = parser
//!     .parse_from_text(r#"<doc id="d1"><title>Intro</title></doc>"#)
//!     .unwrap();
//!
//! assert_eq!(root.tag(), "doc");
//! let doc = root.value().as_node().unwrap();
//! assert_eq!(doc.field("id").unwrap().as_str(), Some("d1"));
//! assert_eq!(doc.field("title").unwrap().as_str(), Some("Intro"));
//! ```

mod arena;
mod dispatcher;
mod err;
mod model;
mod name_table;
mod parser;
mod policy;
mod schema;
mod source;
mod tokenizer;

pub use err::{ErrorKind, ParseError, ParseWarning, Result, SchemaError, WarningKind};
pub use model::{Cursor, FrozenList, Node, TaggedValue, TupleItem, TypeShape, Value};
pub use parser::{ParseSettings, TreeParser};
pub use policy::{LogWarnings, Strict, WarningPolicy};
pub use schema::{Cardinality, ElementDef, Schema, SchemaBuilder, UnknownAttrPolicy};
pub use source::ReadSource;
