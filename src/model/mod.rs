//! Tree values produced by a parse.
//!
//! Everything here is immutable once the parse that built it returns; the
//! crate-private mutators are only reachable while a document is being
//! assembled.

pub(crate) mod frozen_list;
pub(crate) mod node;
pub(crate) mod tagged;
pub(crate) mod tuple;
pub(crate) mod value;

pub use frozen_list::{Cursor, FrozenList};
pub use node::{Node, TypeShape};
pub use tagged::TaggedValue;
pub use tuple::TupleItem;
pub use value::Value;
