//! Compiled schemas: the process-wide description of every recognized
//! element, attribute and content model, plus the dispatch tables the
//! parser interprets.
//!
//! A [`Schema`] is built once through [`SchemaBuilder`], is immutable
//! afterwards and outlives every parse. Building resolves all type
//! references, assembles per-type dispatch tables indexed by resolved name
//! index, and computes the perfect-hash name tables.
//!
//! Type references are strings: `#text`, `#empty` and `#char` name the
//! builtin element types (text-only content, contentless, and a character
//! substitute carrying its code point in a `value` attribute); `#string`,
//! `#int` and `#bool` name the builtin attribute types; anything else must
//! name a type defined on the same builder.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::err::SchemaError;
use crate::model::TypeShape;
use crate::name_table::NameTable;

type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// How many times a child element may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly once.
    Required,
    /// Zero or one times.
    Optional,
    /// Any number of times, at least `min`.
    List { min: usize },
}

/// Policy for attributes the schema does not recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownAttrPolicy {
    /// Report a warning and continue (the default).
    #[default]
    Warn,
    /// Treat the attribute as a fatal error.
    Error,
}

#[derive(Debug, Clone)]
enum TypeDef {
    Element(ElementDef),
    Enum(Vec<String>),
    CharEnum(String),
}

#[derive(Debug, Clone)]
struct AttrSpec {
    name: String,
    ty: String,
    optional: bool,
}

#[derive(Debug, Clone)]
struct ChildSpec {
    elem: String,
    ty: String,
    cardinality: Cardinality,
}

#[derive(Debug, Clone, Default)]
enum ContentSpec {
    #[default]
    None,
    Bare(Vec<(String, String)>),
    Tuple(Vec<(String, String)>),
    Union(Vec<(String, String)>),
}

/// Definition of one element type: its attributes, named children and
/// content model.
#[derive(Debug, Clone, Default)]
pub struct ElementDef {
    attrs: Vec<AttrSpec>,
    children: Vec<ChildSpec>,
    content: ContentSpec,
    allow_text: bool,
    unknown_attrs: UnknownAttrPolicy,
}

impl ElementDef {
    pub fn new() -> Self {
        ElementDef::default()
    }

    /// A required attribute.
    pub fn attribute(mut self, name: &str, ty: &str) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            ty: ty.to_string(),
            optional: false,
        });
        self
    }

    /// An optional attribute; unset becomes `Value::Null`.
    pub fn opt_attribute(mut self, name: &str, ty: &str) -> Self {
        self.attrs.push(AttrSpec {
            name: name.to_string(),
            ty: ty.to_string(),
            optional: true,
        });
        self
    }

    /// A single required child element.
    pub fn child(self, elem: &str, ty: &str) -> Self {
        self.child_with(elem, ty, Cardinality::Required)
    }

    /// A single optional child element.
    pub fn opt_child(self, elem: &str, ty: &str) -> Self {
        self.child_with(elem, ty, Cardinality::Optional)
    }

    /// A repeatable child element collected into a list field.
    pub fn list_child(self, elem: &str, ty: &str) -> Self {
        self.child_with(elem, ty, Cardinality::List { min: 0 })
    }

    /// A repeatable child element that must appear at least once.
    pub fn nonempty_list_child(self, elem: &str, ty: &str) -> Self {
        self.child_with(elem, ty, Cardinality::List { min: 1 })
    }

    pub fn child_with(mut self, elem: &str, ty: &str, cardinality: Cardinality) -> Self {
        self.children.push(ChildSpec {
            elem: elem.to_string(),
            ty: ty.to_string(),
            cardinality,
        });
        self
    }

    /// Ordered content: the named elements may repeat in any order and
    /// their values are appended to the content list untagged.
    pub fn bare_content<'a>(mut self, items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.content = ContentSpec::Bare(
            items
                .into_iter()
                .map(|(e, t)| (e.to_string(), t.to_string()))
                .collect(),
        );
        self
    }

    /// Ordered-tuple content: the named elements must repeat in strict
    /// left-to-right groups.
    pub fn tuple_content<'a>(mut self, slots: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.content = ContentSpec::Tuple(
            slots
                .into_iter()
                .map(|(e, t)| (e.to_string(), t.to_string()))
                .collect(),
        );
        self
    }

    /// Tagged-union content: each recognized child is appended to the
    /// content list wrapped in a [`TaggedValue`](crate::model::TaggedValue).
    pub fn union_content<'a>(mut self, alts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.content = ContentSpec::Union(
            alts.into_iter()
                .map(|(e, t)| (e.to_string(), t.to_string()))
                .collect(),
        );
        self
    }

    /// Permit character data inside this element; text runs are appended
    /// to the content list as plain strings.
    pub fn allow_text(mut self) -> Self {
        self.allow_text = true;
        self
    }

    /// Escalate unrecognized attributes to fatal errors for this type.
    pub fn deny_unknown_attributes(mut self) -> Self {
        self.unknown_attrs = UnknownAttrPolicy::Error;
        self
    }
}

/// Assembles a [`Schema`] from type definitions and root declarations.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: Vec<(String, TypeDef)>,
    roots: Vec<(String, String)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Declare a recognized root: element name plus the type it parses as.
    /// The returned tree is tagged with the element name.
    pub fn root(mut self, elem: &str, ty: &str) -> Self {
        self.roots.push((elem.to_string(), ty.to_string()));
        self
    }

    pub fn element(mut self, name: &str, def: ElementDef) -> Self {
        self.types.push((name.to_string(), TypeDef::Element(def)));
        self
    }

    /// An enumeration attribute type with the given allowed values.
    pub fn enumeration<'a>(mut self, name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        self.types.push((
            name.to_string(),
            TypeDef::Enum(values.into_iter().map(str::to_string).collect()),
        ));
        self
    }

    /// An attribute type allowing exactly one of the given characters.
    pub fn char_enum(mut self, name: &str, allowed: &str) -> Self {
        self.types
            .push((name.to_string(), TypeDef::CharEnum(allowed.to_string())));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Compilation::run(self)
    }
}

// Compiled representation, interpreted by the dispatcher.

/// Destination type of a child element.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// A schema element type, by compiled index.
    Node(usize),
    /// Builtin `#text`: text-only content producing a string.
    Text,
    /// Builtin `#empty`: no attributes, no content, value `Null`.
    Empty,
    /// Builtin `#char`: contributes one character to the text run.
    CharSub,
}

#[derive(Debug, Clone)]
pub(crate) enum AttrCoerce {
    Str,
    Int,
    Bool,
    Enum(usize),
    CharEnum(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct AttrAction {
    pub field: usize,
    pub coerce: AttrCoerce,
}

#[derive(Debug, Clone)]
pub(crate) struct AttrField {
    pub field: usize,
    pub name: Arc<str>,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum ChildAction {
    Single {
        field: usize,
        elem: Arc<str>,
        target: Target,
    },
    ListAppend {
        field: usize,
        target: Target,
    },
    Content {
        target: Target,
    },
    TupleSlot {
        index: usize,
        target: Target,
    },
    UnionAlt {
        tag: Arc<str>,
        target: Target,
        accumulates_text: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ChildField {
    pub field: usize,
    pub elem: Arc<str>,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, Default)]
pub(crate) enum ContentModel {
    #[default]
    None,
    /// Plain repeated children.
    Bare,
    /// Strict left-to-right tuple groups; the shape names the slots.
    Tuple(Arc<TypeShape>),
    /// Tagged alternatives mixed with character data.
    Union,
}

#[derive(Debug)]
pub(crate) struct CompiledType {
    pub shape: Arc<TypeShape>,
    /// Indexed by resolved attribute name.
    pub attrs: Box<[Option<AttrAction>]>,
    pub attr_fields: Vec<AttrField>,
    /// Indexed by resolved element name.
    pub children: Box<[Option<ChildAction>]>,
    pub child_fields: Vec<ChildField>,
    pub content: ContentModel,
    pub allow_text: bool,
    pub unknown_attrs: UnknownAttrPolicy,
}

impl CompiledType {
    /// Whether values of this type carry an ordered content list.
    pub(crate) fn has_content_list(&self) -> bool {
        self.allow_text || !matches!(self.content, ContentModel::None)
    }
}

#[derive(Debug)]
pub(crate) struct EnumDef {
    pub symbols: Vec<Arc<str>>,
    pub table: NameTable,
}

#[derive(Debug)]
pub(crate) struct CharEnumDef {
    pub allowed: String,
}

#[derive(Debug, Clone)]
pub(crate) struct RootDef {
    pub elem: usize,
    pub tag: Arc<str>,
    pub target: Target,
}

/// A compiled schema. Built once, shared by any number of parses.
#[derive(Debug)]
pub struct Schema {
    elements: NameTable,
    attributes: NameTable,
    types: Vec<CompiledType>,
    type_index: FastMap<String, usize>,
    enums: Vec<EnumDef>,
    char_enums: Vec<CharEnumDef>,
    roots: Vec<RootDef>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// The shape of a named element type, if defined.
    pub fn type_shape(&self, name: &str) -> Option<&Arc<TypeShape>> {
        self.type_index.get(name).map(|&ix| &self.types[ix].shape)
    }

    pub(crate) fn resolve_element(&self, name: &str) -> Option<usize> {
        self.elements.resolve(name)
    }

    pub(crate) fn resolve_attribute(&self, name: &str) -> Option<usize> {
        self.attributes.resolve(name)
    }

    pub(crate) fn ty(&self, index: usize) -> &CompiledType {
        &self.types[index]
    }

    pub(crate) fn enum_def(&self, index: usize) -> &EnumDef {
        &self.enums[index]
    }

    pub(crate) fn char_enum(&self, index: usize) -> &CharEnumDef {
        &self.char_enums[index]
    }

    pub(crate) fn roots(&self) -> &[RootDef] {
        &self.roots
    }
}

/// One-shot schema compilation state.
struct Compilation {
    type_index: FastMap<String, usize>,
    enum_index: FastMap<String, usize>,
    char_enum_index: FastMap<String, usize>,
}

impl Compilation {
    fn run(builder: SchemaBuilder) -> Result<Schema, SchemaError> {
        if builder.roots.is_empty() {
            return Err(SchemaError::NoRoots);
        }

        let mut state = Compilation {
            type_index: FastMap::default(),
            enum_index: FastMap::default(),
            char_enum_index: FastMap::default(),
        };

        // First pass: index type names so references can point forward.
        let mut element_defs: Vec<(String, ElementDef)> = Vec::new();
        let mut enums: Vec<EnumDef> = Vec::new();
        let mut char_enums: Vec<CharEnumDef> = Vec::new();
        for (name, def) in builder.types {
            let taken = state.type_index.contains_key(&name)
                || state.enum_index.contains_key(&name)
                || state.char_enum_index.contains_key(&name);
            if taken {
                return Err(SchemaError::DuplicateType(name));
            }
            match def {
                TypeDef::Element(def) => {
                    state.type_index.insert(name.clone(), element_defs.len());
                    element_defs.push((name, def));
                }
                TypeDef::Enum(values) => {
                    state.enum_index.insert(name, enums.len());
                    enums.push(EnumDef {
                        symbols: values.iter().map(|v| Arc::from(v.as_str())).collect(),
                        table: NameTable::new(values)?,
                    });
                }
                TypeDef::CharEnum(allowed) => {
                    state.char_enum_index.insert(name, char_enums.len());
                    char_enums.push(CharEnumDef { allowed });
                }
            }
        }

        // Collect the global element and attribute name sets.
        let mut element_names: Vec<String> = Vec::new();
        let mut attribute_names: Vec<String> = Vec::new();
        for (root, _) in &builder.roots {
            element_names.push(root.clone());
        }
        for (_, def) in &element_defs {
            for child in &def.children {
                element_names.push(child.elem.clone());
            }
            match &def.content {
                ContentSpec::None => {}
                ContentSpec::Bare(items) | ContentSpec::Tuple(items) | ContentSpec::Union(items) => {
                    element_names.extend(items.iter().map(|(e, _)| e.clone()))
                }
            }
            for attr in &def.attrs {
                attribute_names.push(attr.name.clone());
            }
        }
        // The #char builtin reads its code point from a "value" attribute.
        attribute_names.push("value".to_string());

        element_names.sort();
        element_names.dedup();
        attribute_names.sort();
        attribute_names.dedup();

        let elements = NameTable::new(element_names)?;
        let attributes = NameTable::new(attribute_names)?;

        // Second pass: compile dispatch tables.
        let mut types = Vec::with_capacity(element_defs.len());
        for (name, def) in &element_defs {
            types.push(state.compile_element(name, def, &elements, &attributes)?);
        }

        let mut roots = Vec::with_capacity(builder.roots.len());
        for (elem, ty) in &builder.roots {
            let target = state.resolve_target(ty, elem)?;
            let elem_ix = elements
                .resolve(elem)
                .expect("root element names are part of the element set");
            roots.push(RootDef {
                elem: elem_ix,
                tag: Arc::from(elem.as_str()),
                target,
            });
        }

        Ok(Schema {
            elements,
            attributes,
            types,
            type_index: state.type_index,
            enums,
            char_enums,
            roots,
        })
    }

    fn resolve_target(&self, ty: &str, context: &str) -> Result<Target, SchemaError> {
        match ty {
            "#text" => Ok(Target::Text),
            "#empty" => Ok(Target::Empty),
            "#char" => Ok(Target::CharSub),
            _ => match self.type_index.get(ty) {
                Some(&ix) => Ok(Target::Node(ix)),
                None if self.enum_index.contains_key(ty) || self.char_enum_index.contains_key(ty) => {
                    Err(SchemaError::NotAnElementType {
                        reference: ty.to_string(),
                        context: context.to_string(),
                    })
                }
                None => Err(SchemaError::UnknownType {
                    reference: ty.to_string(),
                    context: context.to_string(),
                }),
            },
        }
    }

    fn resolve_attr_coerce(&self, ty: &str, context: &str) -> Result<AttrCoerce, SchemaError> {
        match ty {
            "#string" => Ok(AttrCoerce::Str),
            "#int" => Ok(AttrCoerce::Int),
            "#bool" => Ok(AttrCoerce::Bool),
            _ => {
                if let Some(&ix) = self.enum_index.get(ty) {
                    Ok(AttrCoerce::Enum(ix))
                } else if let Some(&ix) = self.char_enum_index.get(ty) {
                    Ok(AttrCoerce::CharEnum(ix))
                } else if self.type_index.contains_key(ty) {
                    Err(SchemaError::NotAnAttributeType {
                        reference: ty.to_string(),
                        context: context.to_string(),
                    })
                } else {
                    Err(SchemaError::UnknownType {
                        reference: ty.to_string(),
                        context: context.to_string(),
                    })
                }
            }
        }
    }

    fn compile_element(
        &self,
        name: &str,
        def: &ElementDef,
        elements: &NameTable,
        attributes: &NameTable,
    ) -> Result<CompiledType, SchemaError> {
        let mut field_names: Vec<Arc<str>> = Vec::new();
        let mut seen: FastMap<String, ()> = FastMap::default();
        let mut claim = |n: &str| -> Result<(), SchemaError> {
            if seen.insert(n.to_string(), ()).is_some() {
                return Err(SchemaError::DuplicateName {
                    name: n.to_string(),
                    context: name.to_string(),
                });
            }
            Ok(())
        };

        let mut attr_table: Vec<Option<AttrAction>> = vec![None; attributes.len()];
        let mut attr_fields = Vec::with_capacity(def.attrs.len());
        for attr in &def.attrs {
            claim(&attr.name)?;
            let field = field_names.len();
            field_names.push(Arc::from(attr.name.as_str()));
            let coerce = self.resolve_attr_coerce(&attr.ty, name)?;
            let ix = attributes
                .resolve(&attr.name)
                .expect("declared attribute names are part of the attribute set");
            attr_table[ix] = Some(AttrAction { field, coerce });
            attr_fields.push(AttrField {
                field,
                name: Arc::from(attr.name.as_str()),
                optional: attr.optional,
            });
        }

        let mut child_table: Vec<Option<ChildAction>> = vec![None; elements.len()];
        let mut child_fields = Vec::with_capacity(def.children.len());
        for child in &def.children {
            claim(&child.elem)?;
            let field = field_names.len();
            field_names.push(Arc::from(child.elem.as_str()));
            let target = self.resolve_target(&child.ty, name)?;
            let ix = elements
                .resolve(&child.elem)
                .expect("declared child names are part of the element set");
            let elem: Arc<str> = Arc::from(child.elem.as_str());
            child_table[ix] = match child.cardinality {
                Cardinality::List { .. } => Some(ChildAction::ListAppend { field, target }),
                _ => Some(ChildAction::Single {
                    field,
                    elem: Arc::clone(&elem),
                    target,
                }),
            };
            child_fields.push(ChildField {
                field,
                elem,
                cardinality: child.cardinality,
            });
        }

        let content = match &def.content {
            ContentSpec::None => ContentModel::None,
            ContentSpec::Bare(items) => {
                for (elem, ty) in items {
                    claim(elem)?;
                    let target = self.resolve_target(ty, name)?;
                    let ix = elements
                        .resolve(elem)
                        .expect("content element names are part of the element set");
                    child_table[ix] = Some(ChildAction::Content { target });
                }
                ContentModel::Bare
            }
            ContentSpec::Tuple(slots) => {
                let shape = Arc::new(TypeShape::new(
                    &format!("{name}-item"),
                    slots.iter().map(|(e, _)| Arc::<str>::from(e.as_str())),
                ));
                for (index, (elem, ty)) in slots.iter().enumerate() {
                    claim(elem)?;
                    let target = self.resolve_target(ty, name)?;
                    let ix = elements
                        .resolve(elem)
                        .expect("tuple slot names are part of the element set");
                    child_table[ix] = Some(ChildAction::TupleSlot { index, target });
                }
                ContentModel::Tuple(shape)
            }
            ContentSpec::Union(alts) => {
                for (elem, ty) in alts {
                    claim(elem)?;
                    let target = self.resolve_target(ty, name)?;
                    // Only #char substitutes fold into an adjacent text
                    // run; every other alternative keeps its tag.
                    let accumulates_text = matches!(target, Target::CharSub);
                    let ix = elements
                        .resolve(elem)
                        .expect("union alternative names are part of the element set");
                    child_table[ix] = Some(ChildAction::UnionAlt {
                        tag: Arc::from(elem.as_str()),
                        target,
                        accumulates_text,
                    });
                }
                ContentModel::Union
            }
        };

        Ok(CompiledType {
            shape: Arc::new(TypeShape::new(name, field_names)),
            attrs: attr_table.into_boxed_slice(),
            attr_fields,
            children: child_table.into_boxed_slice(),
            child_fields,
            content,
            allow_text: def.allow_text,
            unknown_attrs: def.unknown_attrs,
        })
    }
}
