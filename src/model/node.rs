use std::sync::Arc;

use crate::model::{FrozenList, Value};

/// Shared, immutable description of one node or tuple-item type: its name
/// and the names of its fields, in field order. Built once per schema
/// compilation and attached to every value of that type.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeShape {
    name: Arc<str>,
    fields: Box<[Arc<str>]>,
}

impl TypeShape {
    pub(crate) fn new(name: &str, fields: impl IntoIterator<Item = Arc<str>>) -> Self {
        TypeShape {
            name: Arc::from(name),
            fields: fields.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.as_ref())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.as_ref() == name)
    }

    pub(crate) fn field_name(&self, index: usize) -> &Arc<str> {
        &self.fields[index]
    }
}

/// A parsed element: a fixed field vector plus, for content-bearing
/// types, the ordered content list.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    shape: Arc<TypeShape>,
    fields: Box<[Value]>,
    content: Option<FrozenList<Value>>,
}

impl Node {
    pub(crate) fn new(
        shape: Arc<TypeShape>,
        fields: Box<[Value]>,
        content: Option<FrozenList<Value>>,
    ) -> Self {
        debug_assert_eq!(shape.field_count(), fields.len());
        Node {
            shape,
            fields,
            content,
        }
    }

    pub fn type_name(&self) -> &str {
        self.shape.name()
    }

    pub fn shape(&self) -> &Arc<TypeShape> {
        &self.shape
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.shape.field_index(name).map(|i| &self.fields[i])
    }

    pub fn field_at(&self, index: usize) -> &Value {
        &self.fields[index]
    }

    /// Content list of a list-style element; `None` for field-only types.
    pub fn content(&self) -> Option<&FrozenList<Value>> {
        self.content.as_ref()
    }
}
