use std::sync::Arc;

use crate::model::Value;

/// A `(tag, payload)` pair: one alternative of a tagged union, or the
/// document root wrapped with the name of the matched root element.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    tag: Arc<str>,
    value: Value,
}

impl TaggedValue {
    pub fn new(tag: Arc<str>, value: Value) -> Self {
        TaggedValue { tag, value }
    }

    /// The name of the matched union alternative.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
