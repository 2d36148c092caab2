use std::sync::Arc;

use crate::model::{FrozenList, Node, TaggedValue, TupleItem};

/// A single value in the parsed tree.
///
/// `Null` stands for an optional field that was absent from the document.
/// Enumeration values are interned symbols shared with the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Bool(bool),
    Char(char),
    Enum(Arc<str>),
    Node(Node),
    List(FrozenList<Value>),
    Tagged(Box<TaggedValue>),
    Tuple(TupleItem),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// The symbol of an enumeration value.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&FrozenList<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_tagged(&self) -> Option<&TaggedValue> {
        match self {
            Value::Tagged(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&TupleItem> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }
}
