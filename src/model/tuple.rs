use std::sync::Arc;

use crate::model::{TypeShape, Value};

/// A fixed-arity ordered record inside ordered-tuple content.
///
/// Fields are filled strictly left to right, across repeated sibling
/// elements; a slot is distinct from holding `Null` (an `#empty` child
/// legitimately stores `Null` into its slot). Indexed and sized access
/// mirror a plain tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleItem {
    shape: Arc<TypeShape>,
    fields: Box<[Option<Value>]>,
}

impl TupleItem {
    pub(crate) fn unfilled(shape: Arc<TypeShape>) -> Self {
        let fields = vec![None; shape.field_count()].into_boxed_slice();
        TupleItem { shape, fields }
    }

    /// Construct a completed item directly; requires exactly the declared
    /// arity.
    pub fn new(shape: Arc<TypeShape>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            shape.field_count(),
            "tuple item arity mismatch"
        );
        TupleItem {
            shape,
            fields: values.into_iter().map(Some).collect(),
        }
    }

    pub fn shape(&self) -> &Arc<TypeShape> {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).and_then(Option::as_ref)
    }

    /// Look up a slot by its field name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.shape
            .field_index(name)
            .and_then(|i| self.fields[i].as_ref())
    }

    pub(crate) fn is_filled(&self, index: usize) -> bool {
        self.fields[index].is_some()
    }

    // A repeated element within one group lands on the same slot and
    // replaces the earlier value.
    pub(crate) fn set(&mut self, index: usize, value: Value) {
        self.fields[index] = Some(value);
    }

    /// Index of the first unfilled slot, if the item is incomplete.
    pub(crate) fn first_unfilled(&self) -> Option<usize> {
        self.fields.iter().position(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> Arc<TypeShape> {
        Arc::new(TypeShape::new(
            "item",
            ["type", "name"].map(Arc::<str>::from),
        ))
    }

    #[test]
    fn fills_left_to_right() {
        let mut item = TupleItem::unfilled(shape());
        assert_eq!(item.first_unfilled(), Some(0));
        item.set(0, Value::Str("int".into()));
        assert_eq!(item.first_unfilled(), Some(1));
        item.set(1, Value::Str("x".into()));
        assert_eq!(item.first_unfilled(), None);
        assert_eq!(item.field("name"), Some(&Value::Str("x".into())));
        assert_eq!(item.get(0), Some(&Value::Str("int".into())));
        assert_eq!(item.len(), 2);
    }

    #[test]
    fn direct_construction_requires_exact_arity() {
        let item = TupleItem::new(
            shape(),
            vec![Value::Str("int".into()), Value::Str("x".into())],
        );
        assert_eq!(item.get(1), Some(&Value::Str("x".into())));
    }
}
