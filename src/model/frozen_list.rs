//! Append-then-immutable ordered sequence.

use std::ops::Index;

/// Default capacity for lists grown one push at a time.
pub(crate) const LIST_INITIAL_CAPACITY: usize = 5;

/// An ordered sequence that is append-only while its parse is running and
/// immutable afterwards. Backing storage grows by amortized doubling from
/// an initial capacity hint and is never exposed before the list is
/// sealed.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenList<T> {
    items: Vec<T>,
}

impl<T> FrozenList<T> {
    pub(crate) fn new() -> Self {
        FrozenList { items: Vec::new() }
    }

    pub(crate) fn push(&mut self, item: T) {
        if self.items.capacity() == 0 {
            self.items.reserve(LIST_INITIAL_CAPACITY);
        }
        self.items.push(item);
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Iterate over the sealed list. The cursor holds the list reference
    /// only while unexhausted.
    pub fn iter(&self) -> Cursor<'_, T> {
        Cursor {
            list: if self.items.is_empty() { None } else { Some(self) },
            index: 0,
        }
    }
}

impl<T> Default for FrozenList<T> {
    fn default() -> Self {
        FrozenList::new()
    }
}

impl<T> From<Vec<T>> for FrozenList<T> {
    fn from(items: Vec<T>) -> Self {
        FrozenList { items }
    }
}

impl<T> FromIterator<T> for FrozenList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        // Length hint from the source sequence, else the small default.
        let (lower, _) = iter.size_hint();
        let mut items = Vec::with_capacity(lower.max(LIST_INITIAL_CAPACITY));
        items.extend(iter);
        FrozenList { items }
    }
}

impl<T> Index<usize> for FrozenList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a FrozenList<T> {
    type Item = &'a T;
    type IntoIter = Cursor<'a, T>;

    fn into_iter(self) -> Cursor<'a, T> {
        self.iter()
    }
}

/// Iteration cursor: a non-owning handle, released as soon as the last
/// item has been yielded.
#[derive(Debug)]
pub struct Cursor<'a, T> {
    list: Option<&'a FrozenList<T>>,
    index: usize,
}

impl<'a, T> Iterator for Cursor<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let list = self.list?;
        let item = &list.items[self.index];
        self.index += 1;
        if self.index == list.items.len() {
            self.list = None;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.list {
            Some(list) => list.items.len() - self.index,
            None => 0,
        };
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Cursor<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_read() {
        let mut list = FrozenList::new();
        list.push("a");
        list.push("b");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1), Some(&"b"));
        assert_eq!(list.get(2), None);
        assert_eq!(list[0], "a");
    }

    #[test]
    fn reiterating_yields_identical_sequences() {
        let list: FrozenList<i32> = vec![1, 2, 3].into();
        let first: Vec<i32> = list.iter().copied().collect();
        let second: Vec<i32> = list.iter().copied().collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2, 3]);
    }

    #[test]
    fn cursor_releases_list_on_exhaustion() {
        let list: FrozenList<i32> = vec![7].into();
        let mut cursor = list.iter();
        assert_eq!(cursor.size_hint(), (1, Some(1)));
        assert_eq!(cursor.next(), Some(&7));
        assert!(cursor.list.is_none());
        assert_eq!(cursor.size_hint(), (0, Some(0)));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn empty_list_cursor_starts_released() {
        let list: FrozenList<i32> = FrozenList::new();
        let mut cursor = list.iter();
        assert!(cursor.list.is_none());
        assert_eq!(cursor.next(), None);
    }
}
