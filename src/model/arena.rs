//! Index-stable storage for sketch elements.
//!
//! Elements are never removed or reordered while a sketch is being worked
//! on; passes retire an element by clearing its `exists` flag so every index
//! held elsewhere stays valid.

use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Returned by [`Arena::push`] when the configured capacity is reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} arena is full (capacity {capacity})")]
pub struct CapacityError {
    /// What the arena stores ("atom", "bond", "letter").
    pub kind: &'static str,
    /// The configured capacity.
    pub capacity: usize,
}

/// Growable vector with a hard capacity and stable `usize` keys.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    kind: &'static str,
    capacity: usize,
    items: Vec<T>,
}

impl<T> Arena<T> {
    pub fn new(kind: &'static str, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            items: Vec::new(),
        }
    }

    /// Appends an element and returns its index.
    pub fn push(&mut self, item: T) -> Result<usize, CapacityError> {
        if self.items.len() >= self.capacity {
            return Err(CapacityError {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Reorders the elements.
    ///
    /// Only valid before any other structure stores indices into this arena.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.items.sort_by(compare);
    }
}

impl<T> Index<usize> for Arena<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for Arena<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_indices() {
        let mut arena = Arena::new("atom", 4);
        assert_eq!(arena.push('a'), Ok(0));
        assert_eq!(arena.push('b'), Ok(1));
        assert_eq!(arena[1], 'b');
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn push_past_capacity_fails_without_clamping() {
        let mut arena = Arena::new("bond", 2);
        arena.push(1).unwrap();
        arena.push(2).unwrap();
        let err = arena.push(3).unwrap_err();
        assert_eq!(
            err,
            CapacityError {
                kind: "bond",
                capacity: 2
            }
        );
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[1], 2);
    }

    #[test]
    fn index_mut_updates_in_place() {
        let mut arena = Arena::new("letter", 8);
        let i = arena.push(10).unwrap();
        arena[i] += 5;
        assert_eq!(arena.get(i), Some(&15));
        assert!(arena.get(3).is_none());
    }
}
