// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Write Batch - ordered producer buffer.

use crate::event::Event;

/// Ordered, append-only buffer of events. No dedup, no capacity limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBatch<E> {
    events: Vec<E>,
}

impl<E: Event> WriteBatch<E> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: E) {
        self.events.push(event);
    }

    /// Visit events in insertion order. The batch is left untouched, so it can
    /// be walked again.
    pub fn each<F>(&self, mut visit: F)
    where
        F: FnMut(&E),
    {
        for event in &self.events {
            visit(event);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E: Event> Default for WriteBatch<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Extend<E> for WriteBatch<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<E: Event> FromIterator<E> for WriteBatch<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for WriteBatch<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a WriteBatch<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_is_ordered_and_restartable() {
        let mut batch = WriteBatch::new();
        batch.push("x");
        batch.push("y");
        batch.push("x");

        let mut first = Vec::new();
        batch.each(|e| first.push(*e));
        let mut second = Vec::new();
        batch.each(|e| second.push(*e));

        assert_eq!(first, vec!["x", "y", "x"]);
        assert_eq!(first, second);
        assert_eq!(batch.len(), 3);
    }
}
