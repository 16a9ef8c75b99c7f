//! Session-scoped cursors for `#UNIQ` draws.
use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;

/// One fixed permutation and the position of the next element to hand out.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueCursor {
    order: Vec<Value>,
    next: usize,
}

impl UniqueCursor {
    fn shuffled<R: Rng>(items: &[Value], rng: &mut R) -> Self {
        let mut order = items.to_vec();
        order.shuffle(rng);
        Self { order, next: 0 }
    }

    /// The permutation drawn for this name.
    #[must_use]
    pub fn order(&self) -> &[Value] {
        &self.order
    }

    /// Index into [`Self::order`] of the next element.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.next
    }

    fn advance(&mut self) -> Option<Value> {
        let value = self.order.get(self.next)?.clone();
        self.next = (self.next + 1) % self.order.len();
        Some(value)
    }
}

/// Unique-draw state owned by a single expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermutationState {
    cursors: HashMap<String, UniqueCursor>,
}

impl PermutationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next element of the permutation for `name`, drawing the permutation on
    /// first use. Wraps to the start of the same permutation once exhausted.
    ///
    /// Returns `None` only for an empty list.
    pub fn next_unique<R: Rng>(&mut self, name: &str, items: &[Value], rng: &mut R) -> Option<Value> {
        if !self.cursors.contains_key(name) {
            log::trace!("drawing #UNIQ permutation for `{name}` ({} items)", items.len());
            self.cursors
                .insert(name.to_string(), UniqueCursor::shuffled(items, rng));
        }
        self.cursors.get_mut(name)?.advance()
    }

    #[must_use]
    pub fn cursor(&self, name: &str) -> Option<&UniqueCursor> {
        self.cursors.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
