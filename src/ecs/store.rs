//! Sparse-mapped dense component storage.
//!
//! Per spec.md §4.7: each component type has a dense packed array of
//! `(EntityId, T)` pairs plus a hash map `EntityId -> dense index`. Removal
//! is O(1) swap-with-last plus a map update. This replaces the teacher's
//! reliance on Bevy's internal (opaque) component storage with the
//! explicit contract spec.md requires — `get`, `get_mut`, `has`, and dense
//! iteration are all part of the crate's public surface, not hidden behind
//! a query macro.

use std::collections::HashMap;

use crate::ecs::entity::EntityId;

/// Dense, packed storage for one component type.
///
/// Invariant (spec.md §4.7): `dense.len() == index.len()`, and `index`'s
/// image is exactly `0..dense.len()`.
#[derive(Debug)]
pub struct ComponentStore<T> {
    dense: Vec<(EntityId, T)>,
    index: HashMap<EntityId, usize>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> ComponentStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities carrying this component.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    #[must_use]
    pub fn has(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Insert or overwrite the component for `id`.
    pub fn insert(&mut self, id: EntityId, value: T) {
        if let Some(&i) = self.index.get(&id) {
            self.dense[i].1 = value;
        } else {
            self.index.insert(id, self.dense.len());
            self.dense.push((id, value));
        }
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.dense[i].1)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.dense[i].1),
            None => None,
        }
    }

    /// Remove the component for `id` via swap-with-last. Returns the
    /// removed value, if present.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let i = self.index.remove(&id)?;
        let last = self.dense.len() - 1;
        self.dense.swap(i, last);
        let (_, value) = self.dense.pop().expect("dense non-empty");
        if i != last {
            let moved_id = self.dense[i].0;
            self.index.insert(moved_id, i);
        }
        Some(value)
    }

    /// Dense iteration in insertion-relative order (order is only stable
    /// until the next `remove`, per the swap-with-last invariant).
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense.iter().map(|(id, v)| (*id, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.dense.iter_mut().map(|(id, v)| (*id, v))
    }

    /// Check the representation invariant: useful in property tests
    /// (spec.md §8 "Entity store" quantified invariant).
    #[cfg(test)]
    fn check_invariant(&self) {
        assert_eq!(self.dense.len(), self.index.len());
        for (expected_idx, (id, _)) in self.dense.iter().enumerate() {
            assert_eq!(self.index.get(id), Some(&expected_idx));
        }
    }
}
