//! Insertion-ordered unique collection
//!
//! Every by-type and by-tag registry, every child list and every tag list is a
//! [`ComponentSet`]. Removal leaves a hole that is skipped during iteration;
//! holes are compacted once they outnumber live entries, which keeps both
//! insertion and removal O(1) amortized.

use std::collections::HashMap;
use std::hash::Hash;

/// An insertion-ordered set of unique values
#[derive(Clone, Debug)]
pub struct ComponentSet<T> {
    slots: Vec<Option<T>>,
    positions: HashMap<T, usize>,
}

impl<T> Default for ComponentSet<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> ComponentSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value at the end; returns false if it was already present
    pub fn insert(&mut self, value: T) -> bool {
        if self.positions.contains_key(&value) {
            return false;
        }
        self.positions.insert(value, self.slots.len());
        self.slots.push(Some(value));
        true
    }

    /// Remove a value; returns false if it was not present
    pub fn remove(&mut self, value: &T) -> bool {
        let Some(position) = self.positions.remove(value) else {
            return false;
        };
        self.slots[position] = None;

        let holes = self.slots.len() - self.positions.len();
        if holes > 8 && holes > self.positions.len() {
            self.compact();
        }
        true
    }

    /// Check membership
    #[inline]
    pub fn contains(&self, value: &T) -> bool {
        self.positions.contains_key(value)
    }

    /// Number of values in the set
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The oldest value still in the set
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    /// Copy the current contents, in insertion order
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.slots.clear();
        self.positions.clear();
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (position, slot) in self.slots.iter().enumerate() {
            if let Some(value) = slot {
                self.positions.insert(*value, position);
            }
        }
    }
}

impl<T: Copy + Eq + Hash> FromIterator<T> for ComponentSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}
