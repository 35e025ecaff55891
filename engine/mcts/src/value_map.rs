//! Sorted multiset of node means used to normalize values into `[-1, 1]`.
//!
//! Proof-cost values are unbounded in principle (they grow with the number
//! of P1 moves on a path), so Q-values are rescaled against the smallest and
//! largest mean currently in the tree.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    counts: BTreeMap<OrderedFloat<f32>, u32>,
    total: usize,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: f32) {
        *self.counts.entry(OrderedFloat(value)).or_insert(0) += 1;
        self.total += 1;
    }

    /// Remove one occurrence of `value`. Returns `false` if it was absent.
    pub fn decrement(&mut self, value: f32) -> bool {
        let key = OrderedFloat(value);
        let Some(count) = self.counts.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&key);
        }
        self.total -= 1;
        true
    }

    pub fn min(&self) -> Option<f32> {
        self.counts.keys().next().map(|k| k.0)
    }

    pub fn max(&self) -> Option<f32> {
        self.counts.keys().next_back().map(|k| k.0)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of values counting duplicates.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Occurrences of `value`.
    pub fn count(&self, value: f32) -> u32 {
        self.counts.get(&OrderedFloat(value)).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }

    /// `(value, occurrences)` in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (f32, u32)> + '_ {
        self.counts.iter().map(|(k, &c)| (k.0, c))
    }

    /// Map `mean` linearly onto `[-1, 1]` using the current min and max.
    ///
    /// With fewer than two distinct values there is no range to scale
    /// against and the result is -1.
    pub fn normalize(&self, mean: f32) -> f32 {
        let (Some(lower), Some(upper)) = (self.min(), self.max()) else {
            return -1.0;
        };
        if self.len() <= 1 {
            return -1.0;
        }
        let value = (mean - lower) / (upper - lower);
        (2.0 * value - 1.0).clamp(-1.0, 1.0)
    }
}
