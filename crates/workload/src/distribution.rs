//! Discrete distributions used for session planning and page navigation.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform choice over a fixed list of values.
#[derive(Clone, Debug)]
pub struct Choice<T> {
    values: Vec<T>,
}

impl<T> Choice<T> {
    /// Create a choice. Returns `None` for an empty list.
    pub fn new(values: Vec<T>) -> Option<Self> {
        if values.is_empty() {
            None
        } else {
            Some(Self { values })
        }
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        // Non-empty by construction.
        &self.values[rng.gen_range(0..self.values.len())]
    }
}

/// Weighted choice over a fixed list of values.
#[derive(Clone, Debug)]
pub struct WeightedTable<T> {
    items: Vec<T>,
    index: WeightedIndex<u32>,
}

impl<T> WeightedTable<T> {
    /// Build a table from `(value, weight)` pairs.
    ///
    /// Returns `None` when the list is empty or every weight is zero.
    pub fn new(entries: Vec<(T, u32)>) -> Option<Self> {
        let (items, weights): (Vec<T>, Vec<u32>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(weights).ok()?;
        Some(Self { items, index })
    }

    /// Draw one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.items[self.index.sample(rng)]
    }

    /// Number of entries, including zero-weight ones.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table is empty (never true for a constructed table).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Pick `k` distinct elements of `items` (all of them if `k >= len`).
pub fn sample_distinct<T: Clone, R: Rng + ?Sized>(items: &[T], k: usize, rng: &mut R) -> Vec<T> {
    items
        .choose_multiple(rng, k.min(items.len()))
        .cloned()
        .collect()
}
