/// Random number source shared by every generator.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RandomError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Every draw a generator makes goes through this trait, so a seeded
/// `StdRng` makes a whole generation reproducible.
///
/// Implemented for all [`rand::Rng`] types.
pub trait RandomSource {
    /// Uniform integer in `[min, max]`, both ends inclusive. Swapped bounds
    /// are tolerated.
    fn uniform_int(&mut self, min: i32, max: i32) -> i32;

    /// Uniform float in `[0, 1)`.
    fn uniform_float(&mut self) -> f64;

    /// Index `i` with probability `weights[i] / sum(weights)`.
    fn weighted_index(&mut self, weights: &[u32]) -> Result<usize, RandomError>;

    fn weighted_choice<'a, T>(
        &mut self,
        items: &'a [T],
        weights: &[u32],
    ) -> Result<&'a T, RandomError> {
        if items.len() != weights.len() {
            return Err(RandomError::InvalidInput(format!(
                "{} items but {} weights",
                items.len(),
                weights.len()
            )));
        }
        let index = self.weighted_index(weights)?;
        Ok(&items[index])
    }

    /// Uniform pick; `None` on an empty slice.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.uniform_int(0, items.len() as i32 - 1) as usize;
        items.get(index)
    }

    /// Up to `count` distinct items, in draw order.
    fn pick_distinct<'a, T>(&mut self, items: &'a [T], count: usize) -> Vec<&'a T> {
        let mut indices: Vec<usize> = (0..items.len()).collect();
        let take = count.min(items.len());
        for i in 0..take {
            let j = self.uniform_int(i as i32, indices.len() as i32 - 1) as usize;
            indices.swap(i, j);
        }
        indices[..take].iter().map(|&i| &items[i]).collect()
    }

    /// Sum of `count` dice with `sides` faces each.
    fn roll(&mut self, count: u32, sides: u32) -> u32 {
        (0..count)
            .map(|_| self.uniform_int(1, sides.max(1) as i32) as u32)
            .sum()
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.uniform_float() < p
    }
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform_int(&mut self, min: i32, max: i32) -> i32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.gen_range(lo..=hi)
    }

    fn uniform_float(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn weighted_index(&mut self, weights: &[u32]) -> Result<usize, RandomError> {
        // Summed as u64: a handful of large u32 weights must not overflow.
        let dist = WeightedIndex::new(weights.iter().map(|&w| u64::from(w)))
            .map_err(|e| RandomError::InvalidInput(format!("bad weights: {e}")))?;
        Ok(dist.sample(self))
    }
}
