//! Growth policy: when a table grows and by how much.

use crate::error::TableError;

/// How the load `len / capacity` is measured against the growth threshold.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Integer division first, then compare. With the default threshold of
    /// 2.5 this grows once `len >= 3 * capacity`.
    #[default]
    TruncatingDivision,
    /// Floating-point ratio compared directly against the threshold.
    Exact,
}

/// Growth configuration for a [`ChainTable`](crate::ChainTable).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GrowthPolicy {
    /// Bucket count at construction and after `clear`.
    pub initial_capacity: usize,
    /// Load above which the next insert first resizes.
    pub growth_threshold: f64,
    /// Factor applied to the bucket count on resize.
    pub growth_ratio: f64,
    pub threshold_mode: ThresholdMode,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: 10,
            growth_threshold: 2.5,
            growth_ratio: 1.5,
            threshold_mode: ThresholdMode::TruncatingDivision,
        }
    }
}

impl GrowthPolicy {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_growth_threshold(mut self, growth_threshold: f64) -> Self {
        self.growth_threshold = growth_threshold;
        self
    }

    pub fn with_growth_ratio(mut self, growth_ratio: f64) -> Self {
        self.growth_ratio = growth_ratio;
        self
    }

    pub fn with_threshold_mode(mut self, threshold_mode: ThresholdMode) -> Self {
        self.threshold_mode = threshold_mode;
        self
    }

    /// Reject configurations that would leave a table without buckets or
    /// unable to grow.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.initial_capacity == 0 {
            return Err(TableError::PreconditionViolation(
                "initial_capacity must be at least 1",
            ));
        }
        if !self.growth_threshold.is_finite() || self.growth_threshold <= 0.0 {
            return Err(TableError::PreconditionViolation(
                "growth_threshold must be finite and positive",
            ));
        }
        if !self.growth_ratio.is_finite() || self.growth_ratio <= 1.0 {
            return Err(TableError::PreconditionViolation(
                "growth_ratio must be finite and greater than 1",
            ));
        }
        Ok(())
    }

    /// Whether a table holding `len` entries in `capacity` buckets must grow
    /// before accepting another entry.
    pub fn should_grow(&self, len: usize, capacity: usize) -> bool {
        debug_assert!(capacity > 0);
        let load = match self.threshold_mode {
            ThresholdMode::TruncatingDivision => (len / capacity) as f64,
            ThresholdMode::Exact => len as f64 / capacity as f64,
        };
        load > self.growth_threshold
    }

    /// Bucket count after one resize step. Always strictly larger than
    /// `capacity`, even when truncation would round the scaled value down to it.
    pub fn next_capacity(&self, capacity: usize) -> usize {
        let scaled = (capacity as f64 * self.growth_ratio) as usize;
        scaled.max(capacity.saturating_add(1))
    }
}
