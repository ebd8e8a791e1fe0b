//! Dynamic batch means.
//!
//! Observations fill batches of the current batch size. Each full batch
//! contributes its mean. When the number of batch means reaches
//! `min_batches × max_multiple`, adjacent pairs are averaged into one and
//! the batch size doubles, so the number of batches stays bounded however
//! long the run while every observation still counts.

use tracing::trace;

use crate::discretize::default_interval;
use crate::error::StatsError;
use crate::statistic::Statistic;

/// Batching parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchingConfig {
    /// Fewest batches kept after a rebatch. Default: 20.
    pub min_batches: usize,
    /// Starting batch size. Default: 16.
    pub min_batch_size: usize,
    /// Batch count, as a multiple of `min_batches`, that triggers a
    /// rebatch. Default: 2.
    pub max_multiple: usize,
    /// Tick width used to discretize time-weighted responses. `None`
    /// derives it from the run with [`default_interval`]. Default: `None`.
    pub interval: Option<f64>,
}

impl BatchingConfig {
    /// Check every parameter is at least 2.
    pub fn validate(&self) -> Result<(), StatsError> {
        for (name, value) in [
            ("minimum batch count", self.min_batches),
            ("minimum batch size", self.min_batch_size),
            ("maximum batch multiple", self.max_multiple),
        ] {
            if value < 2 {
                return Err(StatsError::BatchParameter { name, value });
            }
        }
        match self.interval {
            Some(value) if !(value.is_finite() && value > 0.0) => {
                Err(StatsError::Interval { value })
            }
            _ => Ok(()),
        }
    }

    /// The discretization interval for a run of `replication_length` with
    /// `warm_up_length`: the configured one, else the default rule.
    pub fn resolve_interval(&self, replication_length: f64, warm_up_length: f64) -> Option<f64> {
        self.interval
            .or_else(|| default_interval(replication_length, warm_up_length))
    }

    /// Batch count at which adjacent batches are merged.
    pub fn max_batches(&self) -> usize {
        self.min_batches * self.max_multiple
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            min_batches: 20,
            min_batch_size: 16,
            max_multiple: 2,
            interval: None,
        }
    }
}

/// Batch-means accumulator.
#[derive(Clone, Debug)]
pub struct BatchStatistic {
    config: BatchingConfig,
    batch_size: usize,
    batch_means: Vec<f64>,
    partial_sum: f64,
    partial_count: usize,
    rebatches: u32,
    total: Statistic,
}

impl BatchStatistic {
    /// Create an accumulator; fails if any parameter is below 2.
    pub fn new(config: BatchingConfig) -> Result<Self, StatsError> {
        config.validate()?;
        Ok(Self {
            config,
            batch_size: config.min_batch_size,
            batch_means: Vec::with_capacity(config.max_batches()),
            partial_sum: 0.0,
            partial_count: 0,
            rebatches: 0,
            total: Statistic::new(),
        })
    }

    /// Add one observation.
    pub fn collect(&mut self, x: f64) {
        self.total.collect(x);
        self.partial_sum += x;
        self.partial_count += 1;
        if self.partial_count == self.batch_size {
            self.batch_means
                .push(self.partial_sum / self.batch_size as f64);
            self.partial_sum = 0.0;
            self.partial_count = 0;
            while self.batch_means.len() >= self.config.max_batches() {
                self.rebatch();
            }
        }
    }

    fn rebatch(&mut self) {
        let old_size = self.batch_size;
        if self.batch_means.len() % 2 == 1 {
            // An unpaired batch returns to the partial batch at the new
            // size. The partial batch is empty right after a batch closes.
            if let Some(leftover) = self.batch_means.pop() {
                self.partial_sum += leftover * old_size as f64;
                self.partial_count += old_size;
            }
        }
        self.batch_means = self
            .batch_means
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
        self.batch_size = old_size * 2;
        self.rebatches += 1;
        trace!(
            batches = self.batch_means.len(),
            batch_size = self.batch_size,
            "rebatched"
        );
    }

    /// Forget every observation; the configuration is kept.
    pub fn reset(&mut self) {
        self.batch_size = self.config.min_batch_size;
        self.batch_means.clear();
        self.partial_sum = 0.0;
        self.partial_count = 0;
        self.rebatches = 0;
        self.total.reset();
    }

    /// The configuration.
    pub fn config(&self) -> BatchingConfig {
        self.config
    }

    /// Completed batch means, oldest first.
    pub fn batch_means(&self) -> &[f64] {
        &self.batch_means
    }

    /// Number of completed batches.
    pub fn batch_count(&self) -> usize {
        self.batch_means.len()
    }

    /// Observations per completed batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Observations waiting in the partial batch.
    pub fn partial_count(&self) -> usize {
        self.partial_count
    }

    /// How many times batches were merged.
    pub fn rebatch_count(&self) -> u32 {
        self.rebatches
    }

    /// Total observations collected.
    pub fn count(&self) -> u64 {
        self.total.count()
    }

    /// Summary of every raw observation.
    pub fn observations(&self) -> &Statistic {
        &self.total
    }

    /// Summary of the completed batch means. Its half-width is the
    /// batch-means confidence interval.
    pub fn batch_mean_statistic(&self) -> Statistic {
        let mut s = Statistic::from_values(&self.batch_means);
        // The level was validated when it was set on `total`.
        let _ = s.set_confidence_level(self.total.confidence_level());
        s
    }

    /// Set the confidence level used for batch-means half-widths.
    pub fn set_confidence_level(&mut self, level: f64) -> Result<(), StatsError> {
        self.total.set_confidence_level(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_batches: usize, min_batch_size: usize, max_multiple: usize) -> BatchingConfig {
        BatchingConfig {
            min_batches,
            min_batch_size,
            max_multiple,
            interval: None,
        }
    }

    #[test]
    fn rejects_parameters_below_two() {
        for bad in [config(1, 2, 2), config(2, 1, 2), config(2, 2, 1)] {
            assert!(matches!(
                BatchStatistic::new(bad),
                Err(StatsError::BatchParameter { value: 1, .. })
            ));
        }
        assert!(BatchStatistic::new(config(2, 2, 2)).is_ok());
    }

    #[test]
    fn interval_validated_and_resolved() {
        let mut cfg = BatchingConfig::default();
        assert_eq!(cfg.resolve_interval(532.0, 20.0), Some(1.0));
        assert_eq!(cfg.resolve_interval(f64::INFINITY, 0.0), None);
        cfg.interval = Some(0.5);
        assert_eq!(cfg.resolve_interval(f64::INFINITY, 0.0), Some(0.5));
        cfg.interval = Some(-1.0);
        assert!(matches!(cfg.validate(), Err(StatsError::Interval { .. })));
    }

    #[test]
    fn batches_fill_then_merge_pairwise() {
        let mut b = BatchStatistic::new(config(2, 2, 2)).unwrap();
        for x in [1.0, 3.0, 5.0, 7.0, 9.0, 11.0] {
            b.collect(x);
        }
        assert_eq!(b.batch_means(), &[2.0, 6.0, 10.0]);
        assert_eq!(b.batch_size(), 2);

        // The fourth batch reaches 2 × 2 and triggers a merge.
        b.collect(13.0);
        b.collect(15.0);
        assert_eq!(b.batch_means(), &[4.0, 12.0]);
        assert_eq!(b.batch_size(), 4);
        assert_eq!(b.rebatch_count(), 1);
        assert_eq!(b.count(), 8);
    }

    #[test]
    fn odd_batch_count_returns_leftover_to_partial() {
        let mut b = BatchStatistic::new(config(3, 2, 3)).unwrap();
        for i in 0..18 {
            b.collect(f64::from(i));
        }
        // Nine batches of two merge into four of four plus a leftover.
        assert_eq!(b.batch_count(), 4);
        assert_eq!(b.batch_size(), 4);
        assert_eq!(b.partial_count(), 2);
        assert_eq!(b.batch_means(), &[1.5, 5.5, 9.5, 13.5]);
    }

    #[test]
    fn reset_keeps_configuration() {
        let mut b = BatchStatistic::new(config(2, 2, 2)).unwrap();
        for i in 0..20 {
            b.collect(f64::from(i));
        }
        b.reset();
        assert_eq!(b.count(), 0);
        assert_eq!(b.batch_count(), 0);
        assert_eq!(b.batch_size(), 2);
        assert_eq!(b.config(), config(2, 2, 2));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn batch_count_bounded_and_no_data_lost(
                min_batches in 2usize..6,
                min_batch_size in 2usize..6,
                max_multiple in 2usize..4,
                n in 0usize..2000,
            ) {
                let cfg = config(min_batches, min_batch_size, max_multiple);
                let mut b = BatchStatistic::new(cfg).unwrap();
                for i in 0..n {
                    b.collect((i % 13) as f64);
                    prop_assert!(b.batch_count() <= cfg.max_batches());
                }
                let in_batches = b.batch_count() * b.batch_size() + b.partial_count();
                prop_assert_eq!(in_batches as u64, b.count());
                prop_assert_eq!(b.count(), n as u64);
            }

            #[test]
            fn batch_means_preserve_total(
                n in 1usize..1500,
            ) {
                let mut b = BatchStatistic::new(config(4, 2, 2)).unwrap();
                let mut sum = 0.0;
                for i in 0..n {
                    let x = (i * 7 % 11) as f64;
                    sum += x;
                    b.collect(x);
                }
                let batched: f64 = b.batch_means().iter().sum::<f64>() * b.batch_size() as f64;
                let partial = sum - batched;
                prop_assert!(partial >= -1e-6);
                prop_assert!(b.partial_count() > 0 || partial.abs() < 1e-6);
            }
        }
    }
}
