//! [`Statistic`]: single-pass summary of a sequence of observations.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::error::StatsError;

/// Default confidence level for half-widths.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Running summary of observations.
///
/// Mean and variance use Welford's update, so the summary is stable for
/// long runs. Lag-1 correlation and the von Neumann statistic are kept
/// from running cross-products and need no stored observations.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistic {
    count: u64,
    sum: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    first: f64,
    last: f64,
    sum_lag: f64,
    confidence_level: f64,
}

impl Statistic {
    /// An empty statistic at the default confidence level.
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            first: f64::NAN,
            last: f64::NAN,
            sum_lag: 0.0,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }

    /// Summarize a slice.
    pub fn from_values(values: &[f64]) -> Self {
        let mut s = Self::new();
        for &x in values {
            s.collect(x);
        }
        s
    }

    /// Set the confidence level used by [`half_width`](Self::half_width).
    pub fn set_confidence_level(&mut self, level: f64) -> Result<(), StatsError> {
        if !(level > 0.0 && level < 1.0) {
            return Err(StatsError::ConfidenceLevel { value: level });
        }
        self.confidence_level = level;
        Ok(())
    }

    /// Add one observation.
    pub fn collect(&mut self, x: f64) {
        if self.count == 0 {
            self.first = x;
        } else {
            self.sum_lag += self.last * x;
        }
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        self.last = x;
    }

    /// Forget every observation; the confidence level is kept.
    pub fn reset(&mut self) {
        let level = self.confidence_level;
        *self = Self::new();
        self.confidence_level = level;
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of observations.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sample mean; NaN when empty.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample variance (n − 1 denominator); NaN below two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation.
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean.
    pub fn standard_error(&self) -> f64 {
        self.standard_deviation() / (self.count as f64).sqrt()
    }

    /// Smallest observation; +∞ when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observation; −∞ when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The most recent observation; NaN when empty.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Confidence level used for half-widths.
    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// Student-t confidence-interval half-width; NaN below two
    /// observations.
    pub fn half_width(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        let dof = (self.count - 1) as f64;
        let Ok(t) = StudentsT::new(0.0, 1.0, dof) else {
            return f64::NAN;
        };
        let alpha = 1.0 - self.confidence_level;
        t.inverse_cdf(1.0 - alpha / 2.0) * self.standard_error()
    }

    /// Lag-1 sample autocorrelation; NaN below two observations or for a
    /// constant series.
    pub fn lag1_correlation(&self) -> f64 {
        if self.count < 2 || self.m2 == 0.0 {
            return f64::NAN;
        }
        let n = self.count as f64;
        let m = self.mean;
        // Σ (x_i − m)(x_{i+1} − m) over i = 1..n−1, expanded.
        let cross = self.sum_lag - m * ((self.sum - self.last) + (self.sum - self.first))
            + (n - 1.0) * m * m;
        cross / self.m2
    }

    /// Von Neumann lag-1 test statistic for independence; approximately
    /// standard normal for independent data. NaN below three
    /// observations.
    pub fn von_neumann_statistic(&self) -> f64 {
        if self.count < 3 || self.m2 == 0.0 {
            return f64::NAN;
        }
        let n = self.count as f64;
        let ends = (self.first - self.mean).powi(2) + (self.last - self.mean).powi(2);
        let r1 = self.lag1_correlation() + ends / (2.0 * self.m2);
        ((n * n - 1.0) / (n - 2.0)).sqrt() * r1
    }

    /// One-sided p-value of [`von_neumann_statistic`](Self::von_neumann_statistic).
    pub fn von_neumann_p_value(&self) -> f64 {
        let z = self.von_neumann_statistic();
        if z.is_nan() {
            return f64::NAN;
        }
        match Normal::new(0.0, 1.0) {
            Ok(normal) => 1.0 - normal.cdf(z),
            Err(_) => f64::NAN,
        }
    }
}

impl Default for Statistic {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_variance_extremes() {
        let s = Statistic::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count(), 8);
        assert!(close(s.average(), 5.0));
        assert!(close(s.variance(), 32.0 / 7.0));
        assert_eq!(s.min(), 2.0);
        assert_eq!(s.max(), 9.0);
        assert_eq!(s.sum(), 40.0);
    }

    #[test]
    fn empty_and_single_are_nan() {
        let mut s = Statistic::new();
        assert!(s.average().is_nan());
        s.collect(3.0);
        assert_eq!(s.average(), 3.0);
        assert!(s.variance().is_nan());
        assert!(s.half_width().is_nan());
        assert!(s.lag1_correlation().is_nan());
    }

    #[test]
    fn lag1_matches_direct_formula() {
        let xs = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 5.0];
        let s = Statistic::from_values(&xs);
        let m = xs.iter().sum::<f64>() / xs.len() as f64;
        let num: f64 = xs.windows(2).map(|w| (w[0] - m) * (w[1] - m)).sum();
        let den: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
        assert!(close(s.lag1_correlation(), num / den));
    }

    #[test]
    fn half_width_uses_student_t() {
        // t_{0.975, 9} = 2.2621571627...
        let xs: Vec<f64> = (1..=10).map(f64::from).collect();
        let s = Statistic::from_values(&xs);
        let expected = 2.262_157_162_7 * s.standard_error();
        assert!((s.half_width() - expected).abs() < 1e-6);
    }

    #[test]
    fn confidence_level_validated() {
        let mut s = Statistic::new();
        assert!(s.set_confidence_level(1.0).is_err());
        assert!(s.set_confidence_level(0.9).is_ok());
        s.collect(1.0);
        s.reset();
        assert_eq!(s.count(), 0);
        assert_eq!(s.confidence_level(), 0.9);
    }

    #[test]
    fn von_neumann_flags_trend() {
        let trending = Statistic::from_values(&(0..50).map(f64::from).collect::<Vec<_>>());
        assert!(trending.von_neumann_statistic() > 3.0);
        assert!(trending.von_neumann_p_value() < 0.01);
    }
}
