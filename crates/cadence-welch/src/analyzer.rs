//! Initialization-bias analysis across replications.
//!
//! The Welch average at observation `i` is the mean over replications of
//! each replication's `i`-th observation. Plotted together with its
//! cumulative average it shows where the transient ends. The bias test
//! statistics compare the two halves of a (batch-mean) series to decide
//! whether the first half is still drifting.

use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::error::WelchError;
use crate::reader::WelchReader;

/// Direction of the bias being tested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bias {
    /// The early observations sit above the steady state.
    Positive,
    /// The early observations sit below the steady state.
    Negative,
}

/// Welch averages for observations `1..=min_count`.
///
/// Replications are read one at a time, so memory use is one replication
/// plus the running sums.
pub fn welch_averages<R: Read + Seek>(reader: &mut WelchReader<R>) -> Result<Vec<f64>, WelchError> {
    let replications = reader.replications();
    let min_count = reader.metadata().min_count();
    if replications == 0 || min_count == 0 {
        return Err(WelchError::NoReplications);
    }
    let len = min_count as usize;
    let mut sums = vec![0.0; len];
    for rep in 1..=replications {
        let data = reader.replication(rep)?;
        for (sum, x) in sums.iter_mut().zip(&data) {
            *sum += x;
        }
    }
    let n = replications as f64;
    debug!(replications, observations = len, "Welch averages computed");
    Ok(sums.into_iter().map(|s| s / n).collect())
}

/// Welch average at one observation index (1-based).
pub fn welch_average_at<R: Read + Seek>(
    reader: &mut WelchReader<R>,
    observation: u64,
) -> Result<f64, WelchError> {
    let replications = reader.replications();
    if replications == 0 {
        return Err(WelchError::NoReplications);
    }
    let min_count = reader.metadata().min_count();
    if observation == 0 || observation > min_count {
        return Err(WelchError::ObservationOutOfRange {
            replication: 0,
            observation,
            count: min_count,
        });
    }
    let mut sum = 0.0;
    for rep in 1..=replications {
        sum += reader.observation(rep, observation)?;
    }
    Ok(sum / replications as f64)
}

/// Running mean of `data`: element `i` is the mean of `data[..=i]`.
pub fn cumulative_averages(data: &[f64]) -> Vec<f64> {
    let mut sum = 0.0;
    data.iter()
        .enumerate()
        .map(|(i, x)| {
            sum += x;
            sum / (i + 1) as f64
        })
        .collect()
}

/// Partial sums of deviations from `average`.
///
/// Returns `n + 1` values: `s[0] = 0` and `s[j] = j·average − Σ data[..j]`.
/// When `average` is the mean of `data`, `s[n]` is zero too. A single
/// observation is its own mean, so one value always gives `[0, 0]`.
pub fn partial_sums(average: f64, data: &[f64]) -> Vec<f64> {
    if data.len() == 1 {
        return vec![0.0, 0.0];
    }
    let mut s = Vec::with_capacity(data.len() + 1);
    s.push(0.0);
    let mut cumulative = 0.0;
    for (j, x) in data.iter().enumerate() {
        cumulative += x;
        s.push((j + 1) as f64 * average - cumulative);
    }
    s
}

/// Extreme partial sum of one half and its index.
fn extreme(half: &[f64], bias: Bias) -> (usize, f64) {
    let average = half.iter().sum::<f64>() / half.len() as f64;
    let sums = partial_sums(average, half);
    let mut best = (0, sums[0]);
    for (k, &s) in sums.iter().enumerate().skip(1) {
        let better = match bias {
            Bias::Positive => s > best.1,
            Bias::Negative => s < best.1,
        };
        if better {
            best = (k, s);
        }
    }
    best
}

/// Bias test statistic for a series, typically batch means of the Welch
/// averages.
///
/// The series is split into two halves of `m` values (an odd trailing
/// value is dropped). In each half the extreme partial sum `e` and its
/// index `k` are found (max for [`Bias::Positive`], min for
/// [`Bias::Negative`]), and
/// `F = k2·(m − k2)·e1² / (k1·(m − k1)·e2²)`.
///
/// NaN when the series has fewer than two values, or when `e2` or the
/// denominator is zero.
pub fn bias_test_statistic(data: &[f64], bias: Bias) -> f64 {
    let m = data.len() / 2;
    if m == 0 {
        return f64::NAN;
    }
    let (k1, e1) = extreme(&data[..m], bias);
    let (k2, e2) = extreme(&data[m..2 * m], bias);
    let m = m as f64;
    let (k1, k2) = (k1 as f64, k2 as f64);
    let denominator = k1 * (m - k1) * e2 * e2;
    if e2 == 0.0 || denominator == 0.0 {
        return f64::NAN;
    }
    k2 * (m - k2) * e1 * e1 / denominator
}

/// Means of consecutive non-overlapping batches of `size` values; a short
/// trailing batch is dropped. Empty when `size` is zero.
pub fn batch_means(data: &[f64], size: usize) -> Vec<f64> {
    if size == 0 {
        return Vec::new();
    }
    data.chunks_exact(size)
        .map(|c| c.iter().sum::<f64>() / size as f64)
        .collect()
}

/// Write the Welch plot CSV: `Observation,WelchAverage,CumulativeAverage`,
/// one row per observation index.
pub fn write_welch_plot_csv<W: Write>(writer: W, welch: &[f64]) -> Result<W, WelchError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Observation", "WelchAverage", "CumulativeAverage"])?;
    for (i, (w, c)) in welch.iter().zip(cumulative_averages(welch)).enumerate() {
        csv.write_record(&[(i + 1).to_string(), w.to_string(), c.to_string()])?;
    }
    csv.into_inner()
        .map_err(|e| WelchError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WelchWriter;
    use std::io::Cursor;

    fn reader(reps: &[&[f64]]) -> WelchReader<Cursor<Vec<u8>>> {
        let mut w = WelchWriter::new(Vec::new());
        for rep in reps {
            for &x in *rep {
                w.write_observation(x).unwrap();
            }
            w.end_replication(1.0);
        }
        let (data, meta) = w.into_parts();
        WelchReader::new(Cursor::new(data), meta)
    }

    #[test]
    fn averages_across_replications() {
        let mut r = reader(&[&[2.0, 4.0, 6.0], &[4.0, 4.0, 4.0], &[6.0, 4.0, 2.0]]);
        let welch = welch_averages(&mut r).unwrap();
        assert_eq!(welch, vec![4.0, 4.0, 4.0]);
        assert_eq!(cumulative_averages(&welch)[0], welch[0]);
        assert_eq!(welch_average_at(&mut r, 1).unwrap(), 4.0);
    }

    #[test]
    fn stops_at_shortest_replication() {
        let mut r = reader(&[&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0]]);
        assert_eq!(welch_averages(&mut r).unwrap(), vec![2.0, 3.0]);
        assert!(matches!(
            welch_average_at(&mut r, 3),
            Err(WelchError::ObservationOutOfRange { count: 2, .. })
        ));
    }

    #[test]
    fn nothing_to_average() {
        assert!(matches!(
            welch_averages(&mut reader(&[])),
            Err(WelchError::NoReplications)
        ));
        assert!(matches!(
            welch_averages(&mut reader(&[&[1.0], &[]])),
            Err(WelchError::NoReplications)
        ));
    }

    #[test]
    fn partial_sum_cases() {
        assert_eq!(partial_sums(4.0, &[4.0, 4.0, 4.0]), vec![0.0; 4]);
        assert_eq!(partial_sums(7.0, &[7.0]), vec![0.0, 0.0]);
        assert_eq!(partial_sums(3.0, &[5.0]), vec![0.0, 0.0]);
        assert_eq!(partial_sums(2.0, &[1.0, 3.0]), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn cumulative_running_mean() {
        assert_eq!(cumulative_averages(&[2.0, 4.0, 9.0]), vec![2.0, 3.0, 5.0]);
        assert!(cumulative_averages(&[]).is_empty());
    }

    #[test]
    fn bias_statistic_degenerate_cases() {
        assert!(bias_test_statistic(&[1.0], Bias::Positive).is_nan());
        // Constant second half: every partial sum is zero.
        assert!(bias_test_statistic(&[5.0, 1.0, 2.0, 2.0], Bias::Positive).is_nan());
    }

    #[test]
    fn bias_statistic_value() {
        // Halves [1, 3, 2] and [2, 4, 3], both mean-centred the same way.
        let data = [1.0, 3.0, 2.0, 2.0, 4.0, 3.0];
        let f = bias_test_statistic(&data, Bias::Positive);
        assert!((f - 1.0).abs() < 1e-12);
        // Odd trailing value ignored.
        let mut odd = data.to_vec();
        odd.push(100.0);
        assert_eq!(bias_test_statistic(&odd, Bias::Positive), f);
    }

    #[test]
    fn bias_statistic_detects_transient() {
        // First half climbs onto the steady level of the second.
        let data = [0.0, 1.0, 2.0, 3.0, 3.0, 3.0, 2.9, 3.1, 2.9, 3.1, 2.9, 3.1];
        let f = bias_test_statistic(&data, Bias::Positive);
        assert!(f > 10.0);
    }

    #[test]
    fn batch_means_drop_short_tail() {
        assert_eq!(batch_means(&[1.0, 3.0, 5.0, 7.0, 9.0], 2), vec![2.0, 6.0]);
        assert!(batch_means(&[1.0], 0).is_empty());
    }

    #[test]
    fn plot_csv_columns() {
        let out = write_welch_plot_csv(Vec::new(), &[2.0, 4.0]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Observation,WelchAverage,CumulativeAverage\n1,2,2\n2,4,3\n"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn partial_sums_close_at_zero(data in prop::collection::vec(-1e3f64..1e3, 1..200)) {
            let average = data.iter().sum::<f64>() / data.len() as f64;
            let s = partial_sums(average, &data);
            prop_assert_eq!(s.len(), data.len() + 1);
            prop_assert_eq!(s[0], 0.0);
            prop_assert!(s[data.len()].abs() < 1e-6);
        }

        #[test]
        fn batch_means_average_like_the_data(
            batches in prop::collection::vec(-50.0f64..50.0, 1..40),
            size in 1usize..8,
        ) {
            let data: Vec<f64> = batches.iter().flat_map(|&x| std::iter::repeat_n(x, size)).collect();
            let means = batch_means(&data, size);
            prop_assert_eq!(means.len(), batches.len());
            for (m, b) in means.iter().zip(&batches) {
                prop_assert!((m - b).abs() < 1e-9);
            }
        }

        #[test]
        fn bias_statistic_is_non_negative_or_nan(data in prop::collection::vec(-10.0f64..10.0, 0..64)) {
            for bias in [Bias::Positive, Bias::Negative] {
                let f = bias_test_statistic(&data, bias);
                prop_assert!(f.is_nan() || f >= 0.0);
            }
        }
    }
}
