//! The batch-statistics CSV: one row per tracked response.

use std::fmt;
use std::io::Write;

use crate::batch::BatchStatistic;
use crate::error::StatsError;

/// Kind of response a row summarizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatType {
    /// A time-weighted (area-based) response.
    TimeWeighted,
    /// An observation-based response.
    ResponseVariable,
}

impl StatType {
    /// The label written to the `StatType` column.
    pub fn as_str(self) -> &'static str {
        match self {
            StatType::TimeWeighted => "TimeWeighted",
            StatType::ResponseVariable => "ResponseVariable",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names, in order.
pub const HEADER: [&str; 18] = [
    "Model",
    "StatType",
    "Name",
    "Count",
    "Average",
    "Variance",
    "StdDev",
    "StdError",
    "HalfWidth",
    "ConfidenceLevel",
    "Minimum",
    "Maximum",
    "Lag1Correlation",
    "VonNeumannStatistic",
    "NumBatches",
    "BatchSize",
    "NumRebatches",
    "TotalObservations",
];

/// Writes the batch-statistics CSV.
///
/// The header row is written on construction. Summary fields describe
/// the batch means, so `HalfWidth` is the batch-means confidence-interval
/// half-width.
pub struct BatchCsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> BatchCsvWriter<W> {
    /// Wrap a writer and emit the header row.
    pub fn new(writer: W) -> Result<Self, StatsError> {
        let mut inner = csv::Writer::from_writer(writer);
        inner.write_record(HEADER)?;
        Ok(Self { inner })
    }

    /// Append one row.
    pub fn write_row(
        &mut self,
        model: &str,
        stat_type: StatType,
        name: &str,
        stat: &BatchStatistic,
    ) -> Result<(), StatsError> {
        let s = stat.batch_mean_statistic();
        let numbers = [
            s.average(),
            s.variance(),
            s.standard_deviation(),
            s.standard_error(),
            s.half_width(),
            s.confidence_level(),
            s.min(),
            s.max(),
            s.lag1_correlation(),
            s.von_neumann_statistic(),
        ];
        let mut record = Vec::with_capacity(HEADER.len());
        record.push(model.to_string());
        record.push(stat_type.to_string());
        record.push(name.to_string());
        record.push(s.count().to_string());
        record.extend(numbers.iter().map(f64::to_string));
        record.push(stat.batch_count().to_string());
        record.push(stat.batch_size().to_string());
        record.push(stat.rebatch_count().to_string());
        record.push(stat.count().to_string());
        self.inner.write_record(&record)?;
        Ok(())
    }

    /// Flush buffered rows.
    pub fn flush(&mut self) -> Result<(), StatsError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, StatsError> {
        self.inner
            .into_inner()
            .map_err(|e| StatsError::from(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchingConfig;

    #[test]
    fn header_and_rows() {
        let mut stat = BatchStatistic::new(BatchingConfig {
            min_batches: 2,
            min_batch_size: 2,
            max_multiple: 2,
            interval: None,
        })
        .unwrap();
        for x in [1.0, 3.0, 5.0, 7.0] {
            stat.collect(x);
        }
        let mut w = BatchCsvWriter::new(Vec::new()).unwrap();
        w.write_row("mm1", StatType::TimeWeighted, "queue", &stat).unwrap();
        w.write_row("mm1", StatType::ResponseVariable, "wait", &stat).unwrap();
        let text = String::from_utf8(w.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Model,StatType,Name,Count,Average"));
        assert!(lines[1].starts_with("mm1,TimeWeighted,queue,2,4,"));
        assert!(lines[2].starts_with("mm1,ResponseVariable,wait,"));
        assert!(lines[1].ends_with(",2,2,0,4"));
    }
}
