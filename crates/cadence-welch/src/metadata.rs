//! The Welch metadata file.
//!
//! Plain text. Line 1 holds the number of replications; each following
//! line describes one replication as
//! `observationCount,timePerObservation,replicationAverage`.

use std::io::{BufRead, Write};

use crate::codec::observation_offset;
use crate::error::WelchError;

/// Summary of one replication's observations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplicationRecord {
    /// Observations written for the replication.
    pub count: u64,
    /// Average simulated time between observations.
    pub time_per_observation: f64,
    /// Mean of the replication's observations; NaN when there are none.
    pub average: f64,
}

/// Per-replication records, in replication order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WelchMetadata {
    records: Vec<ReplicationRecord>,
}

impl WelchMetadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next replication's record.
    pub fn push(&mut self, record: ReplicationRecord) {
        self.records.push(record);
    }

    /// Number of replications.
    pub fn replications(&self) -> usize {
        self.records.len()
    }

    /// All records.
    pub fn records(&self) -> &[ReplicationRecord] {
        &self.records
    }

    /// Record of replication `replication` (1-based).
    pub fn record(&self, replication: usize) -> Result<&ReplicationRecord, WelchError> {
        replication
            .checked_sub(1)
            .and_then(|j| self.records.get(j))
            .ok_or(WelchError::ReplicationOutOfRange {
                replication,
                replications: self.records.len(),
            })
    }

    /// Fewest observations any replication reached; 0 when there are no
    /// replications.
    pub fn min_count(&self) -> u64 {
        self.records.iter().map(|r| r.count).min().unwrap_or(0)
    }

    /// Observations across every replication.
    pub fn total_observations(&self) -> u64 {
        self.records.iter().map(|r| r.count).sum()
    }

    /// Byte offset of `observation` (1-based) in replication `replication`
    /// (1-based) within the data file.
    pub fn offset(&self, replication: usize, observation: u64) -> Result<u64, WelchError> {
        let count = self.record(replication)?.count;
        if observation == 0 || observation > count {
            return Err(WelchError::ObservationOutOfRange {
                replication,
                observation,
                count,
            });
        }
        let earlier: u64 = self.records[..replication - 1].iter().map(|r| r.count).sum();
        Ok(observation_offset(earlier, observation))
    }

    /// Write the metadata text.
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), WelchError> {
        writeln!(w, "{}", self.records.len())?;
        for r in &self.records {
            writeln!(w, "{},{},{}", r.count, r.time_per_observation, r.average)?;
        }
        w.flush()?;
        Ok(())
    }

    /// Parse metadata text.
    ///
    /// The replication count on line 1 must match the number of record
    /// lines. Blank trailing lines are ignored.
    pub fn read_from<R: BufRead>(r: R) -> Result<Self, WelchError> {
        let mut lines = r.lines().enumerate();
        let expected = match lines.next() {
            Some((_, line)) => {
                let line = line?;
                line.trim()
                    .parse::<usize>()
                    .map_err(|e| malformed(1, format!("replication count: {e}")))?
            }
            None => return Err(malformed(1, "empty metadata".to_string())),
        };

        let mut meta = Self::new();
        for (i, line) in lines {
            let line = line?;
            let number = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [count, time, average] = fields.as_slice() else {
                return Err(malformed(
                    number,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            };
            meta.push(ReplicationRecord {
                count: count
                    .parse()
                    .map_err(|e| malformed(number, format!("observation count: {e}")))?,
                time_per_observation: time
                    .parse()
                    .map_err(|e| malformed(number, format!("time per observation: {e}")))?,
                average: average
                    .parse()
                    .map_err(|e| malformed(number, format!("average: {e}")))?,
            });
        }
        if meta.replications() != expected {
            return Err(malformed(
                1,
                format!(
                    "header declares {expected} replications, found {}",
                    meta.replications()
                ),
            ));
        }
        Ok(meta)
    }
}

fn malformed(line: usize, detail: String) -> WelchError {
    WelchError::MalformedMetadata { line, detail }
}
