//! Welch data writer.
//!
//! [`WelchWriter`] streams observations to any `Write` sink in the binary
//! layout of [`codec`](crate::codec) and keeps the per-replication
//! records that become the metadata file.

use std::fs::File;
use std::io::{BufWriter, Write};

use tracing::debug;

use crate::codec::write_f64_be;
use crate::error::WelchError;
use crate::metadata::{ReplicationRecord, WelchMetadata};
use crate::paths::WelchPaths;

/// Writes one response's observations, replication after replication.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
///
/// # Examples
///
/// ```
/// use cadence_welch::{WelchReader, WelchWriter};
/// use std::io::Cursor;
///
/// let mut writer = WelchWriter::new(Vec::new());
/// for rep in [[2.0, 4.0, 6.0], [4.0, 4.0, 4.0], [6.0, 4.0, 2.0]] {
///     for x in rep {
///         writer.write_observation(x).unwrap();
///     }
///     writer.end_replication(1.0);
/// }
/// let (data, metadata) = writer.into_parts();
///
/// let mut reader = WelchReader::new(Cursor::new(data), metadata);
/// assert_eq!(reader.observation(3, 1).unwrap(), 6.0);
/// ```
pub struct WelchWriter<W: Write> {
    writer: W,
    metadata: WelchMetadata,
    count: u64,
    sum: f64,
}

impl WelchWriter<BufWriter<File>> {
    /// Create (truncating) the data file named by `paths`.
    pub fn create(paths: &WelchPaths) -> Result<Self, WelchError> {
        let file = File::create(&paths.data)?;
        debug!(path = %paths.data.display(), "Welch data file created");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> WelchWriter<W> {
    /// Wrap a sink positioned where the first observation belongs.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            metadata: WelchMetadata::new(),
            count: 0,
            sum: 0.0,
        }
    }

    /// Append one observation to the current replication.
    pub fn write_observation(&mut self, x: f64) -> Result<(), WelchError> {
        write_f64_be(&mut self.writer, x)?;
        self.count += 1;
        self.sum += x;
        Ok(())
    }

    /// Close the current replication and record it.
    ///
    /// A replication that produced no observations is still recorded, with
    /// count 0 and a NaN average.
    pub fn end_replication(&mut self, time_per_observation: f64) -> ReplicationRecord {
        let average = if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        };
        let record = ReplicationRecord {
            count: self.count,
            time_per_observation,
            average,
        };
        self.metadata.push(record);
        self.count = 0;
        self.sum = 0.0;
        record
    }

    /// Observations written in the current replication.
    pub fn current_count(&self) -> u64 {
        self.count
    }

    /// Records of the completed replications.
    pub fn metadata(&self) -> &WelchMetadata {
        &self.metadata
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), WelchError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush, then write the metadata text to `metadata`.
    pub fn write_metadata<M: Write>(&mut self, metadata: M) -> Result<(), WelchError> {
        self.flush()?;
        self.metadata.write_to(metadata)
    }

    /// Consume the writer and return the sink and the metadata.
    pub fn into_parts(self) -> (W, WelchMetadata) {
        (self.writer, self.metadata)
    }
}

impl WelchWriter<BufWriter<File>> {
    /// Flush the data file and write the metadata file named by `paths`.
    pub fn finish(mut self, paths: &WelchPaths) -> Result<WelchMetadata, WelchError> {
        let file = File::create(&paths.metadata)?;
        self.write_metadata(BufWriter::new(file))?;
        debug!(
            path = %paths.metadata.display(),
            replications = self.metadata.replications(),
            "Welch metadata written"
        );
        Ok(self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_replication() {
        let mut w = WelchWriter::new(Vec::new());
        for x in [1.0, 2.0, 3.0] {
            w.write_observation(x).unwrap();
        }
        let first = w.end_replication(2.0);
        assert_eq!(first.count, 3);
        assert_eq!(first.average, 2.0);
        let empty = w.end_replication(0.0);
        assert_eq!(empty.count, 0);
        assert!(empty.average.is_nan());

        let (data, meta) = w.into_parts();
        assert_eq!(data.len(), 24);
        assert_eq!(meta.replications(), 2);
    }
}
