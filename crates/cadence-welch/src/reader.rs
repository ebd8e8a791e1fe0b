//! Welch data reader.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::codec::read_f64_be;
use crate::error::WelchError;
use crate::metadata::WelchMetadata;
use crate::paths::WelchPaths;

/// Random access to the observations of a Welch data file.
///
/// Positions come from the metadata, so any observation of any
/// replication can be read without scanning the ones before it.
pub struct WelchReader<R: Read + Seek> {
    reader: R,
    metadata: WelchMetadata,
}

impl WelchReader<BufReader<File>> {
    /// Open the data and metadata files named by `paths`.
    pub fn open(paths: &WelchPaths) -> Result<Self, WelchError> {
        let metadata = WelchMetadata::read_from(BufReader::new(File::open(&paths.metadata)?))?;
        let data = BufReader::new(File::open(&paths.data)?);
        Ok(Self::new(data, metadata))
    }
}

impl<R: Read + Seek> WelchReader<R> {
    /// Wrap a data source described by `metadata`.
    pub fn new(reader: R, metadata: WelchMetadata) -> Self {
        Self { reader, metadata }
    }

    /// The metadata describing the data.
    pub fn metadata(&self) -> &WelchMetadata {
        &self.metadata
    }

    /// Number of replications on file.
    pub fn replications(&self) -> usize {
        self.metadata.replications()
    }

    /// Observation `observation` (1-based) of replication `replication`
    /// (1-based).
    pub fn observation(&mut self, replication: usize, observation: u64) -> Result<f64, WelchError> {
        let offset = self.metadata.offset(replication, observation)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        read_f64_be(&mut self.reader)
    }

    /// Every observation of replication `replication` (1-based).
    pub fn replication(&mut self, replication: usize) -> Result<Vec<f64>, WelchError> {
        let count = self.metadata.record(replication)?.count;
        if count == 0 {
            return Ok(Vec::new());
        }
        let offset = self.metadata.offset(replication, 1)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        (0..count).map(|_| read_f64_be(&mut self.reader)).collect()
    }

    /// Average of replication `replication` (1-based) as recorded.
    pub fn replication_average(&self, replication: usize) -> Result<f64, WelchError> {
        Ok(self.metadata.record(replication)?.average)
    }

    /// Consume the reader and return the data source.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WelchWriter;
    use std::io::Cursor;

    fn reader() -> WelchReader<Cursor<Vec<u8>>> {
        let mut w = WelchWriter::new(Vec::new());
        for rep in [&[1.0, 2.0][..], &[], &[3.0, 4.0, 5.0]] {
            for &x in rep {
                w.write_observation(x).unwrap();
            }
            w.end_replication(1.0);
        }
        let (data, meta) = w.into_parts();
        WelchReader::new(Cursor::new(data), meta)
    }

    #[test]
    fn random_access_skips_empty_replications() {
        let mut r = reader();
        assert_eq!(r.observation(3, 2).unwrap(), 4.0);
        assert_eq!(r.observation(1, 1).unwrap(), 1.0);
        assert_eq!(r.replication(3).unwrap(), vec![3.0, 4.0, 5.0]);
        assert!(r.replication(2).unwrap().is_empty());
        assert!(r.replication_average(2).unwrap().is_nan());
        assert!(matches!(
            r.observation(2, 1),
            Err(WelchError::ObservationOutOfRange { count: 0, .. })
        ));
    }
}
