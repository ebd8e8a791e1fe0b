//! File locations for one tracked response.

use std::path::{Path, PathBuf};

/// Extension of the binary data file.
pub const DATA_EXTENSION: &str = "wdf";

/// Extension of the metadata text file.
pub const METADATA_EXTENSION: &str = "wdfmd";

/// The data and metadata files of one response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WelchPaths {
    /// Binary observations.
    pub data: PathBuf,
    /// Per-replication metadata text.
    pub metadata: PathBuf,
}

impl WelchPaths {
    /// `<dir>/<name>.wdf` and `<dir>/<name>.wdfmd`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            data: dir.join(format!("{name}.{DATA_EXTENSION}")),
            metadata: dir.join(format!("{name}.{METADATA_EXTENSION}")),
        }
    }
}
