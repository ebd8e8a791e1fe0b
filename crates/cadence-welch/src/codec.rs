//! Binary encoding of Welch observations.
//!
//! Each observation is one IEEE-754 `f64` in big-endian byte order, with
//! no header and no padding. Observation `i` (1-based) of replication `j`
//! sits at byte `(Σ_{k<j} count[k] + i − 1) × 8`.

use std::io::{Read, Write};

use crate::error::WelchError;

/// Bytes per stored observation.
pub const OBSERVATION_BYTES: u64 = 8;

/// Write a big-endian f64.
pub fn write_f64_be(w: &mut dyn Write, v: f64) -> Result<(), WelchError> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

/// Read a big-endian f64.
pub fn read_f64_be(r: &mut dyn Read) -> Result<f64, WelchError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}

/// Byte offset of observation `observation` (1-based) given the counts of
/// every earlier replication.
pub fn observation_offset(earlier_counts: u64, observation: u64) -> u64 {
    (earlier_counts + observation - 1) * OBSERVATION_BYTES
}
