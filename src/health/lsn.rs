//! WAL log sequence number parsing
//!
//! PostgreSQL renders an LSN as two hexadecimal groups, `HIGH/LOW`, where
//! each group holds 32 bits of a 64-bit byte position in the WAL stream.

use std::fmt;
use std::str::FromStr;

/// A position in the write-ahead log, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(pub u64);

/// Error for LSN text that is not `HIGH/LOW` hex
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed LSN: {0:?}")]
pub struct LsnError(pub String);

impl Lsn {
    pub const ZERO: Lsn = Lsn(0);

    /// Bytes from `earlier` up to `self`, zero if `earlier` is ahead
    pub fn distance_from(self, earlier: Lsn) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl FromStr for Lsn {
    type Err = LsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LsnError(s.to_string());

        let (high, low) = s.trim().split_once('/').ok_or_else(err)?;
        if high.is_empty() || low.is_empty() {
            return Err(err());
        }
        let high = u32::from_str_radix(high, 16).map_err(|_| err())?;
        let low = u32::from_str_radix(low, 16).map_err(|_| err())?;

        Ok(Lsn(((high as u64) << 32) | low as u64))
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

/// Parse LSN text, yielding 0 for anything unparsable
pub fn parse_lsn(s: &str) -> u64 {
    s.parse::<Lsn>().map(|lsn| lsn.0).unwrap_or(0)
}
