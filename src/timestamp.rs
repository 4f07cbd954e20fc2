//! Unix timestamp utilities for payment freshness windows.
//!
//! Settlement times reported by the ledger and acceptance times recorded by
//! the replay guard are both plain seconds since the Unix epoch. Keeping them
//! behind [`UnixTimestamp`] avoids mixing them up with ages and windows,
//! which are bare `u64` second counts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};
use std::time::SystemTime;

/// Seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// Serialized as a JSON number, matching the ledger's `blockTime` field and
/// the `timestamp` field of verification results.
///
/// # Example
///
/// ```
/// use x402_paygate::timestamp::UnixTimestamp;
///
/// let settled = UnixTimestamp::from_secs(1_699_999_999);
/// let now = settled + 10;
/// assert_eq!(now.saturating_secs_since(settled), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Creates a [`UnixTimestamp`] from a raw seconds value.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the Unix epoch, which should
    /// never happen on properly configured systems.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, saturating to zero if `earlier` is
    /// in the future relative to `self`.
    pub fn saturating_secs_since(&self, earlier: UnixTimestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0 + rhs)
    }
}

impl Sub<u64> for UnixTimestamp {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0.saturating_sub(rhs))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UnixTimestamp(secs))
    }
}
