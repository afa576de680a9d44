//! Index entry types.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Width of a SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// SHA-1 content hash of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; DIGEST_LEN]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a hex string of exactly `2 * DIGEST_LEN` digits.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != DIGEST_LEN * 2 {
            return None;
        }

        let mut out = [0u8; DIGEST_LEN];
        for (byte, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            *byte = ((hi << 4) | lo) as u8;
        }
        Some(Self(out))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid digest: {s}")))
    }
}

/// File modification time with separate second and nanosecond parts.
///
/// Seconds are counted from the Unix epoch and may be negative; `nanos` is
/// always in `0..1_000_000_000`. Formats as `"<secs>.<nanos>"` with the
/// nanoseconds unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Modified {
    /// Whole seconds since the epoch.
    pub secs: i64,
    /// Sub-second part in nanoseconds.
    pub nanos: u32,
}

impl Modified {
    /// Create a timestamp from its parts.
    pub fn new(secs: i64, nanos: u32) -> Self {
        debug_assert!(nanos < NANOS_PER_SEC);
        Self { secs, nanos }
    }

    /// Convert a `SystemTime`, including times before the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(err) => {
                let d = err.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = NANOS_PER_SEC - nanos;
                }
                Self::new(secs, nanos)
            }
        }
    }

    /// Convert to a UTC date-time, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }

    /// Parse the `"<secs>.<nanos>"` form.
    ///
    /// Seconds take an optional leading `-`; both parts must be non-empty
    /// runs of ASCII digits and nanoseconds must be below one second.
    pub fn parse(s: &str) -> Option<Self> {
        let (secs, nanos) = s.split_once('.')?;

        let secs_digits = secs.strip_prefix('-').unwrap_or(secs);
        if !is_digits(secs_digits) || !is_digits(nanos) {
            return None;
        }

        let secs: i64 = secs.parse().ok()?;
        let nanos: u32 = nanos.parse().ok()?;
        (nanos < NANOS_PER_SEC).then_some(Self { secs, nanos })
    }

    /// Time elapsed from `self` until `now`, or `None` if `self` is later.
    pub fn elapsed_until(self, now: Modified) -> Option<Duration> {
        let delta = now.as_nanos() - self.as_nanos();
        u64::try_from(delta).ok().map(Duration::from_nanos)
    }

    /// Whole seconds from `self` until `now` (negative if `self` is later).
    pub fn seconds_until(self, now: Modified) -> i64 {
        now.secs.saturating_sub(self.secs)
    }

    fn as_nanos(self) -> i128 {
        i128::from(self.secs) * i128::from(NANOS_PER_SEC) + i128::from(self.nanos)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Modified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.secs, self.nanos)
    }
}

impl From<SystemTime> for Modified {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

/// One index record: the digest of a file as of its modification time.
///
/// The path is the key under which the entry is stored in an
/// [`Index`](crate::Index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Modification time observed when the digest was computed.
    pub modified: Modified,
    /// Content hash of the file.
    pub digest: ContentHash,
}

impl Entry {
    /// Create a new entry.
    pub fn new(modified: Modified, digest: ContentHash) -> Self {
        Self { modified, digest }
    }
}
