//! MVCC vocabulary: timestamps, versioned keys and revision metadata.
//!
//! Every logical key is stored as a chain of entries. The chain optionally
//! starts with a metadata entry (zero timestamp), followed by versions ordered
//! from the newest to the oldest. An empty version value is a deletion
//! tombstone.

pub mod meta;

use {
    crate::keys::Key,
    bytes::Bytes,
    std::{cmp::Ordering, fmt},
};

pub use meta::{MetadataError, MvccMetadata, TxnMeta};

/// Size of the timestamp suffix of an encoded version key.
pub const MVCC_VERSION_TIMESTAMP_SIZE: i64 = 12;

pub(crate) const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Hybrid logical timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    /// Wall time in nanoseconds since the epoch.
    pub wall_time: i64,
    /// Disambiguates events that share the same wall time.
    pub logical: i32,
}

impl Timestamp {
    /// Zero timestamp, marks metadata entries.
    pub const ZERO: Timestamp = Timestamp {
        wall_time: 0,
        logical: 0,
    };

    pub const fn new(wall_time: i64, logical: i32) -> Self {
        Self { wall_time, logical }
    }

    /// Timestamp at the given wall time with no logical component.
    pub const fn from_nanos(wall_time: i64) -> Self {
        Self::new(wall_time, 0)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Wall time truncated to whole seconds.
    pub fn wall_secs(&self) -> i64 {
        self.wall_time / NANOS_PER_SEC
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09},{}", self.wall_secs(), self.wall_time % NANOS_PER_SEC, self.logical)
    }
}

/// Key of a single entry in an MVCC chain.
///
/// Sorted by key, then the metadata entry first, then versions from the
/// newest timestamp to the oldest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MvccKey {
    pub key: Key,
    pub timestamp: Timestamp,
}

impl MvccKey {
    /// Key of the metadata entry of `key`.
    pub fn meta(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            timestamp: Timestamp::ZERO,
        }
    }

    /// Key of the version of `key` written at `timestamp`.
    pub fn version(key: impl Into<Key>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            timestamp,
        }
    }

    /// Whether this entry holds a version (as opposed to metadata).
    pub fn is_value(&self) -> bool {
        !self.timestamp.is_zero()
    }

    /// Length of the key once encoded by the engine.
    pub fn encoded_size(&self) -> i64 {
        let size = self.key.len() as i64 + 1;
        if self.is_value() {
            size + MVCC_VERSION_TIMESTAMP_SIZE
        } else {
            size
        }
    }
}

impl Ord for MvccKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key).then_with(|| {
            match (self.timestamp.is_zero(), other.timestamp.is_zero()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => other.timestamp.cmp(&self.timestamp),
            }
        })
    }
}

impl PartialOrd for MvccKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MvccKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_value() {
            write!(f, "{}/{}", self.key, self.timestamp)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

/// Entry as read from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MvccEntry {
    pub key: MvccKey,
    pub value: Bytes,
}

impl MvccEntry {
    pub fn new(key: MvccKey, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}
