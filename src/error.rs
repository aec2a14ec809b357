use crate::{interval::KeyInterval, keys::Key};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    /// Failure reported by the storage engine (I/O, closed snapshot, etc.)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Metadata entry could not be decoded
    #[error("Corrupt MVCC metadata at {key}: {reason}")]
    CorruptMetadata { key: Key, reason: String },

    /// Metadata disagrees with the versions stored under it
    #[error("Inconsistent MVCC metadata at {key}: {reason}")]
    InconsistentMetadata { key: Key, reason: String },

    /// Cursor yielded entries that a consistent snapshot cannot produce
    #[error("Snapshot violation at {key}: {reason}")]
    Snapshot { key: Key, reason: String },

    /// Reference time is outside of the accepted bounds
    #[error("Invalid reference timestamp: {0}ns")]
    InvalidTimestamp(i64),

    /// Scan of a particular interval failed
    #[error("Failed to compute stats for {interval}: {source}")]
    Interval {
        interval: KeyInterval,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    /// Creates an engine error from any displayable cause.
    pub fn engine(cause: impl std::fmt::Display) -> Self {
        Self::Engine(cause.to_string())
    }

    pub(crate) fn interval(interval: KeyInterval, source: ScanError) -> Self {
        Self::Interval {
            interval,
            source: Box::new(source),
        }
    }

    /// Interval whose scan failed, if the error carries that context.
    pub fn failed_interval(&self) -> Option<&KeyInterval> {
        match self {
            Self::Interval { interval, .. } => Some(interval),
            _ => None,
        }
    }

    /// Returns the underlying error, stripping interval context.
    pub fn root(&self) -> &ScanError {
        match self {
            Self::Interval { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
