use {
    crate::keys::Key,
    std::{fmt, ops::Range},
};

/// A half-open interval of the keyspace.
///
/// Range bounded inclusively below and exclusively above i.e.
/// `[start..end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInterval {
    start: Key,
    end: Key,
}

impl KeyInterval {
    /// Creates a new interval from the given start and end keys.
    pub fn new(start: impl Into<Key>, end: impl Into<Key>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> &Key {
        &self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> &Key {
        &self.end
    }

    /// Whether no key falls into the interval.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if the given key is in the interval.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_bytes() && key < self.end.as_bytes()
    }

    /// Check if the two intervals share at least one key.
    pub fn overlaps(&self, other: &KeyInterval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// Splits the interval at `key`.
    ///
    /// Returns `None` if `key` does not lie strictly inside the interval.
    pub fn split_at(&self, key: impl Into<Key>) -> Option<(KeyInterval, KeyInterval)> {
        let key = key.into();
        if key <= self.start || key >= self.end {
            return None;
        }
        Some((
            KeyInterval::new(self.start.clone(), key.clone()),
            KeyInterval::new(key, self.end.clone()),
        ))
    }
}

impl fmt::Display for KeyInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<Range<Key>> for KeyInterval {
    fn from(range: Range<Key>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<KeyInterval> for Range<Key> {
    fn from(interval: KeyInterval) -> Self {
        interval.start..interval.end
    }
}
