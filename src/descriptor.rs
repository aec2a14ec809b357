use {
    crate::{interval::KeyInterval, keys::Key},
    std::fmt,
};

/// Numeric identity of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RangeId(pub u64);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl From<u64> for RangeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Location of a single replica of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplicaDescriptor {
    pub node_id: u32,
    pub store_id: u32,
    pub replica_id: u32,
}

impl ReplicaDescriptor {
    pub fn new(node_id: u32, store_id: u32, replica_id: u32) -> Self {
        Self {
            node_id,
            store_id,
            replica_id,
        }
    }
}

/// Immutable description of a range and the replicas holding it.
///
/// The range covers user keys `[start_key..end_key)`. Besides user data, a
/// replica owns the local keys addressed by the range id and by the range's
/// user keys; see [`Partitioner`](crate::Partitioner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDescriptor {
    range_id: RangeId,
    start_key: Key,
    end_key: Key,
    replicas: Vec<ReplicaDescriptor>,
}

impl RangeDescriptor {
    /// Creates a descriptor without replicas.
    pub fn new(range_id: RangeId, start_key: impl Into<Key>, end_key: impl Into<Key>) -> Self {
        Self {
            range_id,
            start_key: start_key.into(),
            end_key: end_key.into(),
            replicas: Vec::new(),
        }
    }

    /// Returns the descriptor with the given replica set.
    pub fn with_replicas<I: IntoIterator<Item = ReplicaDescriptor>>(mut self, replicas: I) -> Self {
        self.replicas = replicas.into_iter().collect();
        self
    }

    pub fn range_id(&self) -> RangeId {
        self.range_id
    }

    pub fn start_key(&self) -> &Key {
        &self.start_key
    }

    pub fn end_key(&self) -> &Key {
        &self.end_key
    }

    pub fn replicas(&self) -> &[ReplicaDescriptor] {
        &self.replicas
    }

    /// Returns the replica stored on the given store, if any.
    pub fn replica_on_store(&self, store_id: u32) -> Option<&ReplicaDescriptor> {
        self.replicas.iter().find(|r| r.store_id == store_id)
    }

    /// User keys covered by the range.
    pub fn key_span(&self) -> KeyInterval {
        KeyInterval::new(self.start_key.clone(), self.end_key.clone())
    }
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.range_id, self.key_span())
    }
}
