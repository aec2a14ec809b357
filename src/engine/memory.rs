use {
    super::{Cursor, Reader},
    crate::{
        error::{ScanError, ScanResult},
        interval::KeyInterval,
        keys::Key,
        mvcc::{MetadataError, MvccEntry, MvccKey, MvccMetadata, Timestamp, TxnMeta},
    },
    bytes::Bytes,
    parking_lot::RwLock,
    std::{
        collections::{BTreeMap, btree_map},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    },
    tracing::trace,
};

type Entries = BTreeMap<MvccKey, Bytes>;

/// In-memory MVCC engine.
///
/// Entries are kept in a sorted map behind a copy-on-write pointer, so taking
/// a snapshot is cheap and never blocks writers.
#[derive(Default)]
pub struct MemEngine {
    entries: RwLock<Arc<Entries>>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a committed version of `key`.
    pub fn put(&self, key: impl Into<Key>, timestamp: Timestamp, value: impl Into<Bytes>) {
        self.put_raw(MvccKey::version(key, timestamp), value);
    }

    /// Writes a deletion tombstone for `key`.
    pub fn delete(&self, key: impl Into<Key>, timestamp: Timestamp) {
        self.put_raw(MvccKey::version(key, timestamp), Bytes::new());
    }

    /// Writes an uncommitted version of `key` on behalf of `txn`.
    ///
    /// An empty value is a provisional deletion.
    pub fn put_intent(
        &self,
        key: impl Into<Key>,
        timestamp: Timestamp,
        txn: TxnMeta,
        value: impl Into<Bytes>,
    ) -> Result<(), MetadataError> {
        let key = key.into();
        let value = value.into();
        let meta = MvccMetadata::intent(txn, timestamp, value.len()).encode()?;

        let mut entries = self.entries.write();
        let entries = Arc::make_mut(&mut entries);
        entries.insert(MvccKey::meta(key.clone()), meta);
        entries.insert(MvccKey::version(key, timestamp), value);
        Ok(())
    }

    /// Writes an unversioned value of `key`.
    pub fn put_inline(
        &self,
        key: impl Into<Key>,
        value: impl Into<Bytes>,
    ) -> Result<(), MetadataError> {
        let meta = MvccMetadata::inline(value).encode()?;
        self.put_raw(MvccKey::meta(key), meta);
        Ok(())
    }

    /// Writes an arbitrary entry.
    pub fn put_raw(&self, key: MvccKey, value: impl Into<Bytes>) {
        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).insert(key, value.into());
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captures the current state of the engine.
    pub fn snapshot(&self) -> MemSnapshot {
        let entries = Arc::clone(&self.entries.read());
        trace!(entries = entries.len(), "snapshot taken");
        MemSnapshot {
            entries,
            fault: None,
            open_cursors: AtomicUsize::new(0),
            opened_cursors: AtomicUsize::new(0),
        }
    }
}

/// Immutable view of a [`MemEngine`].
pub struct MemSnapshot {
    entries: Arc<Entries>,
    fault: Option<Key>,
    open_cursors: AtomicUsize,
    opened_cursors: AtomicUsize,
}

impl MemSnapshot {
    /// Makes cursors fail with an engine error upon reaching `key`.
    pub fn with_fault(mut self, key: impl Into<Key>) -> Self {
        self.fault = Some(key.into());
        self
    }

    /// Number of cursors currently open.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of cursors opened over the lifetime of the snapshot.
    pub fn opened_cursors(&self) -> usize {
        self.opened_cursors.load(Ordering::SeqCst)
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Reader for MemSnapshot {
    fn cursor(&self, interval: &KeyInterval) -> ScanResult<Cursor<'_>> {
        let entries = if interval.is_empty() {
            None
        } else {
            // Metadata sorts first within a key, so this covers every entry
            // of every key in the interval.
            let start = MvccKey::meta(interval.start().clone());
            let end = MvccKey::meta(interval.end().clone());
            Some(self.entries.range(start..end))
        };

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        self.opened_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemCursor {
            entries,
            fault: self.fault.as_ref(),
            failed: false,
            open_cursors: &self.open_cursors,
        }))
    }
}

struct MemCursor<'a> {
    entries: Option<btree_map::Range<'a, MvccKey, Bytes>>,
    fault: Option<&'a Key>,
    failed: bool,
    open_cursors: &'a AtomicUsize,
}

impl Iterator for MemCursor<'_> {
    type Item = ScanResult<MvccEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (key, value) = self.entries.as_mut()?.next()?;
        if self.fault.is_some_and(|fault| key.key == *fault) {
            self.failed = true;
            return Some(Err(ScanError::engine(format!("injected fault at {key}"))));
        }
        Some(Ok(MvccEntry::new(key.clone(), value.clone())))
    }
}

impl Drop for MemCursor<'_> {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}
