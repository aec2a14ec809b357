//! Single pass computation of MVCC statistics.
//!
//! Entries of each key are classified as follows (non-local keys):
//!
//! - The metadata portion (encoded key, plus the metadata value if stored
//!   explicitly) counts once per key. It is live if the newest version is a
//!   committed value, part of the intent if the newest version is
//!   uncommitted, and garbage otherwise.
//! - The uncommitted version of an intent counts towards the intent only.
//! - The newest committed version is live, unless it is a deletion
//!   tombstone.
//! - Every older version is garbage. A tombstone is garbage from its own
//!   timestamp on; an overwritten value from the timestamp of the version
//!   that overwrote it.
//!
//! Entries of local keys are only counted as system bytes.

#[cfg(test)]
mod scanner_test;

use {
    crate::{
        engine::Reader,
        error::{ScanError, ScanResult},
        interval::KeyInterval,
        keys::Key,
        mvcc::{MVCC_VERSION_TIMESTAMP_SIZE, MvccEntry, MvccKey, MvccMetadata, NANOS_PER_SEC},
        stats::MvccStats,
    },
    bytes::Bytes,
    tracing::trace,
};

/// Computes statistics of key intervals of a single reader.
pub struct StatsScanner<R> {
    reader: R,
}

impl<R: Reader> StatsScanner<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Computes statistics of all entries in `interval` as of `now_nanos`.
    ///
    /// Any cursor opened for the computation is released before returning,
    /// whether the computation succeeded or not.
    pub fn scan(&self, interval: &KeyInterval, now_nanos: i64) -> ScanResult<MvccStats> {
        self.reader.compute_stats(interval, now_nanos)
    }
}

/// Computes statistics of `entries`, all of which must lie in `interval` and
/// be sorted in engine order.
///
/// An interval without entries yields [`MvccStats::default()`].
pub fn compute_stats<I>(entries: I, interval: &KeyInterval, now_nanos: i64) -> ScanResult<MvccStats>
where
    I: IntoIterator<Item = ScanResult<MvccEntry>>,
{
    if now_nanos < 0 {
        return Err(ScanError::InvalidTimestamp(now_nanos));
    }

    let mut scan = Scan::new(interval, now_nanos);
    for entry in entries {
        scan.visit(entry?)?;
    }
    scan.finish()
}

/// Chain of entries of the key being visited.
struct Chain {
    key: Key,
    sys: bool,
    meta: MvccMetadata,
    /// Metadata was stored, as opposed to derived from the newest version.
    explicit: bool,
    /// The uncommitted version is yet to be visited.
    pending_intent: bool,
    /// The newest committed version has been visited.
    seen_committed: bool,
    /// Wall time at which the next older version became garbage.
    gc_since: i64,
}

struct Scan<'a> {
    interval: &'a KeyInterval,
    now_nanos: i64,
    now_secs: i64,
    ms: MvccStats,
    prev: Option<MvccKey>,
    chain: Option<Chain>,
}

impl<'a> Scan<'a> {
    fn new(interval: &'a KeyInterval, now_nanos: i64) -> Self {
        Self {
            interval,
            now_nanos,
            now_secs: now_nanos / NANOS_PER_SEC,
            ms: MvccStats::default(),
            prev: None,
            chain: None,
        }
    }

    fn visit(&mut self, entry: MvccEntry) -> ScanResult<()> {
        let MvccEntry { key, value } = entry;
        self.check_order(&key)?;

        let previous = self.chain.take();
        let chain = if key.is_value() {
            let chain = match previous {
                Some(chain) if chain.key == key.key => chain,
                previous => {
                    close(previous)?;
                    let meta = MvccMetadata::implicit(key.timestamp, value.len());
                    let meta_key_size = MvccKey::meta(key.key.clone()).encoded_size();
                    self.begin_chain(key.key.clone(), meta, false, meta_key_size, 0)
                }
            };
            self.visit_version(chain, &key, &value)?
        } else {
            close(previous)?;
            let meta = MvccMetadata::decode(&value).map_err(|err| ScanError::CorruptMetadata {
                key: key.key.clone(),
                reason: err.to_string(),
            })?;
            self.begin_chain(
                key.key.clone(),
                meta,
                true,
                key.encoded_size(),
                value.len() as i64,
            )
        };

        self.chain = Some(chain);
        self.prev = Some(key);
        Ok(())
    }

    fn check_order(&self, key: &MvccKey) -> ScanResult<()> {
        if !self.interval.contains(&key.key) {
            return Err(ScanError::Snapshot {
                key: key.key.clone(),
                reason: format!("entry outside of {}", self.interval),
            });
        }
        if let Some(prev) = &self.prev {
            if prev >= key {
                return Err(ScanError::Snapshot {
                    key: key.key.clone(),
                    reason: format!("entry {key} does not sort after {prev}"),
                });
            }
        }
        Ok(())
    }

    /// Accounts the metadata portion of a new chain.
    fn begin_chain(
        &mut self,
        key: Key,
        meta: MvccMetadata,
        explicit: bool,
        meta_key_size: i64,
        meta_val_size: i64,
    ) -> Chain {
        let sys = key.is_local();
        let total = meta_key_size + meta_val_size;
        let ms = &mut self.ms;

        if sys {
            ms.sys_bytes += total;
            ms.sys_count += 1;
        } else {
            ms.key_bytes += meta_key_size;
            ms.val_bytes += meta_val_size;
            ms.key_count += 1;
            if meta.is_inline() {
                ms.val_count += 1;
            }

            if meta.is_intent() {
                ms.intent_bytes += total;
                ms.intent_count += 1;
                ms.intent_age += self.now_secs - meta.timestamp.wall_secs();
            } else if !meta.deleted {
                ms.live_bytes += total;
                ms.live_count += 1;
            } else {
                ms.gc_bytes_age += total * (self.now_secs - meta.timestamp.wall_secs());
            }
        }

        trace!(
            %key,
            sys,
            explicit,
            intent = meta.is_intent(),
            inline = meta.is_inline(),
            deleted = meta.deleted,
            "visiting key"
        );

        Chain {
            key,
            sys,
            pending_intent: meta.is_intent(),
            seen_committed: false,
            gc_since: meta.timestamp.wall_time,
            explicit,
            meta,
        }
    }

    fn visit_version(&mut self, mut chain: Chain, key: &MvccKey, value: &Bytes) -> ScanResult<Chain> {
        if chain.meta.is_inline() {
            return Err(inconsistent(key, "version stored under an inline value"));
        }

        let bytes = MVCC_VERSION_TIMESTAMP_SIZE + value.len() as i64;
        let wall_time = key.timestamp.wall_time;
        let now_secs = self.now_secs;
        let age_since = |wall_time: i64| now_secs - wall_time / NANOS_PER_SEC;

        let provisional = chain.pending_intent;
        let newest_committed = !provisional && !chain.seen_committed;
        if provisional || (newest_committed && chain.explicit && !chain.meta.is_intent()) {
            check_newest(&chain.meta, key, value)?;
        }
        chain.pending_intent = false;
        chain.seen_committed |= newest_committed;

        let ms = &mut self.ms;
        if chain.sys {
            ms.sys_bytes += bytes;
            return Ok(chain);
        }

        ms.key_bytes += MVCC_VERSION_TIMESTAMP_SIZE;
        ms.val_bytes += value.len() as i64;
        ms.val_count += 1;

        if provisional {
            ms.intent_bytes += bytes;
        } else if newest_committed {
            if chain.meta.is_intent() {
                // Newest committed version under an intent.
                if value.is_empty() {
                    ms.gc_bytes_age += bytes * age_since(wall_time);
                } else {
                    ms.live_bytes += bytes;
                    ms.live_count += 1;
                }
            } else if chain.meta.deleted {
                ms.gc_bytes_age += bytes * age_since(chain.meta.timestamp.wall_time);
            } else {
                ms.live_bytes += bytes;
            }
            chain.gc_since = wall_time;
        } else if value.is_empty() {
            ms.gc_bytes_age += bytes * age_since(wall_time);
            chain.gc_since = wall_time;
        } else {
            ms.gc_bytes_age += bytes * age_since(chain.gc_since);
            chain.gc_since = wall_time;
        }

        Ok(chain)
    }

    fn finish(self) -> ScanResult<MvccStats> {
        close(self.chain)?;
        if self.prev.is_none() {
            return Ok(MvccStats::default());
        }
        Ok(MvccStats {
            last_update_nanos: self.now_nanos,
            ..self.ms
        })
    }
}

/// Checks that the chain of a fully visited key is complete.
fn close(chain: Option<Chain>) -> ScanResult<()> {
    match chain {
        Some(chain) if chain.pending_intent => Err(ScanError::InconsistentMetadata {
            key: chain.key,
            reason: "intent without a provisional version".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Checks that stored metadata describes the newest version of its chain.
fn check_newest(meta: &MvccMetadata, key: &MvccKey, value: &Bytes) -> ScanResult<()> {
    if meta.timestamp != key.timestamp {
        return Err(inconsistent(
            key,
            format!("metadata written at {}", meta.timestamp),
        ));
    }
    if meta.key_bytes != MVCC_VERSION_TIMESTAMP_SIZE {
        return Err(inconsistent(
            key,
            format!(
                "metadata key bytes {} differ from {MVCC_VERSION_TIMESTAMP_SIZE}",
                meta.key_bytes
            ),
        ));
    }
    if meta.val_bytes != value.len() as i64 {
        return Err(inconsistent(
            key,
            format!(
                "metadata value bytes {} differ from {}",
                meta.val_bytes,
                value.len()
            ),
        ));
    }
    if meta.deleted != value.is_empty() {
        return Err(inconsistent(key, "metadata deletion flag disagrees with value"));
    }
    Ok(())
}

fn inconsistent(key: &MvccKey, reason: impl Into<String>) -> ScanError {
    ScanError::InconsistentMetadata {
        key: key.key.clone(),
        reason: format!("{}: {}", key, reason.into()),
    }
}
