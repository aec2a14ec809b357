//! MVCC statistics of range replicas.
//!
//! A range owns a contiguous span of user keys, together with range-local
//! and range-ID-local system keys. Given a [`RangeDescriptor`] and a
//! consistent [`Reader`] of a storage engine, [`RangeStats`] partitions the
//! keyspace owned by the replica into disjoint intervals, scans each of them
//! and merges the partial figures into a single [`MvccStats`] record.
//!
//! ```
//! use rangestats::{
//!     RangeDescriptor, RangeId, RangeStatsBuilder, Timestamp, engine::memory::MemEngine,
//! };
//!
//! let engine = MemEngine::new();
//! engine.put("b", Timestamp::from_nanos(1_000_000_000), "value");
//!
//! let desc = RangeDescriptor::new(RangeId(1), "a", "z");
//! let stats = RangeStatsBuilder::new(engine.snapshot())
//!     .build()
//!     .compute(&desc, 2_000_000_000)
//!     .unwrap();
//!
//! assert_eq!(stats.live_count, 1);
//! assert_eq!(stats.live_bytes, 2 + 12 + 5);
//! ```

mod builder;
mod compute;
mod descriptor;
pub mod engine;
mod error;
mod interval;
pub mod keys;
pub mod mvcc;
mod partition;
mod scanner;
mod stats;

pub use {
    builder::{RangeStatsBuilder, RangeStatsBuilderWithPartitioner},
    compute::{RangeStats, compute_stats_for_range},
    descriptor::{RangeDescriptor, RangeId, ReplicaDescriptor},
    engine::{Cursor, Reader},
    error::{ScanError, ScanResult},
    interval::KeyInterval,
    keys::Key,
    mvcc::{MvccEntry, MvccKey, MvccMetadata, Timestamp, TxnMeta},
    partition::{AllKeyRanges, Partitioner, ReplicatedKeyRanges},
    scanner::{StatsScanner, compute_stats},
    stats::{MvccStats, merge},
};
