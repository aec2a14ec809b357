//! Read-only access to a storage engine.

pub mod memory;

use {
    crate::{
        error::ScanResult,
        interval::KeyInterval,
        mvcc::MvccEntry,
        scanner,
        stats::MvccStats,
    },
    auto_impl::auto_impl,
};

/// Forward cursor over the entries of a key interval.
///
/// Entries are yielded in engine order (see [`MvccKey`](crate::MvccKey)).
/// Dropping the cursor releases whatever engine resources back it.
pub type Cursor<'a> = Box<dyn Iterator<Item = ScanResult<MvccEntry>> + 'a>;

/// Consistent, point-in-time view of a storage engine.
///
/// Every cursor opened on the same reader observes the same data: no write
/// may become visible between two cursors, or while a cursor is open.
#[auto_impl(&, Box, Arc)]
pub trait Reader {
    /// Opens a cursor over all entries whose key lies in `interval`.
    ///
    /// An empty interval yields an empty cursor.
    fn cursor(&self, interval: &KeyInterval) -> ScanResult<Cursor<'_>>;

    /// Computes the statistics of all entries in `interval` as of
    /// `now_nanos`.
    ///
    /// The default implementation makes a single pass over a cursor. Engines
    /// that maintain statistics natively may override it, but must return
    /// exact figures.
    fn compute_stats(&self, interval: &KeyInterval, now_nanos: i64) -> ScanResult<MvccStats> {
        let cursor = self.cursor(interval)?;
        scanner::compute_stats(cursor, interval, now_nanos)
    }
}
