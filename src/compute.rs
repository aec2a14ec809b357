use {
    crate::{
        builder::RangeStatsBuilder,
        descriptor::RangeDescriptor,
        engine::Reader,
        error::{ScanError, ScanResult},
        partition::{Partitioner, ReplicatedKeyRanges},
        scanner::StatsScanner,
        stats::{MvccStats, merge},
    },
    tracing::{debug, instrument, warn},
};

/// Computes statistics of replicas against a single reader.
///
/// Create with [`RangeStatsBuilder`].
pub struct RangeStats<R, P = ReplicatedKeyRanges> {
    scanner: StatsScanner<R>,
    partitioner: P,
}

impl<R: Reader, P: Partitioner> RangeStats<R, P> {
    pub(crate) fn new(reader: R, partitioner: P) -> Self {
        Self {
            scanner: StatsScanner::new(reader),
            partitioner,
        }
    }

    pub fn reader(&self) -> &R {
        self.scanner.reader()
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    /// Computes the statistics of the keyspace owned by the replica of `desc`,
    /// as of `now_nanos`.
    ///
    /// Intervals returned by the partitioner are scanned one at a time, in
    /// order. The first failing interval aborts the computation: its error is
    /// returned, wrapped in [`ScanError::Interval`], and nothing of what was
    /// accumulated so far.
    #[instrument(level = "debug", skip_all, fields(range_id = %desc.range_id()))]
    pub fn compute(&self, desc: &RangeDescriptor, now_nanos: i64) -> ScanResult<MvccStats> {
        let intervals = self.partitioner.partition(desc);
        let mut total = MvccStats::default();

        for (idx, interval) in intervals.iter().enumerate() {
            let partial = match self.scanner.scan(interval, now_nanos) {
                Ok(partial) => partial,
                Err(err) => {
                    warn!(%interval, idx, error = %err, "failed to compute interval stats");
                    return Err(ScanError::interval(interval.clone(), err));
                }
            };
            debug!(
                %interval,
                idx,
                key_count = partial.key_count,
                live_bytes = partial.live_bytes,
                intent_count = partial.intent_count,
                sys_bytes = partial.sys_bytes,
                "interval stats computed"
            );
            total = merge(total, &partial);
        }

        debug!(intervals = intervals.len(), total_bytes = total.total(), "range stats computed");
        Ok(total)
    }
}

/// Computes the statistics of the replicated state of the range described by
/// `desc`, as seen by `reader` at `now_nanos`.
pub fn compute_stats_for_range<R: Reader>(
    desc: &RangeDescriptor,
    reader: R,
    now_nanos: i64,
) -> ScanResult<MvccStats> {
    RangeStatsBuilder::new(reader).build().compute(desc, now_nanos)
}
