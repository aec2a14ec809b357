use super::{Partitioner, RangeStats, Reader, ReplicatedKeyRanges};

/// Range statistics builder.
pub struct RangeStatsBuilder<R: Reader>(R);

impl<R: Reader> RangeStatsBuilder<R> {
    /// Create new builder reading from the given snapshot.
    pub fn new(reader: R) -> Self {
        Self(reader)
    }

    /// Transform the builder into one with a different partitioner.
    pub fn with_partitioner<P: Partitioner>(
        self,
        partitioner: P,
    ) -> RangeStatsBuilderWithPartitioner<R, P> {
        RangeStatsBuilderWithPartitioner(self.0, partitioner)
    }

    /// Build with the default partitioner, i.e. accounting for the replicated
    /// state only.
    pub fn build(self) -> RangeStats<R, ReplicatedKeyRanges> {
        RangeStats::new(self.0, ReplicatedKeyRanges)
    }
}

/// Range statistics builder with custom partitioner.
pub struct RangeStatsBuilderWithPartitioner<R, P>(R, P);

impl<R, P> RangeStatsBuilderWithPartitioner<R, P>
where
    R: Reader,
    P: Partitioner,
{
    /// Replace the partitioner.
    pub fn with_partitioner<CustomP: Partitioner>(
        self,
        partitioner: CustomP,
    ) -> RangeStatsBuilderWithPartitioner<R, CustomP> {
        RangeStatsBuilderWithPartitioner(self.0, partitioner)
    }

    /// Build with the given partitioner.
    pub fn build(self) -> RangeStats<R, P> {
        RangeStats::new(self.0, self.1)
    }
}
