//! MVCC statistics of a keyspace portion.
//!
//! Statistics of disjoint portions are combined with [`merge`] (or `+`).
//! Merging is commutative and associative, and [`MvccStats::default()`] is its
//! identity, so portions can be computed in any order and folded afterwards.

use {
    crate::mvcc::NANOS_PER_SEC,
    std::{
        iter::Sum,
        ops::{Add, AddAssign, Sub, SubAssign},
    },
};

/// Accounting counters of MVCC data.
///
/// Counters are signed, so that the same type can carry deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MvccStats {
    /// Whether any counter is an estimate rather than an exact value.
    pub contains_estimates: bool,
    /// Wall time (ns) up to which the age counters are accrued.
    pub last_update_nanos: i64,
    /// Sum of ages (seconds) of all intents.
    pub intent_age: i64,
    /// Sum over garbage bytes of the number of seconds they have been garbage.
    pub gc_bytes_age: i64,
    /// Key and value bytes of the newest committed, non-deleted versions.
    pub live_bytes: i64,
    /// Number of keys whose newest committed version is not deleted.
    pub live_count: i64,
    /// Encoded key bytes of all entries.
    pub key_bytes: i64,
    /// Number of distinct keys.
    pub key_count: i64,
    /// Value bytes of all entries.
    pub val_bytes: i64,
    /// Number of stored values (versions and inline values).
    pub val_count: i64,
    /// Key and value bytes of intents.
    pub intent_bytes: i64,
    /// Number of intents.
    pub intent_count: i64,
    /// Key and value bytes of system (local) keys.
    pub sys_bytes: i64,
    /// Number of system (local) keys.
    pub sys_count: i64,
}

impl MvccStats {
    /// All key and value bytes, live or not.
    pub fn total(&self) -> i64 {
        self.key_bytes + self.val_bytes
    }

    /// Bytes that are neither live nor part of an intent.
    pub fn gc_bytes(&self) -> i64 {
        self.total() - self.live_bytes - self.intent_bytes
    }

    /// Average age of intents, as of `now_nanos`, in seconds.
    pub fn avg_intent_age(&self, now_nanos: i64) -> f64 {
        if self.intent_count == 0 {
            return 0.0;
        }
        let mut aged = *self;
        aged.age_to(now_nanos);
        aged.intent_age as f64 / aged.intent_count as f64
    }

    /// Accrues the age counters up to `now_nanos`.
    ///
    /// Ages are tracked in whole seconds; moving backwards in time is a no-op.
    pub fn age_to(&mut self, now_nanos: i64) {
        if self.last_update_nanos >= now_nanos {
            return;
        }
        let diff_secs = now_nanos / NANOS_PER_SEC - self.last_update_nanos / NANOS_PER_SEC;
        self.gc_bytes_age += self.gc_bytes() * diff_secs;
        self.intent_age += self.intent_count * diff_secs;
        self.last_update_nanos = now_nanos;
    }

    /// Adds `other` to `self`, after aging both to the later of their update
    /// times.
    pub fn merge_from(&mut self, other: &MvccStats) {
        let mut other = *other;
        self.age_to(other.last_update_nanos);
        other.age_to(self.last_update_nanos);

        self.contains_estimates |= other.contains_estimates;
        self.intent_age += other.intent_age;
        self.gc_bytes_age += other.gc_bytes_age;
        self.live_bytes += other.live_bytes;
        self.live_count += other.live_count;
        self.key_bytes += other.key_bytes;
        self.key_count += other.key_count;
        self.val_bytes += other.val_bytes;
        self.val_count += other.val_count;
        self.intent_bytes += other.intent_bytes;
        self.intent_count += other.intent_count;
        self.sys_bytes += other.sys_bytes;
        self.sys_count += other.sys_count;
    }

    /// Subtracts `other` from `self`, after aging both to the later of their
    /// update times. The result may hold negative counters.
    pub fn subtract(&mut self, other: &MvccStats) {
        let mut other = *other;
        self.age_to(other.last_update_nanos);
        other.age_to(self.last_update_nanos);

        self.contains_estimates |= other.contains_estimates;
        self.intent_age -= other.intent_age;
        self.gc_bytes_age -= other.gc_bytes_age;
        self.live_bytes -= other.live_bytes;
        self.live_count -= other.live_count;
        self.key_bytes -= other.key_bytes;
        self.key_count -= other.key_count;
        self.val_bytes -= other.val_bytes;
        self.val_count -= other.val_count;
        self.intent_bytes -= other.intent_bytes;
        self.intent_count -= other.intent_count;
        self.sys_bytes -= other.sys_bytes;
        self.sys_count -= other.sys_count;
    }

    /// Whether all counters are zero.
    ///
    /// The update time and the estimate flag are not counters.
    pub fn is_zero(&self) -> bool {
        let zero = MvccStats {
            contains_estimates: self.contains_estimates,
            last_update_nanos: self.last_update_nanos,
            ..Default::default()
        };
        *self == zero
    }
}

/// Folds a partial result into a running total.
pub fn merge(mut total: MvccStats, partial: &MvccStats) -> MvccStats {
    total.merge_from(partial);
    total
}

impl AddAssign<&MvccStats> for MvccStats {
    fn add_assign(&mut self, rhs: &MvccStats) {
        self.merge_from(rhs);
    }
}

impl AddAssign for MvccStats {
    fn add_assign(&mut self, rhs: MvccStats) {
        self.merge_from(&rhs);
    }
}

impl Add for MvccStats {
    type Output = MvccStats;

    fn add(self, rhs: MvccStats) -> MvccStats {
        merge(self, &rhs)
    }
}

impl SubAssign for MvccStats {
    fn sub_assign(&mut self, rhs: MvccStats) {
        self.subtract(&rhs);
    }
}

impl Sub for MvccStats {
    type Output = MvccStats;

    fn sub(mut self, rhs: MvccStats) -> MvccStats {
        self.subtract(&rhs);
        self
    }
}

impl Sum for MvccStats {
    fn sum<I: Iterator<Item = MvccStats>>(iter: I) -> Self {
        iter.fold(MvccStats::default(), |total, partial| merge(total, &partial))
    }
}

impl<'a> Sum<&'a MvccStats> for MvccStats {
    fn sum<I: Iterator<Item = &'a MvccStats>>(iter: I) -> Self {
        iter.fold(MvccStats::default(), merge)
    }
}
