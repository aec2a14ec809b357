use {
    crate::{
        descriptor::RangeDescriptor,
        interval::KeyInterval,
        keys::{self, Key, LOCAL_MAX},
    },
    auto_impl::auto_impl,
};

/// Splits the keyspace owned by a replica into intervals.
///
/// Different classes of keys (range-ID bookkeeping, range-local data, user
/// data) live in different parts of the keyspace; a partitioner returns one
/// interval per class.
///
/// Implementations must be deterministic and return intervals that are
/// non-empty and pairwise disjoint, in ascending key order.
#[auto_impl(&, Box, Arc)]
pub trait Partitioner {
    /// Returns `[start..end)` intervals of the keyspace that are owned by the
    /// replica of the given range.
    fn partition(&self, desc: &RangeDescriptor) -> Vec<KeyInterval>;
}

/// Intervals holding the replicated state of a range.
///
/// This is the state that is identical on every replica, and the one that
/// range statistics are accounted for:
///
/// 1. replicated range-ID local keys,
/// 2. range-local keys,
/// 3. user keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicatedKeyRanges;

impl Partitioner for ReplicatedKeyRanges {
    fn partition(&self, desc: &RangeDescriptor) -> Vec<KeyInterval> {
        let prefix = keys::range_id_replicated_prefix(desc.range_id().0);
        let range_id = KeyInterval::new(prefix.clone(), prefix.prefix_end());
        non_empty([range_id, range_local_interval(desc), user_interval(desc)])
    }
}

/// All intervals holding data of a replica, including the range-ID keys that
/// are not replicated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllKeyRanges;

impl Partitioner for AllKeyRanges {
    fn partition(&self, desc: &RangeDescriptor) -> Vec<KeyInterval> {
        let prefix = keys::range_id_prefix(desc.range_id().0);
        let range_id = KeyInterval::new(prefix.clone(), prefix.prefix_end());
        non_empty([range_id, range_local_interval(desc), user_interval(desc)])
    }
}

fn range_local_interval(desc: &RangeDescriptor) -> KeyInterval {
    KeyInterval::new(
        keys::range_key_prefix(desc.start_key()),
        keys::range_key_prefix(desc.end_key()),
    )
}

/// User keys of the range. A range starting at the beginning of the keyspace
/// does not own the local keys below [`LOCAL_MAX`].
fn user_interval(desc: &RangeDescriptor) -> KeyInterval {
    let local_max = Key::from_static(LOCAL_MAX);
    let start = desc.start_key().clone().max(local_max);
    KeyInterval::new(start, desc.end_key().clone())
}

fn non_empty<const N: usize>(intervals: [KeyInterval; N]) -> Vec<KeyInterval> {
    intervals.into_iter().filter(|i| !i.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::descriptor::RangeId,
        proptest::prelude::*,
        std::sync::Arc,
    };

    fn assert_disjoint_and_sorted(intervals: &[KeyInterval]) {
        for interval in intervals {
            assert!(!interval.is_empty(), "empty interval {interval}");
        }
        for pair in intervals.windows(2) {
            assert!(pair[0].end() <= pair[1].start(), "{} / {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn replicated_key_ranges() {
        let desc = RangeDescriptor::new(RangeId(3), "a", "z");
        let intervals = ReplicatedKeyRanges.partition(&desc);

        assert_eq!(intervals.len(), 3);
        assert_disjoint_and_sorted(&intervals);

        let prefix = keys::range_id_replicated_prefix(3);
        assert_eq!(intervals[0], KeyInterval::new(prefix.clone(), prefix.prefix_end()));
        assert_eq!(
            intervals[1],
            KeyInterval::new(
                keys::range_key_prefix(&Key::from("a")),
                keys::range_key_prefix(&Key::from("z"))
            )
        );
        assert_eq!(intervals[2], KeyInterval::new("a", "z"));

        // Unreplicated keys are not part of the replicated state.
        let unreplicated = keys::range_id_unreplicated_prefix(3);
        assert!(intervals.iter().all(|i| !i.contains(&unreplicated)));
        // Neither are keys of other ranges.
        let other = keys::make_range_id_replicated_key(4, b"stats");
        assert!(intervals.iter().all(|i| !i.contains(&other)));
    }

    #[test]
    fn first_range_skips_local_keys() {
        let desc = RangeDescriptor::new(RangeId(1), Key::MIN, "m");
        let intervals = ReplicatedKeyRanges.partition(&desc);

        assert_eq!(intervals.len(), 3);
        assert_disjoint_and_sorted(&intervals);
        assert_eq!(intervals[2], KeyInterval::new(LOCAL_MAX, "m"));
    }

    #[test]
    fn all_key_ranges() {
        let desc = RangeDescriptor::new(RangeId(3), "a", "z");
        let all = AllKeyRanges.partition(&desc);
        let replicated = ReplicatedKeyRanges.partition(&desc);

        assert_disjoint_and_sorted(&all);
        assert_eq!(all[1..], replicated[1..]);
        assert!(all[0].contains(&keys::range_id_unreplicated_prefix(3)));
        assert!(all[0].contains(&keys::range_id_replicated_prefix(3)));
        assert!(!all[0].contains(&keys::range_id_prefix(4)));
    }

    #[test]
    fn drops_empty_intervals() {
        // Inverted descriptor: nothing but the range-ID keys is owned.
        let desc = RangeDescriptor::new(RangeId(9), "z", "a");
        let intervals = ReplicatedKeyRanges.partition(&desc);
        assert_eq!(intervals.len(), 1);
    }

    #[test]
    fn deterministic_through_pointers() {
        let desc = RangeDescriptor::new(RangeId(5), "c", "f");
        let partitioner: Arc<dyn Partitioner> = Arc::new(ReplicatedKeyRanges);
        assert_eq!(partitioner.partition(&desc), ReplicatedKeyRanges.partition(&desc));
        assert_eq!((&partitioner).partition(&desc), partitioner.partition(&desc));
    }

    fn key_bytes() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(
            prop_oneof![
                prop::sample::select(vec![0x00u8, 0x01, 0x02, b'i', b'k', b'r', 0xff]),
                any::<u8>(),
            ],
            0..4,
        )
    }

    /// Number of intervals holding `key`.
    fn owners(intervals: &[KeyInterval], key: &[u8]) -> usize {
        intervals.iter().filter(|i| i.contains(key)).count()
    }

    proptest! {
        #[test]
        fn owned_keys_fall_into_exactly_one_interval(
            range_id in prop_oneof![0u64..256, any::<u64>()],
            start in key_bytes(),
            end in key_bytes(),
            user_key in key_bytes(),
        ) {
            let desc = RangeDescriptor::new(RangeId(range_id), start, end);
            let replicated = ReplicatedKeyRanges.partition(&desc);
            let all = AllKeyRanges.partition(&desc);
            assert_disjoint_and_sorted(&replicated);
            assert_disjoint_and_sorted(&all);
            prop_assert_eq!(replicated.clone(), ReplicatedKeyRanges.partition(&desc));

            let own = keys::make_range_id_replicated_key(range_id, b"x");
            prop_assert_eq!(owners(&replicated, &own), 1);
            prop_assert_eq!(owners(&all, &own), 1);

            let mut unreplicated = keys::range_id_unreplicated_prefix(range_id).to_vec();
            unreplicated.push(b'x');
            prop_assert_eq!(owners(&replicated, &unreplicated), 0);
            prop_assert_eq!(owners(&all, &unreplicated), 1);

            let other = keys::make_range_id_replicated_key(range_id.wrapping_add(1), b"x");
            prop_assert_eq!(owners(&replicated, &other), 0);
            prop_assert_eq!(owners(&all, &other), 0);

            // Range-local and user keys are owned iff the user key is in the
            // span of the range.
            let user_key = Key::from(user_key);
            let in_span = usize::from(desc.key_span().contains(&user_key));
            let local = keys::make_range_key(&user_key, b"x");
            prop_assert_eq!(owners(&replicated, &local), in_span);
            prop_assert_eq!(owners(&all, &local), in_span);
            if !user_key.is_local() {
                prop_assert_eq!(owners(&replicated, &user_key), in_span);
                prop_assert_eq!(owners(&all, &user_key), in_span);
            }
        }
    }
}
