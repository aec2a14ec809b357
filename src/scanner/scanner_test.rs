use {
    super::*,
    crate::{
        engine::memory::{MemEngine, MemSnapshot},
        keys::{self, KEY_MAX},
        mvcc::{Timestamp, TxnMeta},
    },
};

const NOW: i64 = 100 * NANOS_PER_SEC;
const TXN: TxnMeta = TxnMeta { id: 42, epoch: 1 };

fn ts(secs: i64) -> Timestamp {
    Timestamp::from_nanos(secs * NANOS_PER_SEC)
}

fn everything() -> KeyInterval {
    KeyInterval::new(Key::MIN, KEY_MAX)
}

fn scan(snapshot: &MemSnapshot) -> ScanResult<MvccStats> {
    StatsScanner::new(snapshot).scan(&everything(), NOW)
}

fn intent_meta_len(value_len: usize) -> i64 {
    MvccMetadata::intent(TXN, ts(1), value_len).encoded_len() as i64
}

#[test]
fn empty_interval_yields_zero() {
    let engine = MemEngine::new();
    engine.put("x", ts(1), "value");
    let snapshot = engine.snapshot();

    let stats = StatsScanner::new(&snapshot)
        .scan(&KeyInterval::new("a", "m"), NOW)
        .unwrap();
    assert_eq!(stats, MvccStats::default());
    assert_eq!(snapshot.open_cursors(), 0);
}

#[test]
fn overwritten_values_are_garbage() {
    let engine = MemEngine::new();
    engine.put("k", ts(10), "aaaa");
    engine.put("k", ts(20), "bb");
    engine.put("k", ts(30), "c");

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(
        stats,
        MvccStats {
            last_update_nanos: NOW,
            live_bytes: 2 + 13,
            live_count: 1,
            key_bytes: 2 + 3 * 12,
            key_count: 1,
            val_bytes: 7,
            val_count: 3,
            // "bb" is garbage since t30, "aaaa" since t20.
            gc_bytes_age: 14 * 70 + 16 * 80,
            ..Default::default()
        }
    );
    assert_eq!(stats.gc_bytes(), 14 + 16);
}

#[test]
fn tombstones_age_from_their_own_timestamp() {
    let engine = MemEngine::new();
    engine.put("k", ts(10), "v1");
    engine.delete("k", ts(20));
    engine.put("k", ts(30), "v3");

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(stats.live_count, 1);
    assert_eq!(stats.live_bytes, 2 + 14);
    assert_eq!(stats.val_count, 3);
    assert_eq!(stats.gc_bytes_age, 12 * 80 + 14 * 80);
}

#[test]
fn deleted_key_is_not_live() {
    let engine = MemEngine::new();
    engine.put("k", ts(10), "v1");
    engine.delete("k", ts(40));

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(stats.live_count, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.key_count, 1);
    // Metadata and tombstone are garbage since t40, and so is "v1".
    assert_eq!(stats.gc_bytes_age, (2 + 12) * 60 + 14 * 60);
    assert_eq!(stats.gc_bytes(), 2 + 12 + 14);
}

#[test]
fn intent_over_committed_value() {
    let engine = MemEngine::new();
    engine.put("k", ts(10), "old");
    engine.put_intent("k", ts(50), TXN, "newval").unwrap();
    let meta_len = intent_meta_len(6);

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(
        stats,
        MvccStats {
            last_update_nanos: NOW,
            intent_age: 50,
            live_bytes: 12 + 3,
            live_count: 1,
            key_bytes: 2 + 12 + 12,
            key_count: 1,
            val_bytes: meta_len + 6 + 3,
            val_count: 2,
            intent_bytes: 2 + meta_len + 12 + 6,
            intent_count: 1,
            ..Default::default()
        }
    );
    assert_eq!(stats.gc_bytes(), 0);
}

#[test]
fn intent_without_committed_value() {
    let engine = MemEngine::new();
    engine.put_intent("k", ts(40), TXN, "").unwrap();
    let meta_len = intent_meta_len(0);

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(stats.live_count, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.intent_count, 1);
    assert_eq!(stats.intent_age, 60);
    assert_eq!(stats.intent_bytes, 2 + meta_len + 12);
    assert_eq!(stats.gc_bytes(), 0);
}

#[test]
fn inline_and_system_keys() {
    let engine = MemEngine::new();
    engine.put_inline("k", "abc").unwrap();

    let lease = keys::make_range_id_replicated_key(1, b"lease");
    engine.put_inline(lease.clone(), "x").unwrap();

    let desc = keys::make_range_key(&Key::from("a"), b"desc");
    engine.put(desc.clone(), ts(1), "d1");
    engine.put(desc.clone(), ts(2), "d22");

    let inline_len = |value: &'static str| MvccMetadata::inline(value).encoded_len() as i64;

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(
        stats,
        MvccStats {
            last_update_nanos: NOW,
            live_bytes: 2 + inline_len("abc"),
            live_count: 1,
            key_bytes: 2,
            key_count: 1,
            val_bytes: inline_len("abc"),
            val_count: 1,
            sys_bytes: (lease.len() as i64 + 1 + inline_len("x"))
                + (desc.len() as i64 + 1 + 14 + 15),
            sys_count: 2,
            ..Default::default()
        }
    );
}

#[test]
fn system_key_intents_and_tombstones() {
    let engine = MemEngine::new();

    let desc = keys::make_range_key(&Key::from("a"), b"rdsc");
    engine.put(desc.clone(), ts(1), "old");
    engine.put_intent(desc.clone(), ts(5), TXN, "new").unwrap();

    let txn = keys::make_range_key(&Key::from("b"), b"txn");
    engine.put(txn.clone(), ts(2), "rec");
    engine.delete(txn.clone(), ts(3));

    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(
        stats,
        MvccStats {
            last_update_nanos: NOW,
            sys_bytes: (desc.len() as i64 + 1 + intent_meta_len(3) + 15 + 15)
                + (txn.len() as i64 + 1 + 12 + 15),
            sys_count: 2,
            ..Default::default()
        }
    );

    // System intents are held to the same consistency rules.
    let engine = MemEngine::new();
    engine.put_raw(
        MvccKey::meta(desc.clone()),
        MvccMetadata::intent(TXN, ts(5), 3).encode().unwrap(),
    );
    engine.put_raw(MvccKey::version(desc.clone(), ts(4)), "new");
    assert!(matches!(
        scan(&engine.snapshot()),
        Err(ScanError::InconsistentMetadata { ref key, .. }) if *key == desc
    ));
}

#[test]
fn metadata_must_describe_newest_version() {
    // Intent written at t50 does not own a version at t30.
    let engine = MemEngine::new();
    engine.put_raw(
        MvccKey::meta("k"),
        MvccMetadata::intent(TXN, ts(50), 3).encode().unwrap(),
    );
    engine.put_raw(MvccKey::version("k", ts(30)), "abc");
    assert!(matches!(
        scan(&engine.snapshot()),
        Err(ScanError::InconsistentMetadata { ref key, .. }) if *key == Key::from("k")
    ));

    // Same for explicit committed metadata.
    let engine = MemEngine::new();
    let meta = MvccMetadata::implicit(ts(30), 3).encode().unwrap();
    engine.put_raw(MvccKey::meta("k"), meta.clone());
    engine.put_raw(MvccKey::version("k", ts(20)), "abc");
    assert!(matches!(
        scan(&engine.snapshot()),
        Err(ScanError::InconsistentMetadata { .. })
    ));

    let engine = MemEngine::new();
    engine.put_raw(MvccKey::meta("k"), meta.clone());
    engine.put_raw(MvccKey::version("k", ts(30)), "abc");
    engine.put_raw(MvccKey::version("k", ts(20)), "older");
    let stats = scan(&engine.snapshot()).unwrap();
    assert_eq!(stats.live_count, 1);
    assert_eq!(stats.live_bytes, 2 + meta.len() as i64 + 15);
    assert_eq!(stats.gc_bytes(), 17);
}

#[test]
fn rejects_corrupt_metadata() {
    let engine = MemEngine::new();
    engine.put_raw(MvccKey::meta("k"), &b"\x00"[..]);

    let err = scan(&engine.snapshot()).unwrap_err();
    assert!(matches!(err, ScanError::CorruptMetadata { ref key, .. } if *key == Key::from("k")));
}

#[test]
fn rejects_inconsistent_metadata() {
    let engine = MemEngine::new();
    engine.put_raw(
        MvccKey::meta("k"),
        MvccMetadata::intent(TXN, ts(5), 5).encode().unwrap(),
    );
    engine.put_raw(MvccKey::version("k", ts(5)), "abc");
    assert!(matches!(
        scan(&engine.snapshot()),
        Err(ScanError::InconsistentMetadata { .. })
    ));

    let engine = MemEngine::new();
    engine.put_inline("k", "abc").unwrap();
    engine.put("k", ts(5), "v");
    assert!(matches!(
        scan(&engine.snapshot()),
        Err(ScanError::InconsistentMetadata { .. })
    ));

    // Intent whose provisional version is missing, followed by another key
    // and at the end of the interval.
    for next in [Some("l"), None] {
        let engine = MemEngine::new();
        engine.put_raw(
            MvccKey::meta("k"),
            MvccMetadata::intent(TXN, ts(5), 1).encode().unwrap(),
        );
        if let Some(next) = next {
            engine.put(next, ts(1), "v");
        }
        assert!(matches!(
            scan(&engine.snapshot()),
            Err(ScanError::InconsistentMetadata { ref key, .. }) if *key == Key::from("k")
        ));
    }
}

#[test]
fn rejects_entries_out_of_snapshot_order() {
    let entry = |key: &str, secs: i64| Ok(MvccEntry::new(MvccKey::version(key, ts(secs)), "v"));
    let interval = KeyInterval::new("a", "m");

    // Older version before the newer one.
    let entries = vec![entry("b", 1), entry("b", 2)];
    assert!(matches!(
        compute_stats(entries, &interval, NOW),
        Err(ScanError::Snapshot { .. })
    ));

    // Duplicate entry.
    let entries = vec![entry("b", 1), entry("b", 1)];
    assert!(matches!(
        compute_stats(entries, &interval, NOW),
        Err(ScanError::Snapshot { .. })
    ));

    // Entry outside of the interval.
    let entries = vec![entry("b", 1), entry("x", 1)];
    assert!(matches!(
        compute_stats(entries, &interval, NOW),
        Err(ScanError::Snapshot { ref key, .. }) if *key == Key::from("x")
    ));
}

#[test]
fn rejects_negative_reference_time() {
    let engine = MemEngine::new();
    let snapshot = engine.snapshot();
    assert_eq!(
        StatsScanner::new(&snapshot).scan(&everything(), -1),
        Err(ScanError::InvalidTimestamp(-1))
    );
}

#[test]
fn propagates_engine_errors() {
    let entries = vec![
        Ok(MvccEntry::new(MvccKey::version("b", ts(1)), "v")),
        Err(ScanError::engine("disk on fire")),
    ];
    assert_eq!(
        compute_stats(entries, &everything(), NOW),
        Err(ScanError::Engine("disk on fire".to_string()))
    );
}

#[test]
fn releases_cursor_on_failure() {
    let engine = MemEngine::new();
    engine.put("a", ts(1), "x");
    engine.put("b", ts(1), "y");
    let snapshot = engine.snapshot().with_fault("b");

    let scanner = StatsScanner::new(&snapshot);
    assert!(matches!(
        scanner.scan(&everything(), NOW),
        Err(ScanError::Engine(_))
    ));
    assert_eq!(snapshot.open_cursors(), 0);
    assert_eq!(snapshot.opened_cursors(), 1);

    // Keys before the fault are still readable.
    assert!(scanner.scan(&KeyInterval::new("a", "b"), NOW).is_ok());
    assert_eq!(snapshot.open_cursors(), 0);
}

#[test]
fn idempotent() {
    let engine = MemEngine::new();
    engine.put("a", ts(1), "x");
    engine.put("a", ts(3), "xx");
    engine.put_intent("c", ts(7), TXN, "z").unwrap();
    let snapshot = engine.snapshot();

    assert_eq!(scan(&snapshot).unwrap(), scan(&snapshot).unwrap());
}
