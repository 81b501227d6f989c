//! End-to-end table tests.
//!
//! Exercises the public API the way a caller would: interning, both lookup
//! directions, cursor traversal, snapshots and the frequency optimizer.

use strtab::{
    Cursor, Error, FrequencyTable, INLINE_TAG, StringId, StringTable, TableConfig, optimize,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_intern_cursor_snapshot_flow() {
    init_tracing();
    let mut table = StringTable::new(TableConfig::default()).unwrap();

    assert_eq!(table.intern("alpha").unwrap().as_u32(), 1);
    assert_eq!(table.intern("beta").unwrap().as_u32(), 2);
    assert_eq!(table.intern("alpha").unwrap().as_u32(), 1);

    let mut cursor = Cursor::new(&table);
    let mut seen = Vec::new();
    while cursor.next() {
        seen.push((
            cursor.current_id().unwrap().as_u32(),
            cursor.current_string().unwrap().to_vec(),
        ));
    }
    assert_eq!(seen, vec![(1, b"alpha".to_vec()), (2, b"beta".to_vec())]);

    let mark = table.snapshot();
    assert_eq!(table.intern("gamma").unwrap().as_u32(), 3);
    table.restore(&mark).unwrap();

    assert_eq!(table.count(), 2);
    assert_eq!(table.lookup("gamma"), None);
    assert_eq!(table.lookup_id(StringId::new(3)), None);
    assert_eq!(table.intern("gamma").unwrap().as_u32(), 3);
}

#[test]
fn test_large_snapshot_restore() {
    init_tracing();
    let mut table = StringTable::new(TableConfig::default()).unwrap();

    for i in 0..50_000u32 {
        assert_eq!(table.intern(format!("x{i}")).unwrap().as_u32(), i + 1);
    }
    let mark = table.snapshot();
    for i in 50_000..100_000u32 {
        assert_eq!(table.intern(format!("x{i}")).unwrap().as_u32(), i + 1);
    }
    assert_eq!(table.count(), 100_000);

    table.restore(&mark).unwrap();
    assert_eq!(table.count(), 50_000);

    for i in (0..100_000u32).step_by(997) {
        let s = format!("x{i}");
        if i < 50_000 {
            assert_eq!(table.lookup(&s), Some(StringId::new(i + 1)));
            assert_eq!(table.lookup_str(StringId::new(i + 1)).as_deref(), Some(s.as_str()));
        } else {
            assert_eq!(table.lookup(&s), None);
            assert_eq!(table.lookup_id(StringId::new(i + 1)), None);
        }
    }
    assert_eq!(table.iter().count(), 50_000);

    // The freed ID range is handed out again.
    assert_eq!(table.intern("fresh").unwrap().as_u32(), 50_001);
}

#[test]
fn test_nested_snapshots() {
    let mut table = StringTable::new(TableConfig::default().with_page_size(64)).unwrap();
    table.intern("a").unwrap();
    let first = table.snapshot();
    table.intern("b").unwrap();
    let second = table.snapshot();
    table.intern("c").unwrap();

    table.restore(&second).unwrap();
    assert_eq!(table.count(), 2);
    table.restore(&first).unwrap();
    assert_eq!(table.count(), 1);

    // `second` now describes the future and must be refused.
    assert!(matches!(table.restore(&second), Err(Error::InvalidSnapshot(_))));
    assert_eq!(table.count(), 1);
}

#[test]
fn test_stale_snapshot_rejected_after_regrowth() {
    init_tracing();
    let mut table = StringTable::new(TableConfig::default()).unwrap();
    table.intern("a").unwrap();
    let s0 = table.snapshot();
    table.intern("bbbbbbbbbbbbbbbbbb").unwrap();
    let s1 = table.snapshot();

    table.restore(&s0).unwrap();
    for s in ["c", "d", "e", "f", "g", "h"] {
        table.intern(s).unwrap();
    }

    assert!(matches!(table.restore(&s1), Err(Error::InvalidSnapshot(_))));
    assert_eq!(table.count(), 7);
    assert_eq!(table.lookup("bbbbbbbbbbbbbbbbbb"), None);
    assert_eq!(table.lookup("c"), Some(StringId::new(2)));
    assert_eq!(table.iter().count(), 7);

    // New entries land after the intact records.
    assert_eq!(table.intern("i").unwrap().as_u32(), 8);
    for (id, s) in table.iter() {
        assert_eq!(table.lookup(s), Some(id));
    }
}

#[test]
fn test_inline_unsigned_round_trip() {
    let mut table = StringTable::new(TableConfig::default().with_inline_unsigned(true)).unwrap();

    for s in ["0", "1", "42", "65536", "2147483647"] {
        let id = table.intern(s).unwrap();
        assert!(id.is_inline());
        assert!(id.as_u32() >= INLINE_TAG);
        assert_eq!(table.lookup_str(id).as_deref(), Some(s));
    }
    assert_eq!(table.count(), 0);
    assert_eq!(table.iter().count(), 0);

    for s in ["-1", "+5", "00", "2147483648", "12a"] {
        let id = table.intern(s).unwrap();
        assert!(!id.is_inline(), "{s} must be stored");
        assert_eq!(table.lookup_str(id).as_deref(), Some(s));
    }
    assert_eq!(table.count(), 5);
}

#[test]
fn test_optimize_by_frequency() {
    init_tracing();
    let mut table = StringTable::new(TableConfig::default()).unwrap();
    for w in ["x1", "x2", "x3", "x4", "x5"] {
        table.intern(w).unwrap();
    }

    let mut freq = FrequencyTable::new();
    for id in [3, 2, 3, 5, 3, 2] {
        freq.add(StringId::new(id)).unwrap();
    }
    let optimized = optimize(&table, &mut freq).unwrap();

    let order: Vec<String> = optimized
        .iter()
        .map(|(_, s)| String::from_utf8(s.to_vec()).unwrap())
        .collect();
    assert_eq!(order, ["x3", "x2", "x5"]);

    // The source table is untouched.
    assert_eq!(table.count(), 5);
    assert_eq!(table.lookup("x1"), Some(StringId::new(1)));
}

#[test]
fn test_optimize_full_coverage() {
    let mut table = StringTable::new(TableConfig::default().with_page_size(128)).unwrap();
    let words: Vec<String> = (0..500).map(|i| format!("word_{i}")).collect();
    for w in &words {
        table.intern(w).unwrap();
    }

    let mut freq = FrequencyTable::new();
    freq.add_all(&table).unwrap();
    // Boost the last word.
    freq.add(StringId::new(500)).unwrap();
    freq.add(StringId::new(500)).unwrap();

    let optimized = optimize(&table, &mut freq).unwrap();
    assert_eq!(optimized.count(), 500);
    assert_eq!(optimized.lookup("word_499"), Some(StringId::new(1)));
    assert_eq!(optimized.lookup("word_0"), Some(StringId::new(2)));
    for w in &words {
        let id = optimized.lookup(w).unwrap();
        assert_eq!(optimized.lookup_str(id).as_deref(), Some(w.as_str()));
    }

    assert_eq!(freq.add(StringId::new(1)), Err(Error::TrackerConsumed));
}

#[test]
fn test_arena_stats_track_usage() {
    let mut table = StringTable::new(TableConfig::default().with_page_size(256)).unwrap();
    let empty = table.arena_stats();
    assert_eq!(empty.total().bytes_used, 0);
    assert_eq!(empty.total().page_count, 3);

    table.intern("hello").unwrap();
    let stats = table.arena_stats();
    assert_eq!(stats.strings.bytes_used, 4 + 5);
    assert_eq!(stats.hashes.bytes_used, 4);
    assert_eq!(stats.nodes.bytes_used, 24);
}
