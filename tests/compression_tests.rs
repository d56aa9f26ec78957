//! Integration tests for page compression: strategy selection on real
//! pages, low-gain rejection, transparency of compressed state, and sweep
//! idempotence.

use birch::{BTreeConfig, BTreeIndex, BirchResult, Key, StrategyKind, Value};

/// Deterministic high-entropy printable string; no two seeds share a prefix
/// worth compressing.
fn noise_string(seed: u64, len: usize) -> String {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-=_+[]{};:,.<>/?~|";
    (0..len as u64)
        .map(|i| {
            let x = seed
                .wrapping_add(1)
                .wrapping_mul(0x9E3779B97F4A7C15)
                .wrapping_add(i.wrapping_mul(0xBF58476D1CE4E5B9))
                .rotate_left(31)
                .wrapping_mul(0x94D049BB133111EB);
            ALPHABET[(x >> 33) as usize % ALPHABET.len()] as char
        })
        .collect()
}

#[test]
fn test_prefix_strategy_chosen_for_shared_prefix_keys() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    for i in 1..=8 {
        index.insert(
            Key::text(format!("user_{:03}", i)),
            Value::text(format!("{}", (b'A' + i as u8 - 1) as char)),
        )?;
    }

    let before: Vec<Vec<Value>> = (1..=8)
        .map(|i| index.search(&Key::text(format!("user_{:03}", i))))
        .collect::<BirchResult<_>>()?;

    let report = index.compress_all_pages();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.successes, 1);
    assert!(report.bytes_saved > 0);
    assert!(report.by_strategy.contains_key(&StrategyKind::Prefix));

    // Decoded entries equal the originals
    let after: Vec<Vec<Value>> = (1..=8)
        .map(|i| index.search(&Key::text(format!("user_{:03}", i))))
        .collect::<BirchResult<_>>()?;
    assert_eq!(before, after);

    let stats = index.get_statistics();
    assert!(stats.compression_ratio.is_some_and(|r| r < 1.0));
    Ok(())
}

#[test]
fn test_delta_strategy_on_sequential_integer_keys() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    for key in 1000..1128 {
        index.insert(Key::int(key), Value::int(key))?;
    }

    let report = index.compress_all_pages();
    assert_eq!(report.successes, 1);
    assert!(report.by_strategy.contains_key(&StrategyKind::Delta));

    let stats = index.get_detailed_compression_stats();
    let delta = &stats.by_strategy[&StrategyKind::Delta];
    let ratio = delta.bytes_out as f64 / delta.bytes_in as f64;
    assert!(ratio <= 0.3, "delta ratio {} above 0.3", ratio);

    // The tree-wide ratio reflects the same blocks
    assert!(index
        .get_statistics()
        .compression_ratio
        .is_some_and(|r| r <= 0.3));

    assert_eq!(index.search(&Key::int(1100))?, vec![Value::int(1100)]);
    Ok(())
}

#[test]
fn test_low_gain_page_rejected() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    for seed in 0..16 {
        index.insert(
            Key::text(noise_string(seed, 20)),
            Value::text(noise_string(seed + 1000, 20)),
        )?;
    }

    let report = index.compress_all_pages();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.successes, 0);
    assert_eq!(report.failures, 1);
    assert_eq!(report.bytes_saved, 0);

    // The manager counted the stream attempts but no successes
    let stats = index.get_detailed_compression_stats();
    assert_eq!(stats.attempts, 2);
    assert_eq!(stats.successes, 0);
    assert!(index.get_statistics().compression_ratio.is_none());

    // The page stayed materialized and fully queryable
    let probe = noise_string(7, 20);
    assert_eq!(
        index.search(&Key::text(probe))?,
        vec![Value::text(noise_string(1007, 20))]
    );
    Ok(())
}

#[test]
fn test_queries_identical_before_and_after_compression() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 0..200 {
        index.insert(Key::int(key), Value::int(key % 7))?;
    }

    let full_before = index.scan_all()?;
    let range_before: Vec<(Key, Value)> = index
        .range_query(&Key::int(40), &Key::int(120), true)?
        .collect::<BirchResult<_>>()?;
    let point_before = index.search(&Key::int(77))?;

    let report = index.compress_all_pages();
    assert!(report.successes > 0);
    index.validate()?;

    assert_eq!(index.scan_all()?, full_before);
    let range_after: Vec<(Key, Value)> = index
        .range_query(&Key::int(40), &Key::int(120), true)?
        .collect::<BirchResult<_>>()?;
    assert_eq!(range_after, range_before);
    assert_eq!(index.search(&Key::int(77))?, point_before);
    Ok(())
}

#[test]
fn test_compress_all_pages_is_idempotent() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 0..300 {
        index.insert(Key::int(key), Value::int(1))?;
    }

    let first = index.compress_all_pages();
    assert!(first.successes > 0);

    let second = index.compress_all_pages();
    assert_eq!(second.successes, 0);
    assert_eq!(second.bytes_saved, 0);
    // The second sweep only revisits pages the first one could not compress
    assert_eq!(second.attempts, first.failures);

    index.validate()?;
    assert_eq!(index.len(), 300);
    Ok(())
}

#[test]
fn test_mutations_rematerialize_compressed_pages() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=60 {
        index.insert(Key::int(key), Value::int(key))?;
    }
    index.compress_all_pages();

    // Deletes walk compressed leaves, borrow from compressed siblings, and
    // merge through compressed parents
    for key in 1..=60 {
        assert!(index.delete(&Key::int(key), None)?);
        index.validate()?;
    }
    assert!(index.is_empty());

    // Inserts into a freshly recompressed tree work the same way
    for key in 1..=30 {
        index.insert(Key::int(key), Value::int(key))?;
    }
    index.compress_all_pages();
    index.insert(Key::int(15), Value::int(-15))?;
    assert_eq!(
        index.search(&Key::int(15))?,
        vec![Value::int(15), Value::int(-15)]
    );
    index.validate()?;
    Ok(())
}

#[test]
fn test_decompress_all_pages_resets_state() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 0..200 {
        index.insert(Key::int(key), Value::int(2))?;
    }
    let before = index.scan_all()?;

    let report = index.compress_all_pages();
    assert!(report.successes > 0);
    assert!(index.get_detailed_compression_stats().successes > 0);

    index.decompress_all_pages()?;
    let stats = index.get_detailed_compression_stats();
    assert_eq!(stats.attempts, 0);
    assert_eq!(stats.successes, 0);
    assert!(index.get_statistics().compression_ratio.is_none());

    assert_eq!(index.scan_all()?, before);
    index.validate()?;
    Ok(())
}

#[test]
fn test_disabled_compression_is_a_no_op() -> BirchResult<()> {
    let config = BTreeConfig {
        order: 4,
        enable_compression: false,
        ..BTreeConfig::default()
    };
    let mut index = BTreeIndex::with_config(config)?;
    for key in 0..100 {
        index.insert(Key::int(key), Value::int(1))?;
    }

    let report = index.compress_all_pages();
    assert_eq!(report.attempts, 0);
    assert_eq!(report.successes, 0);
    assert_eq!(report.bytes_saved, 0);

    let stats = index.get_detailed_compression_stats();
    assert_eq!(stats.attempts, 0);
    assert!(index.get_statistics().compression_ratio.is_none());
    Ok(())
}

#[test]
fn test_run_length_on_repeated_values() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    for key in 0..200 {
        index.insert(Key::int(key), Value::text("active"))?;
    }

    let report = index.compress_all_pages();
    assert_eq!(report.successes, 1);
    // Keys are sequential (delta), values are one long run (RLE)
    assert!(report.by_strategy.contains_key(&StrategyKind::Delta));
    assert!(report.by_strategy.contains_key(&StrategyKind::RunLength));

    assert_eq!(index.search(&Key::int(150))?, vec![Value::text("active")]);
    Ok(())
}
