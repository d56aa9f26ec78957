//! Integration tests for the B-tree: ordering, duplicates, range scans,
//! rebalancing deletes, and a randomized workload checked against a
//! reference model.

use birch::{BTreeIndex, BirchError, BirchResult, Key, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn int_pairs(scan: Vec<(Key, Value)>) -> Vec<(i64, i64)> {
    scan.into_iter()
        .map(|(k, v)| match (k, v) {
            (Key::Integer(k), Value::Integer(v)) => (k, v),
            other => panic!("unexpected entry {:?}", other),
        })
        .collect()
}

#[test]
fn test_duplicate_keys_searched_in_insertion_order() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    index.insert(Key::text("user_001"), Value::text("A"))?;
    index.insert(Key::text("user_002"), Value::text("B"))?;
    index.insert(Key::text("user_001"), Value::text("C"))?;

    assert_eq!(
        index.search(&Key::text("user_001"))?,
        vec![Value::text("A"), Value::text("C")]
    );
    assert_eq!(index.search(&Key::text("user_002"))?, vec![Value::text("B")]);
    assert_eq!(index.len(), 3);
    Ok(())
}

#[test]
fn test_range_scan_across_leaves() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=20 {
        index.insert(Key::int(key), Value::int(key))?;
    }
    index.validate()?;

    let scan = index.range_query(&Key::int(5), &Key::int(10), true)?;
    let entries: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert_eq!(
        int_pairs(entries),
        vec![(5, 5), (6, 6), (7, 7), (8, 8), (9, 9), (10, 10)]
    );
    Ok(())
}

#[test]
fn test_exclusive_range_drops_both_endpoints() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=20 {
        index.insert(Key::int(key), Value::int(key))?;
    }

    let scan = index.range_query(&Key::int(5), &Key::int(10), false)?;
    let entries: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert_eq!(int_pairs(entries), vec![(6, 6), (7, 7), (8, 8), (9, 9)]);
    Ok(())
}

#[test]
fn test_point_range_inclusive_and_exclusive() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=8 {
        index.insert(Key::int(key), Value::int(key))?;
    }
    index.insert(Key::int(5), Value::int(50))?;
    index.insert(Key::int(5), Value::int(500))?;

    // start = end, inclusive: every value under the key
    let scan = index.range_query(&Key::int(5), &Key::int(5), true)?;
    let entries: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert_eq!(int_pairs(entries), vec![(5, 5), (5, 50), (5, 500)]);

    // start = end, exclusive: nothing qualifies
    let scan = index.range_query(&Key::int(5), &Key::int(5), false)?;
    let entries: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert!(entries.is_empty());
    Ok(())
}

#[test]
fn test_range_on_empty_tree() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    let scan = index.range_query(&Key::int(0), &Key::int(100), true)?;
    let entries: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert!(entries.is_empty());
    Ok(())
}

#[test]
fn test_inverted_range_is_invalid() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    index.insert(Key::int(1), Value::int(1))?;
    assert!(matches!(
        index.range_query(&Key::int(9), &Key::int(1), true),
        Err(BirchError::InvalidArgument(_))
    ));
    Ok(())
}

#[test]
fn test_delete_driven_merges_keep_tree_shallow() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=10 {
        index.insert(Key::int(key), Value::int(key))?;
    }

    // Ten sequential inserts stack three levels; height only shrinks
    assert_eq!(index.height(), 3);

    for key in 1..=5 {
        assert!(index.delete(&Key::int(key), None)?);
        index.validate()?;
        assert!(index.height() <= 3);
    }
    // The merges collapsed the tree back to two levels
    assert_eq!(index.height(), 2);

    let remaining = int_pairs(index.scan_all()?);
    assert_eq!(remaining, (6..=10).map(|k| (k, k)).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_insert_then_delete_restores_equivalent_state() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    for key in 1..=30 {
        index.insert(Key::int(key), Value::int(key))?;
    }
    let before = index.scan_all()?;
    let keys_before = index.len();

    index.insert(Key::int(15), Value::int(-15))?;
    assert!(index.delete(&Key::int(15), Some(&Value::int(-15)))?);

    assert_eq!(index.scan_all()?, before);
    assert_eq!(index.len(), keys_before);
    index.validate()?;
    Ok(())
}

#[test]
fn test_deleting_last_entry_collapses_to_empty() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    index.insert(Key::int(1), Value::int(1))?;
    assert_eq!(index.height(), 1);
    assert_eq!(index.node_count(), 1);

    assert!(index.delete(&Key::int(1), None)?);
    assert!(index.is_empty());
    assert_eq!(index.height(), 0);
    assert_eq!(index.node_count(), 0);
    index.validate()?;
    Ok(())
}

#[test]
fn test_full_scan_matches_sorted_multiset() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    let keys = [9i64, 3, 7, 3, 1, 9, 3, 12, 0, 7];
    let mut expected: Vec<(i64, i64)> = Vec::new();
    for (seq, key) in keys.iter().enumerate() {
        index.insert(Key::int(*key), Value::int(seq as i64))?;
        expected.push((*key, seq as i64));
    }
    expected.sort_by_key(|(key, _)| *key);

    assert_eq!(int_pairs(index.scan_all()?), expected);

    let scan = index.range_query(&Key::int(i64::MIN), &Key::int(i64::MAX), true)?;
    let all: Vec<(Key, Value)> = scan.collect::<BirchResult<_>>()?;
    assert_eq!(int_pairs(all), expected);
    Ok(())
}

#[test]
fn test_text_and_integer_keys_coexist() -> BirchResult<()> {
    let mut index = BTreeIndex::new(4)?;
    index.insert(Key::text("zeta"), Value::int(1))?;
    index.insert(Key::int(10), Value::int(2))?;
    index.insert(Key::text("alpha"), Value::int(3))?;
    index.insert(Key::int(-3), Value::int(4))?;
    index.validate()?;

    // Integers order before text in the key total order
    let order: Vec<Key> = index.scan_all()?.into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        order,
        vec![
            Key::int(-3),
            Key::int(10),
            Key::text("alpha"),
            Key::text("zeta")
        ]
    );
    Ok(())
}

#[test]
fn test_default_order_bulk_load() -> BirchResult<()> {
    let mut index = BTreeIndex::new(256)?;
    for key in 0..5000 {
        index.insert(Key::int(key), Value::int(key * 2))?;
    }
    index.validate()?;

    // High fanout keeps the tree shallow
    assert!(index.height() <= 3);
    assert_eq!(index.search(&Key::int(4999))?, vec![Value::int(9998)]);

    let stats = index.get_statistics();
    assert_eq!(stats.total_keys, 5000);
    assert!(stats.avg_fill_ratio > 0.0);
    Ok(())
}

/// Reference model: entries in insertion order; deletion removes the first
/// match, mirroring the tree's insertion-stable duplicate policy.
struct Model {
    entries: Vec<(i64, i64)>,
}

impl Model {
    fn search(&self, key: i64) -> Vec<i64> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .collect()
    }

    fn delete_first(&mut self, key: i64) -> bool {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    fn sorted(&self) -> Vec<(i64, i64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|(k, _)| *k);
        sorted
    }
}

#[test]
fn test_randomized_workload_against_model() -> BirchResult<()> {
    let mut rng = StdRng::seed_from_u64(0xB17C4);
    let mut index = BTreeIndex::new(4)?;
    let mut model = Model {
        entries: Vec::new(),
    };

    for op in 0..2000u64 {
        if model.entries.is_empty() || rng.gen_bool(0.65) {
            let key = rng.gen_range(0..150);
            let value = op as i64;
            index.insert(Key::int(key), Value::int(value))?;
            model.entries.push((key, value));
        } else {
            let key = rng.gen_range(0..150);
            let deleted = index.delete(&Key::int(key), None)?;
            assert_eq!(deleted, model.delete_first(key));
        }

        if op % 100 == 0 {
            index.validate()?;
            let probe = rng.gen_range(0..150);
            let found: Vec<i64> = index
                .search(&Key::int(probe))?
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => i,
                    other => panic!("unexpected value {:?}", other),
                })
                .collect();
            assert_eq!(found, model.search(probe));
        }

        // Sweep compression mid-workload so mutations hit compressed pages
        if op % 250 == 249 {
            index.compress_all_pages();
        }
    }

    index.validate()?;
    assert_eq!(int_pairs(index.scan_all()?), model.sorted());
    assert_eq!(index.len(), model.entries.len());
    Ok(())
}
