//! Bitmap integration tests.
//!
//! Exercises the public surface end to end: point operations across
//! container transitions, set algebra, range removal, rank/select,
//! cleanup compaction, and buffer round-trips.

use std::collections::HashSet;

use brim_bitmap::Bitmap;
use brim_common::words;
use rand::Rng;

// =============================================================================
// Helpers
// =============================================================================

fn dense(range: std::ops::Range<u64>) -> Bitmap {
    let mut bm = Bitmap::new();
    for x in range {
        bm.set(x);
    }
    bm
}

// =============================================================================
// Point operations
// =============================================================================

#[test]
fn test_second_container_boundary() {
    let mut ra = Bitmap::new();
    assert!(ra.set(65536));
    assert!(ra.contains(65536));
    // 65536 is the first value of the second key.
    assert_eq!(ra.num_keys(), 1);
    ra.set(1);
    assert_eq!(ra.num_keys(), 2);
    assert!(!ra.contains(65535));
}

#[test]
fn test_u64_extreme_values() {
    let mut bm = Bitmap::new();
    let edges = [0u64, u8::MAX as u64, u16::MAX as u64, u32::MAX as u64, u64::MAX];
    for &e in &edges {
        bm.set(e);
    }
    for &e in &edges {
        assert!(bm.contains(e));
    }
    assert_eq!(bm.get_cardinality(), edges.len() as u64);
    assert_eq!(bm.minimum(), 0);
    assert_eq!(bm.maximum(), u64::MAX);
}

#[test]
fn test_set_get_dense() {
    let n = 100_000u64;
    let bm = dense(0..n);
    for i in 0..n {
        assert!(bm.contains(i));
    }
    assert!(!bm.contains(n));
    assert_eq!(bm.get_cardinality(), n);
}

#[test]
fn test_set_many() {
    let mut bm = Bitmap::new();
    bm.set_many(&[1, 100, 65536, 1 << 32]);
    assert_eq!(bm.to_array(), vec![1, 100, 65536, 1 << 32]);
}

#[test]
fn test_bulk_add_random() {
    let mut rng = rand::thread_rng();
    let mut ra = Bitmap::new();
    let mut model: HashSet<u64> = HashSet::new();
    let max = 64u64 << 16;

    for _ in 0..100_000 {
        let x = rng.gen_range(0..max);
        if model.contains(&x) {
            assert!(ra.contains(x), "{x} should be present");
            assert!(!ra.set(x), "re-adding {x} must report unchanged");
        } else {
            model.insert(x);
            assert!(ra.set(x), "unable to set {x}");
        }
    }
    assert_eq!(ra.get_cardinality(), model.len() as u64);
    for &x in &model {
        assert!(ra.contains(x));
    }

    // Round-trip through an adopted word buffer.
    let bytes = ra.to_buffer_with_copy();
    let buffer = words::bytes_to_words(&bytes).unwrap();
    let ra2 = Bitmap::from_buffer(buffer).unwrap();
    assert_eq!(ra2.get_cardinality(), model.len() as u64);
    for &x in &model {
        assert!(ra2.contains(x));
    }
}

#[test]
fn test_remove() {
    let n = 100_000u64;
    let mut a = dense(0..n);
    assert_eq!(a.get_cardinality(), n);

    for i in 0..n / 2 {
        assert!(a.remove(i));
    }
    assert_eq!(a.get_cardinality(), n / 2);

    // Removing absent values is a no-op.
    for i in 0..n / 2 {
        assert!(!a.remove(i));
    }
    assert_eq!(a.get_cardinality(), n / 2);

    for i in n / 2..n {
        assert!(a.remove(i));
    }
    assert_eq!(a.get_cardinality(), 0);
    assert!(a.is_empty());
}

#[test]
fn test_extremes() {
    let mut a = Bitmap::new();
    assert_eq!(a.minimum(), 0);
    assert_eq!(a.maximum(), 0);

    a.set(1);
    assert_eq!(a.minimum(), 1);
    assert_eq!(a.maximum(), 1);

    a.set(100_000);
    assert_eq!(a.minimum(), 1);
    assert_eq!(a.maximum(), 100_000);

    a.remove(100_000);
    assert_eq!(a.minimum(), 1);
    assert_eq!(a.maximum(), 1);

    a.remove(1);
    assert_eq!(a.minimum(), 0);
    assert_eq!(a.maximum(), 0);

    a.set(100_000);
    assert_eq!(a.minimum(), 100_000);
    assert_eq!(a.maximum(), 100_000);
}

// =============================================================================
// Sorted construction
// =============================================================================

#[test]
fn test_from_sorted_list() {
    let check = |n: u64| {
        let arr: Vec<u64> = (0..n).collect();
        let mut r = Bitmap::from_sorted_list(&arr);
        assert_eq!(r.get_cardinality(), n);
        assert_eq!(r.to_array(), arr);

        r.set(n);
        assert!(r.contains(n));
        assert_eq!(r.get_cardinality(), n + 1);
    };
    check(10);
    check(100_000);
}

#[test]
fn test_from_sorted_list_sparse_keys() {
    let arr: Vec<u64> = (0..50).map(|i| i << 20).collect();
    let r = Bitmap::from_sorted_list(&arr);
    assert_eq!(r.to_array(), arr);
    assert_eq!(r.num_keys(), 50);
}

// =============================================================================
// Set algebra
// =============================================================================

#[test]
fn test_or_with_single_values() {
    let mut bm1 = Bitmap::new();
    bm1.set(1);
    assert_eq!(bm1.to_array(), vec![1]);

    let mut bm2 = Bitmap::new();
    bm2.set(2);

    let bm3 = &bm1 | &bm2;
    assert!(!bm3.contains(0));
    assert!(bm3.contains(1));
    assert!(bm3.contains(2));
    assert_eq!(bm3.get_cardinality(), 2);
}

#[test]
fn test_and() {
    let n = 100_000u64;
    let mut a = Bitmap::new();
    let mut b = Bitmap::new();
    for i in 0..n {
        if i % 2 == 0 {
            a.set(i);
        } else {
            b.set(i);
        }
    }
    assert_eq!(a.get_cardinality(), n / 2);
    assert_eq!(b.get_cardinality(), n / 2);

    let res = &a & &b;
    assert_eq!(res.get_cardinality(), 0);

    a.and(&b);
    assert_eq!(a.get_cardinality(), 0);
}

#[test]
fn test_or() {
    let n = 100_000u64;
    let mut a = Bitmap::new();
    let mut b = Bitmap::new();
    for i in 0..n {
        if i % 2 == 0 {
            a.set(i);
        } else {
            b.set(i);
        }
    }
    let res = &a | &b;
    assert_eq!(res.get_cardinality(), n);
    for i in 0..n {
        assert!(res.contains(i));
    }

    a.or(&b);
    assert_eq!(a.get_cardinality(), n);
}

#[test]
fn test_set_after_remove_range() {
    let n = 100_000u64;
    let mut a = dense(0..n);
    assert_eq!(a.get_cardinality(), n);
    a.remove_range(0, n / 2);

    for i in 0..n {
        a.set(i);
    }
    assert_eq!(a.get_cardinality(), n);
}

#[test]
fn test_and_not() {
    let n = 100_000u64;
    let mut a = Bitmap::new();
    let mut b = Bitmap::new();
    for i in 0..n {
        a.set(i);
        if i < n / 2 {
            b.set(i);
        }
    }
    a.and_not(&b);
    assert_eq!(a.get_cardinality(), n / 2);
    for i in n / 2..n {
        assert!(a.contains(i));
    }

    // Small arrays produce an array container.
    let mut a = Bitmap::new();
    let mut b = Bitmap::new();
    a.set_many(&[1, 2, 3, 4]);
    b.set_many(&[3, 4, 5, 6]);
    a.and_not(&b);
    assert_eq!(a.to_array(), vec![1, 2]);

    // Dense difference keeps a bitmap container.
    let mut a = Bitmap::new();
    let mut b = Bitmap::new();
    for i in 0..10_000u64 {
        a.set(i);
        if i < 7000 {
            b.set(i);
        }
    }
    a.and_not(&b);
    assert_eq!(a.get_cardinality(), 3000);
    for i in 0..10_000u64 {
        assert_eq!(a.contains(i), i >= 7000, "at {i}");
    }
}

#[test]
fn test_and_not_disjoint() {
    let n = 100_000u64;
    let a0 = dense(0..n / 2);
    let b = dense(n / 2..n);

    let mut a = a0.clone();
    a.and_not(&b);
    assert_eq!(a.get_cardinality(), n / 2);

    let diff = &a0 - &b;
    assert_eq!(diff.get_cardinality(), n / 2);
}

#[test]
fn test_ops_against_model() {
    let mut rng = rand::thread_rng();
    let m = 10_000u64;
    let n = 10_000usize;

    for f in [1u64, 10, 100] {
        let mut small = Bitmap::new();
        let mut big = Bitmap::new();
        let mut small_set: HashSet<u64> = HashSet::new();
        let mut big_set: HashSet<u64> = HashSet::new();

        for _ in 0..n {
            let sx = rng.gen_range(0..m);
            let added = small.set(sx);
            assert_eq!(added, small_set.insert(sx), "re-add must report presence");

            let bx = rng.gen_range(0..m * f);
            let added = big.set(bx);
            assert_eq!(added, big_set.insert(bx));
        }
        assert_eq!(small.get_cardinality(), small_set.len() as u64);
        assert_eq!(big.get_cardinality(), big_set.len() as u64);

        let bit_or = &small | &big;
        let bit_and = &small & &big;

        let cnt_or = small_set.union(&big_set).count() as u64;
        let cnt_and = small_set.intersection(&big_set).count() as u64;
        assert_eq!(bit_or.get_cardinality(), cnt_or, "f={f}");
        assert_eq!(bit_and.get_cardinality(), cnt_and, "f={f}");

        for &x in small_set.union(&big_set) {
            assert!(bit_or.contains(x));
        }
        for &x in small_set.intersection(&big_set) {
            assert!(bit_and.contains(x));
        }
    }
}

#[test]
fn test_algebra_with_empty_operand() {
    let a = dense(0..100);
    let empty = Bitmap::new();

    assert_eq!((&a | &empty).to_array(), a.to_array());
    assert_eq!((&empty | &a).to_array(), a.to_array());
    assert_eq!((&a & &empty).get_cardinality(), 0);
    assert_eq!((&a - &empty).to_array(), a.to_array());
    assert_eq!((&empty - &a).get_cardinality(), 0);
}

// =============================================================================
// Range removal
// =============================================================================

#[test]
fn test_remove_range() {
    let n = 1_000_000u64;
    let mut a = dense(0..n);

    a.remove_range(0, 0);
    assert_eq!(a.get_cardinality(), n);

    a.remove_range(n / 4, n / 2);
    assert_eq!(a.get_cardinality(), 3 * n / 4);

    a.remove_range(0, n / 2);
    assert_eq!(a.get_cardinality(), n / 2);

    a.remove_range(n / 2, n);
    assert_eq!(a.get_cardinality(), 0);

    a.set(n / 4);
    a.set(n / 2);
    a.set(3 * n / 4);
    assert_eq!(a.get_cardinality(), 3);

    let arr: Vec<u64> = (0..123).collect();
    let mut b = Bitmap::from_sorted_list(&arr);
    b.remove_range(50, u64::MAX);
    assert_eq!(b.get_cardinality(), 50);
}

#[test]
fn test_remove_range_keeps_last_container_high() {
    // The top of the last touched container must survive an exclusive hi.
    let mut a = Bitmap::new();
    for i in 1..10u64 {
        a.set(i * (1 << 16));
        a.set(i * (1 << 16) - 1);
    }
    a.remove_range(1 << 16, (4 << 16) - 1);
    assert!(a.contains((4 << 16) - 1));
    assert!(!a.contains(1 << 16));
    assert!(!a.contains((4 << 16) - 2));
    assert!(a.contains(4 << 16));
}

#[test]
fn test_remove_range_leaves_half_open_complement() {
    let n = 200_000u64;
    let (lo, hi) = (70_000u64, 140_000u64);
    let mut a = dense(0..n);
    a.remove_range(lo, hi);
    for i in (0..n).step_by(997) {
        assert_eq!(a.contains(i), i < lo || i >= hi, "at {i}");
    }
    assert!(a.contains(hi));
    assert!(!a.contains(hi - 1));
    assert!(a.contains(lo - 1));
    assert!(!a.contains(lo));
}

#[test]
fn test_is_empty() {
    let mut a = Bitmap::new();
    assert!(a.is_empty());

    let n = 100_000u64;
    for i in 0..n {
        a.set(i);
    }
    assert!(!a.is_empty());
    a.remove_range(0, u64::MAX);
    assert!(a.is_empty());
}

// =============================================================================
// Cleanup
// =============================================================================

#[test]
fn test_cleanup_after_range_removal() {
    let mut a = Bitmap::new();
    let n = 10u64;
    for i in 0..n {
        a.set(i * (1 << 16));
    }
    let abuf = a.to_buffer_with_copy();

    assert_eq!(a.num_keys(), 10);
    a.remove_range(1 << 16, 2 * (1 << 16));
    assert_eq!(a.num_keys(), 9);

    a.remove_range(6 * (1 << 16), 8 * (1 << 16));
    assert_eq!(a.num_keys(), 7);

    let mut a = Bitmap::from_buffer_with_copy(&abuf).unwrap();
    assert_eq!(a.num_keys(), 10);
    a.remove(6 * (1 << 16));
    a.remove_range(7 * (1 << 16), 9 * (1 << 16));
    assert_eq!(a.num_keys(), 7);

    let n = 100_000u64;
    let mut b = dense(0..n);
    b.remove_range(0, n / 2);
    assert_eq!(b.get_cardinality(), n / 2);
    let buf = b.to_buffer_with_copy();
    let b = Bitmap::from_buffer_with_copy(&buf).unwrap();
    assert_eq!(b.get_cardinality(), n / 2);
}

#[test]
fn test_remove_keeps_keys_until_cleanup() {
    let mut a = Bitmap::new();
    let n = 10u64;
    for i in 0..n {
        a.set(i * (1 << 16));
    }
    assert_eq!(a.get_cardinality(), n);
    assert_eq!(a.num_keys(), n as usize);

    for i in 0..n {
        if i % 2 == 1 {
            a.remove(i * (1 << 16));
        }
    }
    assert_eq!(a.get_cardinality(), n / 2);
    assert_eq!(a.num_keys(), n as usize);

    a.cleanup();
    assert_eq!(a.get_cardinality(), n / 2);
    assert_eq!(a.num_keys(), (n / 2) as usize);
}

#[test]
fn test_cleanup_is_semantic_noop() {
    let mut a = dense(0..5000);
    for i in 1000..2000u64 {
        a.remove(i);
    }
    let before = a.to_array();
    a.cleanup();
    assert_eq!(a.to_array(), before);
}

#[test]
fn test_repeated_split_by_halves() {
    let n = 100_000u64;
    let mut a = dense(0..n);

    while a.get_cardinality() > 1 {
        let card = a.get_cardinality();
        let mid = a.select(card / 2).unwrap();

        let mut b = a.clone();
        a.remove_range(0, mid);
        b.remove_range(mid, u64::MAX);

        assert_eq!(card, a.get_cardinality() + b.get_cardinality());
    }
}

// =============================================================================
// Rank / Select
// =============================================================================

#[test]
fn test_select() {
    let n = 10_000u64;
    let a = dense(0..n);
    for i in 0..n {
        assert_eq!(a.select(i).unwrap(), i);
    }
    assert!(a.select(n).is_err());
}

#[test]
fn test_rank() {
    let n = 100_000u64;
    let mut a = dense(0..n);
    for i in (0..n).step_by(313) {
        assert_eq!(a.rank(i), Some(i));
    }
    assert_eq!(a.rank(n), None);

    // Ranks after removing one element.
    a.remove(100);
    for i in (0..n).step_by(313) {
        let expected = match i.cmp(&100) {
            std::cmp::Ordering::Less => Some(i),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(i - 1),
        };
        assert_eq!(a.rank(i), expected, "at {i}");
    }

    // Ranks after removing a whole range.
    a.remove_range(0, 10_000);
    for i in (0..n).step_by(313) {
        if i < 10_000 {
            assert_eq!(a.rank(i), None, "at {i}");
        } else {
            assert_eq!(a.rank(i), Some(i - 10_000), "at {i}");
        }
    }
}

#[test]
fn test_rank_select_agree() {
    let mut rng = rand::thread_rng();
    let mut bm = Bitmap::new();
    for _ in 0..5000 {
        bm.set(rng.gen_range(0..u64::MAX));
    }
    let arr = bm.to_array();
    assert_eq!(arr.len() as u64, bm.get_cardinality());
    for (i, &v) in arr.iter().enumerate().step_by(37) {
        assert_eq!(bm.select(i as u64).unwrap(), v);
        assert_eq!(bm.rank(v), Some(i as u64));
    }
}

// =============================================================================
// Clone, split, serialization
// =============================================================================

#[test]
fn test_clone() {
    let mut rng = rand::thread_rng();
    let mut a = Bitmap::new();
    for _ in 0..100_000 {
        a.set(rng.gen_range(0..u64::MAX >> 1));
    }
    let b = a.clone();
    assert_eq!(a.get_cardinality(), b.get_cardinality());
    assert_eq!(a.to_array(), b.to_array());
}

#[test]
fn test_clone_is_independent() {
    let mut a = Bitmap::new();
    a.set(7);
    let mut b = a.clone();
    b.set(8);
    a.remove(7);
    assert!(!a.contains(7));
    assert!(b.contains(7));
    assert!(b.contains(8));
    assert!(!a.contains(8));
}

#[test]
fn test_split() {
    let run = |n: u64| {
        let mut r = Bitmap::new();
        for i in 1..=n {
            r.set(i);
        }
        let f = |_start: u64, _end: u64| 0u64;

        let bms = r.split(f, 1 << 10);
        let csum: u64 = bms.iter().map(|bm| bm.get_cardinality()).sum();
        assert_eq!(csum, n);

        // Concatenating the pieces replays the full ascending order.
        let mut id = 1u64;
        for bm in &bms {
            for cur in bm.iter() {
                assert_eq!(cur, id);
                id += 1;
            }
        }
        assert_eq!(id, n + 1);
    };

    run(2);
    run(11);
    run(1000);
    run(100_000);
}

#[test]
fn test_split_respects_target_size() {
    let r = dense(0..1 << 20);
    let pieces = r.split(|_, _| 0, 16 << 10);
    assert!(pieces.len() > 1);
    for piece in &pieces {
        // One container (8200 bytes) may overflow the budget on its own,
        // but no piece packs two such containers past twice the target.
        assert!(piece.to_buffer().len() as u64 <= 2 * (16 << 10));
    }
}

#[test]
fn test_buffer_roundtrip_views() {
    let mut a = Bitmap::new();
    for i in 0..100_000u64 {
        a.set(i * 3);
    }

    // Zero-copy view and owned copy carry the same image.
    let view = a.to_buffer();
    let copy = a.to_buffer_with_copy();
    assert_eq!(view, &copy[..]);

    let b = Bitmap::from_buffer_with_copy(&copy).unwrap();
    assert_eq!(a.to_array(), b.to_array());

    // The adopted-words path is equivalent.
    let c = Bitmap::from_buffer(words::bytes_to_words(&copy).unwrap()).unwrap();
    assert_eq!(a.to_array(), c.to_array());
}

#[test]
fn test_from_buffer_with_copy_is_independent() {
    let mut a = Bitmap::new();
    a.set(10);
    let buf = a.to_buffer_with_copy();
    let mut b = Bitmap::from_buffer_with_copy(&buf).unwrap();
    b.set(11);
    assert!(!a.contains(11));
    assert!(b.contains(10));
}

#[test]
fn test_from_buffer_rejects_truncation() {
    let mut a = Bitmap::new();
    for i in 0..10u64 {
        a.set(i << 16);
    }
    let buf = a.to_buffer_with_copy();
    // Chopping containers off the tail must fail validation, not read
    // out of bounds later.
    assert!(Bitmap::from_buffer_with_copy(&buf[..buf.len() / 2]).is_err());
}
