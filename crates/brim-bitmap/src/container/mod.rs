//! Containers: typed views over a region of the word buffer.
//!
//! A container is a headered run of words holding the low 16 bits of all
//! values that share one high-48-bit key. Sparse runs use a sorted array
//! container, dense runs a fixed-size bitmap container. Containers do not
//! own storage; every function here operates on the slice the owning
//! bitmap hands it.

pub(crate) mod array;
pub(crate) mod bitmap;

use crate::constants::{
    ARRAY_TO_BITMAP_THRESHOLD, HEADER_WORDS, IDX_CARDINALITY, IDX_SIZE, IDX_TYPE,
    INVALID_CARDINALITY, MAX_CONTAINER_WORDS, MIN_CONTAINER_WORDS, TYPE_ARRAY, TYPE_BITMAP,
};
use brim_common::words;

/// Container type tag.
#[inline]
pub(crate) fn kind(c: &[u16]) -> u16 {
    c[IDX_TYPE]
}

/// Raw cardinality cache read. May return `INVALID_CARDINALITY`; callers
/// that need the true population use [`resolved_cardinality`].
#[inline]
pub(crate) fn get_cardinality(c: &[u16]) -> u32 {
    words::get_u32(c, IDX_CARDINALITY)
}

#[inline]
pub(crate) fn set_cardinality(c: &mut [u16], cardinality: u32) {
    words::set_u32(c, IDX_CARDINALITY, cardinality);
}

/// Bumps the cached cardinality, leaving an invalid cache invalid.
#[inline]
pub(crate) fn incr_cardinality(c: &mut [u16]) {
    let card = get_cardinality(c);
    if card != INVALID_CARDINALITY {
        set_cardinality(c, card + 1);
    }
}

/// Drops the cached cardinality by one, leaving an invalid cache invalid.
#[inline]
pub(crate) fn decr_cardinality(c: &mut [u16]) {
    let card = get_cardinality(c);
    if card != INVALID_CARDINALITY {
        debug_assert!(card > 0);
        set_cardinality(c, card - 1);
    }
}

/// Cached cardinality when valid, otherwise a fresh count. Only bitmap
/// containers ever carry an invalid cache; array operations maintain the
/// cache exactly.
pub(crate) fn resolved_cardinality(c: &[u16]) -> u32 {
    let card = get_cardinality(c);
    if card == INVALID_CARDINALITY {
        bitmap::count(c)
    } else {
        card
    }
}

/// Smallest container allocation holding `n` array values.
pub(crate) fn size_for(n: usize) -> usize {
    (HEADER_WORDS + n).next_power_of_two().max(MIN_CONTAINER_WORDS)
}

/// Builds a container out of sorted values, choosing the representation by
/// cardinality: past the array cap the result is a bitmap container.
pub(crate) fn from_values(vals: &[u16], out: &mut Vec<u16>) {
    out.clear();
    if vals.len() > ARRAY_TO_BITMAP_THRESHOLD as usize {
        out.resize(MAX_CONTAINER_WORDS, 0);
        out[IDX_SIZE] = MAX_CONTAINER_WORDS as u16;
        out[IDX_TYPE] = TYPE_BITMAP;
        for &v in vals {
            out[HEADER_WORDS + (v >> 4) as usize] |= 1 << (v & 15);
        }
    } else {
        let size = size_for(vals.len());
        out.resize(size, 0);
        out[IDX_SIZE] = size as u16;
        out[IDX_TYPE] = TYPE_ARRAY;
        out[HEADER_WORDS..HEADER_WORDS + vals.len()].copy_from_slice(vals);
    }
    set_cardinality(out, vals.len() as u32);
}

fn clone_into(c: &[u16], out: &mut Vec<u16>) {
    out.clear();
    out.extend_from_slice(c);
}

/// Per-container union into `out`. `vals` is merge scratch reused across
/// calls. Invalid cardinality caches propagate into the result.
pub(crate) fn or_into(a: &[u16], b: &[u16], vals: &mut Vec<u16>, out: &mut Vec<u16>) {
    match (kind(a), kind(b)) {
        (TYPE_ARRAY, TYPE_ARRAY) => {
            array::or_values(array::values(a), array::values(b), vals);
            from_values(vals, out);
        }
        (TYPE_ARRAY, TYPE_BITMAP) => {
            clone_into(b, out);
            for &v in array::values(a) {
                bitmap::add(out, v);
            }
        }
        (TYPE_BITMAP, TYPE_ARRAY) => {
            clone_into(a, out);
            for &v in array::values(b) {
                bitmap::add(out, v);
            }
        }
        (TYPE_BITMAP, TYPE_BITMAP) => {
            clone_into(a, out);
            bitmap::or_inline(out, b);
        }
        (x, y) => panic!("or on unknown container types {x}/{y}"),
    }
}

/// Per-container intersection into `out`.
pub(crate) fn and_into(a: &[u16], b: &[u16], vals: &mut Vec<u16>, out: &mut Vec<u16>) {
    match (kind(a), kind(b)) {
        (TYPE_ARRAY, TYPE_ARRAY) => {
            array::and_values(array::values(a), array::values(b), vals);
            from_values(vals, out);
        }
        (TYPE_ARRAY, TYPE_BITMAP) => {
            vals.clear();
            vals.extend(array::values(a).iter().copied().filter(|&v| bitmap::contains(b, v)));
            from_values(vals, out);
        }
        (TYPE_BITMAP, TYPE_ARRAY) => {
            vals.clear();
            vals.extend(array::values(b).iter().copied().filter(|&v| bitmap::contains(a, v)));
            from_values(vals, out);
        }
        (TYPE_BITMAP, TYPE_BITMAP) => {
            clone_into(a, out);
            bitmap::and_inline(out, b);
            shrink_bitmap(vals, out);
        }
        (x, y) => panic!("and on unknown container types {x}/{y}"),
    }
}

/// Per-container difference (`a \ b`) into `out`.
pub(crate) fn and_not_into(a: &[u16], b: &[u16], vals: &mut Vec<u16>, out: &mut Vec<u16>) {
    match (kind(a), kind(b)) {
        (TYPE_ARRAY, TYPE_ARRAY) => {
            array::and_not_values(array::values(a), array::values(b), vals);
            from_values(vals, out);
        }
        (TYPE_ARRAY, TYPE_BITMAP) => {
            vals.clear();
            vals.extend(array::values(a).iter().copied().filter(|&v| !bitmap::contains(b, v)));
            from_values(vals, out);
        }
        (TYPE_BITMAP, TYPE_ARRAY) => {
            clone_into(a, out);
            for &v in array::values(b) {
                bitmap::remove(out, v);
            }
            shrink_bitmap(vals, out);
        }
        (TYPE_BITMAP, TYPE_BITMAP) => {
            clone_into(a, out);
            bitmap::and_not_inline(out, b);
            shrink_bitmap(vals, out);
        }
        (x, y) => panic!("andnot on unknown container types {x}/{y}"),
    }
}

/// Rewrites a bitmap-container result as an array container when its exact
/// cardinality dropped under the array cap. Results with an invalid cache
/// stay bitmaps; the sentinel must survive.
fn shrink_bitmap(vals: &mut Vec<u16>, out: &mut Vec<u16>) {
    let card = get_cardinality(out);
    if card == INVALID_CARDINALITY || card > ARRAY_TO_BITMAP_THRESHOLD {
        return;
    }
    vals.clear();
    bitmap::collect_values(out, vals);
    from_values(vals, out);
}
