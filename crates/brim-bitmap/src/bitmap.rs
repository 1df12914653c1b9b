//! The bitmap facade: a compressed, serializable set of `u64` values.
//!
//! A value `x` is split into a high-48-bit key (`x & KEY_MASK`) and a low
//! 16-bit half. The key directory at the head of the buffer maps each key
//! to the word offset of its container; the container holds the low halves.
//! Everything lives in one contiguous word buffer, so the in-memory
//! representation is also the serialized form.

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use bytes::Bytes;

use brim_common::{words, BrimError, Result};

use crate::buffer::WordBuffer;
use crate::constants::{
    DIR_ENTRY_WORDS, DIR_HEADER_WORDS, DIR_IDX_NUM_KEYS, DIR_IDX_SIZE, DIR_START, HEADER_WORDS,
    IDX_TYPE, INITIAL_DIR_KEYS, INVALID_CARDINALITY, KEY_MASK, MAX_CONTAINER_WORDS,
    MIN_CONTAINER_WORDS, TYPE_ARRAY, TYPE_BITMAP,
};
use crate::container::array::AddOutcome;
use crate::container::{self, array, bitmap};

/// A compressed bitmap over `u64` values.
///
/// Single-writer: `&mut self` methods mutate, `&self` methods read, and the
/// borrow checker enforces the rest. Iterators borrow the bitmap, so
/// mutation invalidates them at compile time.
#[derive(Clone)]
pub struct Bitmap {
    pub(crate) data: WordBuffer,
}

impl Bitmap {
    /// Creates an empty bitmap.
    pub fn new() -> Bitmap {
        Self::with_dir_capacity(INITIAL_DIR_KEYS)
    }

    /// Creates an empty bitmap whose directory holds `keys` entries before
    /// it has to grow.
    fn with_dir_capacity(keys: usize) -> Bitmap {
        let keys = keys.max(INITIAL_DIR_KEYS);
        let size = DIR_HEADER_WORDS + keys * DIR_ENTRY_WORDS;
        let data = WordBuffer::with_len(DIR_START + size);
        let mut bm = Bitmap { data };
        bm.set_dir_size_words(size);
        bm
    }

    /// Builds a bitmap from strictly ascending values, choosing container
    /// representations up front instead of growing into them.
    pub fn from_sorted_list(values: &[u64]) -> Bitmap {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));

        // Count key groups first so the directory never grows (and never
        // shifts containers) while they are appended.
        let mut groups = 0usize;
        let mut prev = None;
        for &v in values {
            let key = v & KEY_MASK;
            if prev != Some(key) {
                groups += 1;
                prev = Some(key);
            }
        }

        let mut bm = Bitmap::with_dir_capacity(groups);
        let mut lows: Vec<u16> = Vec::new();
        let mut scratch: Vec<u16> = Vec::new();
        let mut i = 0;
        while i < values.len() {
            let key = values[i] & KEY_MASK;
            lows.clear();
            while i < values.len() && values[i] & KEY_MASK == key {
                lows.push(values[i] as u16);
                i += 1;
            }
            container::from_values(&lows, &mut scratch);
            let off = bm.append_container(&scratch);
            bm.set_key(key, off);
        }
        bm
    }

    /// Adds `x` to the set. Returns true when `x` was not already present.
    pub fn set(&mut self, x: u64) -> bool {
        let key = x & KEY_MASK;
        let offset = match self.get_value(key) {
            Some(off) => off,
            None => {
                let off = self.new_container(MIN_CONTAINER_WORDS, TYPE_ARRAY);
                self.set_key(key, off)
            }
        };
        self.container_add(key, offset, x as u16)
    }

    /// Adds every value in `values`.
    pub fn set_many(&mut self, values: &[u64]) {
        for &x in values {
            self.set(x);
        }
    }

    /// Whether `x` is in the set.
    pub fn contains(&self, x: u64) -> bool {
        match self.get_value(x & KEY_MASK) {
            Some(off) => {
                let c = self.data.container(off);
                if container::kind(c) == TYPE_BITMAP {
                    bitmap::contains(c, x as u16)
                } else {
                    array::contains(c, x as u16)
                }
            }
            None => false,
        }
    }

    /// Removes `x`. Returns true when it was present. The container keeps
    /// its directory key even when it empties; only [`Bitmap::cleanup`]
    /// drops keys.
    pub fn remove(&mut self, x: u64) -> bool {
        match self.find_container(x & KEY_MASK) {
            Some((_, off)) => {
                let c = self.data.container_mut(off);
                if container::kind(c) == TYPE_BITMAP {
                    bitmap::remove(c, x as u16)
                } else {
                    array::remove(c, x as u16)
                }
            }
            None => false,
        }
    }

    /// Number of values in the set. Containers with a stale cardinality
    /// cache are recounted on the fly.
    pub fn get_cardinality(&self) -> u64 {
        self.values()
            .map(|off| container::resolved_cardinality(self.data.container(off)) as u64)
            .sum()
    }

    /// Whether the set holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.values()
            .all(|off| container::resolved_cardinality(self.data.container(off)) == 0)
    }

    /// Smallest value in the set, 0 when empty.
    pub fn minimum(&self) -> u64 {
        for i in 0..self.num_keys() {
            let c = self.data.container(self.offset_at(i));
            if container::resolved_cardinality(c) == 0 {
                continue;
            }
            let low = if container::kind(c) == TYPE_BITMAP {
                match bitmap::min(c) {
                    Some(v) => v,
                    None => continue,
                }
            } else {
                array::values(c)[0]
            };
            return self.key_at(i) | low as u64;
        }
        0
    }

    /// Largest value in the set, 0 when empty.
    pub fn maximum(&self) -> u64 {
        for i in (0..self.num_keys()).rev() {
            let c = self.data.container(self.offset_at(i));
            if container::resolved_cardinality(c) == 0 {
                continue;
            }
            let low = if container::kind(c) == TYPE_BITMAP {
                match bitmap::max(c) {
                    Some(v) => v,
                    None => continue,
                }
            } else {
                let vals = array::values(c);
                vals[vals.len() - 1]
            };
            return self.key_at(i) | low as u64;
        }
        0
    }

    /// Zero-based position of `x` among the set's values, or `None` when
    /// `x` is absent. For a present `x` this equals the number of set
    /// values strictly below it.
    pub fn rank(&self, x: u64) -> Option<u64> {
        let key = x & KEY_MASK;
        let low = x as u16;
        let mut acc = 0u64;
        for (k, off) in self.keys().zip(self.values()) {
            if k > key {
                return None;
            }
            let c = self.data.container(off);
            if k < key {
                acc += container::resolved_cardinality(c) as u64;
                continue;
            }
            return if container::kind(c) == TYPE_BITMAP {
                if bitmap::contains(c, low) {
                    Some(acc + bitmap::rank_below(c, low) as u64)
                } else {
                    None
                }
            } else {
                array::rank(c, low).map(|r| acc + r as u64)
            };
        }
        None
    }

    /// The `i`-th value (zero-based) in ascending order.
    pub fn select(&self, i: u64) -> Result<u64> {
        let mut remaining = i;
        for idx in 0..self.num_keys() {
            let c = self.data.container(self.offset_at(idx));
            let card = container::resolved_cardinality(c) as u64;
            if remaining < card {
                let low = if container::kind(c) == TYPE_BITMAP {
                    bitmap::select(c, remaining as u32)
                } else {
                    array::select(c, remaining as u32)
                };
                return Ok(self.key_at(idx) | low as u64);
            }
            remaining -= card;
        }
        Err(BrimError::OutOfRange {
            index: i,
            cardinality: i - remaining,
        })
    }

    /// Every value in ascending order.
    pub fn to_array(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Removes every value in the half-open range `lo..hi`. `lo == hi` is a
    /// no-op; `hi == u64::MAX` clears everything from `lo` on. Containers
    /// emptied by the removal are compacted away.
    ///
    /// Note the convention split: this range is half-open, while the
    /// per-container `remove_range` it drives is inclusive on both ends.
    pub fn remove_range(&mut self, lo: u64, hi: u64) {
        if lo > hi {
            panic!("remove_range: lo {lo} greater than hi {hi}");
        }
        if lo == hi {
            return;
        }
        let k1 = lo & KEY_MASK;
        let k2 = hi & KEY_MASK;

        for i in 0..self.num_keys() {
            let k = self.key_at(i);
            if k > k1 && k < k2 {
                self.clear_container_at(i);
            }
        }

        if k1 == k2 {
            if let Some((_, off)) = self.find_container(k1) {
                if hi == u64::MAX {
                    self.container_remove_range(off, lo as u16, u16::MAX);
                } else {
                    // Same container and lo < hi, so hi's low half is above
                    // lo's; hi itself stays.
                    self.container_remove_range(off, lo as u16, hi as u16 - 1);
                }
            }
        } else {
            if let Some((_, off)) = self.find_container(k1) {
                self.container_remove_range(off, lo as u16, u16::MAX);
            }
            if let Some((_, off)) = self.find_container(k2) {
                if hi == u64::MAX {
                    self.container_remove_range(off, 0, u16::MAX);
                } else if hi as u16 > 0 {
                    self.container_remove_range(off, 0, hi as u16 - 1);
                }
            }
        }
        self.cleanup();
    }

    /// Drops every container whose cardinality is 0, compacting the buffer
    /// and rewriting directory offsets. Semantically a no-op.
    pub fn cleanup(&mut self) {
        // Drop the dead keys, then compact the survivors into a fresh
        // buffer so the gaps they leave behind are reclaimed too.
        let dead: Vec<u64> = self
            .keys()
            .zip(self.values())
            .filter(|&(_, off)| container::resolved_cardinality(self.data.container(off)) == 0)
            .map(|(key, _)| key)
            .collect();
        for key in dead {
            self.remove_key(key);
        }

        let n = self.num_keys();
        let mut out = Bitmap::with_dir_capacity(n);
        for i in 0..n {
            let off = self.offset_at(i);
            let card = container::resolved_cardinality(self.data.container(off));
            let new_off = out.append_container(self.data.container(off));
            // Refresh a stale cache while we hold the recount.
            let c = out.data.container_mut(new_off);
            if container::get_cardinality(c) == INVALID_CARDINALITY {
                container::set_cardinality(c, card);
            }
            out.set_key(self.key_at(i), new_off);
        }
        *self = out;
    }

    /// Unions `other` into `self`.
    pub fn or(&mut self, other: &Bitmap) {
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        for j in 0..other.num_keys() {
            let key = other.key_at(j);
            let oc_off = other.offset_at(j);
            match self.find_container(key) {
                None => {
                    let oc = other.data.container(oc_off);
                    if container::resolved_cardinality(oc) > 0 {
                        let off = self.append_container(oc);
                        self.set_key(key, off);
                    }
                }
                Some((idx, off)) => {
                    let oc = other.data.container(oc_off);
                    if self.data[off as usize + IDX_TYPE] == TYPE_BITMAP {
                        let c = self.data.container_mut(off);
                        if container::kind(oc) == TYPE_ARRAY {
                            for &v in array::values(oc) {
                                bitmap::add(c, v);
                            }
                        } else {
                            bitmap::or_inline(c, oc);
                        }
                    } else {
                        container::or_into(self.data.container(off), oc, &mut vals, &mut scratch);
                        self.replace_container(idx, &scratch);
                    }
                }
            }
        }
    }

    /// Intersects `self` with `other`, compacting dropped containers.
    pub fn and(&mut self, other: &Bitmap) {
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        for i in 0..self.num_keys() {
            let key = self.key_at(i);
            let off = self.offset_at(i);
            match other.find_container(key) {
                None => self.clear_container_at(i),
                Some((_, oc_off)) => {
                    let oc = other.data.container(oc_off);
                    if self.data[off as usize + IDX_TYPE] == TYPE_BITMAP
                        && container::kind(oc) == TYPE_BITMAP
                    {
                        bitmap::and_inline(self.data.container_mut(off), oc);
                    } else {
                        container::and_into(self.data.container(off), oc, &mut vals, &mut scratch);
                        if container::resolved_cardinality(&scratch) == 0 {
                            self.clear_container_at(i);
                        } else {
                            self.replace_container(i, &scratch);
                        }
                    }
                }
            }
        }
        self.cleanup();
    }

    /// Removes every value of `other` from `self`, compacting dropped
    /// containers.
    pub fn and_not(&mut self, other: &Bitmap) {
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        for i in 0..self.num_keys() {
            let key = self.key_at(i);
            let Some((_, oc_off)) = other.find_container(key) else {
                continue;
            };
            let off = self.offset_at(i);
            let oc = other.data.container(oc_off);
            if self.data[off as usize + IDX_TYPE] == TYPE_BITMAP
                && container::kind(oc) == TYPE_BITMAP
            {
                bitmap::and_not_inline(self.data.container_mut(off), oc);
            } else {
                container::and_not_into(self.data.container(off), oc, &mut vals, &mut scratch);
                if container::resolved_cardinality(&scratch) == 0 {
                    self.clear_container_at(i);
                } else {
                    self.replace_container(i, &scratch);
                }
            }
        }
        self.cleanup();
    }

    /// Partitions the set into independent bitmaps of roughly `max_size`
    /// serialized bytes each, in ascending value order: concatenating the
    /// pieces' iterators replays this bitmap's iterator. `external_size` is
    /// called with each container's value span and its result is added to
    /// that container's byte budget; pass `|_, _| 0` to size by the
    /// serialized form alone.
    pub fn split<F>(&self, external_size: F, max_size: u64) -> Vec<Bitmap>
    where
        F: Fn(u64, u64) -> u64,
    {
        let mut out = Vec::new();
        let mut cur = Bitmap::new();
        let mut used = false;
        let mut acc = 0u64;
        for i in 0..self.num_keys() {
            let c = self.data.container(self.offset_at(i));
            if container::resolved_cardinality(c) == 0 {
                continue;
            }
            let key = self.key_at(i);
            let sz = (c.len() * 2) as u64 + external_size(key, key | 0xFFFF);
            if used && acc + sz > max_size {
                out.push(std::mem::take(&mut cur));
                acc = 0;
                used = false;
            }
            self.copy_container_into(&mut cur, i);
            used = true;
            acc += sz;
        }
        if used {
            out.push(cur);
        }
        out
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Zero-copy byte view of the backing buffer. This is the serialized
    /// form on little-endian hosts; it aliases the bitmap, so it is
    /// invalidated by any mutation.
    pub fn to_buffer(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Owned little-endian snapshot of the backing buffer.
    pub fn to_buffer_with_copy(&self) -> Bytes {
        Bytes::from(words::words_to_bytes(&self.data))
    }

    /// Adopts a word buffer previously produced by serialization, without
    /// copying. Validation happens here, not lazily.
    pub fn from_buffer(buffer: Vec<u16>) -> Result<Bitmap> {
        Self::validate(&buffer)?;
        Ok(Bitmap {
            data: WordBuffer::from_words(buffer),
        })
    }

    /// Copies a little-endian byte buffer and adopts the copy.
    pub fn from_buffer_with_copy(bytes: &[u8]) -> Result<Bitmap> {
        let buffer = words::bytes_to_words(bytes).ok_or_else(|| {
            BrimError::MalformedBuffer(format!("odd byte length {}", bytes.len()))
        })?;
        Self::from_buffer(buffer)
    }

    fn validate(buf: &[u16]) -> Result<()> {
        let malformed = |reason: String| Err(BrimError::MalformedBuffer(reason));

        if buf.len() < DIR_START + DIR_HEADER_WORDS {
            return malformed(format!("{} words is shorter than the header", buf.len()));
        }
        let dir_size = words::get_u32(buf, DIR_START + DIR_IDX_SIZE) as usize;
        if dir_size < DIR_HEADER_WORDS || DIR_START + dir_size > buf.len() {
            return malformed(format!("directory size {dir_size} out of bounds"));
        }
        if (dir_size - DIR_HEADER_WORDS) % DIR_ENTRY_WORDS != 0 {
            return malformed(format!("directory size {dir_size} not entry-aligned"));
        }
        let num_keys = words::get_u32(buf, DIR_START + DIR_IDX_NUM_KEYS) as usize;
        if num_keys * DIR_ENTRY_WORDS > dir_size - DIR_HEADER_WORDS {
            return malformed(format!("{num_keys} keys exceed the directory allocation"));
        }

        let mut prev: Option<u64> = None;
        for i in 0..num_keys {
            let e = DIR_START + DIR_HEADER_WORDS + i * DIR_ENTRY_WORDS;
            let key = words::get_u64(buf, e);
            let off = words::get_u64(buf, e + 4) as usize;
            if key & !KEY_MASK != 0 {
                return malformed(format!("key {key:#x} has low bits set"));
            }
            if let Some(p) = prev {
                if key <= p {
                    return malformed(format!("keys not strictly increasing at {key:#x}"));
                }
            }
            prev = Some(key);

            if off < DIR_START + dir_size || off.saturating_add(HEADER_WORDS) > buf.len() {
                return malformed(format!("container offset {off} out of range"));
            }
            let size = buf[off] as usize;
            if size < MIN_CONTAINER_WORDS || off + size > buf.len() {
                return malformed(format!("container at {off} overruns the buffer"));
            }
            let card = words::get_u32(buf, off + crate::constants::IDX_CARDINALITY);
            match buf[off + IDX_TYPE] {
                TYPE_ARRAY => {
                    if card as usize > size - HEADER_WORDS {
                        return malformed(format!(
                            "array at {off} claims {card} values in {size} words"
                        ));
                    }
                }
                TYPE_BITMAP => {
                    if size != MAX_CONTAINER_WORDS {
                        return malformed(format!("bitmap container at {off} has size {size}"));
                    }
                    if card > INVALID_CARDINALITY {
                        return malformed(format!("cardinality {card} at {off} out of range"));
                    }
                }
                t => return malformed(format!("unknown container type {t} at {off}")),
            }
        }
        Ok(())
    }

    // =========================================================================
    // Container management
    // =========================================================================

    /// Appends a zeroed container of `size` words and stamps its header.
    pub(crate) fn new_container(&mut self, size: usize, kind: u16) -> u64 {
        let off = self.data.alloc(size);
        self.data[off] = size as u16;
        self.data[off + IDX_TYPE] = kind;
        off as u64
    }

    /// Doubles the container at `offset` (capped at the bitmap-container
    /// size), shifting every higher container up and rewriting their
    /// directory offsets.
    pub(crate) fn expand_container(&mut self, offset: u64) {
        let off = offset as usize;
        let old = self.data[off] as usize;
        let new = (old * 2).min(MAX_CONTAINER_WORDS);
        let delta = new - old;
        self.data.insert_gap(off + old, delta);
        self.data[off] = new as u16;
        for i in 0..self.num_keys() {
            let o = self.offset_at(i);
            if o > offset {
                self.set_offset_at(i, o + delta as u64);
            }
        }
    }

    /// Replaces the array container of `key` with a bitmap container
    /// holding the same values. The array's words become a dead gap until
    /// `cleanup` reclaims them.
    fn convert_to_bitmap(&mut self, key: u64) -> u64 {
        let (idx, old_off) = match self.find_container(key) {
            Some(found) => found,
            None => panic!("conversion for unmapped key {key:#x}"),
        };
        let old_off = old_off as usize;
        let new_off = self.new_container(MAX_CONTAINER_WORDS, TYPE_BITMAP) as usize;

        let (head, tail) = self.data.split_at_mut(new_off);
        let size = head[old_off] as usize;
        let src = &head[old_off..old_off + size];
        let dst = &mut tail[..MAX_CONTAINER_WORDS];
        let card = container::get_cardinality(src);
        for &v in &src[HEADER_WORDS..HEADER_WORDS + card as usize] {
            dst[HEADER_WORDS + (v >> 4) as usize] |= 1 << (v & 15);
        }
        container::set_cardinality(dst, card);

        self.set_offset_at(idx, new_off as u64);
        new_off as u64
    }

    fn container_add(&mut self, key: u64, mut offset: u64, low: u16) -> bool {
        loop {
            let c = self.data.container_mut(offset);
            if container::kind(c) == TYPE_BITMAP {
                return bitmap::add(c, low);
            }
            match array::add(c, low) {
                AddOutcome::Added => return true,
                AddOutcome::Present => return false,
                AddOutcome::NeedsExpansion => {
                    // The container keeps its offset; only its tail moves.
                    self.expand_container(offset);
                }
                AddOutcome::NeedsConversion => {
                    offset = self.convert_to_bitmap(key);
                }
            }
        }
    }

    fn container_remove_range(&mut self, offset: u64, lo: u16, hi: u16) {
        let c = self.data.container_mut(offset);
        if container::kind(c) == TYPE_BITMAP {
            bitmap::remove_range(c, lo, hi);
        } else {
            array::remove_range(c, lo, hi);
        }
    }

    /// Empties the container at directory index `key_idx`, keeping its key.
    fn clear_container_at(&mut self, key_idx: usize) {
        let off = self.offset_at(key_idx);
        let c = self.data.container_mut(off);
        c[HEADER_WORDS..].fill(0);
        container::set_cardinality(c, 0);
    }

    /// Copies raw container words to the tail of the buffer.
    fn append_container(&mut self, c: &[u16]) -> u64 {
        let off = self.data.alloc(c.len());
        self.data[off..off + c.len()].copy_from_slice(c);
        off as u64
    }

    /// Rewrites the container at directory index `key_idx` with `c`,
    /// in place when it fits and relocated to the tail otherwise.
    fn replace_container(&mut self, key_idx: usize, c: &[u16]) {
        let off = self.offset_at(key_idx) as usize;
        let cur = self.data[off] as usize;
        if c.len() <= cur {
            self.data[off..off + c.len()].copy_from_slice(c);
            self.data[off + c.len()..off + cur].fill(0);
        } else {
            let new_off = self.append_container(c);
            self.set_offset_at(key_idx, new_off);
        }
    }

    /// Copies this bitmap's `idx`-th container into `dst`, skipping empty
    /// containers.
    pub(crate) fn copy_container_into(&self, dst: &mut Bitmap, idx: usize) {
        let c = self.data.container(self.offset_at(idx));
        if container::resolved_cardinality(c) == 0 {
            return;
        }
        let off = dst.append_container(c);
        dst.set_key(self.key_at(idx), off);
    }

    // =========================================================================
    // Static set algebra
    // =========================================================================

    fn union_of(a: &Bitmap, b: &Bitmap) -> Bitmap {
        let mut res = Bitmap::new();
        let (na, nb) = (a.num_keys(), b.num_keys());
        let (mut i, mut j) = (0, 0);
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        while i < na && j < nb {
            let (ka, kb) = (a.key_at(i), b.key_at(j));
            match ka.cmp(&kb) {
                std::cmp::Ordering::Less => {
                    a.copy_container_into(&mut res, i);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    b.copy_container_into(&mut res, j);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    container::or_into(
                        a.data.container(a.offset_at(i)),
                        b.data.container(b.offset_at(j)),
                        &mut vals,
                        &mut scratch,
                    );
                    if container::resolved_cardinality(&scratch) > 0 {
                        let off = res.append_container(&scratch);
                        res.set_key(ka, off);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        while i < na {
            a.copy_container_into(&mut res, i);
            i += 1;
        }
        while j < nb {
            b.copy_container_into(&mut res, j);
            j += 1;
        }
        res
    }

    fn intersection_of(a: &Bitmap, b: &Bitmap) -> Bitmap {
        let mut res = Bitmap::new();
        let (na, nb) = (a.num_keys(), b.num_keys());
        let (mut i, mut j) = (0, 0);
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        while i < na && j < nb {
            let (ka, kb) = (a.key_at(i), b.key_at(j));
            match ka.cmp(&kb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    container::and_into(
                        a.data.container(a.offset_at(i)),
                        b.data.container(b.offset_at(j)),
                        &mut vals,
                        &mut scratch,
                    );
                    if container::resolved_cardinality(&scratch) > 0 {
                        let off = res.append_container(&scratch);
                        res.set_key(ka, off);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        res
    }

    fn difference_of(a: &Bitmap, b: &Bitmap) -> Bitmap {
        let mut res = Bitmap::new();
        let (mut vals, mut scratch) = (Vec::new(), Vec::new());
        for i in 0..a.num_keys() {
            let key = a.key_at(i);
            match b.find_container(key) {
                None => a.copy_container_into(&mut res, i),
                Some((_, oc_off)) => {
                    container::and_not_into(
                        a.data.container(a.offset_at(i)),
                        b.data.container(oc_off),
                        &mut vals,
                        &mut scratch,
                    );
                    if container::resolved_cardinality(&scratch) > 0 {
                        let off = res.append_container(&scratch);
                        res.set_key(key, off);
                    }
                }
            }
        }
        res
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("keys", &self.num_keys())
            .field("cardinality", &self.get_cardinality())
            .field("words", &self.data.len())
            .finish()
    }
}

/// Union: `&a | &b` builds a new bitmap.
impl BitOr for &Bitmap {
    type Output = Bitmap;

    fn bitor(self, rhs: &Bitmap) -> Bitmap {
        Bitmap::union_of(self, rhs)
    }
}

/// Intersection: `&a & &b` builds a new bitmap.
impl BitAnd for &Bitmap {
    type Output = Bitmap;

    fn bitand(self, rhs: &Bitmap) -> Bitmap {
        Bitmap::intersection_of(self, rhs)
    }
}

/// Difference: `&a - &b` builds a new bitmap.
impl Sub for &Bitmap {
    type Output = Bitmap;

    fn sub(self, rhs: &Bitmap) -> Bitmap {
        Bitmap::difference_of(self, rhs)
    }
}

impl Extend<u64> for Bitmap {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        for x in iter {
            self.set(x);
        }
    }
}

impl FromIterator<u64> for Bitmap {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        let mut bm = Bitmap::new();
        bm.extend(iter);
        bm
    }
}
