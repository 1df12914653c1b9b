//! Key directory: the sorted (key, container offset) table at the head of
//! the buffer.
//!
//! Each entry maps a high-48-bit key to the word offset of its container.
//! Entries are 8 words wide (u64 key, u64 offset) and kept sorted, so
//! lookups are a binary search over a flat run of words. The directory
//! grows by doubling its entry capacity; because it sits at the head of the
//! buffer, growth shifts every container up and rewrites every stored
//! offset before anything else observes them.

use crate::bitmap::Bitmap;
use crate::constants::{
    DIR_ENTRY_WORDS, DIR_HEADER_WORDS, DIR_IDX_NUM_KEYS, DIR_IDX_SIZE, DIR_START,
};
use brim_common::words;

impl Bitmap {
    /// Allocated directory size in words, header included.
    pub(crate) fn dir_size_words(&self) -> usize {
        words::get_u32(&self.data, DIR_START + DIR_IDX_SIZE) as usize
    }

    pub(crate) fn set_dir_size_words(&mut self, size: usize) {
        words::set_u32(&mut self.data, DIR_START + DIR_IDX_SIZE, size as u32);
    }

    /// Number of directory keys, one per container, empty containers
    /// included. Only `cleanup` drops keys.
    pub fn num_keys(&self) -> usize {
        words::get_u32(&self.data, DIR_START + DIR_IDX_NUM_KEYS) as usize
    }

    fn set_num_keys(&mut self, n: usize) {
        words::set_u32(&mut self.data, DIR_START + DIR_IDX_NUM_KEYS, n as u32);
    }

    /// Entry capacity of the current directory allocation.
    fn dir_capacity(&self) -> usize {
        (self.dir_size_words() - DIR_HEADER_WORDS) / DIR_ENTRY_WORDS
    }

    #[inline]
    fn entry_word(i: usize) -> usize {
        DIR_START + DIR_HEADER_WORDS + i * DIR_ENTRY_WORDS
    }

    #[inline]
    pub(crate) fn key_at(&self, i: usize) -> u64 {
        debug_assert!(i < self.num_keys());
        words::get_u64(&self.data, Self::entry_word(i))
    }

    #[inline]
    pub(crate) fn offset_at(&self, i: usize) -> u64 {
        debug_assert!(i < self.num_keys());
        words::get_u64(&self.data, Self::entry_word(i) + 4)
    }

    #[inline]
    pub(crate) fn set_offset_at(&mut self, i: usize, offset: u64) {
        debug_assert!(i < self.num_keys());
        words::set_u64(&mut self.data, Self::entry_word(i) + 4, offset);
    }

    /// Binary search over the entries: `Ok(index)` when `key` is present,
    /// `Err(insertion_index)` otherwise.
    pub(crate) fn find_key(&self, key: u64) -> Result<usize, usize> {
        let (mut lo, mut hi) = (0, self.num_keys());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let k = self.key_at(mid);
            if k == key {
                return Ok(mid);
            } else if k < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Err(lo)
    }

    /// The container offset stored for `key`, if present.
    pub(crate) fn get_value(&self, key: u64) -> Option<u64> {
        self.find_key(key).ok().map(|i| self.offset_at(i))
    }

    /// Directory index and container offset for `key`, if present.
    pub(crate) fn find_container(&self, key: u64) -> Option<(usize, u64)> {
        self.find_key(key).ok().map(|i| (i, self.offset_at(i)))
    }

    /// Inserts or updates the entry for `key`. Returns the offset the
    /// container ended up at: directory growth shifts every container, the
    /// one being registered included, so callers must use the returned
    /// offset rather than the one they passed in.
    pub(crate) fn set_key(&mut self, key: u64, offset: u64) -> u64 {
        debug_assert_eq!(key & !crate::constants::KEY_MASK, 0);
        let pos = match self.find_key(key) {
            Ok(i) => {
                self.set_offset_at(i, offset);
                return offset;
            }
            Err(pos) => pos,
        };

        let mut offset = offset;
        let n = self.num_keys();
        if n == self.dir_capacity() {
            offset += self.grow_dir() as u64;
        }

        let base = DIR_START + DIR_HEADER_WORDS;
        self.data.copy_within(
            base + pos * DIR_ENTRY_WORDS..base + n * DIR_ENTRY_WORDS,
            base + (pos + 1) * DIR_ENTRY_WORDS,
        );
        words::set_u64(&mut self.data, Self::entry_word(pos), key);
        words::set_u64(&mut self.data, Self::entry_word(pos) + 4, offset);
        self.set_num_keys(n + 1);
        offset
    }

    /// Removes the entry for `key`, if present. The container it pointed
    /// at becomes unreferenced; `cleanup` reclaims the space.
    pub(crate) fn remove_key(&mut self, key: u64) -> bool {
        let i = match self.find_key(key) {
            Ok(i) => i,
            Err(_) => return false,
        };
        let n = self.num_keys();
        let base = DIR_START + DIR_HEADER_WORDS;
        self.data.copy_within(
            base + (i + 1) * DIR_ENTRY_WORDS..base + n * DIR_ENTRY_WORDS,
            base + i * DIR_ENTRY_WORDS,
        );
        self.data[base + (n - 1) * DIR_ENTRY_WORDS..base + n * DIR_ENTRY_WORDS].fill(0);
        self.set_num_keys(n - 1);
        true
    }

    /// Directory keys in ascending order.
    pub(crate) fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.num_keys()).map(|i| self.key_at(i))
    }

    /// Container offsets in key order.
    pub(crate) fn values(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.num_keys()).map(|i| self.offset_at(i))
    }

    /// Doubles the directory's entry capacity. Every container shifts up by
    /// the returned delta, and every stored offset is rewritten to match
    /// before this returns.
    fn grow_dir(&mut self) -> usize {
        let old = self.dir_size_words();
        let delta = old - DIR_HEADER_WORDS;
        self.data.insert_gap(DIR_START + old, delta);
        self.set_dir_size_words(old + delta);
        for i in 0..self.num_keys() {
            let off = self.offset_at(i);
            self.set_offset_at(i, off + delta as u64);
        }
        delta
    }
}
