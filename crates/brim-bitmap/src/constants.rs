//! Layout constants for the word buffer, containers, and key directory.

/// Words reserved at the very start of the buffer, kept zero. They exist so
/// that offset 0 is never a valid container offset.
pub(crate) const SENTINEL_WORDS: usize = 2;

// Container header layout (4 words at the start of every container).

/// Container length in words, header included.
pub(crate) const IDX_SIZE: usize = 0;

/// Container type tag.
pub(crate) const IDX_TYPE: usize = 1;

/// Cached cardinality, stored as a little-endian u32 across two words. The
/// cache field needs 17 bits: a full container holds 65536 values, one more
/// than a single word can express.
pub(crate) const IDX_CARDINALITY: usize = 2;

/// First payload word of any container.
pub(crate) const HEADER_WORDS: usize = 4;

/// Container type tags.
pub(crate) const TYPE_ARRAY: u16 = 1;
pub(crate) const TYPE_BITMAP: u16 = 2;

/// Payload words in a bitmap container: 65536 bits.
pub(crate) const BITMAP_PAYLOAD_WORDS: usize = (1 << 16) / 16;

/// Total words in a bitmap container, the largest container there is.
pub(crate) const MAX_CONTAINER_WORDS: usize = HEADER_WORDS + BITMAP_PAYLOAD_WORDS;

/// Smallest array container: header plus four payload slots.
pub(crate) const MIN_CONTAINER_WORDS: usize = 8;

/// A full array container holding at least this many values converts to a
/// bitmap container instead of doubling again.
pub(crate) const ARRAY_TO_BITMAP_THRESHOLD: u32 = 2048;

/// Exact population of a full container.
pub(crate) const MAX_CARDINALITY: u32 = 1 << 16;

/// Cache sentinel: the cached cardinality is stale and must be recounted.
/// Bulk operations propagate the sentinel instead of recounting.
pub(crate) const INVALID_CARDINALITY: u32 = MAX_CARDINALITY + 1;

/// The high 48 bits of a value select its container.
pub(crate) const KEY_MASK: u64 = 0xFFFF_FFFF_FFFF_0000;

// Key directory layout. The directory sits right after the sentinel words:
// a 4-word header followed by 8-word entries, sorted by key.

/// First word of the directory.
pub(crate) const DIR_START: usize = SENTINEL_WORDS;

/// Directory header: allocated size in words and number of keys, both
/// little-endian u32 pairs. Offsets below are relative to `DIR_START`.
pub(crate) const DIR_HEADER_WORDS: usize = 4;
pub(crate) const DIR_IDX_SIZE: usize = 0;
pub(crate) const DIR_IDX_NUM_KEYS: usize = 2;

/// Directory entry: u64 key (low 16 bits zero) then u64 container offset.
pub(crate) const DIR_ENTRY_WORDS: usize = 8;

/// Entry capacity of a fresh bitmap's directory.
pub(crate) const INITIAL_DIR_KEYS: usize = 4;
