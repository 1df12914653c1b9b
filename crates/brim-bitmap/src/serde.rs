//! Serde support.
//!
//! A bitmap serializes as its buffer snapshot and deserializes through the
//! same validation as `from_buffer_with_copy`.

use std::fmt;

use ::serde::de::{Error as DeError, SeqAccess, Visitor};
use ::serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bitmap::Bitmap;

impl Serialize for Bitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.to_buffer())
    }
}

struct BufferVisitor;

impl<'de> Visitor<'de> for BufferVisitor {
    type Value = Bitmap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a serialized bitmap buffer")
    }

    fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Bitmap, E> {
        Bitmap::from_buffer_with_copy(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bitmap, A::Error> {
        // Human-readable formats render bytes as a sequence.
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Bitmap::from_buffer_with_copy(&bytes).map_err(DeError::custom)
    }
}

impl<'de> Deserialize<'de> for Bitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Bitmap, D::Error> {
        deserializer.deserialize_bytes(BufferVisitor)
    }
}
