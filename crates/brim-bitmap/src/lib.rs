//! Brim: a compressed, serializable bitmap for `u64` sets.
//!
//! Values are grouped by their high 48 bits into containers: sparse groups
//! use a sorted array of 16-bit values, dense groups a 65536-bit vector.
//! A sorted key directory maps each group to its container. The directory
//! and the containers all live in one contiguous buffer of
//! little-endian 16-bit words, so the in-memory representation is also the
//! serialized form: [`Bitmap::to_buffer`] is a zero-copy view and
//! [`Bitmap::from_buffer`] adopts a word vector without reparsing.
//!
//! This crate provides:
//! - Point operations: [`Bitmap::set`], [`Bitmap::contains`],
//!   [`Bitmap::remove`], [`Bitmap::remove_range`]
//! - Set algebra: in-place [`Bitmap::or`]/[`Bitmap::and`]/
//!   [`Bitmap::and_not`], and `|`, `&`, `-` on `&Bitmap` for fresh results
//! - Order statistics: [`Bitmap::rank`], [`Bitmap::select`],
//!   [`Bitmap::minimum`], [`Bitmap::maximum`]
//! - Iteration: [`Bitmap::iter`], [`Bitmap::many_iterator`],
//!   [`Bitmap::range_iterators`], and [`Bitmap::split`] for sharding

mod bitmap;
mod buffer;
mod constants;
mod container;
mod iterator;
mod keys;
mod serde;

pub use bitmap::Bitmap;
pub use iterator::{BitmapIterator, ManyIterator};

pub use brim_common::{BrimError, Result};
