//! Brim shared foundation.
//!
//! This crate provides the definitions used across all Brim components:
//! the workspace error type and the 16-bit word primitives that the
//! serialized bitmap format is built on.

pub mod error;
pub mod words;

pub use error::{BrimError, Result};
