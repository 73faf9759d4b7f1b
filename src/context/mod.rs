//! Context management module
//!
//! Byte accounting and tail-preserving compression for prompts.

pub mod bytes;
pub mod compressor;

// Re-export commonly used helpers
pub use bytes::{byte_len, tail_utf8, truncate_utf8, ByteBudget};
pub use compressor::{cap_keep_tail, ELISION_MARKER};
