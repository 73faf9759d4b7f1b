//! Answer production
//!
//! Provides:
//! - Extractive fallback composer (network-free, infallible)
//! - Output sanitizer for generator and local text
//! - Final result assembly with citations and confidence

pub mod composer;
pub mod fallback;
pub mod sanitize;

pub use composer::{AnswerComposer, AnswerConfig};
pub use fallback::{repair_leading, FallbackComposer, BULLET};
pub use sanitize::{OutputSanitizer, TextOrigin};
