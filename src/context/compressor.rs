//! Tail-preserving prompt compression
//!
//! Used by the shrink-and-retry loop: the question block sits at the end of
//! every prompt, so compression keeps the tail verbatim and elides the
//! middle of the evidence with a marker.
//!
//! ```text
//! Input:  prompt P with |P| > cap bytes
//! Output: head(P) ++ MARKER ++ tail(P),  |output| ≤ cap
//!
//! tail = min(tail_bytes, cap / 2, cap - |MARKER|)
//! head = cap - tail - |MARKER|
//! ```

use crate::context::bytes::{tail_utf8, truncate_utf8};

/// Inserted between the kept head and tail
pub const ELISION_MARKER: &str = "\n…\n";

/// Cap `prompt` at `max_bytes`, keeping up to `tail_bytes` of its end verbatim
///
/// Prompts already within the cap are returned unchanged.
pub fn cap_keep_tail(prompt: &str, max_bytes: usize, tail_bytes: usize) -> String {
    if prompt.len() <= max_bytes {
        return prompt.to_string();
    }
    if max_bytes <= ELISION_MARKER.len() {
        return truncate_utf8(prompt, max_bytes).to_string();
    }

    let tail_budget = tail_bytes
        .min(max_bytes / 2)
        .min(max_bytes - ELISION_MARKER.len());
    let head_budget = max_bytes - tail_budget - ELISION_MARKER.len();

    let tail = tail_utf8(prompt, tail_budget);
    let head = truncate_utf8(prompt, head_budget);

    let mut out = String::with_capacity(head.len() + ELISION_MARKER.len() + tail.len());
    out.push_str(head);
    out.push_str(ELISION_MARKER);
    out.push_str(tail);
    out
}
