//! UTF-8 byte accounting
//!
//! Every prompt budget in this crate is expressed in UTF-8 bytes, because
//! that is what the gateway measures. Truncation always lands on a char
//! boundary so a multi-byte code point is never split.
//!
//! # Complexity
//! O(1) for measurement, O(4) worst case boundary search for truncation

/// Byte length of a string as sent on the wire
#[inline]
pub fn byte_len(text: &str) -> usize {
    text.len()
}

/// Longest prefix of `text` that fits in `max_bytes`
///
/// ```text
/// truncate_utf8(s, n) = s[..b]  where b = max { i ≤ n : is_char_boundary(s, i) }
/// ```
///
/// # Examples
///
/// ```
/// # use groundask::context::bytes::truncate_utf8;
/// assert_eq!(truncate_utf8("héllo", 2), "h");
/// assert_eq!(truncate_utf8("héllo", 3), "hé");
/// ```
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Longest suffix of `text` that fits in `max_bytes`
pub fn tail_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Running byte budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteBudget {
    limit: usize,
    used: usize,
}

impl ByteBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn fits(&self, text: &str) -> bool {
        byte_len(text) <= self.remaining()
    }

    /// Record `text` as consumed; callers check [`fits`](Self::fits) first
    pub fn consume(&mut self, text: &str) {
        self.used += byte_len(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_utf8("abcdef", 3), "abc");
        assert_eq!(truncate_utf8("abc", 10), "abc");
        assert_eq!(truncate_utf8("abc", 0), "");
    }

    #[test]
    fn test_truncate_never_splits_code_point() {
        // Devanagari letters are 3 bytes each
        let text = "नमस्ते";
        for n in 0..=text.len() {
            let cut = truncate_utf8(text, n);
            assert!(cut.len() <= n);
            assert!(text.starts_with(cut));
        }
        assert_eq!(truncate_utf8(text, 4), "न");
    }

    #[test]
    fn test_tail_never_splits_code_point() {
        let text = "ab€cd";
        assert_eq!(tail_utf8(text, 2), "cd");
        assert_eq!(tail_utf8(text, 4), "cd");
        assert_eq!(tail_utf8(text, 5), "€cd");
        assert_eq!(tail_utf8(text, 100), text);
    }

    #[test]
    fn test_budget_accounting() {
        let mut budget = ByteBudget::new(10);
        assert!(budget.fits("hello"));
        budget.consume("hello");
        assert_eq!(budget.remaining(), 5);
        assert!(!budget.fits("world!"));
        assert_eq!(budget.used(), 5);
    }
}
