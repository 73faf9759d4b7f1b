// Deterministic extractive answers built from evidence, no network
use crate::types::{Language, Passage};

/// Glyph that starts every extractive bullet
pub const BULLET: &str = "• ";

/// Upstream text cleanup sometimes eats a line's first letter; restore the
/// usual victims. Matched case-insensitively against the line start.
const LEADING_REPAIRS: [(&str, &str); 8] = [
    ("nd ", "and "),
    ("r ", "or "),
    ("pplying ", "applying "),
    ("griculture ", "agriculture "),
    ("nterest ", "interest "),
    ("eneficiary ", "beneficiary "),
    ("cheme ", "Scheme "),
    ("oans ", "loans "),
];

/// Apply the first matching leading-fragment repair
pub fn repair_leading(line: &str) -> String {
    let trimmed = line.trim_start();
    for (broken, fixed) in LEADING_REPAIRS {
        let head = trimmed.get(..broken.len());
        if head.map_or(false, |h| h.eq_ignore_ascii_case(broken)) {
            return format!("{}{}", fixed, &trimmed[broken.len()..]);
        }
    }
    trimmed.to_string()
}

/// Extractive bullet composer
#[derive(Debug, Clone)]
pub struct FallbackComposer {
    max_bullets: usize,
    max_chars: usize,
}

impl Default for FallbackComposer {
    fn default() -> Self {
        Self {
            max_bullets: 4,
            max_chars: 220,
        }
    }
}

impl FallbackComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_bullets: usize, max_chars: usize) -> Self {
        Self {
            max_bullets,
            max_chars,
        }
    }

    /// First sentence of `text`, cut to `max_chars` characters with "..."
    pub fn lead_sentence(&self, text: &str) -> String {
        let sentence = text.trim().split(". ").next().unwrap_or_default();
        if sentence.chars().count() > self.max_chars {
            let cut: String = sentence.chars().take(self.max_chars).collect();
            format!("{}...", cut)
        } else {
            sentence.to_string()
        }
    }

    /// Bulleted lead sentences of the first passages
    ///
    /// Never fails; an empty or blank evidence list yields the localized
    /// "no answer" text.
    pub fn compose(&self, passages: &[Passage], language: Language) -> String {
        let bullets: Vec<String> = passages
            .iter()
            .take(self.max_bullets)
            .filter(|p| !p.text.trim().is_empty())
            .map(|p| format!("{}{}", BULLET, repair_leading(&self.lead_sentence(&p.text))))
            .collect();

        if bullets.is_empty() {
            language.no_answer().to_string()
        } else {
            bullets.join("\n")
        }
    }
}
