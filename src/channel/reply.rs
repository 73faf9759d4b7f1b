// Plain-text chat replies and the XML message envelope
use crate::types::{AnswerMeta, AnswerSource, AnswerStatus, Citation};

pub const HELP_TEXT: &str = "Send a question (e.g., 'benefits subsidy').\n\
Engine: 'llm <q>' for LLM, 'local <q>' for Local. Default is auto (LLM, local on failure).\n\
Overrides: t=<tokens> s=<seconds> k=<topk> or 'fast'. Example: 'llm t=32 s=12 benefits?'\n\
Language auto-detected; inline 'lang hi: <q>' or 'lang en: <q>' to force.";

pub const NO_EVIDENCE: &str = "No evidence found in the documents.";

/// Which path produced the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Llm,
    Local,
    LocalFallback,
}

impl Marker {
    pub fn from_meta(meta: &AnswerMeta) -> Self {
        match (meta.source, meta.status) {
            (AnswerSource::Llm, _) => Marker::Llm,
            (AnswerSource::Local, AnswerStatus::Fallback) => Marker::LocalFallback,
            (AnswerSource::Local, _) => Marker::Local,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Marker::Llm => "LLM",
            Marker::Local => "Local",
            Marker::LocalFallback => "Local (fallback)",
        }
    }

    /// `LLM (t=36, s=15s)`
    pub fn line(&self, tokens: u32, seconds: u64) -> String {
        format!("{} (t={}, s={}s)", self.label(), tokens, seconds)
    }
}

/// Cap `text` at `max_chars` characters, ending in "…" when cut
pub fn clip(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", keep.trim_end())
}

/// Answer text followed by one `Source:` line per cited document
pub fn format_reply(answer: &str, citations: &[Citation], max_chars: usize, max_sources: usize) -> String {
    let mut lines = vec![clip(answer, max_chars)];
    lines.extend(
        citations
            .iter()
            .take(max_sources)
            .map(|c| format!("Source: {}", c.tag())),
    );
    lines.join("\n")
}

/// Escape markup-significant characters
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal XML message envelope around `message`
pub fn envelope(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(message)
    )
}
