//! Command parsing for chat messages
//!
//! A message may open with an engine selector (`llm` / `local`), then an
//! inline language (`lang hi: ...`), and carry knob flags near the front:
//! `t=32`, `s=12`, `k=4` or the keyword `fast`. Everything recognized is
//! stripped; the rest is the question.

use regex::{Captures, Regex};

use crate::errors::Result;
use crate::types::{EngineMode, Language};

/// Flags are only honored within this many leading characters
pub const FLAG_WINDOW_CHARS: usize = 60;

/// Per-message knob overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub tokens: Option<u32>,
    pub seconds: Option<u64>,
    pub topk: Option<usize>,
}

/// Parsed chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCommand {
    pub engine: EngineMode,
    pub question: String,
    /// Set by an inline `lang xx:` prefix
    pub language: Option<Language>,
    pub overrides: Overrides,
    pub fast: bool,
}

/// Compiled message grammar
#[derive(Debug, Clone)]
pub struct CommandParser {
    engine: Regex,
    inline_language: Regex,
    flags: Regex,
}

impl CommandParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            engine: Regex::new(r"(?is)^\s*(llm|local)\b\s*[:\-]?\s*(.*)$")?,
            inline_language: Regex::new(r"(?is)^\s*lang\s+(hi|en)\b\s*[:\-]?\s*(.*)$")?,
            flags: Regex::new(
                r"(?i)\b(?:t|tok|tokens|max)\s*=\s*(\d{1,4})\b|\b(?:s|sec|seconds)\s*=\s*(\d{1,4})\b|\bk\s*=\s*(\d{1,2})\b|\bfast\b",
            )?,
        })
    }

    /// Parse one message; never fails, unknown text is the question
    pub fn parse(&self, message: &str) -> ChannelCommand {
        let mut rest = message.trim().to_string();

        let mut engine = EngineMode::Auto;
        if let Some(caps) = self.engine.captures(&rest) {
            engine = match caps[1].to_ascii_lowercase().as_str() {
                "local" => EngineMode::Local,
                _ => EngineMode::Llm,
            };
            rest = caps[2].trim().to_string();
        }

        let mut language = None;
        if let Some(caps) = self.inline_language.captures(&rest) {
            language = Some(Language::from_code(&caps[1]));
            rest = caps[2].trim().to_string();
        }

        let (head, tail) = split_at_char(&rest, FLAG_WINDOW_CHARS);
        let mut overrides = Overrides::default();
        let mut fast = false;
        let head = self.flags.replace_all(head, |caps: &Captures| {
            if let Some(tokens) = caps.get(1) {
                overrides.tokens = tokens.as_str().parse().ok();
            } else if let Some(seconds) = caps.get(2) {
                overrides.seconds = seconds.as_str().parse().ok();
            } else if let Some(topk) = caps.get(3) {
                overrides.topk = topk.as_str().parse().ok();
            } else {
                fast = true;
            }
            ""
        });

        let question = format!("{}{}", head, tail)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        ChannelCommand {
            engine,
            question,
            language,
            overrides,
            fast,
        }
    }
}

/// Split `text` after `n` characters
fn split_at_char(text: &str, n: usize) -> (&str, &str) {
    match text.char_indices().nth(n) {
        Some((idx, _)) => text.split_at(idx),
        None => (text, ""),
    }
}
