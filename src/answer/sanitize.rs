//! Output sanitization
//!
//! Generators echo prompt scaffolding back: evidence tags, the system
//! preamble, the language directive. Each rule below removes one such
//! artifact; whitespace is collapsed afterwards.

use regex::Regex;

use crate::answer::fallback::BULLET;
use crate::errors::Result;

/// Where a piece of answer text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    /// Remote generator output
    Remote,
    /// Extractive composer output; bullets get normalized
    Local,
}

/// Compiled cleanup rules
#[derive(Debug, Clone)]
pub struct OutputSanitizer {
    doc_tag_closed: Regex,
    doc_tag_half_open: Regex,
    evidence_tag: Regex,
    system_echo: Regex,
    language_echo: Regex,
    spaces: Regex,
    blank_runs: Regex,
    list_marker: Regex,
}

impl OutputSanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // [DOC: x], [DOC#chunk 3], [DOC#chunks 1,2]
            // A closed tag never spans lines
            doc_tag_closed: Regex::new(r"(?i)[ \t]*\[DOC(?:#(?:chunks?)?|\b)[ \t]*[:\-]?[^\]\n]*\][ \t]*")?,
            // "[DOC ..." running to end of line
            doc_tag_half_open: Regex::new(r"(?im)[ \t]*\[DOC(?:#(?:chunks?)?|\b)[ \t]*[:\-]?[^\]\n]*$")?,
            // [hr-policy#4] or [hr-policy#4,5]
            evidence_tag: Regex::new(r"\s*\[[\w.\-]+#\d+(?:\s*,\s*\d+)*\]")?,
            system_echo: Regex::new(r"(?im)^[ \t]*You are GroundAsk\.[^\n]*$")?,
            language_echo: Regex::new(r"(?im)^[ \t]*Answer in (?:English|Hindi)\.[^\n]*$")?,
            spaces: Regex::new(r"[ \t]{2,}")?,
            blank_runs: Regex::new(r"\n{3,}")?,
            list_marker: Regex::new(r"^(?:[•\-–—*]+|\(?\d{1,3}[.)]|\([a-zA-Z]\)|[a-zA-Z][.)])\s+")?,
        })
    }

    /// Clean `text` produced by `origin`
    pub fn sanitize(&self, text: &str, origin: TextOrigin) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let t = self.doc_tag_closed.replace_all(text, " ");
        let t = self.doc_tag_half_open.replace_all(&t, "");
        let t = self.evidence_tag.replace_all(&t, "");
        let t = self.system_echo.replace_all(&t, "");
        let t = self.language_echo.replace_all(&t, "");
        let t = self.spaces.replace_all(&t, " ");
        let t = self.blank_runs.replace_all(&t, "\n\n");

        let t = match origin {
            TextOrigin::Remote => t.into_owned(),
            TextOrigin::Local => self.normalize_bullets(&t),
        };
        t.trim().to_string()
    }

    /// One bullet glyph per list line, blank lines dropped
    fn normalize_bullets(&self, text: &str) -> String {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if let Some(rest) = line.strip_prefix('•') {
                    format!("{}{}", BULLET, rest.trim_start_matches('•').trim_start())
                } else {
                    self.list_marker.replace(line, BULLET).into_owned()
                }
            })
            .filter(|line| line.chars().any(char::is_alphanumeric))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
