// Evidence budgeting and grounded prompt assembly
//
// Two passes in a fixed order: a percent-based character cap selects the
// evidence set, then a hard byte cap renders it. The question block always
// sits at the end of the prompt and is the last thing to be cut.
use serde::{Deserialize, Serialize};

use crate::context::bytes::{byte_len, truncate_utf8, ByteBudget};
use crate::types::{Language, Passage};

/// Instructions placed ahead of the evidence
pub const SYSTEM_PREAMBLE: &str = "You are GroundAsk. Answer clearly and concisely using ONLY the evidence below.\n\
If the evidence does not contain the answer, say you don't have enough information.\n\n";

/// Marks the start of the evidence lines
pub const EVIDENCE_HEADER: &str = "EVIDENCE:\n";

/// Prompt assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Hard cap on the whole prompt, in UTF-8 bytes
    pub max_bytes: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { max_bytes: 12_000 }
    }
}

/// Requested answer shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStyle {
    Bullets,
    Paragraph,
}

impl AnswerStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bullets" | "bullet" | "list" => Some(AnswerStyle::Bullets),
            "paragraph" | "para" | "prose" => Some(AnswerStyle::Paragraph),
            _ => None,
        }
    }
}

/// Optional length/format guidance appended after the question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerHint {
    pub style: Option<AnswerStyle>,
    /// Free text such as "2-3 sentences"
    pub length: Option<String>,
}

impl AnswerHint {
    pub fn is_empty(&self) -> bool {
        self.style.is_none() && self.length.as_deref().map_or(true, |l| l.trim().is_empty())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        match self.style {
            Some(AnswerStyle::Bullets) => out.push_str("\nFormat: short bullet points."),
            Some(AnswerStyle::Paragraph) => out.push_str("\nFormat: one short paragraph."),
            None => {}
        }
        if let Some(length) = self.length.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            out.push_str("\nLength: ");
            out.push_str(length);
        }
        out
    }
}

/// Passages chosen for one query, in rank order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub passages: Vec<Passage>,
    /// Characters of passage text included
    pub chars: usize,
    /// UTF-8 bytes of passage text included
    pub bytes: usize,
}

impl EvidenceSet {
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Passage> {
        self.passages.iter()
    }
}

/// Rendered prompt with its accounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub bytes: usize,
    /// Evidence lines rendered, including a truncated last line
    pub lines: usize,
    /// An evidence line was cut or dropped by the byte cap
    pub truncated: bool,
}

/// The question block: question, language directive, optional hint
pub fn question_block(question: &str, language: Language, hint: Option<&AnswerHint>) -> String {
    let mut block = format!("\n\nQUESTION: {}\n{}", question.trim(), language.directive());
    if let Some(hint) = hint {
        block.push_str(&hint.render());
    }
    block
}

/// One evidence line: `[doc_id#chunk_index] text\n`
pub fn evidence_line(passage: &Passage) -> String {
    format!(
        "[{}#{}] {}\n",
        passage.doc_id,
        passage.chunk_index,
        passage.text.trim()
    )
}

/// Selects and renders evidence under character and byte budgets
#[derive(Debug, Clone, Default)]
pub struct EvidenceBudgeter {
    config: PromptConfig,
}

impl EvidenceBudgeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    /// Character soft cap over the first `evidence_k` non-blank passages
    ///
    /// ```text
    /// budget = total_chars × clamp(percent_cap, 10, 100) / 100
    /// include passages in order; the passage whose inclusion pushes the
    /// running total past `budget` is kept, then selection stops
    /// ```
    pub fn select(&self, ranked: &[Passage], evidence_k: usize, percent_cap: u8) -> EvidenceSet {
        let forwarded: Vec<&Passage> = ranked
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .take(evidence_k)
            .collect();

        let total: usize = forwarded.iter().map(|p| p.text.trim().chars().count()).sum();
        let pct = percent_cap.clamp(10, 100) as usize;
        let budget = total * pct / 100;

        let mut set = EvidenceSet::default();
        for passage in forwarded {
            let text = passage.text.trim();
            set.chars += text.chars().count();
            set.bytes += byte_len(text);
            set.passages.push(passage.clone());
            if set.chars > budget {
                break;
            }
        }
        set
    }

    /// Grounded QA prompt for `question` over `evidence`
    pub fn render(
        &self,
        evidence: &EvidenceSet,
        question: &str,
        language: Language,
        hint: Option<&AnswerHint>,
    ) -> AssembledPrompt {
        let mut preamble = String::with_capacity(SYSTEM_PREAMBLE.len() + EVIDENCE_HEADER.len());
        preamble.push_str(SYSTEM_PREAMBLE);
        preamble.push_str(EVIDENCE_HEADER);
        self.assemble(&preamble, evidence, &question_block(question, language, hint))
    }

    /// Lay out `preamble`, evidence lines and `tail` within `max_bytes`
    ///
    /// ```text
    /// body_budget = max_bytes − |tail|
    /// body        = preamble ++ lines, overflowing line cut at a char
    ///               boundary, nothing after it
    /// prompt      = truncate(body ++ tail, max_bytes)
    /// ```
    pub fn assemble(&self, preamble: &str, evidence: &EvidenceSet, tail: &str) -> AssembledPrompt {
        let max_bytes = self.config.max_bytes;
        let mut budget = ByteBudget::new(max_bytes.saturating_sub(byte_len(tail)));
        let mut body = String::new();
        let mut lines = 0;
        let mut truncated = false;

        let head = truncate_utf8(preamble, budget.remaining());
        budget.consume(head);
        body.push_str(head);

        for passage in evidence.iter() {
            let line = evidence_line(passage);
            if budget.fits(&line) {
                budget.consume(&line);
                body.push_str(&line);
                lines += 1;
                continue;
            }
            truncated = true;
            let cut = truncate_utf8(&line, budget.remaining());
            if !cut.is_empty() {
                budget.consume(cut);
                body.push_str(cut);
                lines += 1;
            }
            break;
        }

        body.push_str(tail);
        let text = truncate_utf8(&body, max_bytes).to_string();
        AssembledPrompt {
            bytes: text.len(),
            text,
            lines,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages(n: usize, len: usize) -> Vec<Passage> {
        (0..n)
            .map(|i| Passage::new(format!("doc{}", i), i as u32, "a".repeat(len), 1.0))
            .collect()
    }

    #[test]
    fn test_select_respects_evidence_k() {
        let budgeter = EvidenceBudgeter::new();
        let set = budgeter.select(&passages(8, 10), 3, 100);
        assert_eq!(set.len(), 3);
        assert_eq!(set.chars, 30);
    }

    #[test]
    fn test_select_includes_crossing_passage_then_stops() {
        let budgeter = EvidenceBudgeter::new();
        // total 400 chars, 30% => budget 120; 100, 200 (crosses) then stop
        let set = budgeter.select(&passages(4, 100), 4, 30);
        assert_eq!(set.len(), 2);
        assert_eq!(set.chars, 200);
    }

    #[test]
    fn test_select_clamps_percent_cap() {
        let budgeter = EvidenceBudgeter::new();
        let low = budgeter.select(&passages(20, 10), 20, 0);
        // 10% of 200 = 20; third passage crosses
        assert_eq!(low.len(), 3);
    }

    #[test]
    fn test_select_skips_blank_text() {
        let mut ranked = passages(3, 10);
        ranked[1].text = "   ".to_string();
        let set = EvidenceBudgeter::new().select(&ranked, 3, 100);
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|p| !p.text.trim().is_empty()));
    }

    #[test]
    fn test_render_layout() {
        let budgeter = EvidenceBudgeter::new();
        let set = budgeter.select(
            &[Passage::new("hr-policy", 4, " Leave is 24 days. ", 0.9)],
            5,
            100,
        );
        let prompt = budgeter.render(&set, "How much leave?", Language::En, None);

        assert!(prompt.text.starts_with(SYSTEM_PREAMBLE));
        assert!(prompt.text.contains("EVIDENCE:\n[hr-policy#4] Leave is 24 days.\n"));
        assert!(prompt
            .text
            .ends_with("\n\nQUESTION: How much leave?\nAnswer in English."));
        assert_eq!(prompt.bytes, prompt.text.len());
        assert_eq!(prompt.lines, 1);
        assert!(!prompt.truncated);
    }

    #[test]
    fn test_render_truncates_overflowing_line_and_keeps_question() {
        let budgeter = EvidenceBudgeter::with_config(PromptConfig { max_bytes: 600 });
        let set = budgeter.select(&passages(5, 300), 5, 100);
        let prompt = budgeter.render(&set, "What is the rule?", Language::Hi, None);

        assert!(prompt.bytes <= 600);
        assert!(prompt.truncated);
        assert!(prompt.lines < 5);
        assert!(prompt.text.ends_with("QUESTION: What is the rule?\nAnswer in Hindi."));
    }

    #[test]
    fn test_render_multibyte_boundaries() {
        let budgeter = EvidenceBudgeter::with_config(PromptConfig { max_bytes: 401 });
        let ranked = vec![Passage::new("d", 0, "नियम ".repeat(100), 1.0)];
        let set = budgeter.select(&ranked, 1, 100);
        let prompt = budgeter.render(&set, "नियम क्या है?", Language::Hi, None);
        assert!(prompt.bytes <= 401);
        assert!(prompt.text.contains("QUESTION: नियम क्या है?"));
    }

    #[test]
    fn test_render_question_larger_than_cap() {
        let budgeter = EvidenceBudgeter::with_config(PromptConfig { max_bytes: 20 });
        let set = budgeter.select(&passages(2, 50), 2, 100);
        let prompt = budgeter.render(&set, "a long question that cannot fit", Language::En, None);
        assert!(prompt.bytes <= 20);
        assert_eq!(prompt.lines, 0);
    }

    #[test]
    fn test_hint_goes_after_question() {
        let budgeter = EvidenceBudgeter::new();
        let hint = AnswerHint {
            style: Some(AnswerStyle::Bullets),
            length: Some("2-3 lines".to_string()),
        };
        let prompt = budgeter.render(&EvidenceSet::default(), "Q?", Language::En, Some(&hint));
        assert!(prompt
            .text
            .ends_with("Answer in English.\nFormat: short bullet points.\nLength: 2-3 lines"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let budgeter = EvidenceBudgeter::with_config(PromptConfig { max_bytes: 900 });
        let set = budgeter.select(&passages(6, 200), 6, 70);
        let a = budgeter.render(&set, "same?", Language::En, None);
        let b = budgeter.render(&set, "same?", Language::En, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_answer_style_parse() {
        assert_eq!(AnswerStyle::parse("Bullet"), Some(AnswerStyle::Bullets));
        assert_eq!(AnswerStyle::parse("prose"), Some(AnswerStyle::Paragraph));
        assert_eq!(AnswerStyle::parse("haiku"), None);
        assert!(AnswerHint::default().is_empty());
    }
}
