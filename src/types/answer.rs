//! Answer-side data model: language, citations, results and diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    /// Parse a language code; anything starting with `hi` is Hindi
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_lowercase().starts_with("hi") {
            Language::Hi
        } else {
            Language::En
        }
    }

    /// Hindi when the text contains Devanagari, English otherwise
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
            Language::Hi
        } else {
            Language::En
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    /// Directive line appended to the question block
    pub fn directive(&self) -> &'static str {
        match self {
            Language::En => "Answer in English.",
            Language::Hi => "Answer in Hindi.",
        }
    }

    /// Returned by the extractive composer when no passage is usable
    pub fn no_answer(&self) -> &'static str {
        match self {
            Language::En => "No clear answer found in the documents.",
            Language::Hi => "दस्तावेज़ों में स्पष्ट उत्तर नहीं मिला।",
        }
    }

    /// Returned when retrieval produced no passages at all
    pub fn insufficient_evidence(&self) -> &'static str {
        match self {
            Language::En => "I couldn't find enough evidence in the documents to answer.",
            Language::Hi => "दस्तावेज़ों में उत्तर देने के लिए पर्याप्त प्रमाण नहीं मिला।",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How the caller wants the answer produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Remote generator, local fallback on failure
    #[default]
    Auto,
    /// Same as auto but explicitly requested
    Llm,
    /// Never call the remote generator
    Local,
}

impl EngineMode {
    /// Lenient parse of a free-text mode ("LLM (longer)", "remote", "local", ...)
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim().to_lowercase();
        if t.is_empty() {
            return None;
        }
        if t.contains("llm") || matches!(t.as_str(), "model" | "remote" | "gateway") {
            return Some(EngineMode::Llm);
        }
        if t.contains("local") {
            return Some(EngineMode::Local);
        }
        if t == "auto" {
            return Some(EngineMode::Auto);
        }
        None
    }

    pub fn uses_remote(&self) -> bool {
        !matches!(self, EngineMode::Local)
    }
}

/// Generation knobs forwarded to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.2,
            top_p: 1.0,
        }
    }
}

/// Grouped reference attached to an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    /// Sorted, de-duplicated
    pub chunk_indices: Vec<u32>,
}

impl Citation {
    /// Inline tag `[doc#c1,c2]`, or `[doc]` without chunks
    pub fn tag(&self) -> String {
        if self.chunk_indices.is_empty() {
            return format!("[{}]", self.doc_id);
        }
        let chunks: Vec<String> = self.chunk_indices.iter().map(|c| c.to_string()).collect();
        format!("[{}#{}]", self.doc_id, chunks.join(","))
    }
}

/// Where the answer text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Llm,
    Local,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Llm => "llm",
            AnswerSource::Local => "local",
        }
    }
}

/// Whether the requested path was honored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Ok,
    Fallback,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Ok => "ok",
            AnswerStatus::Fallback => "fallback",
        }
    }
}

/// Diagnostics attached to every answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerMeta {
    pub source: AnswerSource,
    pub status: AnswerStatus,
    pub took_ms: u64,
    /// Passages returned by retrieval
    pub k: usize,
    /// Passages forwarded as evidence
    pub evidence_k: usize,
    pub prompt_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_elapsed_ms: Option<u64>,
    /// Gateway round trips performed
    pub attempts: usize,
    pub percent_cap: u8,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub prompt_max_bytes: usize,
    /// Sanitized failure reason when the fallback was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl AnswerMeta {
    /// Meta for an answer produced without contacting the gateway
    pub fn local(status: AnswerStatus) -> Self {
        Self {
            source: AnswerSource::Local,
            status,
            took_ms: 0,
            k: 0,
            evidence_k: 0,
            prompt_bytes: 0,
            used_tokens: None,
            llm_elapsed_ms: None,
            attempts: 0,
            percent_cap: 0,
            max_tokens: 0,
            timeout_ms: 0,
            prompt_max_bytes: 0,
            failure: None,
        }
    }
}

/// Final result of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(rename = "answer")]
    pub text: String,
    pub citations: Vec<Citation>,
    /// Within [0, 1)
    pub confidence: f64,
    pub grounded: bool,
    pub meta: AnswerMeta,
}
