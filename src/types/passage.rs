//! Retrieval-side data model: passages, fused candidates, filters

use serde::{Deserialize, Serialize};

/// Characters kept in a candidate preview
pub const PREVIEW_CHARS: usize = 320;

/// Identity of a passage within the corpus
pub type PassageKey = (String, u32);

/// A single retrievable unit of document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub doc_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub score: f64,
}

impl Passage {
    pub fn new(doc_id: impl Into<String>, chunk_index: u32, text: impl Into<String>, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            chunk_index,
            text: text.into(),
            score,
        }
    }

    /// Identity key `(doc_id, chunk_index)`
    pub fn key(&self) -> PassageKey {
        (self.doc_id.clone(), self.chunk_index)
    }
}

/// Which retrieval signal produced a fused candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Semantic,
    Keyword,
    Hybrid,
    Fallback,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Semantic => "semantic",
            CandidateSource::Keyword => "keyword",
            CandidateSource::Hybrid => "hybrid",
            CandidateSource::Fallback => "fallback",
        }
    }
}

/// One merged candidate per identity key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub doc_id: String,
    pub chunk_index: u32,
    /// Min-max normalized semantic score (0 when absent from the pool)
    pub sem_score: f64,
    /// Min-max normalized lexical score (0 when absent from the pool)
    pub kw_score: f64,
    /// Always within [0, 1]
    pub fused_score: f64,
    pub source: CandidateSource,
    pub preview: String,
    pub text: String,
    /// Cross-encoder score, set only when the reranker ran on this candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
}

impl FusedCandidate {
    pub fn key(&self) -> PassageKey {
        (self.doc_id.clone(), self.chunk_index)
    }

    /// Same document and chunk indices at most one apart
    pub fn is_adjacent_to(&self, other: &FusedCandidate) -> bool {
        self.doc_id == other.doc_id && self.chunk_index.abs_diff(other.chunk_index) <= 1
    }

    /// Lexical-only candidate used when the semantic pool is empty or failed
    pub fn fallback_from(passage: &Passage) -> Self {
        Self {
            doc_id: passage.doc_id.clone(),
            chunk_index: passage.chunk_index,
            sem_score: 0.0,
            kw_score: passage.score.clamp(0.0, 1.0),
            fused_score: passage.score.clamp(0.0, 1.0),
            source: CandidateSource::Fallback,
            preview: preview_of(&passage.text),
            text: passage.text.clone(),
            rerank_score: None,
        }
    }

    pub fn into_passage(self) -> Passage {
        Passage {
            doc_id: self.doc_id,
            chunk_index: self.chunk_index,
            text: self.text,
            score: self.fused_score,
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of a passage
pub fn preview_of(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Optional department / language restriction applied by every search backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub department: Option<String>,
    pub language: Option<String>,
}

impl SearchFilters {
    pub fn new(department: Option<String>, language: Option<String>) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
        };
        Self {
            department: clean(department),
            language: clean(language),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.department.is_none() && self.language.is_none()
    }
}
