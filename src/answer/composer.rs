// Final answer assembly: citations, confidence, grounded flag
use serde::{Deserialize, Serialize};

use crate::types::{AnswerMeta, AnswerResult, AnswerStatus, Citation, Language, Passage};

/// Citation and confidence limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Distinct documents cited
    pub max_citation_docs: usize,
    /// Chunk indices listed per cited document
    pub max_chunks_per_doc: usize,
    /// Confidence ceiling, reached at `confidence_saturation` passages
    pub max_confidence: f64,
    pub confidence_saturation: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_citation_docs: 3,
            max_chunks_per_doc: 4,
            max_confidence: 0.9,
            confidence_saturation: 10,
        }
    }
}

/// Builds [`AnswerResult`]s from text and the evidence behind it
#[derive(Debug, Clone, Default)]
pub struct AnswerComposer {
    config: AnswerConfig,
}

impl AnswerComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnswerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    /// Group passages by document in first-seen order
    ///
    /// Chunk indices are de-duplicated and sorted before the per-document
    /// cap is applied, so the lowest indices are the ones kept.
    pub fn citations(&self, passages: &[Passage]) -> Vec<Citation> {
        let mut grouped: Vec<Citation> = Vec::new();

        for passage in passages {
            if let Some(i) = grouped.iter().position(|c| c.doc_id == passage.doc_id) {
                grouped[i].chunk_indices.push(passage.chunk_index);
            } else if grouped.len() < self.config.max_citation_docs {
                grouped.push(Citation {
                    doc_id: passage.doc_id.clone(),
                    chunk_indices: vec![passage.chunk_index],
                });
            }
        }

        for citation in &mut grouped {
            citation.chunk_indices.sort_unstable();
            citation.chunk_indices.dedup();
            citation.chunk_indices.truncate(self.config.max_chunks_per_doc);
        }
        grouped
    }

    /// Saturating confidence for `evidence` passages
    ///
    /// ```text
    /// confidence(n) = round₂(min(max, 0.5 + 0.04 · min(n, saturation)))
    /// confidence(0) = 0
    /// ```
    pub fn confidence(&self, evidence: usize) -> f64 {
        if evidence == 0 {
            return 0.0;
        }
        let n = evidence.min(self.config.confidence_saturation) as f64;
        let raw = (0.5 + 0.04 * n).min(self.config.max_confidence);
        (raw * 100.0).round() / 100.0
    }

    /// Answer grounded in `evidence`, whichever path produced `text`
    pub fn compose(&self, text: String, evidence: &[Passage], meta: AnswerMeta) -> AnswerResult {
        AnswerResult {
            text,
            citations: self.citations(evidence),
            confidence: self.confidence(evidence.len()),
            grounded: !evidence.is_empty(),
            meta,
        }
    }

    /// Terminal result for a query that retrieved nothing
    pub fn empty(&self, language: Language, mut meta: AnswerMeta) -> AnswerResult {
        meta.k = 0;
        meta.evidence_k = 0;
        meta.status = AnswerStatus::Ok;
        AnswerResult {
            text: language.insufficient_evidence().to_string(),
            citations: Vec::new(),
            confidence: 0.0,
            grounded: false,
            meta,
        }
    }
}
