// Cross-encoder reranking of the kept candidate prefix
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::errors::{AskError, Result};
use crate::types::FusedCandidate;

/// Scores `(query, text)` pairs; higher is more relevant
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Must return exactly one score per text
    async fn score(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>>;
}

/// Re-ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReRankConfig {
    /// Enable/disable reranking
    pub enabled: bool,
    /// Number of leading candidates to rescore
    pub top_m: usize,
}

impl Default for ReRankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_m: 10,
        }
    }
}

/// Outcome of a rerank pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReRankStats {
    /// Candidates rescored (0 when skipped)
    pub used: usize,
    pub took_ms: u64,
}

/// Fail-open reranker
///
/// Any failure to run the encoder (missing, erroring, wrong output length)
/// leaves the ordering untouched.
pub struct ReRanker {
    encoder: Option<Arc<dyn CrossEncoder>>,
    config: ReRankConfig,
}

impl ReRanker {
    /// Reranker that never reorders
    pub fn disabled() -> Self {
        Self {
            encoder: None,
            config: ReRankConfig::default(),
        }
    }

    /// Create with an encoder and configuration
    pub fn with_encoder(encoder: Arc<dyn CrossEncoder>, config: ReRankConfig) -> Self {
        Self {
            encoder: Some(encoder),
            config,
        }
    }

    pub fn config(&self) -> &ReRankConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled && self.config.top_m > 0 && self.encoder.is_some()
    }

    /// Reorder the first `top_m` candidates by cross-encoder score
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<FusedCandidate>,
    ) -> (Vec<FusedCandidate>, ReRankStats) {
        let encoder = match (&self.encoder, self.is_active() && !candidates.is_empty()) {
            (Some(encoder), true) => encoder,
            _ => return (candidates, ReRankStats::default()),
        };

        let m = self.config.top_m.min(candidates.len());
        let started = Instant::now();

        let scores = {
            let texts: Vec<&str> = candidates[..m].iter().map(|c| c.text.as_str()).collect();
            encoder.score(query, &texts).await.and_then(|scores| {
                if scores.len() == m {
                    Ok(scores)
                } else {
                    Err(AskError::RerankError(format!(
                        "expected {} scores, got {}",
                        m,
                        scores.len()
                    )))
                }
            })
        };

        let scores = match scores {
            Ok(scores) => scores,
            Err(e) => {
                warn!(error = %e, "reranker unavailable; keeping fused order");
                return (candidates, ReRankStats::default());
            }
        };

        let mut rest = candidates;
        let tail = rest.split_off(m);
        let mut head: Vec<(FusedCandidate, f32)> = rest.into_iter().zip(scores).collect();
        head.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut ordered: Vec<FusedCandidate> = head
            .into_iter()
            .map(|(mut c, s)| {
                c.rerank_score = Some(s as f64);
                c
            })
            .collect();
        ordered.extend(tail);

        let stats = ReRankStats {
            used: m,
            took_ms: started.elapsed().as_millis() as u64,
        };
        debug!(used = stats.used, took_ms = stats.took_ms, "reranked prefix");
        (ordered, stats)
    }
}

impl Default for ReRanker {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Network-free encoder scoring query term coverage
///
/// Fraction of query words longer than 3 characters found in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordOverlapEncoder;

impl KeywordOverlapEncoder {
    fn coverage(query_words: &[String], text: &str) -> f32 {
        if query_words.is_empty() {
            return 0.0;
        }
        let content = text.to_lowercase();
        let matches = query_words
            .iter()
            .filter(|word| content.contains(word.as_str()))
            .count();
        matches as f32 / query_words.len() as f32
    }
}

#[async_trait]
impl CrossEncoder for KeywordOverlapEncoder {
    async fn score(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>> {
        let words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(String::from)
            .collect();
        Ok(texts.iter().map(|t| Self::coverage(&words, t)).collect())
    }
}
