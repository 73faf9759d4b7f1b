// Hybrid retrieval engine: semantic + lexical pools, fused and deduplicated
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::rag::reranking::ReRanker;
use crate::rag::retrieval::fusion::{fuse, select_diverse, DEFAULT_ALPHA};
use crate::rag::retrieval::search::{EmbeddingProvider, LexicalSearch, VectorSearch};
use crate::types::{FusedCandidate, Passage, SearchFilters};

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Candidates requested from the vector index
    pub semantic_pool: usize,
    /// Candidates requested from the lexical index
    pub lexical_pool: usize,
    /// Weight of the semantic signal (0.0 to 1.0)
    pub alpha: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            semantic_pool: 24,
            lexical_pool: 24,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// Per-query counters, logged once per retrieval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalStats {
    pub semantic_hits: usize,
    pub lexical_hits: usize,
    pub merged: usize,
    pub kept: usize,
    pub reranked: usize,
    pub took_ms: u64,
}

/// Ranked candidates plus the counters that produced them
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub candidates: Vec<FusedCandidate>,
    pub stats: RetrievalStats,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Ranked candidates as passages scored by fused score
    pub fn into_passages(self) -> Vec<Passage> {
        self.candidates
            .into_iter()
            .map(FusedCandidate::into_passage)
            .collect()
    }
}

/// Retrieval engine for hybrid search
///
/// Never fails: a backend error empties that pool and is logged.
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorSearch>,
    lexical: Arc<dyn LexicalSearch>,
    reranker: ReRanker,
    params: SearchParams,
}

impl RetrievalEngine {
    /// Create new retrieval engine with default parameters and no reranking
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorSearch>,
        lexical: Arc<dyn LexicalSearch>,
    ) -> Self {
        Self {
            embedder,
            vectors,
            lexical,
            reranker: ReRanker::disabled(),
            params: SearchParams::default(),
        }
    }

    /// Create with custom default parameters
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_reranker(mut self, reranker: ReRanker) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    async fn semantic_pool(&self, query: &str, filters: &SearchFilters) -> Result<Vec<Passage>> {
        let embedding = self.embedder.embed(query).await?;
        self.vectors
            .search(&embedding, filters, self.params.semantic_pool)
            .await
    }

    /// Retrieve up to `n` fused, adjacency-deduplicated candidates
    pub async fn retrieve(&self, query: &str, filters: &SearchFilters, n: usize) -> Retrieval {
        let started = Instant::now();

        let (semantic, lexical) = tokio::join!(
            self.semantic_pool(query, filters),
            self.lexical
                .search(query, filters, self.params.lexical_pool)
        );

        let semantic = semantic.unwrap_or_else(|e| {
            warn!(error = %e, "semantic search failed; continuing with lexical pool");
            Vec::new()
        });
        let lexical = lexical.unwrap_or_else(|e| {
            warn!(error = %e, "lexical search failed; continuing with semantic pool");
            Vec::new()
        });

        // Without semantic hits the lexical pool stands alone, raw scores kept
        let fused: Vec<FusedCandidate> = if semantic.is_empty() {
            lexical.iter().map(FusedCandidate::fallback_from).collect()
        } else {
            fuse(&semantic, &lexical, self.params.alpha)
        };
        let kept = select_diverse(&fused, n);

        let (candidates, rerank) = self.reranker.rerank(query, kept).await;

        let stats = RetrievalStats {
            semantic_hits: semantic.len(),
            lexical_hits: lexical.len(),
            merged: fused.len(),
            kept: candidates.len(),
            reranked: rerank.used,
            took_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            semantic = stats.semantic_hits,
            lexical = stats.lexical_hits,
            merged = stats.merged,
            kept = stats.kept,
            reranked = stats.reranked,
            took_ms = stats.took_ms,
            alpha = self.params.alpha,
            "hybrid retrieval"
        );

        Retrieval { candidates, stats }
    }

    /// Convenience wrapper returning passages only
    pub async fn retrieve_passages(
        &self,
        query: &str,
        filters: &SearchFilters,
        n: usize,
    ) -> Vec<Passage> {
        self.retrieve(query, filters, n).await.into_passages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AskError;
    use crate::rag::reranking::{KeywordOverlapEncoder, ReRankConfig};
    use crate::types::CandidateSource;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2])
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AskError::search("embedder", "unreachable"))
        }
    }

    struct Pool(Vec<Passage>);

    #[async_trait]
    impl VectorSearch for Pool {
        async fn search(
            &self,
            _embedding: &[f32],
            _filters: &SearchFilters,
            limit: usize,
        ) -> Result<Vec<Passage>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    #[async_trait]
    impl LexicalSearch for Pool {
        async fn search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            limit: usize,
        ) -> Result<Vec<Passage>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }

        async fn search_document(
            &self,
            doc_id: &str,
            _query: &str,
            limit: usize,
        ) -> Result<Vec<Passage>> {
            Ok(self
                .0
                .iter()
                .filter(|p| p.doc_id == doc_id)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn engine(semantic: Vec<Passage>, lexical: Vec<Passage>) -> RetrievalEngine {
        RetrievalEngine::new(
            Arc::new(FixedEmbedder),
            Arc::new(Pool(semantic)),
            Arc::new(Pool(lexical)),
        )
    }

    #[test]
    fn test_search_params_default() {
        let params = SearchParams::default();
        assert_eq!(params.semantic_pool, 24);
        assert_eq!(params.lexical_pool, 24);
        assert_eq!(params.alpha, DEFAULT_ALPHA);
    }

    #[tokio::test]
    async fn test_retrieve_fuses_both_pools() {
        let engine = engine(
            vec![
                Passage::new("hr", 0, "leave policy", 0.9),
                Passage::new("hr", 5, "payroll", 0.4),
            ],
            vec![Passage::new("hr", 0, "leave policy", 0.7)],
        );

        let result = engine.retrieve("leave", &SearchFilters::default(), 5).await;
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.candidates[0].source, CandidateSource::Hybrid);
        assert_eq!(result.stats.semantic_hits, 2);
        assert_eq!(result.stats.lexical_hits, 1);
    }

    #[tokio::test]
    async fn test_retrieve_empty_pools_is_empty() {
        let engine = engine(vec![], vec![]);
        let result = engine.retrieve("anything", &SearchFilters::default(), 5).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_failure_keeps_lexical() {
        let engine = RetrievalEngine::new(
            Arc::new(BrokenEmbedder),
            Arc::new(Pool(vec![Passage::new("a", 0, "x", 0.9)])),
            Arc::new(Pool(vec![Passage::new("b", 1, "y", 0.5)])),
        );
        let passages = engine
            .retrieve_passages("q", &SearchFilters::default(), 3)
            .await;
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].doc_id, "b");
    }

    #[tokio::test]
    async fn test_unusable_semantic_pool_marks_fallback() {
        let lexical = vec![
            Passage::new("b", 1, "carry-over rules", 0.8),
            Passage::new("b", 2, "carry-over limits", 0.6),
            Passage::new("c", 7, "leave encashment", 0.4),
        ];

        let broken = RetrievalEngine::new(
            Arc::new(BrokenEmbedder),
            Arc::new(Pool(vec![Passage::new("a", 0, "x", 0.9)])),
            Arc::new(Pool(lexical.clone())),
        );
        let result = broken.retrieve("carry-over", &SearchFilters::default(), 2).await;
        assert_eq!(result.stats.semantic_hits, 0);
        assert_eq!(result.candidates.len(), 2);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.source == CandidateSource::Fallback));
        // b#2 sits next to b#1
        assert_eq!(result.candidates[1].doc_id, "c");
        assert_eq!(result.candidates[0].fused_score, 0.8);

        let empty = engine(vec![], lexical);
        let result = empty.retrieve("carry-over", &SearchFilters::default(), 5).await;
        assert_eq!(result.candidates.len(), 3);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.source == CandidateSource::Fallback));
    }

    #[tokio::test]
    async fn test_retrieve_applies_reranker() {
        let engine = engine(
            vec![
                Passage::new("a", 0, "unrelated words", 0.9),
                Passage::new("b", 0, "gratuity eligibility rules", 0.8),
            ],
            vec![],
        )
        .with_reranker(ReRanker::with_encoder(
            Arc::new(KeywordOverlapEncoder),
            ReRankConfig {
                enabled: true,
                top_m: 5,
            },
        ));

        let result = engine
            .retrieve("gratuity eligibility", &SearchFilters::default(), 2)
            .await;
        assert_eq!(result.candidates[0].doc_id, "b");
        assert_eq!(result.stats.reranked, 2);
    }

    #[tokio::test]
    async fn test_retrieve_zero_requested() {
        let engine = engine(vec![Passage::new("a", 0, "x", 0.9)], vec![]);
        let result = engine.retrieve("q", &SearchFilters::default(), 0).await;
        assert!(result.is_empty());
    }
}
