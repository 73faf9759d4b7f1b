// Search service contracts consumed by the retrieval engine
use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{Passage, SearchFilters};

/// Turns query text into an embedding vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Vector similarity search
///
/// Returns passages ordered by descending score, where
/// `score = 1 - cosine_distance`.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Passage>>;
}

/// Trigram / substring similarity search, scores within [0, 1]
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Passage>>;

    /// Ranked passages of a single document; chunk order when `query` is empty
    async fn search_document(
        &self,
        doc_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Passage>>;
}

/// Document metadata store used for fan-out candidate listing
#[async_trait]
pub trait DocumentCatalog: Send + Sync {
    async fn list_documents(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<String>>;
}
