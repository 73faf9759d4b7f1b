// Document-scoped and global fan-out retrieval
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::rag::retrieval::search::{DocumentCatalog, LexicalSearch};
use crate::types::{Passage, SearchFilters};

/// Fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    /// Candidate documents scanned per global query
    pub max_docs: usize,
    /// Passages taken from each document
    pub take_per_doc: usize,
    /// Concurrent per-document searches
    pub parallelism: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_docs: 60,
            take_per_doc: 3,
            parallelism: 8,
        }
    }
}

/// Probe depth for a per-document search returning `k` passages
pub fn probe_size(k: usize) -> usize {
    (k * 5).max(10)
}

/// Global order: score desc, then doc_id asc, then chunk_index asc
pub fn global_order(a: &Passage, b: &Passage) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
        .then_with(|| a.chunk_index.cmp(&b.chunk_index))
}

/// Retrieves across many documents with bounded concurrency
pub struct FanOutRetriever {
    catalog: Arc<dyn DocumentCatalog>,
    lexical: Arc<dyn LexicalSearch>,
    config: FanOutConfig,
}

impl FanOutRetriever {
    pub fn new(catalog: Arc<dyn DocumentCatalog>, lexical: Arc<dyn LexicalSearch>) -> Self {
        Self::with_config(catalog, lexical, FanOutConfig::default())
    }

    pub fn with_config(
        catalog: Arc<dyn DocumentCatalog>,
        lexical: Arc<dyn LexicalSearch>,
        config: FanOutConfig,
    ) -> Self {
        Self {
            catalog,
            lexical,
            config,
        }
    }

    pub fn config(&self) -> &FanOutConfig {
        &self.config
    }

    /// Top passages of a single document, at most `min(5, k)`
    pub async fn retrieve_document(&self, doc_id: &str, query: &str, k: usize) -> Result<Vec<Passage>> {
        let mut rows = self
            .lexical
            .search_document(doc_id, query, probe_size(k))
            .await?;
        rows.truncate(k.min(5));
        Ok(rows)
    }

    /// Merge the best passages of every candidate document into one pool
    ///
    /// Individual document failures are skipped; only a catalog failure is
    /// returned as an error.
    pub async fn retrieve_global(
        &self,
        query: &str,
        filters: &SearchFilters,
        k: usize,
    ) -> Result<Vec<Passage>> {
        let doc_ids = self
            .catalog
            .list_documents(filters, self.config.max_docs)
            .await?;

        let per_doc = self.config.take_per_doc.min(k).max(1);
        let probe = probe_size(k);
        let permits = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        let tasks = doc_ids.iter().take(self.config.max_docs).map(|doc_id| {
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits.acquire().await.ok()?;
                match self.lexical.search_document(doc_id, query, probe).await {
                    Ok(mut rows) => {
                        rows.truncate(per_doc);
                        Some(rows)
                    }
                    Err(e) => {
                        warn!(doc_id = %doc_id, error = %e, "per-document search failed; skipping");
                        None
                    }
                }
            }
        });

        let mut merged: Vec<Passage> = futures_util::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .flatten()
            .collect();
        merged.sort_by(global_order);

        debug!(docs = doc_ids.len(), rows = merged.len(), "global fan-out");
        Ok(merged)
    }
}
