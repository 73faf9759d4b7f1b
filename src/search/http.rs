//! HTTP client for a document search service
//!
//! One client backs all four retrieval contracts. Search services differ in
//! how they name hit fields and wrap result lists, so responses go through
//! alias-tolerant normalization before they become [`Passage`]s.

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{AskError, Result};
use crate::rag::retrieval::{DocumentCatalog, EmbeddingProvider, LexicalSearch, VectorSearch};
use crate::types::{Passage, SearchFilters};

pub const DOC_ID_KEYS: [&str; 5] = ["doc_id", "document_id", "doc", "id", "docId"];
pub const CHUNK_KEYS: [&str; 4] = ["chunk_index", "chunk", "index", "chunk_no"];
pub const TEXT_KEYS: [&str; 6] = ["text", "snippet", "passage", "content", "preview", "chunk_text"];
pub const SCORE_KEYS: [&str; 4] = ["score", "similarity", "cosine", "dense_score"];
pub const LIST_KEYS: [&str; 5] = ["passages", "results", "items", "hits", "data"];
pub const WRAPPER_KEYS: [&str; 3] = ["result", "payload", "response"];
pub const EMBEDDING_KEYS: [&str; 2] = ["embedding", "vector"];

/// Search service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub embed_path: String,
    pub semantic_path: String,
    pub lexical_path: String,
    pub documents_path: String,
    /// `{doc_id}` is replaced with the percent-encoded document id
    pub passages_path: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            timeout_secs: 30,
            embed_path: "/api/embed".to_string(),
            semantic_path: "/api/search/semantic".to_string(),
            lexical_path: "/api/search_text".to_string(),
            documents_path: "/api/docs".to_string(),
            passages_path: "/api/docs/{doc_id}/passages".to_string(),
        }
    }
}

/// First non-null value under any of `keys`
fn pick<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k).filter(|v| !v.is_null()))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Hit list from a bare array, a list key, or a list key under a wrapper
pub fn extract_hits(body: &Value) -> &[Value] {
    fn listed(object: &Value) -> Option<&[Value]> {
        LIST_KEYS.iter().find_map(|k| {
            object
                .get(*k)
                .and_then(Value::as_array)
                .filter(|a| !a.is_empty())
                .map(Vec::as_slice)
        })
    }

    match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => listed(body)
            .or_else(|| {
                WRAPPER_KEYS
                    .iter()
                    .filter_map(|k| body.get(*k))
                    .find_map(listed)
            })
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// One hit as a passage; hits without a document id are dropped
pub fn normalize_hit(hit: &Value) -> Option<Passage> {
    let doc_id = pick(hit, &DOC_ID_KEYS).and_then(as_text)?;
    let chunk_index = pick(hit, &CHUNK_KEYS)
        .and_then(as_number)
        .filter(|c| *c >= 0.0)
        .map_or(0, |c| c as u32);
    let text = pick(hit, &TEXT_KEYS).and_then(as_text).unwrap_or_default();
    let score = pick(hit, &SCORE_KEYS)
        .and_then(as_number)
        .filter(|s| s.is_finite())
        .unwrap_or(0.0);
    Some(Passage::new(doc_id, chunk_index, text, score))
}

pub fn normalize_hits(body: &Value) -> Vec<Passage> {
    extract_hits(body).iter().filter_map(normalize_hit).collect()
}

/// Embedding under `embedding`/`vector`, bare, or as `data[0].embedding`
pub fn extract_embedding(body: &Value) -> Option<Vec<f32>> {
    let array = match body {
        Value::Array(_) => Some(body),
        _ => pick(body, &EMBEDDING_KEYS).or_else(|| {
            body.get("data")
                .and_then(|d| d.get(0))
                .and_then(|first| pick(first, &EMBEDDING_KEYS))
        }),
    }?;
    array
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Search service client
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: Client,
    config: SearchConfig,
}

impl HttpSearchClient {
    pub fn new() -> Result<Self> {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(AskError::HttpError)?;

        Ok(Self {
            client,
            config: SearchConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Per-document endpoint; `doc_id` becomes one escaped path segment
    pub fn passages_url(&self, doc_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| AskError::ConfigError(format!("invalid search.base_url: {}", e)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AskError::ConfigError(format!(
                    "search.base_url cannot carry a path: {}",
                    self.config.base_url
                ))
            })?;
            segments.pop_if_empty();
            for part in self.config.passages_path.split('/').filter(|p| !p.is_empty()) {
                segments.push(&part.replace("{doc_id}", doc_id));
            }
        }
        Ok(url)
    }

    /// Filter pairs for query strings
    fn filter_params(filters: &SearchFilters) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(dept) = &filters.department {
            params.push(("dept", dept.clone()));
        }
        if let Some(lang) = &filters.language {
            params.push(("lang", lang.clone()));
        }
        params
    }

    /// Decode a JSON body, mapping failures to a search error for `backend`
    async fn read_json(backend: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(AskError::UnexpectedResponse {
                backend: backend.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|_| AskError::search(backend, "response body is not JSON"))
    }

    async fn get_json(&self, backend: &str, url: impl IntoUrl, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AskError::search(backend, transport_message(&e)))?;
        Self::read_json(backend, response).await
    }

    async fn post_json(&self, backend: &str, url: String, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AskError::search(backend, transport_message(&e)))?;
        Self::read_json(backend, response).await
    }

    /// Check whether the service answers at its base URL
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(&self.config.base_url).send().await {
            Ok(response) => Ok(!response.status().is_server_error()),
            Err(_) => Ok(false),
        }
    }
}

/// Transport failure description without URL or body
fn transport_message(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    }
}

#[async_trait]
impl EmbeddingProvider for HttpSearchClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = self
            .post_json("embedding", self.url(&self.config.embed_path), &json!({ "text": text }))
            .await?;
        extract_embedding(&body).ok_or_else(|| AskError::search("embedding", "no embedding in response"))
    }
}

#[async_trait]
impl VectorSearch for HttpSearchClient {
    async fn search(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        let body = json!({
            "embedding": embedding,
            "dept": filters.department,
            "lang": filters.language,
            "limit": limit,
        });
        let response = self
            .post_json("semantic", self.url(&self.config.semantic_path), &body)
            .await?;
        let mut hits = normalize_hits(&response);
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl LexicalSearch for HttpSearchClient {
    async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        let mut params = vec![("q", query.to_string()), ("limit", limit.to_string())];
        params.extend(Self::filter_params(filters));
        let response = self
            .get_json("lexical", self.url(&self.config.lexical_path), &params)
            .await?;
        let mut hits = normalize_hits(&response);
        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_document(
        &self,
        doc_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        let mut params = vec![("limit", limit.to_string())];
        if !query.trim().is_empty() {
            params.push(("q", query.to_string()));
        }
        let response = self
            .get_json("passages", self.passages_url(doc_id)?, &params)
            .await?;
        let mut hits: Vec<Passage> = extract_hits(&response)
            .iter()
            .filter_map(|hit| {
                // Per-document endpoints often omit the id on each row
                normalize_hit(hit).or_else(|| {
                    let mut patched = hit.clone();
                    patched.as_object_mut()?.insert("doc_id".into(), json!(doc_id));
                    normalize_hit(&patched)
                })
            })
            .collect();
        if query.trim().is_empty() {
            hits.sort_by_key(|p| p.chunk_index);
        }
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl DocumentCatalog for HttpSearchClient {
    async fn list_documents(&self, filters: &SearchFilters, limit: usize) -> Result<Vec<String>> {
        let mut params = vec![("limit", limit.to_string())];
        params.extend(Self::filter_params(filters));
        let response = self
            .get_json("catalog", self.url(&self.config.documents_path), &params)
            .await?;

        let mut ids: Vec<String> = Vec::new();
        for id in extract_hits(&response)
            .iter()
            .filter_map(|item| pick(item, &DOC_ID_KEYS).and_then(as_text))
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids.truncate(limit);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_list() {
        let body = json!([
            {"doc_id": "hr", "chunk_index": 2, "text": "Leave", "score": 0.8}
        ]);
        assert_eq!(normalize_hits(&body), vec![Passage::new("hr", 2, "Leave", 0.8)]);
    }

    #[test]
    fn test_key_aliases() {
        let body = json!({"hits": [
            {"document_id": "fin", "chunk": "3", "snippet": "Budget", "similarity": "0.5"},
            {"id": 42, "index": 1, "content": "Numeric id", "cosine": 0.25},
        ]});
        let hits = normalize_hits(&body);
        assert_eq!(hits[0], Passage::new("fin", 3, "Budget", 0.5));
        assert_eq!(hits[1], Passage::new("42", 1, "Numeric id", 0.25));
    }

    #[test]
    fn test_wrapped_list() {
        let body = json!({"payload": {"results": [{"doc": "ops", "preview": "p"}]}});
        let hits = normalize_hits(&body);
        assert_eq!(hits, vec![Passage::new("ops", 0, "p", 0.0)]);
    }

    #[test]
    fn test_empty_list_key_skipped() {
        let body = json!({"passages": [], "items": [{"doc_id": "a", "text": "t"}]});
        assert_eq!(normalize_hits(&body).len(), 1);
    }

    #[test]
    fn test_hits_without_doc_id_dropped() {
        let body = json!({"results": [{"text": "orphan"}, {"doc_id": "a"}]});
        let hits = normalize_hits(&body);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "a");
    }

    #[test]
    fn test_unrecognized_body() {
        assert!(normalize_hits(&json!({"status": "ok"})).is_empty());
        assert!(normalize_hits(&json!("text")).is_empty());
    }

    #[test]
    fn test_embedding_shapes() {
        assert_eq!(extract_embedding(&json!({"embedding": [0.5, 1.0]})), Some(vec![0.5, 1.0]));
        assert_eq!(extract_embedding(&json!([0.25])), Some(vec![0.25]));
        assert_eq!(
            extract_embedding(&json!({"data": [{"embedding": [1.0]}]})),
            Some(vec![1.0])
        );
        assert_eq!(extract_embedding(&json!({"embedding": ["x"]})), None);
        assert_eq!(extract_embedding(&json!({})), None);
    }

    #[test]
    fn test_passages_url_encodes_id() {
        let client = HttpSearchClient::with_config(SearchConfig {
            base_url: "http://search:9000/".to_string(),
            ..SearchConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.passages_url("HR policy/2024").unwrap().as_str(),
            "http://search:9000/api/docs/HR%20policy%2F2024/passages"
        );
        assert_eq!(
            client.passages_url("50%?v#2").unwrap().as_str(),
            "http://search:9000/api/docs/50%25%3Fv%232/passages"
        );
    }

    #[test]
    fn test_passages_url_keeps_base_path_and_template() {
        let client = HttpSearchClient::with_config(SearchConfig {
            base_url: "https://search.example/v2".to_string(),
            passages_path: "docs/{doc_id}.json".to_string(),
            ..SearchConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.passages_url("hr").unwrap().as_str(),
            "https://search.example/v2/docs/hr.json"
        );
    }

    #[test]
    fn test_passages_url_rejects_unusable_base() {
        for base in ["not a url", "mailto:search@example.com"] {
            let client = HttpSearchClient::with_config(SearchConfig {
                base_url: base.to_string(),
                ..SearchConfig::default()
            })
            .unwrap();
            assert!(matches!(
                client.passages_url("hr"),
                Err(AskError::ConfigError(_))
            ));
        }
    }
}
