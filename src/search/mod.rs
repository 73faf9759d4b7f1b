//! Search service adapters

pub mod http;

pub use http::{extract_hits, normalize_hit, normalize_hits, HttpSearchClient, SearchConfig};
