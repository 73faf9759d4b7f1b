// Optional cross-encoder reranking
pub mod scorer;

pub use scorer::{CrossEncoder, KeywordOverlapEncoder, ReRankConfig, ReRankStats, ReRanker};
