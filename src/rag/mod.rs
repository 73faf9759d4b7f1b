// Grounded answering over retrieved evidence
//
// Components:
// - Retrieval: hybrid fusion, adjacency dedup, fan-out
// - Re-ranking: optional fail-open cross-encoder pass
// - Context: evidence budgeting and prompt assembly
// - Respond: generate-or-fallback step
// - Pipeline / Summarize: end-to-end question answering and summaries

pub mod context;
pub mod pipeline;
pub mod reranking;
pub mod respond;
pub mod retrieval;
pub mod summarize;

pub use context::{AnswerHint, AnswerStyle, AssembledPrompt, EvidenceBudgeter, EvidenceSet, PromptConfig};
pub use pipeline::{AskPipeline, AskRequest, RetrievalScope, MAX_TOPK};
pub use reranking::ReRanker;
pub use respond::{Draft, Responder};
pub use retrieval::RetrievalEngine;
pub use summarize::{SummaryConfig, SummaryStyle, Summarizer};
