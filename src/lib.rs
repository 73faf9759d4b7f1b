//! GroundAsk - evidence-grounded question answering
//!
//! Answers questions over a document corpus from retrieved passages.
//!
//! # Architecture
//!
//! - **Retrieval**: semantic + lexical pools fused, deduplicated and diversified
//! - **Evidence**: byte-budgeted prompt assembly with UTF-8 safe cuts
//! - **Generation**: remote gateway with shrink-and-retry, extractive local fallback
//! - **Surfaces**: CLI, chat channel and document summaries

pub mod answer;
pub mod bootstrap;
pub mod channel;
pub mod cli;
pub mod config;
pub mod context;
pub mod doctor;
pub mod errors;
pub mod gateway;
pub mod rag;
pub mod search;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use errors::{AskError, Result};
