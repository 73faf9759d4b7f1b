//! Shared data model for retrieval and answering

pub mod answer;
pub mod passage;

pub use answer::{
    AnswerMeta, AnswerResult, AnswerSource, AnswerStatus, Citation, EngineMode, GenerationParams,
    Language,
};
pub use passage::{preview_of, CandidateSource, FusedCandidate, Passage, PassageKey, SearchFilters};
