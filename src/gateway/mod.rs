//! Remote text-generation gateway
//!
//! Provides:
//! - HTTP client with prompt and chat payload styles
//! - Ordered response-layout parsers
//! - Shrink-and-retry invoker with typed failure reasons

pub mod client;
pub mod invoker;
pub mod parser;

pub use client::{
    GatewayConfig, GatewayResponse, GenerationGateway, GenerationRequest, HttpGateway,
    PayloadStyle, TransportKind,
};
pub use invoker::{
    is_context_overflow, FailureReason, Generation, InvokeFailure, LlmInvoker, ShrinkAttempt,
    ShrinkConfig,
};
pub use parser::{parse_response, ParseOutcome, ResponseShape};
