//! Shrink-and-retry invocation of the generation gateway
//!
//! Bounded retry with a fixed, descending schedule of byte caps:
//! - Only context-overflow rejections (HTTP 400) are retried
//! - Every other failure ends the loop immediately
//! - Worst-case latency: |factors| × per-attempt timeout
//!
//! # Mathematical Specification
//!
//! ```text
//! For factor fᵢ in F = [1.0, 0.7, 0.5, 0.35, 0.25]:
//!   capᵢ  = min(max_bytes, max(floor_bytes, ⌊max_bytes · fᵢ⌋))
//!   tailᵢ = max(min_tail, min(tail_bytes, ⌊capᵢ · tail_ratio⌋))
//!   sendᵢ = cap_keep_tail(original, capᵢ, tailᵢ)
//!
//! outcome(sendᵢ):
//!   transport error / timeout        → FAIL
//!   400 ∧ overflow(body) ∧ i < |F|-1 → next factor
//!   400 ∧ overflow(body) ∧ i = |F|-1 → FAIL(context_too_large)
//!   other non-2xx                    → FAIL(http_status)
//!   2xx ∧ text ≠ ""                  → SUCCESS
//!   2xx ∧ text = ""                  → FAIL(empty_output)
//! ```
//!
//! Every attempt re-truncates the original prompt, never the previous
//! attempt's payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::context::compressor::cap_keep_tail;
use crate::gateway::client::{GenerationGateway, GenerationRequest, TransportKind};
use crate::gateway::parser::{parse_response, ParseOutcome};
use crate::types::{GenerationParams, Language};

/// Lower-cased body fragments that identify a context-overflow rejection
pub const CONTEXT_OVERFLOW_PHRASES: [&str; 5] = [
    "context size",
    "max context",
    "exceeds the available context",
    "token limit",
    "too many tokens",
];

/// Default shrink schedule
pub const DEFAULT_SHRINK_FACTORS: [f64; 5] = [1.0, 0.7, 0.5, 0.35, 0.25];

/// Byte-cap schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkConfig {
    /// Cap at factor 1.0
    pub max_bytes: usize,
    /// Tail preserved verbatim at factor 1.0
    pub tail_bytes: usize,
    /// No shrunk cap goes below this
    pub floor_bytes: usize,
    /// No shrunk tail goes below this
    pub min_tail_bytes: usize,
    /// Tail share of a shrunk cap
    pub tail_ratio: f64,
    /// Descending factors in (0, 1]
    pub factors: Vec<f64>,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_bytes: 12_000,
            tail_bytes: 2_200,
            floor_bytes: 1_500,
            min_tail_bytes: 600,
            tail_ratio: 0.35,
            factors: DEFAULT_SHRINK_FACTORS.to_vec(),
        }
    }
}

/// Byte budget for one attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkAttempt {
    pub factor: f64,
    pub byte_cap: usize,
    pub tail_bytes: usize,
}

impl ShrinkConfig {
    /// Attempt budgets in schedule order
    pub fn schedule(&self) -> Vec<ShrinkAttempt> {
        self.factors
            .iter()
            .map(|&factor| {
                let byte_cap = if factor >= 1.0 {
                    self.max_bytes
                } else {
                    ((self.max_bytes as f64 * factor) as usize)
                        .max(self.floor_bytes)
                        .min(self.max_bytes)
                };
                let tail_bytes = if factor >= 1.0 {
                    self.tail_bytes
                } else {
                    self.tail_bytes
                        .min((byte_cap as f64 * self.tail_ratio) as usize)
                        .max(self.min_tail_bytes)
                };
                ShrinkAttempt {
                    factor,
                    byte_cap,
                    tail_bytes,
                }
            })
            .collect()
    }
}

/// Why an invocation produced no usable text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Per-attempt deadline elapsed
    Timeout,
    /// Network-level failure
    Transport(TransportKind),
    /// Non-2xx status that is not a context overflow
    HttpStatus(u16),
    /// Every factor was rejected as too large
    ContextTooLarge,
    /// 2xx with blank text
    EmptyOutput,
    /// 2xx with a body of unknown layout
    Unparsed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => f.write_str("timeout"),
            FailureReason::Transport(kind) => write!(f, "transport_error:{}", kind),
            FailureReason::HttpStatus(code) => write!(f, "http_status:{}", code),
            FailureReason::ContextTooLarge => f.write_str("context_too_large"),
            FailureReason::EmptyOutput => f.write_str("empty_output"),
            FailureReason::Unparsed => f.write_str("unparsed_response"),
        }
    }
}

/// Failed invocation; display text is safe to surface in diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeFailure {
    pub reason: FailureReason,
    /// Requests actually sent
    pub attempts: u32,
    pub elapsed_ms: u64,
}

impl fmt::Display for InvokeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} attempt(s)", self.reason, self.attempts)
    }
}

impl std::error::Error for InvokeFailure {}

/// Successful invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub used_tokens: Option<u64>,
    pub attempts: u32,
    /// Bytes of the payload that succeeded
    pub prompt_bytes: usize,
    /// Shrink factor that succeeded
    pub factor: f64,
    pub elapsed_ms: u64,
}

/// Is a rejection body a context-overflow error
pub fn is_context_overflow(body: &str) -> bool {
    let lower = body.to_lowercase();
    CONTEXT_OVERFLOW_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

enum Step {
    Done(Generation),
    Retry,
    Fail(FailureReason),
}

/// Drives a gateway through the shrink schedule
#[derive(Clone)]
pub struct LlmInvoker {
    gateway: Arc<dyn GenerationGateway>,
    config: ShrinkConfig,
}

impl LlmInvoker {
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        Self::with_config(gateway, ShrinkConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn GenerationGateway>, config: ShrinkConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &ShrinkConfig {
        &self.config
    }

    /// Generate text for `prompt`, shrinking on context overflow
    pub async fn invoke(
        &self,
        prompt: &str,
        language: Language,
        params: GenerationParams,
        timeout: Duration,
    ) -> Result<Generation, InvokeFailure> {
        let started = Instant::now();
        let schedule = self.config.schedule();
        let mut attempts = 0u32;
        let mut last_sent: Option<usize> = None;

        for (i, attempt) in schedule.iter().enumerate() {
            let payload = cap_keep_tail(prompt, attempt.byte_cap, attempt.tail_bytes);

            // A cap that no longer shrinks the payload would resend it as-is
            if last_sent.map_or(false, |prev| payload.len() >= prev) {
                continue;
            }
            last_sent = Some(payload.len());
            attempts += 1;

            debug!(
                attempt = attempts,
                factor = attempt.factor,
                byte_cap = attempt.byte_cap,
                tail_bytes = attempt.tail_bytes,
                sent_bytes = payload.len(),
                "gateway attempt"
            );

            let is_last = i + 1 == schedule.len();
            let request = GenerationRequest {
                prompt: payload,
                language,
                params,
                timeout,
            };

            match self.attempt(&request, attempt.factor, is_last).await {
                Step::Done(mut generation) => {
                    generation.attempts = attempts;
                    generation.elapsed_ms = started.elapsed().as_millis() as u64;
                    debug!(
                        attempts,
                        factor = generation.factor,
                        used_tokens = generation.used_tokens,
                        elapsed_ms = generation.elapsed_ms,
                        "gateway success"
                    );
                    return Ok(generation);
                }
                Step::Retry => continue,
                Step::Fail(reason) => return Err(self.fail(reason, attempts, started)),
            }
        }

        Err(self.fail(FailureReason::ContextTooLarge, attempts, started))
    }

    async fn attempt(&self, request: &GenerationRequest, factor: f64, is_last: bool) -> Step {
        let response = match tokio::time::timeout(request.timeout, self.gateway.send(request)).await {
            Err(_) => return Step::Fail(FailureReason::Timeout),
            Ok(Err(TransportKind::Timeout)) => return Step::Fail(FailureReason::Timeout),
            Ok(Err(kind)) => return Step::Fail(FailureReason::Transport(kind)),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            if response.status == 400 && is_context_overflow(&response.body) {
                return if is_last {
                    Step::Fail(FailureReason::ContextTooLarge)
                } else {
                    debug!(factor, "context overflow; shrinking");
                    Step::Retry
                };
            }
            return Step::Fail(FailureReason::HttpStatus(response.status));
        }

        match parse_response(&response.body, response.total_tokens_header) {
            ParseOutcome::Parsed { text, .. } if text.trim().is_empty() => {
                Step::Fail(FailureReason::EmptyOutput)
            }
            ParseOutcome::Parsed { text, usage } => Step::Done(Generation {
                text,
                used_tokens: usage,
                attempts: 0,
                prompt_bytes: request.prompt.len(),
                factor,
                elapsed_ms: 0,
            }),
            ParseOutcome::Unparsed => Step::Fail(FailureReason::Unparsed),
        }
    }

    fn fail(&self, reason: FailureReason, attempts: u32, started: Instant) -> InvokeFailure {
        let failure = InvokeFailure {
            reason,
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        warn!(reason = %failure.reason, attempts, elapsed_ms = failure.elapsed_ms, "gateway invocation failed");
        failure
    }
}
