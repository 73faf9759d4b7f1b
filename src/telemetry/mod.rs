//! Telemetry for groundask
//!
//! Provides tracing setup and per-process answer counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::time::Instant;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::types::{AnswerResult, AnswerSource, AnswerStatus};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "GROUNDASK_LOG";

static INIT: Once = Once::new();

/// Install the fmt subscriber, filtered by `GROUNDASK_LOG`
///
/// Falls back to `groundask=info`. Logs go to stderr so stdout stays
/// machine-readable. Calling this more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("groundask=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .init();
    });
}

/// Answer counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerStats {
    pub answered: u64,
    pub remote: u64,
    pub local: u64,
    pub fallbacks: u64,
    /// Answers with no evidence at all
    pub ungrounded: u64,
    pub gateway_attempts: u64,
}

impl AnswerStats {
    /// Share of remote-eligible answers that ended in the fallback
    pub fn fallback_rate(&self) -> f64 {
        let eligible = self.remote + self.fallbacks;
        if eligible == 0 {
            0.0
        } else {
            self.fallbacks as f64 / eligible as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    answered: AtomicU64,
    remote: AtomicU64,
    local: AtomicU64,
    fallbacks: AtomicU64,
    ungrounded: AtomicU64,
    gateway_attempts: AtomicU64,
}

/// Shared answer counters
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    counters: Arc<Counters>,
    start_time: Instant,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    /// Count one finished answer
    pub fn record(&self, result: &AnswerResult) {
        let c = &self.counters;
        c.answered.fetch_add(1, Ordering::Relaxed);
        match (result.meta.source, result.meta.status) {
            (AnswerSource::Llm, _) => c.remote.fetch_add(1, Ordering::Relaxed),
            (AnswerSource::Local, AnswerStatus::Fallback) => c.fallbacks.fetch_add(1, Ordering::Relaxed),
            (AnswerSource::Local, AnswerStatus::Ok) => c.local.fetch_add(1, Ordering::Relaxed),
        };
        if !result.grounded {
            c.ungrounded.fetch_add(1, Ordering::Relaxed);
        }
        c.gateway_attempts
            .fetch_add(result.meta.attempts as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AnswerStats {
        let c = &self.counters;
        AnswerStats {
            answered: c.answered.load(Ordering::Relaxed),
            remote: c.remote.load(Ordering::Relaxed),
            local: c.local.load(Ordering::Relaxed),
            fallbacks: c.fallbacks.load(Ordering::Relaxed),
            ungrounded: c.ungrounded.load(Ordering::Relaxed),
            gateway_attempts: c.gateway_attempts.load(Ordering::Relaxed),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
