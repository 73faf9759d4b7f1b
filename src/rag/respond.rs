// Generate-or-fallback step shared by question answering and summaries
use std::time::Duration;
use tracing::{info, warn};

use crate::answer::{AnswerComposer, FallbackComposer, OutputSanitizer, TextOrigin};
use crate::errors::Result;
use crate::gateway::{FailureReason, InvokeFailure, LlmInvoker};
use crate::rag::context::AssembledPrompt;
use crate::types::{
    AnswerMeta, AnswerResult, AnswerSource, AnswerStatus, EngineMode, GenerationParams, Language,
    Passage,
};

/// Everything needed to answer from an already-selected evidence set
#[derive(Debug, Clone, Copy)]
pub struct Draft<'a> {
    pub prompt: &'a AssembledPrompt,
    pub evidence: &'a [Passage],
    pub language: Language,
    pub mode: EngineMode,
    pub params: GenerationParams,
    pub timeout: Duration,
}

/// Runs the gateway, and the local composer whenever the gateway cannot help
///
/// Terminal states: remote text (source llm) or extractive bullets
/// (source local). Nothing in here returns an error.
#[derive(Clone)]
pub struct Responder {
    invoker: LlmInvoker,
    fallback: FallbackComposer,
    sanitizer: OutputSanitizer,
    composer: AnswerComposer,
}

impl Responder {
    pub fn new(invoker: LlmInvoker) -> Result<Self> {
        Ok(Self {
            invoker,
            fallback: FallbackComposer::new(),
            sanitizer: OutputSanitizer::new()?,
            composer: AnswerComposer::new(),
        })
    }

    pub fn with_fallback(mut self, fallback: FallbackComposer) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_composer(mut self, composer: AnswerComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn invoker(&self) -> &LlmInvoker {
        &self.invoker
    }

    pub fn composer(&self) -> &AnswerComposer {
        &self.composer
    }

    /// Extractive answer over `evidence`, sanitized as local text
    pub fn local_text(&self, evidence: &[Passage], language: Language) -> String {
        let raw = self.fallback.compose(evidence, language);
        let cleaned = self.sanitizer.sanitize(&raw, TextOrigin::Local);
        if !cleaned.chars().any(char::is_alphanumeric) {
            language.no_answer().to_string()
        } else {
            cleaned
        }
    }

    /// Produce the final result for `draft`, filling generation fields of `meta`
    pub async fn respond(&self, draft: Draft<'_>, mut meta: AnswerMeta) -> AnswerResult {
        meta.prompt_bytes = draft.prompt.bytes;
        meta.evidence_k = draft.evidence.len();

        if !draft.mode.uses_remote() {
            meta.source = AnswerSource::Local;
            meta.status = AnswerStatus::Ok;
            let text = self.local_text(draft.evidence, draft.language);
            return self.composer.compose(text, draft.evidence, meta);
        }

        let outcome = self
            .invoker
            .invoke(&draft.prompt.text, draft.language, draft.params, draft.timeout)
            .await
            .and_then(|generation| {
                let text = self.sanitizer.sanitize(&generation.text, TextOrigin::Remote);
                if text.is_empty() {
                    // Only scaffolding came back
                    Err(InvokeFailure {
                        reason: FailureReason::EmptyOutput,
                        attempts: generation.attempts,
                        elapsed_ms: generation.elapsed_ms,
                    })
                } else {
                    Ok((text, generation))
                }
            });

        match outcome {
            Ok((text, generation)) => {
                meta.source = AnswerSource::Llm;
                meta.status = AnswerStatus::Ok;
                meta.used_tokens = generation.used_tokens;
                meta.llm_elapsed_ms = Some(generation.elapsed_ms);
                meta.attempts = generation.attempts as usize;
                meta.prompt_bytes = generation.prompt_bytes;
                self.composer.compose(text, draft.evidence, meta)
            }
            Err(failure) => {
                warn!(reason = %failure.reason, "answering from local evidence");
                meta.source = AnswerSource::Local;
                meta.status = AnswerStatus::Fallback;
                meta.llm_elapsed_ms = Some(failure.elapsed_ms);
                meta.attempts = failure.attempts as usize;
                meta.failure = Some(failure.reason.to_string());
                let text = self.local_text(draft.evidence, draft.language);
                self.composer.compose(text, draft.evidence, meta)
            }
        }
    }
}

/// One structured line per answered request
pub(crate) fn log_answer(kind: &'static str, result: &AnswerResult) {
    let meta = &result.meta;
    info!(
        kind,
        source = meta.source.as_str(),
        status = meta.status.as_str(),
        took_ms = meta.took_ms,
        k = meta.k,
        evidence_k = meta.evidence_k,
        prompt_bytes = meta.prompt_bytes,
        attempts = meta.attempts,
        used_tokens = meta.used_tokens,
        failure = meta.failure.as_deref(),
        "answered"
    );
}
