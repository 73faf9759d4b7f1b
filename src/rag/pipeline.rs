// End-to-end grounded question answering
//
// RETRIEVE → (nothing) → EMPTY_ANSWER
// RETRIEVE → BUDGET → BUILD_PROMPT → INVOKE → SANITIZE → RESPOND
//                                          ↘ FALLBACK ↗
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::rag::context::{AnswerHint, EvidenceBudgeter};
use crate::rag::respond::{log_answer, Draft, Responder};
use crate::rag::retrieval::{FanOutRetriever, RetrievalEngine};
use crate::telemetry::TelemetryCollector;
use crate::types::{
    AnswerMeta, AnswerResult, AnswerStatus, EngineMode, GenerationParams, Language, Passage,
    SearchFilters,
};

/// Upper bound on retrieved passages per query
pub const MAX_TOPK: usize = 50;

/// Where candidate passages come from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "doc_id")]
pub enum RetrievalScope {
    /// Fused semantic + lexical search over the corpus
    #[default]
    Hybrid,
    /// Best passages of one document
    Document(String),
    /// Per-document search across many candidate documents
    FanOut,
}

/// One question and its knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Detected from the question when absent
    pub language: Option<Language>,
    pub department: Option<String>,
    /// Restrict retrieval to documents in this language
    pub corpus_language: Option<String>,
    pub scope: RetrievalScope,
    pub topk: usize,
    pub evidence_k: usize,
    pub percent_cap: u8,
    pub mode: EngineMode,
    pub params: GenerationParams,
    pub timeout_ms: u64,
    pub hint: Option<AnswerHint>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            language: None,
            department: None,
            corpus_language: None,
            scope: RetrievalScope::Hybrid,
            topk: 8,
            evidence_k: 5,
            percent_cap: 100,
            mode: EngineMode::Auto,
            params: GenerationParams::default(),
            timeout_ms: 60_000,
            hint: None,
        }
    }

    /// Force every knob into its valid range
    ///
    /// ```text
    /// topk        ∈ [1, 50]
    /// evidence_k  ∈ [1, topk]
    /// percent_cap ∈ [10, 100]
    /// ```
    pub fn clamped(mut self) -> Self {
        self.topk = self.topk.clamp(1, MAX_TOPK);
        self.evidence_k = self.evidence_k.clamp(1, self.topk);
        self.percent_cap = self.percent_cap.clamp(10, 100);
        self
    }

    /// Explicit language, else detected from the question
    pub fn resolved_language(&self) -> Language {
        self.language
            .unwrap_or_else(|| Language::detect(&self.question))
    }

    pub fn filters(&self) -> SearchFilters {
        SearchFilters::new(self.department.clone(), self.corpus_language.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Grounded QA pipeline
pub struct AskPipeline {
    engine: RetrievalEngine,
    fanout: Option<FanOutRetriever>,
    budgeter: EvidenceBudgeter,
    responder: Responder,
    telemetry: TelemetryCollector,
}

impl AskPipeline {
    pub fn new(engine: RetrievalEngine, responder: Responder) -> Self {
        Self {
            engine,
            fanout: None,
            budgeter: EvidenceBudgeter::new(),
            responder,
            telemetry: TelemetryCollector::new(),
        }
    }

    pub fn with_fanout(mut self, fanout: FanOutRetriever) -> Self {
        self.fanout = Some(fanout);
        self
    }

    pub fn with_budgeter(mut self, budgeter: EvidenceBudgeter) -> Self {
        self.budgeter = budgeter;
        self
    }

    /// Share counters with other components
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn budgeter(&self) -> &EvidenceBudgeter {
        &self.budgeter
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    async fn retrieve(&self, request: &AskRequest) -> Vec<Passage> {
        let filters = request.filters();
        let scoped = match (&request.scope, &self.fanout) {
            (RetrievalScope::Hybrid, _) => None,
            (RetrievalScope::Document(doc_id), Some(fanout)) => Some(
                fanout
                    .retrieve_document(doc_id, &request.question, request.topk)
                    .await,
            ),
            (RetrievalScope::FanOut, Some(fanout)) => Some(
                fanout
                    .retrieve_global(&request.question, &filters, request.topk)
                    .await,
            ),
            (scope, None) => {
                warn!(?scope, "fan-out retrieval not configured; using hybrid search");
                None
            }
        };

        match scoped {
            None => {
                self.engine
                    .retrieve_passages(&request.question, &filters, request.topk)
                    .await
            }
            Some(Ok(passages)) => passages,
            Some(Err(e)) => {
                warn!(error = %e, "scoped retrieval failed");
                Vec::new()
            }
        }
    }

    /// Answer one question; never fails
    pub async fn answer(&self, request: AskRequest) -> AnswerResult {
        let started = Instant::now();
        let request = request.clamped();
        let language = request.resolved_language();

        let mut meta = AnswerMeta::local(AnswerStatus::Ok);
        meta.percent_cap = request.percent_cap;
        meta.max_tokens = request.params.max_tokens;
        meta.timeout_ms = request.timeout_ms;
        meta.prompt_max_bytes = self.budgeter.config().max_bytes;

        let ranked = self.retrieve(&request).await;
        meta.k = ranked.len();

        let evidence = self
            .budgeter
            .select(&ranked, request.evidence_k, request.percent_cap);
        debug!(
            k = ranked.len(),
            evidence_k = evidence.len(),
            chars = evidence.chars,
            "evidence selected"
        );

        let mut result = if evidence.is_empty() {
            self.responder.composer().empty(language, meta)
        } else {
            let prompt = self.budgeter.render(
                &evidence,
                &request.question,
                language,
                request.hint.as_ref(),
            );
            let draft = Draft {
                prompt: &prompt,
                evidence: &evidence.passages,
                language,
                mode: request.mode,
                params: request.params,
                timeout: request.timeout(),
            };
            self.responder.respond(draft, meta).await
        };

        result.meta.took_ms = started.elapsed().as_millis() as u64;
        log_answer("ask", &result);
        self.telemetry.record(&result);
        result
    }
}
