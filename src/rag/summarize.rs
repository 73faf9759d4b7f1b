// Whole-document summaries through the same generate-or-fallback path
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::rag::context::{EvidenceBudgeter, EvidenceSet};
use crate::rag::respond::{log_answer, Draft, Responder};
use crate::rag::retrieval::LexicalSearch;
use crate::telemetry::TelemetryCollector;
use crate::types::{AnswerMeta, AnswerResult, AnswerStatus, EngineMode, GenerationParams, Language};

/// Closing line of every summary prompt
const SUMMARY_TAIL: &str = "\n\nSummary:";

/// Requested summary layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    #[default]
    Bullet,
    Abstract,
    Table,
}

impl SummaryStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bullet" | "bullets" => Some(SummaryStyle::Bullet),
            "abstract" | "paragraph" => Some(SummaryStyle::Abstract),
            "table" => Some(SummaryStyle::Table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Bullet => "bullet",
            SummaryStyle::Abstract => "abstract",
            SummaryStyle::Table => "table",
        }
    }
}

/// Summary limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Leading chunks of the document fed to the generator
    pub max_chunks: usize,
    pub percent_cap: u8,
    pub timeout_ms: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_chunks: 6,
            percent_cap: 100,
            timeout_ms: 60_000,
        }
    }
}

/// Instruction block ahead of the document text
pub fn summary_preamble(style: SummaryStyle, language: Language) -> String {
    let language_hint = match language {
        Language::Hi => "\nReturn the summary in Hindi (हिन्दी).",
        Language::En => "",
    };
    format!(
        "Summarize the following text.\nStyle: {}. Keep it concise and factual.{}\n\nTEXT:\n",
        style.as_str(),
        language_hint
    )
}

/// Document summarizer
pub struct Summarizer {
    lexical: Arc<dyn LexicalSearch>,
    budgeter: EvidenceBudgeter,
    responder: Responder,
    config: SummaryConfig,
    telemetry: TelemetryCollector,
}

impl Summarizer {
    pub fn new(lexical: Arc<dyn LexicalSearch>, responder: Responder) -> Self {
        Self {
            lexical,
            budgeter: EvidenceBudgeter::new(),
            responder,
            config: SummaryConfig::default(),
            telemetry: TelemetryCollector::new(),
        }
    }

    pub fn with_config(mut self, config: SummaryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_budgeter(mut self, budgeter: EvidenceBudgeter) -> Self {
        self.budgeter = budgeter;
        self
    }

    /// Count summaries on a collector shared with the question pipeline
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Summarize `doc_id`; never fails
    pub async fn summarize(
        &self,
        doc_id: &str,
        style: SummaryStyle,
        language: Language,
        mode: EngineMode,
        params: GenerationParams,
    ) -> AnswerResult {
        let started = Instant::now();
        let limit = self.config.max_chunks.max(1);

        let mut meta = AnswerMeta::local(AnswerStatus::Ok);
        meta.percent_cap = self.config.percent_cap;
        meta.max_tokens = params.max_tokens;
        meta.timeout_ms = self.config.timeout_ms;
        meta.prompt_max_bytes = self.budgeter.config().max_bytes;

        // Empty query: chunk order
        let chunks = match self.lexical.search_document(doc_id, "", limit).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(doc_id, error = %e, "document lookup failed");
                Vec::new()
            }
        };
        meta.k = chunks.len();

        let evidence: EvidenceSet = self.budgeter.select(&chunks, limit, self.config.percent_cap);
        debug!(doc_id, chunks = evidence.len(), "summary evidence");

        let mut result = if evidence.is_empty() {
            self.responder.composer().empty(language, meta)
        } else {
            let prompt = self.budgeter.assemble(
                &summary_preamble(style, language),
                &evidence,
                SUMMARY_TAIL,
            );
            let draft = Draft {
                prompt: &prompt,
                evidence: &evidence.passages,
                language,
                mode,
                params,
                timeout: Duration::from_millis(self.config.timeout_ms),
            };
            self.responder.respond(draft, meta).await
        };

        result.meta.took_ms = started.elapsed().as_millis() as u64;
        log_answer("summary", &result);
        self.telemetry.record(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::gateway::{
        GatewayResponse, GenerationGateway, GenerationRequest, LlmInvoker, TransportKind,
    };
    use crate::types::{AnswerSource, Passage, SearchFilters};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Doc(Vec<Passage>);

    #[async_trait]
    impl LexicalSearch for Doc {
        async fn search(&self, _q: &str, _f: &SearchFilters, _l: usize) -> Result<Vec<Passage>> {
            Ok(Vec::new())
        }

        async fn search_document(&self, doc_id: &str, _q: &str, limit: usize) -> Result<Vec<Passage>> {
            Ok(self
                .0
                .iter()
                .filter(|p| p.doc_id == doc_id)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct Recording {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationGateway for Recording {
        async fn send(
            &self,
            request: &GenerationRequest,
        ) -> std::result::Result<GatewayResponse, TransportKind> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(request.prompt.clone());
            }
            Ok(GatewayResponse::ok(r#"{"text": "A short summary."}"#))
        }
    }

    fn summarizer(gateway: Arc<Recording>) -> Summarizer {
        let doc = Doc(
            (0..9)
                .map(|i| Passage::new("policy", i, format!("Clause {} applies.", i), 0.0))
                .collect(),
        );
        let responder = Responder::new(LlmInvoker::new(gateway)).unwrap();
        Summarizer::new(Arc::new(doc), responder)
    }

    #[test]
    fn test_preamble_language_hint() {
        let en = summary_preamble(SummaryStyle::Table, Language::En);
        assert!(en.contains("Style: table."));
        assert!(!en.contains("Hindi"));
        assert!(summary_preamble(SummaryStyle::Bullet, Language::Hi).contains("Hindi (हिन्दी)"));
    }

    #[test]
    fn test_style_parse() {
        assert_eq!(SummaryStyle::parse("Bullets"), Some(SummaryStyle::Bullet));
        assert_eq!(SummaryStyle::parse("abstract"), Some(SummaryStyle::Abstract));
        assert_eq!(SummaryStyle::parse("poem"), None);
    }

    #[tokio::test]
    async fn test_summary_uses_leading_chunks() {
        let gateway = Arc::new(Recording::default());
        let result = summarizer(Arc::clone(&gateway))
            .summarize(
                "policy",
                SummaryStyle::Bullet,
                Language::En,
                EngineMode::Auto,
                GenerationParams::default(),
            )
            .await;

        assert_eq!(result.text, "A short summary.");
        assert_eq!(result.meta.source, AnswerSource::Llm);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].chunk_indices, vec![0, 1, 2, 3]);

        let prompts = gateway.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Summarize the following text."));
        assert!(prompts[0].ends_with("Summary:"));
        assert!(prompts[0].contains("[policy#5]"));
        assert!(!prompts[0].contains("[policy#6]"));
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let gateway = Arc::new(Recording::default());
        let result = summarizer(Arc::clone(&gateway))
            .summarize(
                "missing",
                SummaryStyle::Abstract,
                Language::En,
                EngineMode::Auto,
                GenerationParams::default(),
            )
            .await;

        assert!(!result.grounded);
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summaries_counted_on_shared_collector() {
        let telemetry = TelemetryCollector::new();
        let summarizer = summarizer(Arc::new(Recording::default())).with_telemetry(telemetry.clone());

        for doc_id in ["policy", "missing"] {
            summarizer
                .summarize(
                    doc_id,
                    SummaryStyle::Bullet,
                    Language::En,
                    EngineMode::Auto,
                    GenerationParams::default(),
                )
                .await;
        }

        let stats = telemetry.stats();
        assert_eq!(stats.answered, 2);
        assert_eq!(stats.remote, 1);
        assert_eq!(stats.ungrounded, 1);
        assert_eq!(stats.gateway_attempts, 1);
    }

    #[tokio::test]
    async fn test_local_summary() {
        let gateway = Arc::new(Recording::default());
        let result = summarizer(Arc::clone(&gateway))
            .summarize(
                "policy",
                SummaryStyle::Bullet,
                Language::En,
                EngineMode::Local,
                GenerationParams::default(),
            )
            .await;

        assert_eq!(result.text.lines().count(), 4);
        assert!(result.text.starts_with("• Clause 0 applies."));
        assert!(gateway.prompts.lock().unwrap().is_empty());
    }
}
