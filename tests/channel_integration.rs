//! Chat channel integration tests
//!
//! Drives `ChannelHandler` end to end over an in-memory corpus.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use groundask::channel::{ChannelConfig, ChannelHandler, ChannelMessage, HELP_TEXT, NO_EVIDENCE};
use groundask::gateway::{
    GatewayResponse, GenerationGateway, GenerationRequest, LlmInvoker, TransportKind,
};
use groundask::rag::retrieval::{EmbeddingProvider, LexicalSearch, RetrievalEngine, VectorSearch};
use groundask::rag::{AskPipeline, Responder};
use groundask::types::{Passage, SearchFilters};
use groundask::Result;

struct Corpus(Vec<Passage>);

#[async_trait]
impl EmbeddingProvider for Corpus {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0])
    }
}

#[async_trait]
impl VectorSearch for Corpus {
    async fn search(&self, _e: &[f32], _f: &SearchFilters, limit: usize) -> Result<Vec<Passage>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl LexicalSearch for Corpus {
    async fn search(&self, _q: &str, _f: &SearchFilters, limit: usize) -> Result<Vec<Passage>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }

    async fn search_document(&self, _d: &str, _q: &str, _l: usize) -> Result<Vec<Passage>> {
        Ok(Vec::new())
    }
}

/// Records requests; answers with `status`
struct Scripted {
    status: u16,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    fn new(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationGateway for Scripted {
    async fn send(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GatewayResponse, TransportKind> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(GatewayResponse::with_status(
            self.status,
            r#"{"text": "Leave accrues at two days per month."}"#,
        ))
    }
}

fn corpus() -> Vec<Passage> {
    vec![
        Passage::new("leave-policy", 0, "Leave accrues at two days per month. It is credited monthly.", 0.9),
        Passage::new("leave-policy", 4, "Unused leave lapses at year end.", 0.8),
        Passage::new("travel-policy", 2, "Travel needs prior approval.", 0.7),
    ]
}

fn handler(passages: Vec<Passage>, gateway: Arc<Scripted>) -> ChannelHandler {
    handler_with(passages, gateway, ChannelConfig::default())
}

fn handler_with(passages: Vec<Passage>, gateway: Arc<Scripted>, config: ChannelConfig) -> ChannelHandler {
    let corpus = Arc::new(Corpus(passages));
    let engine = RetrievalEngine::new(corpus.clone(), corpus.clone(), corpus);
    let responder = Responder::new(LlmInvoker::new(gateway)).unwrap();
    let pipeline = Arc::new(AskPipeline::new(engine, responder));
    ChannelHandler::with_config(pipeline, config).unwrap()
}

#[tokio::test]
async fn test_blank_message_gets_help() {
    let gateway = Scripted::new(200);
    let reply = handler(corpus(), gateway.clone()).reply(&"   ".into()).await;
    assert_eq!(reply, HELP_TEXT);
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_llm_reply_with_overrides() {
    let gateway = Scripted::new(200);
    let reply = handler(corpus(), gateway.clone())
        .reply(&"llm t=20 s=9 how much leave?".into())
        .await;

    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(lines[0], "LLM (t=20, s=9s)");
    assert_eq!(lines[1], "Leave accrues at two days per month.");
    assert_eq!(lines[2], "Source: [leave-policy#0,4]");
    // 60% of the evidence characters leaves no room for the travel passage
    assert!(!reply.contains("travel-policy"));

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].params.max_tokens, 20);
    assert_eq!(requests[0].timeout.as_secs(), 9);
    assert!(requests[0].prompt.contains("QUESTION: how much leave?"));
}

#[tokio::test]
async fn test_full_percent_cap_cites_every_document() {
    let config = ChannelConfig {
        percent_cap: 100,
        ..ChannelConfig::default()
    };
    let reply = handler_with(corpus(), Scripted::new(200), config)
        .reply(&"llm how much leave?".into())
        .await;

    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(lines[2], "Source: [leave-policy#0,4]");
    assert_eq!(lines[3], "Source: [travel-policy#2]");
}

#[tokio::test]
async fn test_local_engine_skips_gateway() {
    let gateway = Scripted::new(200);
    let reply = handler(corpus(), gateway.clone())
        .reply(&"local how much leave?".into())
        .await;

    assert!(reply.starts_with("Local (t=36, s=15s)\n• Leave accrues at two days per month"));
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_gateway_error_marks_fallback() {
    let gateway = Scripted::new(500);
    let reply = handler(corpus(), gateway.clone())
        .reply(&"how much leave?".into())
        .await;

    assert!(reply.starts_with("Local (fallback) (t=36, s=15s)"));
    assert!(reply.contains("Source: [leave-policy#0,4]"));
    assert_eq!(gateway.requests().len(), 1);
}

#[tokio::test]
async fn test_empty_corpus() {
    let reply = handler(Vec::new(), Scripted::new(200))
        .reply(&"how much leave?".into())
        .await;
    assert_eq!(reply, NO_EVIDENCE);
}

#[tokio::test]
async fn test_language_prefix_and_message_code() {
    let gateway = Scripted::new(200);
    let handler = handler(corpus(), gateway.clone());

    handler.reply(&"lang hi: leave policy".into()).await;
    let message = ChannelMessage {
        body: "leave policy".to_string(),
        language: Some("hi".to_string()),
        department: None,
    };
    handler.reply(&message).await;
    handler.reply(&"leave policy".into()).await;

    let requests = gateway.requests();
    assert!(requests[0].prompt.contains("Answer in Hindi."));
    assert!(requests[1].prompt.contains("Answer in Hindi."));
    assert!(requests[2].prompt.contains("Answer in English."));
}

#[tokio::test]
async fn test_envelope() {
    let reply = handler(Vec::new(), Scripted::new(200))
        .handle("why?")
        .await;
    assert_eq!(
        reply,
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
            NO_EVIDENCE
        )
    );
}
