//! Component wiring
//!
//! Builds the shared search client, gateway, responder and the three
//! front doors (question pipeline, summarizer, chat channel) from one
//! [`Config`].

use std::sync::Arc;
use tracing::debug;

use crate::answer::AnswerComposer;
use crate::channel::ChannelHandler;
use crate::config::Config;
use crate::errors::Result;
use crate::gateway::{HttpGateway, LlmInvoker};
use crate::rag::reranking::{KeywordOverlapEncoder, ReRanker};
use crate::rag::retrieval::{FanOutRetriever, RetrievalEngine};
use crate::rag::{AskPipeline, EvidenceBudgeter, Responder, Summarizer};
use crate::search::HttpSearchClient;
use crate::telemetry::TelemetryCollector;

/// Everything a command needs, sharing one search client and one gateway
pub struct Components {
    pub pipeline: Arc<AskPipeline>,
    pub summarizer: Summarizer,
    pub channel: ChannelHandler,
    pub telemetry: TelemetryCollector,
}

impl Components {
    pub fn from_config(config: &Config) -> Result<Self> {
        let search = Arc::new(HttpSearchClient::with_config(config.search.clone())?);
        let gateway = Arc::new(HttpGateway::with_config(config.gateway.connection.clone())?);

        let invoker = LlmInvoker::with_config(gateway, config.gateway.shrink.clone());
        let responder = Responder::new(invoker)?
            .with_composer(AnswerComposer::with_config(config.answer.clone()));

        let rerank = &config.retrieval.rerank;
        let reranker = if rerank.enabled {
            ReRanker::with_encoder(Arc::new(KeywordOverlapEncoder), rerank.clone())
        } else {
            ReRanker::disabled()
        };
        debug!(rerank = reranker.is_active(), "building retrieval engine");

        let engine = RetrievalEngine::new(search.clone(), search.clone(), search.clone())
            .with_params(config.retrieval.params.clone())
            .with_reranker(reranker);
        let fanout = FanOutRetriever::with_config(search.clone(), search.clone(), config.fanout.clone());
        let budgeter = EvidenceBudgeter::with_config(config.prompt.clone());
        let telemetry = TelemetryCollector::new();

        let pipeline = Arc::new(
            AskPipeline::new(engine, responder.clone())
                .with_fanout(fanout)
                .with_budgeter(budgeter.clone())
                .with_telemetry(telemetry.clone()),
        );

        let summarizer = Summarizer::new(search, responder)
            .with_config(config.summary.clone())
            .with_budgeter(budgeter)
            .with_telemetry(telemetry.clone());

        let channel = ChannelHandler::with_config(Arc::clone(&pipeline), config.channel.clone())?;

        Ok(Self {
            pipeline,
            summarizer,
            channel,
            telemetry,
        })
    }
}
