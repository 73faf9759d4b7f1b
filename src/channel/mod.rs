//! Messaging channel front end
//!
//! Turns a short chat message into an [`AskRequest`] with channel-sized
//! knobs and renders the result as a compact, envelope-wrapped reply.
//!
//! # Knob Resolution
//!
//! ```text
//! tokens  = max(min_tokens,  override ∨ (fast ? fast_tokens : max_tokens))
//! seconds = max(min_seconds, override ∨ (fast ? fast_seconds : timeout_seconds))
//! topk    = clamp(override ∨ topk, 1, max_topk)
//! ```

pub mod command;
pub mod reply;

pub use command::{ChannelCommand, CommandParser, Overrides};
pub use reply::{envelope, format_reply, Marker, HELP_TEXT, NO_EVIDENCE};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::rag::{AskPipeline, AskRequest};
use crate::types::{GenerationParams, Language};

/// Channel defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub topk: usize,
    pub max_topk: usize,
    pub max_tokens: u32,
    pub min_tokens: u32,
    pub timeout_seconds: u64,
    pub min_seconds: u64,
    pub fast_tokens: u32,
    pub fast_seconds: u64,
    pub percent_cap: u8,
    pub reply_max_chars: usize,
    pub max_sources: usize,
    /// Applied when the message names no language; detection otherwise
    pub default_language: Option<Language>,
    pub default_department: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            topk: 6,
            max_topk: 12,
            max_tokens: 36,
            min_tokens: 8,
            timeout_seconds: 15,
            min_seconds: 3,
            fast_tokens: 32,
            fast_seconds: 12,
            percent_cap: 60,
            reply_max_chars: 600,
            max_sources: 3,
            default_language: None,
            default_department: None,
        }
    }
}

/// Resolved per-message knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Knobs {
    pub tokens: u32,
    pub seconds: u64,
    pub topk: usize,
}

impl ChannelConfig {
    pub fn knobs(&self, command: &ChannelCommand) -> Knobs {
        let (tokens, seconds) = if command.fast {
            (self.fast_tokens, self.fast_seconds)
        } else {
            (self.max_tokens, self.timeout_seconds)
        };
        Knobs {
            tokens: command.overrides.tokens.unwrap_or(tokens).max(self.min_tokens),
            seconds: command.overrides.seconds.unwrap_or(seconds).max(self.min_seconds),
            topk: command
                .overrides
                .topk
                .unwrap_or(self.topk)
                .clamp(1, self.max_topk.max(1)),
        }
    }
}

/// One inbound chat message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub body: String,
    /// Language code sent alongside the message
    pub language: Option<String>,
    pub department: Option<String>,
}

impl From<&str> for ChannelMessage {
    fn from(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Self::default()
        }
    }
}

/// Chat entry point over the shared pipeline
pub struct ChannelHandler {
    pipeline: Arc<AskPipeline>,
    parser: CommandParser,
    config: ChannelConfig,
}

impl ChannelHandler {
    pub fn new(pipeline: Arc<AskPipeline>) -> Result<Self> {
        Self::with_config(pipeline, ChannelConfig::default())
    }

    pub fn with_config(pipeline: Arc<AskPipeline>, config: ChannelConfig) -> Result<Self> {
        Ok(Self {
            pipeline,
            parser: CommandParser::new()?,
            config,
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Inline prefix, then the message's own code, then the configured
    /// default, then script detection
    fn language(&self, command: &ChannelCommand, message: &ChannelMessage) -> Language {
        command
            .language
            .or_else(|| {
                message
                    .language
                    .as_deref()
                    .map(str::trim)
                    .filter(|code| matches!(code.to_ascii_lowercase().as_str(), "en" | "hi"))
                    .map(Language::from_code)
            })
            .or(self.config.default_language)
            .unwrap_or_else(|| Language::detect(&command.question))
    }

    /// Build the pipeline request for a parsed message
    pub fn request(&self, command: &ChannelCommand, message: &ChannelMessage) -> (AskRequest, Knobs) {
        let knobs = self.config.knobs(command);
        let mut request = AskRequest::new(command.question.clone());
        request.language = Some(self.language(command, message));
        request.department = message
            .department
            .clone()
            .or_else(|| self.config.default_department.clone());
        request.topk = knobs.topk;
        request.evidence_k = knobs.topk;
        request.percent_cap = self.config.percent_cap;
        request.mode = command.engine;
        request.params = GenerationParams {
            max_tokens: knobs.tokens,
            ..GenerationParams::default()
        };
        request.timeout_ms = knobs.seconds * 1000;
        (request, knobs)
    }

    /// Reply text, without the envelope
    pub async fn reply(&self, message: &ChannelMessage) -> String {
        let command = self.parser.parse(&message.body);
        if command.question.is_empty() {
            return HELP_TEXT.to_string();
        }

        let (request, knobs) = self.request(&command, message);
        debug!(
            engine = ?command.engine,
            tokens = knobs.tokens,
            seconds = knobs.seconds,
            topk = knobs.topk,
            "channel message"
        );

        let result = self.pipeline.answer(request).await;
        if result.meta.k == 0 {
            return NO_EVIDENCE.to_string();
        }

        let marker = Marker::from_meta(&result.meta);
        let body = format_reply(
            &result.text,
            &result.citations,
            self.config.reply_max_chars,
            self.config.max_sources,
        );
        format!("{}\n{}", marker.line(knobs.tokens, knobs.seconds), body)
    }

    /// Envelope-wrapped reply for `message`
    pub async fn handle(&self, message: impl Into<ChannelMessage>) -> String {
        let message = message.into();
        envelope(&self.reply(&message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(message: &str) -> ChannelCommand {
        CommandParser::new().unwrap().parse(message)
    }

    #[test]
    fn test_default_knobs() {
        let knobs = ChannelConfig::default().knobs(&command("leave policy"));
        assert_eq!(
            knobs,
            Knobs {
                tokens: 36,
                seconds: 15,
                topk: 6
            }
        );
    }

    #[test]
    fn test_fast_preset() {
        let knobs = ChannelConfig::default().knobs(&command("fast leave policy"));
        assert_eq!((knobs.tokens, knobs.seconds), (32, 12));
    }

    #[test]
    fn test_override_floors_and_caps() {
        let knobs = ChannelConfig::default().knobs(&command("t=2 s=1 k=40 leave"));
        assert_eq!(
            knobs,
            Knobs {
                tokens: 8,
                seconds: 3,
                topk: 12
            }
        );
        let knobs = ChannelConfig::default().knobs(&command("k=0 leave"));
        assert_eq!(knobs.topk, 1);
    }
}
