//! Remote generation gateway client
//!
//! Two payload styles are supported:
//! - `Prompt`: POST `{prompt, lang, max_tokens, temperature, top_p}`
//! - `Chat`: OpenAI-style `{model, messages, max_tokens, temperature, top_p}`
//!
//! The client reports raw outcomes only (status, body, token header).
//! Classification into success / retry / failure lives in the invoker.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::{AskError, Result};
use crate::types::{GenerationParams, Language};

/// Default gateway endpoint
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8000";

/// Default chat path appended to the base URL
pub const DEFAULT_CHAT_PATH: &str = "/chat";

/// Default model name for chat-style payloads
pub const DEFAULT_MODEL: &str = "mistral-7b";

/// Client-level request timeout (per-attempt timeouts are tighter)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Response header carrying token usage when the body does not
pub const TOTAL_TOKENS_HEADER: &str = "x-total-tokens";

/// Request body layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadStyle {
    #[default]
    Prompt,
    Chat,
}

/// Gateway connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub chat_path: String,
    pub style: PayloadStyle,
    pub model: String,
    /// Bearer token for chat-style gateways
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            style: PayloadStyle::Prompt,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

/// One generation attempt as handed to a gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub language: Language,
    pub params: GenerationParams,
    pub timeout: Duration,
}

/// Raw gateway reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `x-total-tokens` header, if present
    pub total_tokens_header: Option<u64>,
}

impl GatewayResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            total_tokens_header: None,
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            total_tokens_header: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failure class; carries no URL or message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Request,
    Body,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Request => "request",
            TransportKind::Body => "body",
        }
    }

    fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Request
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text-generation backend
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Submit one attempt; non-2xx statuses are returned, not raised
    async fn send(&self, request: &GenerationRequest) -> std::result::Result<GatewayResponse, TransportKind>;
}

/// HTTP gateway client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create gateway client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(GatewayConfig::default())
    }

    /// Create gateway client with custom configuration
    pub fn with_config(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AskError::HttpError)?;

        Ok(Self {
            client,
            config: GatewayConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    /// Full endpoint URL
    pub fn url(&self) -> String {
        format!("{}{}", self.config.base_url, self.config.chat_path)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// JSON body for `request` in the configured style
    pub fn payload(&self, request: &GenerationRequest) -> serde_json::Value {
        let GenerationParams {
            max_tokens,
            temperature,
            top_p,
        } = request.params;

        match self.config.style {
            PayloadStyle::Prompt => serde_json::json!({
                "prompt": request.prompt,
                "lang": request.language.code(),
                "max_tokens": max_tokens,
                "temperature": temperature,
                "top_p": top_p,
            }),
            PayloadStyle::Chat => serde_json::json!({
                "model": self.config.model,
                "messages": [
                    {"role": "system", "content": request.language.directive()},
                    {"role": "user", "content": request.prompt},
                ],
                "max_tokens": max_tokens,
                "temperature": temperature,
                "top_p": top_p,
            }),
        }
    }

    /// Check if the gateway answers at its base URL
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(&self.config.base_url).send().await {
            Ok(response) => Ok(!response.status().is_server_error()),
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl GenerationGateway for HttpGateway {
    async fn send(&self, request: &GenerationRequest) -> std::result::Result<GatewayResponse, TransportKind> {
        let mut builder = self
            .client
            .post(self.url())
            .timeout(request.timeout)
            .header("Accept", "application/json")
            .json(&self.payload(request));

        if request.language == Language::Hi {
            builder = builder.header("Accept-Language", "hi-IN,hi;q=0.9");
        }
        if let (PayloadStyle::Chat, Some(key)) = (self.config.style, self.config.api_key.as_deref()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportKind::classify(&e))?;

        let status = response.status().as_u16();
        let total_tokens_header = response
            .headers()
            .get(TOTAL_TOKENS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|n| *n > 0);
        let body = response
            .text()
            .await
            .map_err(|e| TransportKind::classify(&e))?;

        Ok(GatewayResponse {
            status,
            body,
            total_tokens_header,
        })
    }
}
