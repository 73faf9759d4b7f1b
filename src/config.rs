use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::answer::AnswerConfig;
use crate::channel::ChannelConfig;
use crate::gateway::{GatewayConfig, ShrinkConfig};
use crate::rag::reranking::ReRankConfig;
use crate::rag::retrieval::{FanOutConfig, SearchParams};
use crate::rag::{PromptConfig, SummaryConfig};
use crate::search::SearchConfig;

/// Retrieval section: fusion pools plus the optional reranker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    #[serde(flatten)]
    pub params: SearchParams,
    pub rerank: ReRankConfig,
}

/// Gateway section: connection plus shrink schedule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    #[serde(flatten)]
    pub connection: GatewayConfig,
    pub shrink: ShrinkConfig,
}

/// Effective configuration, built once and handed to each component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    pub fanout: FanOutConfig,
    pub prompt: PromptConfig,
    pub gateway: GatewaySection,
    pub answer: AnswerConfig,
    pub summary: SummaryConfig,
    pub channel: ChannelConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".groundask").join("config.toml"))
    }

    /// Reject values the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        let alpha = self.retrieval.params.alpha;
        if !(0.0..=1.0).contains(&alpha) {
            bail!("retrieval.alpha must be within [0, 1], got {}", alpha);
        }

        for (name, pct) in [
            ("channel.percent_cap", self.channel.percent_cap),
            ("summary.percent_cap", self.summary.percent_cap),
        ] {
            if !(10..=100).contains(&pct) {
                bail!("{} must be within [10, 100], got {}", name, pct);
            }
        }

        let factors = &self.gateway.shrink.factors;
        if factors.is_empty() {
            bail!("gateway.shrink.factors must not be empty");
        }
        if factors.iter().any(|f| !(*f > 0.0 && *f <= 1.0)) {
            bail!("gateway.shrink.factors must lie in (0, 1]");
        }
        if factors.windows(2).any(|w| w[1] >= w[0]) {
            bail!("gateway.shrink.factors must be strictly descending");
        }

        if self.prompt.max_bytes == 0 || self.gateway.shrink.max_bytes == 0 {
            bail!("prompt and gateway byte caps must be positive");
        }
        if self.fanout.parallelism == 0 {
            bail!("fanout.parallelism must be positive");
        }

        let max_confidence = self.answer.max_confidence;
        if !(max_confidence > 0.0 && max_confidence < 1.0) {
            bail!("answer.max_confidence must lie in (0, 1), got {}", max_confidence);
        }

        Ok(())
    }
}
