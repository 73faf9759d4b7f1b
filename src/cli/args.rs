//! Command-line argument parsing for groundask
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rag::{AnswerHint, AnswerStyle, AskRequest, RetrievalScope, SummaryStyle};
use crate::types::{EngineMode, Language};

/// GroundAsk - evidence-grounded answers over a document corpus
#[derive(Parser, Debug)]
#[command(name = "groundask")]
#[command(version)]
#[command(about = "Answer questions from retrieved document evidence", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.groundask/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (answer diagnostics), -vv (plus counters)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (print the answer text only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Question flags shared by `ask`
#[derive(clap::Args, Debug, Clone)]
pub struct AskArgs {
    /// Question text
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Answer language (en or hi); detected from the question when omitted
    #[arg(long)]
    pub lang: Option<String>,

    /// Department filter
    #[arg(long)]
    pub dept: Option<String>,

    /// Only retrieve documents written in this language
    #[arg(long)]
    pub corpus_lang: Option<String>,

    /// Answer from this document only
    #[arg(long, conflicts_with = "fanout")]
    pub doc: Option<String>,

    /// Search every candidate document separately and merge
    #[arg(long)]
    pub fanout: bool,

    #[arg(long, default_value_t = 8)]
    pub topk: usize,

    #[arg(long, default_value_t = 5)]
    pub evidence_k: usize,

    /// Share of evidence characters forwarded (10-100)
    #[arg(long, default_value_t = 100)]
    pub percent_cap: u8,

    /// auto, llm or local
    #[arg(long, default_value = "auto")]
    pub mode: String,

    #[arg(long, default_value_t = 512)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = 60_000)]
    pub timeout_ms: u64,

    /// Answer format: bullets or paragraph
    #[arg(long)]
    pub style: Option<String>,

    /// Free-text length hint, e.g. "2-3 sentences"
    #[arg(long)]
    pub length: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from the corpus
    Ask(AskArgs),

    /// Handle one chat message and print the reply envelope
    Channel {
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// Language code sent with the message
        #[arg(long)]
        lang: Option<String>,

        #[arg(long)]
        dept: Option<String>,
    },

    /// Summarize one document
    Summarize {
        #[arg(value_name = "DOC_ID")]
        doc_id: String,

        /// bullet, abstract or table
        #[arg(long, default_value = "bullet")]
        style: String,

        #[arg(long, default_value = "en")]
        lang: String,

        #[arg(long, default_value = "auto")]
        mode: String,

        #[arg(long)]
        json: bool,
    },

    /// Run diagnostics against the gateway and search service
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl AskArgs {
    /// Translate flags into a pipeline request
    pub fn to_request(&self) -> Result<AskRequest, String> {
        let mode = EngineMode::parse(&self.mode)
            .ok_or_else(|| format!("Unknown mode '{}'. Use auto, llm or local.", self.mode))?;
        let style = match self.style.as_deref() {
            Some(s) => Some(
                AnswerStyle::parse(s)
                    .ok_or_else(|| format!("Unknown style '{}'. Use bullets or paragraph.", s))?,
            ),
            None => None,
        };
        let hint = AnswerHint {
            style,
            length: self.length.clone(),
        };

        let mut request = AskRequest::new(self.question.clone());
        request.language = self.lang.as_deref().map(Language::from_code);
        request.department = self.dept.clone();
        request.corpus_language = self.corpus_lang.clone();
        request.scope = match (&self.doc, self.fanout) {
            (Some(doc_id), _) => RetrievalScope::Document(doc_id.clone()),
            (None, true) => RetrievalScope::FanOut,
            (None, false) => RetrievalScope::Hybrid,
        };
        request.topk = self.topk;
        request.evidence_k = self.evidence_k;
        request.percent_cap = self.percent_cap;
        request.mode = mode;
        request.params.max_tokens = self.max_tokens;
        request.timeout_ms = self.timeout_ms;
        request.hint = (!hint.is_empty()).then_some(hint);
        Ok(request.clamped())
    }
}

/// Parse a summary style flag
pub fn summary_style(value: &str) -> Result<SummaryStyle, String> {
    SummaryStyle::parse(value)
        .ok_or_else(|| format!("Unknown summary style '{}'. Use bullet, abstract or table.", value))
}

impl Verbosity {
    /// Show answer diagnostics
    pub fn show_meta(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Show process counters
    pub fn show_counters(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }

    /// Show citations and headers
    pub fn show_sources(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn ask_args(argv: &[&str]) -> AskArgs {
        match parse(argv).command {
            Commands::Ask(args) => args,
            other => panic!("expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["groundask", "-q", "doctor"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["groundask", "doctor"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["groundask", "-v", "doctor"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["groundask", "doctor", "-vv"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_ask_defaults() {
        let request = ask_args(&["groundask", "ask", "How much leave?"]).to_request().unwrap();
        assert_eq!(request.question, "How much leave?");
        assert_eq!(request.topk, 8);
        assert_eq!(request.evidence_k, 5);
        assert_eq!(request.mode, EngineMode::Auto);
        assert_eq!(request.scope, RetrievalScope::Hybrid);
        assert!(request.language.is_none());
        assert!(request.hint.is_none());
    }

    #[test]
    fn test_ask_flags() {
        let request = ask_args(&[
            "groundask",
            "ask",
            "leave?",
            "--lang",
            "hi",
            "--topk",
            "99",
            "--percent-cap",
            "5",
            "--mode",
            "local",
            "--doc",
            "hr-policy",
            "--style",
            "bullets",
        ])
        .to_request()
        .unwrap();
        assert_eq!(request.language, Some(Language::Hi));
        assert_eq!(request.topk, 50);
        assert_eq!(request.percent_cap, 10);
        assert_eq!(request.mode, EngineMode::Local);
        assert_eq!(request.scope, RetrievalScope::Document("hr-policy".to_string()));
        assert_eq!(request.hint.and_then(|h| h.style), Some(AnswerStyle::Bullets));
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(ask_args(&["groundask", "ask", "q", "--mode", "turbo"])
            .to_request()
            .is_err());
    }

    #[test]
    fn test_doc_conflicts_with_fanout() {
        assert!(Args::try_parse_from(["groundask", "ask", "q", "--doc", "a", "--fanout"]).is_err());
    }

    #[test]
    fn test_summary_style() {
        assert_eq!(summary_style("table"), Ok(SummaryStyle::Table));
        assert!(summary_style("poem").is_err());
    }
}
