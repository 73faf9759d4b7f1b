//! GroundAsk - Main CLI Entry Point

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use groundask::{
    bootstrap::Components,
    channel::ChannelMessage,
    cli::{summary_style, Args, AskArgs, Commands, Verbosity},
    config::Config,
    doctor::Doctor,
    telemetry::{self, TelemetryCollector},
    types::{AnswerResult, EngineMode, GenerationParams, Language},
};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;

    match &args.command {
        Commands::Ask(ask) => run_ask(&args, &config, ask).await?,
        Commands::Channel { message, lang, dept } => {
            let components = Components::from_config(&config)?;
            let message = ChannelMessage {
                body: message.clone(),
                language: lang.clone(),
                department: dept.clone(),
            };
            println!("{}", components.channel.handle(message).await);
        }
        Commands::Summarize {
            doc_id,
            style,
            lang,
            mode,
            json,
        } => {
            let style = summary_style(style).map_err(|e| anyhow!(e))?;
            let mode = EngineMode::parse(mode)
                .ok_or_else(|| anyhow!("Unknown mode '{}'. Use auto, llm or local.", mode))?;
            let components = Components::from_config(&config)?;
            let result = components
                .summarizer
                .summarize(
                    doc_id,
                    style,
                    Language::from_code(lang),
                    mode,
                    GenerationParams::default(),
                )
                .await;
            print_result(&result, args.verbosity(), *json, None)?;
        }
        Commands::Doctor => run_doctor(config).await,
        Commands::Config => show_config(&args, &config)?,
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn run_ask(args: &Args, config: &Config, ask: &AskArgs) -> Result<()> {
    let request = ask.to_request().map_err(|e| anyhow!(e))?;
    let components = Components::from_config(config).context("Failed to build components")?;

    let result = components.pipeline.answer(request).await;
    print_result(&result, args.verbosity(), ask.json, Some(&components.telemetry))
}

fn print_result(
    result: &AnswerResult,
    verbosity: Verbosity,
    json: bool,
    telemetry: Option<&TelemetryCollector>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}", result.text);

    if verbosity.show_sources() && !result.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &result.citations {
            println!("  {}", citation.tag());
        }
    }

    if verbosity.show_meta() {
        let meta = &result.meta;
        eprintln!();
        eprintln!(
            "source={} status={} k={} evidence_k={} attempts={} prompt_bytes={} took_ms={} confidence={:.2}",
            meta.source.as_str(),
            meta.status.as_str(),
            meta.k,
            meta.evidence_k,
            meta.attempts,
            meta.prompt_bytes,
            meta.took_ms,
            result.confidence
        );
        if let Some(failure) = &meta.failure {
            eprintln!("failure: {}", failure);
        }
    }

    if verbosity.show_counters() {
        if let Some(telemetry) = telemetry {
            let stats = telemetry.stats();
            eprintln!(
                "answered={} remote={} local={} fallbacks={} gateway_attempts={} elapsed_ms={}",
                stats.answered,
                stats.remote,
                stats.local,
                stats.fallbacks,
                stats.gateway_attempts,
                telemetry.elapsed().as_millis()
            );
        }
    }

    Ok(())
}

async fn run_doctor(config: Config) {
    let doctor = Doctor::new(config);
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Config::config_path().ok(),
    };
    if let Some(path) = path {
        println!("# {}", path.display());
    }
    println!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?);
    Ok(())
}
