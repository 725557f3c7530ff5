//! Nutureo terminal client
//!
//! Wires the configured model backend, the nutrition-advice tool and the
//! file-backed session store into a `SessionRunner`, then chats over
//! stdin/stdout.

mod config;
mod repl;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentBuilder, JsonlSessionStore, LlmProvider, SessionRunner};
use agent_runtime::{GeminiProvider, OllamaProvider};
use nutrition_advisor::{generation_options, tool_registry, NUTUREO_PROMPT};

use crate::config::{AppConfig, Cli, ProviderSettings};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment before reading RUST_LOG or any flag defaults
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("🚨 Falha ao inicializar o Nutureo: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_cli(cli)?;

    let provider: Arc<dyn LlmProvider> = match &config.provider {
        ProviderSettings::Gemini(gemini) => Arc::new(GeminiProvider::from_config(gemini.clone())?),
        ProviderSettings::Ollama(ollama) => Arc::new(OllamaProvider::from_config(ollama)),
    };

    match provider.health_check().await {
        Ok(true) => tracing::info!(provider = provider.name(), "✓ Model backend reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = provider.name(), "⚠ Model backend not reachable, messages may fail");
        }
    }

    let options = generation_options(&config.model);
    let tools = tool_registry(Arc::clone(&provider), &options)?;
    tracing::info!("Registered {} tools", tools.len());

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(Arc::new(tools))
        .system_prompt(NUTUREO_PROMPT)
        .generation(options)
        .build()?;

    let store = Arc::new(JsonlSessionStore::new(&config.history_dir));
    tracing::info!(session = %config.session, dir = %store.dir().display(), "Using session");

    let runner = SessionRunner::new(agent, store, &config.runner)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl::run(
        &runner,
        &config.session,
        stdin,
        tokio::io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await?;

    Ok(())
}
