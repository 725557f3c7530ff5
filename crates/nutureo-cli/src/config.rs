//! Startup configuration
//!
//! Flags win over environment variables (`.env` included), which win over
//! defaults. Everything the library crates need is passed down explicitly.

use std::path::PathBuf;

use agent_core::{AgentError, Result, RetryConfig, RunnerConfig, SessionId};
use agent_runtime::{GeminiConfig, OllamaConfig};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "nutureo",
    version,
    about = "Nutureo, assistente de nutrição no terminal"
)]
pub struct Cli {
    /// Conversation to resume or start
    #[arg(long, env = "NUTUREO_SESSION", default_value = "sessao_001")]
    pub session: String,

    /// Start a fresh conversation with a random id (ignores --session)
    #[arg(long)]
    pub new_session: bool,

    /// Directory holding one history file per session
    #[arg(long, env = "NUTUREO_HISTORY_DIR", default_value = "nutureo-history")]
    pub history_dir: PathBuf,

    /// Model backend
    #[arg(long, value_enum, env = "NUTUREO_PROVIDER", default_value_t = ProviderKind::Gemini)]
    pub provider: ProviderKind,

    /// Model identifier
    #[arg(long, env = "NUTUREO_MODEL", default_value = nutrition_advisor::DEFAULT_MODEL)]
    pub model: String,

    /// Attempts per message before giving up (1 to 10)
    #[arg(long, env = "NUTUREO_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Google AI API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Ollama host (with --provider ollama)
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost")]
    pub ollama_host: String,

    /// Ollama port (with --provider ollama)
    #[arg(long, env = "OLLAMA_PORT", default_value_t = 11434)]
    pub ollama_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Gemini,
    Ollama,
}

/// Backend selection with its settings
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Gemini(GeminiConfig),
    Ollama(OllamaConfig),
}

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionId,
    pub history_dir: PathBuf,
    pub model: String,
    pub provider: ProviderSettings,
    pub runner: RunnerConfig,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let session = if cli.new_session {
            SessionId::generate()
        } else {
            SessionId::parse(cli.session)
                .map_err(|e| AgentError::Config(e.to_string()))?
        };

        let provider = match cli.provider {
            ProviderKind::Gemini => {
                let key = cli.api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                    AgentError::Config(
                        "a variável de ambiente 'GOOGLE_API_KEY' não foi definida ou está vazia"
                            .into(),
                    )
                })?;
                ProviderSettings::Gemini(GeminiConfig::new(key)?)
            }
            ProviderKind::Ollama => ProviderSettings::Ollama(OllamaConfig {
                host: cli.ollama_host,
                port: cli.ollama_port,
            }),
        };

        let runner = RunnerConfig {
            retry: RetryConfig {
                max_retries: cli.max_retries,
                ..RetryConfig::default()
            },
        };
        runner.retry.validate()?;

        Ok(Self {
            session,
            history_dir: cli.history_dir,
            model: cli.model,
            provider,
            runner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["nutureo"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_gemini_requires_key() {
        let cli = Cli { api_key: Some("   ".into()), ..parse(&["--provider", "gemini"]) };
        let err = AppConfig::from_cli(cli).unwrap_err();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_gemini_with_key() {
        let config = AppConfig::from_cli(parse(&["--api-key", "k", "--session", "minha_sessao"])).unwrap();
        assert_eq!(config.session.as_str(), "minha_sessao");
        assert!(matches!(config.provider, ProviderSettings::Gemini(_)));
        assert_eq!(config.runner.retry.max_retries, 3);
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let cli = Cli { api_key: None, ..parse(&["--provider", "ollama", "--ollama-port", "9999"]) };
        let config = AppConfig::from_cli(cli).unwrap();
        assert!(matches!(config.provider, ProviderSettings::Ollama(ref o) if o.port == 9999));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cli = parse(&["--api-key", "k", "--session", "../fora"]);
        assert!(AppConfig::from_cli(cli).is_err());

        let cli = parse(&["--api-key", "k", "--max-retries", "0"]);
        assert!(matches!(AppConfig::from_cli(cli), Err(AgentError::Config(_))));

        let cli = parse(&["--api-key", "k", "--max-retries", "30"]);
        assert!(matches!(AppConfig::from_cli(cli), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_new_session_generates_id() {
        let cli = parse(&["--api-key", "k", "--new-session"]);
        let config = AppConfig::from_cli(cli).unwrap();
        assert_ne!(config.session.as_str(), "sessao_001");
    }
}
