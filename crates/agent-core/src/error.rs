//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Provider rejected the request permanently (bad request, unknown model)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Request to the provider timed out
    #[error("Provider timed out: {0}")]
    Timeout(String),

    /// Provider answered with something that is neither an answer nor a tool request
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// User input rejected before reaching the model
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session store error (append or read)
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether the retry controller may try the call again.
    ///
    /// Malformed responses count as transient: they are not expected to
    /// reproduce on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_)
                | AgentError::RateLimited(_)
                | AgentError::Timeout(_)
                | AgentError::MalformedResponse(_)
                | AgentError::Io(_)
        )
    }

    /// Convert to a user-friendly message (pt-BR, the assistant's language)
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(_) | AgentError::MalformedResponse(_) => {
                "⚠️ O serviço de IA respondeu de forma inesperada. Tente novamente mais tarde.".into()
            }
            AgentError::ProviderUnavailable(_) | AgentError::Timeout(_) => {
                "⚠️ O serviço de IA está indisponível no momento. Tente novamente mais tarde.".into()
            }
            AgentError::RateLimited(_) => {
                "⚠️ Muitas requisições em pouco tempo. Aguarde um instante.".into()
            }
            AgentError::Auth(_) => "⚠️ Falha de autenticação. Verifique sua chave de API.".into(),
            AgentError::ToolNotFound(name) => format!("⚠️ A ferramenta '{name}' não está disponível."),
            AgentError::ToolExecution(_) => "⚠️ Ocorreu um problema ao gerar o conselho.".into(),
            AgentError::InvalidInput(msg) => format!("⚠️ Entrada inválida: {msg}"),
            AgentError::Session(_) => {
                "⚠️ Não foi possível salvar a conversa. Tente novamente mais tarde.".into()
            }
            AgentError::Config(msg) => format!("❌ Erro de configuração: {msg}"),
            AgentError::Io(_) | AgentError::Json(_) => {
                "⚠️ Algo deu errado durante o processo, tente mais tarde.".into()
            }
        }
    }
}
