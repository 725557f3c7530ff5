//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Local models
//! have no native function calling here, so the tool choice is made in text:
//! the tool list and the fenced-block protocol are appended to the system
//! prompt, and the reply is parsed with
//! [`agent_core::decision::parse_text_decision`].

use agent_core::{
    decision::parse_text_decision,
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, Decision, GenerationOptions, LlmProvider, ModelRequest, TokenUsage},
    tool::render_prompt_section,
};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    },
    models::ModelOptions as OllamaOptions,
    Ollama,
};

use crate::render::{tool_context, turn_text};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: &OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
        }
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(&OllamaConfig::default())
    }

    /// Convert agent turns to Ollama format, system prompt first
    fn convert_messages(system_prompt: Option<&str>, messages: &[Message]) -> Vec<ChatMessage> {
        let mut converted = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            converted.push(ChatMessage::new(MessageRole::System, system.to_string()));
        }
        converted.extend(messages.iter().map(|m| {
            let role = match m.role {
                Role::User | Role::Tool => MessageRole::User, // Tools appear as user context
                Role::Assistant => MessageRole::Assistant,
            };
            ChatMessage::new(role, turn_text(m))
        }));
        converted
    }

    /// Messages for a tool-aware request
    fn decision_messages(request: &ModelRequest<'_>, options: &GenerationOptions) -> Vec<ChatMessage> {
        let mut system = options.system_prompt.clone().unwrap_or_default();
        if !request.tools.is_empty() {
            system.push_str("\n\n");
            system.push_str(&render_prompt_section(request.tools));
        }

        let mut messages = Self::convert_messages(Some(system.as_str()), request.history);
        messages.push(ChatMessage::new(MessageRole::User, request.input.to_string()));

        if let Some(exchange) = request.tool_exchange {
            let block = serde_json::to_string(exchange.call).unwrap_or_default();
            messages.push(ChatMessage::new(
                MessageRole::Assistant,
                format!("```tool\n{block}\n```"),
            ));
            messages.push(ChatMessage::new(
                MessageRole::User,
                format!(
                    "{}\n\nResponda agora ao usuário sem usar outra ferramenta.",
                    tool_context(Some(exchange.call.name.as_str()), exchange.result)
                ),
            ));
        }

        messages
    }

    /// Build Ollama generation options
    fn build_options(opts: &GenerationOptions) -> OllamaOptions {
        OllamaOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }

    async fn chat(&self, messages: Vec<ChatMessage>, options: &GenerationOptions) -> Result<Completion> {
        let request = ChatMessageRequest::new(options.model.clone(), messages)
            .options(Self::build_options(options));

        tracing::info!(model = %options.model, "Sending request to Ollama");
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(Self::convert_completion(response, &options.model))
    }

    /// Convert Ollama response to agent completion
    fn convert_completion(response: ChatMessageResponse, model: &str) -> Completion {
        Completion {
            content: response.message.content,
            model: model.to_string(),
            usage: response.final_data.as_ref().map(|d| {
                let prompt = u32::try_from(d.prompt_eval_count).unwrap_or(u32::MAX);
                let completion = u32::try_from(d.eval_count).unwrap_or(u32::MAX);
                TokenUsage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt.saturating_add(completion),
                }
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(
        &self,
        request: &ModelRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<Decision> {
        let messages = Self::decision_messages(request, options);
        let completion = self.chat(messages, options).await?;
        parse_text_decision(&completion.content)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let messages = Self::convert_messages(options.system_prompt.as_deref(), messages);
        self.chat(messages, options).await
    }
}
