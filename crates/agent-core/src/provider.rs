//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for the hosted model backends (Gemini, Ollama)
//! so the agent loop works with any of them without code changes.
//!
//! A provider answers a [`ModelRequest`] with a [`Decision`]: either a direct
//! textual answer or a request to run one named tool. How the model expresses
//! that choice (native function calling, a fenced JSON block in text, ...) is
//! the provider's business.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{GenerationOptions, LlmProvider, ModelRequest};
//!
//! let request = ModelRequest::new(&history, "Quanto de proteína por dia?", &schemas);
//! match provider.generate(&request, &options).await? {
//!     Decision::DirectAnswer(text) => println!("{text}"),
//!     Decision::ToolInvocation(call) => run_tool(call),
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-1.5-pro", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// System instructions sent ahead of the conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.95 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            system_prompt: None,
        }
    }
}

impl GenerationOptions {
    /// Same options with a different system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Response from a plain text completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// What the model decided to do with a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Final textual answer for the user
    DirectAnswer(String),
    /// Run the named tool with a query, then ask again
    ToolInvocation(ToolCall),
}

/// A tool call that has already been executed within the current exchange
#[derive(Clone, Copy, Debug)]
pub struct ToolExchange<'a> {
    pub call: &'a ToolCall,
    /// Text of the resulting tool turn (result or degraded message)
    pub result: &'a str,
}

/// Everything a provider needs to decide on one user utterance
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    /// Prior turns of the session, oldest first
    pub history: &'a [Message],
    /// The new user utterance
    pub input: &'a str,
    /// Tools the model may ask for
    pub tools: &'a [ToolSchema],
    /// Present on the follow-up submission after a tool ran
    pub tool_exchange: Option<ToolExchange<'a>>,
}

impl<'a> ModelRequest<'a> {
    pub fn new(history: &'a [Message], input: &'a str, tools: &'a [ToolSchema]) -> Self {
        Self {
            history,
            input,
            tools,
            tool_exchange: None,
        }
    }

    /// The follow-up request carrying a tool result
    #[must_use]
    pub fn with_tool_exchange(mut self, exchange: ToolExchange<'a>) -> Self {
        self.tool_exchange = Some(exchange);
        self
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs (e.g., "gemini")
    fn name(&self) -> &str;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Decide between answering directly and invoking a tool
    async fn generate(
        &self,
        request: &ModelRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<Decision>;

    /// Plain text completion, no tools involved
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "gemini-1.5-pro");
        assert!(opts.system_prompt.is_none());
    }

    #[test]
    fn test_request_builder() {
        let call = ToolCall::new("nutrition_advice", "ferro");
        let request = ModelRequest::new(&[], "oi", &[]).with_tool_exchange(ToolExchange {
            call: &call,
            result: "feijão",
        });
        assert_eq!(request.tool_exchange.map(|e| e.result), Some("feijão"));
    }
}
