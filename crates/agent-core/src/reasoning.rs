//! Agent Loop
//!
//! Turns one user utterance into one assistant answer. The model either
//! answers directly or asks for a single tool; in the latter case the tool
//! runs, its result is handed back, and the model's follow-up is the answer.
//!
//! Turns are written to the session store only once the answer exists, so a
//! failed attempt that the retry controller repeats leaves no half exchange.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Decision, GenerationOptions, LlmProvider, ModelRequest, ToolExchange};
use crate::session::{SessionId, SessionStore};
use crate::tool::{ToolCall, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System instructions (persona)
    pub system_prompt: String,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            generation: GenerationOptions::default(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente útil. Responda em português, \
de forma clara e concisa. Use uma ferramenta apenas quando ela ajudar a responder.";

/// Turns produced by one successful exchange, in append order
#[derive(Clone, Debug)]
pub struct Exchange {
    pub turns: Vec<Message>,
    pub answer: String,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    options: GenerationOptions,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let options = config.generation.with_system_prompt(config.system_prompt);
        Self {
            provider,
            tools,
            options,
        }
    }

    /// Answer `input` and persist the exchange to `store`
    pub async fn run(
        &self,
        session: &SessionId,
        history: &[Message],
        input: &str,
        store: &dyn SessionStore,
    ) -> Result<String> {
        let exchange = self.respond(history, input).await?;
        store.append_all(session, &exchange.turns).await?;
        Ok(exchange.answer)
    }

    /// Produce the exchange without touching any store
    pub async fn respond(&self, history: &[Message], input: &str) -> Result<Exchange> {
        let schemas = self.tools.list();
        let request = ModelRequest::new(history, input, &schemas);

        let decision = self.provider.generate(&request, &self.options).await?;
        tracing::debug!(provider = self.provider.name(), ?decision, "Model decision");

        match decision {
            Decision::DirectAnswer(text) => {
                let answer = non_empty_answer(text)?;
                Ok(Exchange {
                    turns: vec![Message::user(input), Message::assistant(&answer)],
                    answer,
                })
            }
            Decision::ToolInvocation(call) => {
                let result = self.execute_tool(&call).await;
                let follow_up = request.with_tool_exchange(ToolExchange {
                    call: &call,
                    result: &result,
                });

                match self.provider.generate(&follow_up, &self.options).await? {
                    Decision::DirectAnswer(text) => {
                        let answer = non_empty_answer(text)?;
                        Ok(Exchange {
                            turns: vec![
                                Message::user(input),
                                Message::tool(&call.name, result),
                                Message::assistant(&answer),
                            ],
                            answer,
                        })
                    }
                    Decision::ToolInvocation(second) => Err(AgentError::MalformedResponse(format!(
                        "model asked for tool '{}' after a tool result",
                        second.name
                    ))),
                }
            }
        }
    }

    /// Execute a tool call; failures become a degraded result text
    async fn execute_tool(&self, call: &ToolCall) -> String {
        let outcome = match self.tools.lookup(&call.name) {
            Ok(tool) => tool.execute(&call.query).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(output) => {
                tracing::info!(tool = %call.name, "Tool executed");
                output
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed, continuing with degraded result");
                format!("[Ferramenta '{}' falhou] {}", call.name, e.user_message())
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Generation options, system prompt included
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }
}

fn non_empty_answer(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AgentError::MalformedResponse("empty answer".into()));
    }
    Ok(text)
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.config.generation = options;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self.tools.unwrap_or_default();

        Ok(Agent::new(provider, tools, self.config))
    }
}
