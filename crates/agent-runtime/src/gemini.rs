//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` for Google's Generative Language API.
//! Tools are advertised as native function declarations; a `functionCall`
//! part in the reply becomes a tool invocation.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, Decision, GenerationOptions, LlmProvider, ModelRequest, TokenUsage,
        ToolExchange,
    },
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::render::turn_text;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_API_VERSION: &str = "v1beta";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key (`GOOGLE_API_KEY`)
    pub api_key: String,

    /// Base URL of the API
    pub endpoint: String,

    /// API version path segment
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Configuration with default endpoint; the key must not be blank
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::Config("GOOGLE_API_KEY is empty".into()));
        }
        Ok(Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.into(),
            api_version: DEFAULT_API_VERSION.into(),
            timeout_secs: 60,
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Gemini LLM provider
pub struct GeminiProvider {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn base_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.api_version
        )
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url())
    }

    /// Map history turns onto Gemini `contents`, each keeping its own role
    fn history_contents(history: &[Message]) -> Vec<Content> {
        let mut contents = Vec::with_capacity(history.len() + 3);
        for message in history {
            let role = match message.role {
                Role::Assistant => GeminiRole::Model,
                Role::User | Role::Tool => GeminiRole::User,
            };
            push_part(&mut contents, role, Part::text(turn_text(message)));
        }
        contents
    }

    /// Map history turns (and the new input) onto Gemini `contents`
    fn build_contents(history: &[Message], input: &str, exchange: Option<ToolExchange<'_>>) -> Vec<Content> {
        let mut contents = Self::history_contents(history);
        push_part(&mut contents, GeminiRole::User, Part::text(input));

        if let Some(exchange) = exchange {
            push_part(&mut contents, GeminiRole::Model, Part::function_call(exchange.call));
            push_part(
                &mut contents,
                GeminiRole::User,
                Part::function_response(&exchange.call.name, exchange.result),
            );
        }

        contents
    }

    fn build_payload(
        contents: Vec<Content>,
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Value {
        let mut payload = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_tokens,
                "topP": options.top_p,
            }
        });

        if let Some(system) = options.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            payload["system_instruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools.iter().map(function_declaration).collect();
            payload["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        payload
    }

    async fn post(&self, model: &str, payload: &Value) -> Result<GenerateResponse> {
        let url = self.generate_url(model);
        tracing::info!(model, "Sending request to Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| AgentError::MalformedResponse(format!("undecodable Gemini body: {e}")))
    }
}

fn function_declaration(schema: &ToolSchema) -> Value {
    json!({
        "name": schema.name,
        "description": schema.description,
        "parameters": {
            "type": "OBJECT",
            "properties": {
                "query": { "type": "STRING", "description": schema.query_description }
            },
            "required": ["query"]
        }
    })
}

/// Consecutive turns with the same role are merged; Gemini expects alternation.
fn push_part(contents: &mut Vec<Content>, role: GeminiRole, part: Part) {
    match contents.last_mut() {
        Some(last) if last.role == role => last.parts.push(part),
        _ => contents.push(Content {
            role,
            parts: vec![part],
        }),
    }
}

fn classify_transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::Timeout(err.to_string())
    } else if err.is_decode() {
        AgentError::MalformedResponse(err.to_string())
    } else {
        AgentError::ProviderUnavailable(err.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> AgentError {
    let detail: String = format!("HTTP {}: {}", status.as_u16(), body.chars().take(300).collect::<String>());
    match status {
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AgentError::Timeout(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models?pageSize=1", self.base_url());
        match self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(
        &self,
        request: &ModelRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<Decision> {
        let contents = Self::build_contents(request.history, request.input, request.tool_exchange);
        let payload = Self::build_payload(contents, request.tools, options);
        let response = self.post(&options.model, &payload).await?;
        response.into_decision()
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        if messages.is_empty() {
            return Err(AgentError::InvalidInput("no messages to complete".into()));
        }

        let contents = Self::history_contents(messages);
        let payload = Self::build_payload(contents, &[], options);
        let response = self.post(&options.model, &payload).await?;
        let usage = response.usage();

        match response.into_decision()? {
            Decision::DirectAnswer(content) => Ok(Completion {
                content,
                model: options.model.clone(),
                usage,
            }),
            Decision::ToolInvocation(call) => Err(AgentError::MalformedResponse(format!(
                "unexpected function call '{}' in plain completion",
                call.name
            ))),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GeminiRole {
    User,
    Model,
}

#[derive(Debug, Serialize)]
struct Content {
    role: GeminiRole,
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn function_call(call: &ToolCall) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: call.name.clone(),
                args: json!({ "query": call.query }),
            }),
            ..Default::default()
        }
    }

    fn function_response(name: &str, result: &str) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.to_string(),
                response: json!({ "result": result }),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

impl FunctionCall {
    fn into_tool_call(self) -> ToolCall {
        let query = match self.args.get("query") {
            Some(Value::String(q)) => q.clone(),
            Some(other) => other.to_string(),
            None if self.args.is_null() => String::new(),
            None => self.args.to_string(),
        };
        ToolCall::new(self.name, query)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GenerateResponse {
    fn usage(&self) -> Option<TokenUsage> {
        self.usage_metadata.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
    }

    fn into_decision(self) -> Result<Decision> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AgentError::Provider(format!("prompt blocked: {reason}")));
        }

        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .ok_or_else(|| AgentError::MalformedResponse("no candidates in Gemini reply".into()))?;

        let mut text = String::new();
        for part in parts {
            if let Some(call) = part.function_call {
                return Ok(Decision::ToolInvocation(call.into_tool_call()));
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        if text.trim().is_empty() {
            return Err(AgentError::MalformedResponse("Gemini reply has no text".into()));
        }
        Ok(Decision::DirectAnswer(text))
    }
}
