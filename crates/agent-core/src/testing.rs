//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, Decision, GenerationOptions, LlmProvider, ModelRequest};
use crate::retry::{BackoffBase, Sleeper};
use crate::tool::{Tool, ToolSchema};

/// Hands out the given bases in order, repeating the last one
pub struct FixedBase {
    bases: Mutex<VecDeque<u64>>,
}

impl FixedBase {
    pub fn new(bases: Vec<u64>) -> Self {
        Self {
            bases: Mutex::new(bases.into()),
        }
    }
}

impl BackoffBase for FixedBase {
    fn next_base(&self) -> u64 {
        let mut bases = self.bases.lock().unwrap();
        if bases.len() > 1 {
            bases.pop_front().unwrap()
        } else {
            *bases.front().unwrap_or(&2)
        }
    }
}

/// Records requested waits instead of sleeping
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// What the scripted provider saw on one `generate` call
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub history_len: usize,
    pub input: String,
    pub tool_names: Vec<String>,
    pub tool_result: Option<String>,
    pub system_prompt: Option<String>,
}

/// Provider answering from a fixed script; runs out into `RateLimited`
#[derive(Default)]
pub struct ScriptedProvider {
    decisions: Mutex<VecDeque<Result<Decision>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    pub fn new(decisions: Vec<Result<Decision>>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            ..Default::default()
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

pub fn answer(text: &str) -> Result<Decision> {
    Ok(Decision::DirectAnswer(text.to_string()))
}

pub fn tool_request(name: &str, query: &str) -> Result<Decision> {
    Ok(Decision::ToolInvocation(crate::tool::ToolCall::new(name, query)))
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn generate(
        &self,
        request: &ModelRequest<'_>,
        options: &GenerationOptions,
    ) -> Result<Decision> {
        self.seen.lock().unwrap().push(SeenRequest {
            history_len: request.history.len(),
            input: request.input.to_string(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            tool_result: request.tool_exchange.map(|e| e.result.to_string()),
            system_prompt: options.system_prompt.clone(),
        });
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::RateLimited("script exhausted".into())))
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        Err(AgentError::ProviderUnavailable("scripted provider has no completions".into()))
    }
}

/// Tool returning a fixed text, or failing when built with `failing`
pub struct StaticTool {
    name: &'static str,
    output: Option<&'static str>,
}

impl StaticTool {
    pub fn ok(name: &'static str, output: &'static str) -> Self {
        Self { name, output: Some(output) }
    }

    pub fn failing(name: &'static str) -> Self {
        Self { name, output: None }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.into(),
            description: "Ferramenta de teste".into(),
            query_description: "Qualquer texto".into(),
        }
    }

    async fn execute(&self, _query: &str) -> Result<String> {
        self.output
            .map(str::to_string)
            .ok_or_else(|| AgentError::ToolExecution("backend down at 10.0.0.7".into()))
    }
}
