//! Nutrition Advice Tool
//!
//! Answers one nutrition question with a dedicated, tool-free model call.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{
    GenerationOptions, LlmProvider, Message, Tool, ToolSchema,
    Result as CoreResult,
};

use crate::error::{AdvisorError, Result};

pub const TOOL_NAME: &str = "nutrition_advice";

/// Tool for evidence-based nutrition advice
pub struct NutritionAdviceTool {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl NutritionAdviceTool {
    /// The tool shares the agent's provider; `options` should carry no persona
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options: GenerationOptions {
                system_prompt: None,
                ..options
            },
        }
    }

    fn expert_prompt(query: &str) -> String {
        format!(
            "Como nutricionista, responda à dúvida abaixo com base em evidências \
             científicas atuais. Seja objetivo e indique quando um profissional \
             de saúde deve ser consultado.\n\nDúvida: {query}"
        )
    }

    async fn advise(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AdvisorError::EmptyQuery);
        }

        let completion = self
            .provider
            .complete(&[Message::user(Self::expert_prompt(query))], &self.options)
            .await?;

        let advice = completion.content.trim();
        if advice.is_empty() {
            return Err(AdvisorError::EmptyAdvice);
        }
        Ok(advice.to_string())
    }
}

#[async_trait]
impl Tool for NutritionAdviceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.into(),
            description: "Use esta ferramenta para fornecer conselhos nutricionais \
                          personalizados e baseados em ciência."
                .into(),
            query_description: "A dúvida nutricional do usuário, com o contexto relevante \
                                (objetivo, restrições, rotina)."
                .into(),
        }
    }

    async fn execute(&self, query: &str) -> CoreResult<String> {
        tracing::info!(tool = TOOL_NAME, "Generating nutrition advice");
        Ok(self.advise(query).await?)
    }
}
