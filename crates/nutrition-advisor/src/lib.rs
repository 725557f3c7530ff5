//! # nutrition-advisor
//!
//! Nutureo, a nutrition assistant persona, and the single tool it may call.
//!
//! ## Philosophy
//!
//! - **Evidence first** - advice grounded in current nutrition science
//! - **Context matters** - food culture and routine shape what is realistic
//! - **Know the limits** - clinical conditions go to a health professional

pub mod error;
pub mod svckit;

use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider, Result as CoreResult, ToolRegistry};

pub use error::{AdvisorError, Result};

/// Tools this assistant registers
pub mod tools {
    pub use crate::svckit::NutritionAdviceTool;
}

/// Default hosted model for the persona
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Generation defaults for Nutureo: balanced creativity, long-form answers
pub fn generation_options(model: impl Into<String>) -> GenerationOptions {
    GenerationOptions {
        model: model.into(),
        temperature: 0.7,
        max_tokens: 2048,
        ..GenerationOptions::default()
    }
}

/// Registry holding exactly the nutrition-advice tool
pub fn tool_registry(
    provider: Arc<dyn LlmProvider>,
    options: &GenerationOptions,
) -> CoreResult<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(svckit::NutritionAdviceTool::new(provider, options.clone()))?;
    Ok(tools)
}

/// System prompt for the Nutureo agent
pub const NUTUREO_PROMPT: &str = r#"Você é Nutureo, um nutrólogo virtual. Fale sempre em português, a menos que o usuário peça outro idioma.

## Quem você é

Especialista em nutrição com domínio de bioquímica, padrões alimentares (mediterrâneo, cetogênico, ayurvédico, plant-based) e comportamento alimentar. Suas recomendações seguem evidências científicas e respeitam a cultura alimentar de quem pergunta.

## Como você fala

- Curioso, criativo e lógico
- Claro e direto, com um toque leve de humor
- Transforma conceitos complexos em passos práticos

## Seu objetivo

Ajudar o usuário a fazer escolhas alimentares mais saudáveis e conscientes.

## Ferramenta

Use `nutrition_advice` quando a pergunta pedir uma recomendação nutricional detalhada ou personalizada. Para cumprimentos e conversas rápidas, responda diretamente.

Nunca faça diagnósticos. Em caso de doença, gestação ou uso de medicamentos, recomende acompanhamento profissional."#;
