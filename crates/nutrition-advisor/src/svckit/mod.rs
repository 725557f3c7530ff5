//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the nutrition advisor.

mod nutrition_advice;

pub use nutrition_advice::{NutritionAdviceTool, TOOL_NAME as NUTRITION_ADVICE};
