//! Error Types for the Nutrition Advisor

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Empty nutrition question")]
    EmptyQuery,

    #[error("Model returned no advice")]
    EmptyAdvice,

    #[error("Advice generation failed: {0}")]
    Model(#[from] AgentError),
}

impl From<AdvisorError> for AgentError {
    fn from(err: AdvisorError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}
