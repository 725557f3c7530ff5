//! # agent-core
//!
//! Session-scoped agent invocation loop: one user utterance in, one durable,
//! retried, optionally tool-augmented answer out.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionRunner                           │
//! │  ┌──────────────┐  ┌──────────────────────────────────────┐  │
//! │  │ SessionStore │  │ RetryController                      │  │
//! │  │ (append/read)│  │  ┌────────────────────────────────┐  │  │
//! │  └──────────────┘  │  │ Agent ── ToolRegistry          │  │  │
//! │                    │  │   └──── LlmProvider (Strategy) │  │  │
//! │                    │  └────────────────────────────────┘  │  │
//! │                    └──────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets Gemini, Ollama, or a scripted test double
//! drive the same agent logic.

pub mod decision;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod retry;
pub mod runner;
pub mod session;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{Decision, GenerationOptions, LlmProvider, ModelRequest};
pub use reasoning::{Agent, AgentBuilder};
pub use retry::{RetryConfig, RetryController, MAX_RETRIES_EXCEEDED, MAX_RETRIES_LIMIT};
pub use runner::{RunnerConfig, SessionHandle, SessionRunner};
pub use session::{JsonlSessionStore, MemorySessionStore, SessionId, SessionStore};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolSchema};
