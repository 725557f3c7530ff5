//! # agent-runtime
//!
//! Model client implementations for the agent loop.
//!
//! ## Providers
//!
//! - **Gemini** (default): Google Generative Language API with native
//!   function calling
//! - **Ollama**: local inference; tools are chosen through the fenced
//!   text protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::gemini::{GeminiConfig, GeminiProvider};
//!
//! let provider = GeminiProvider::from_config(GeminiConfig::new(api_key)?)?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

mod render;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
