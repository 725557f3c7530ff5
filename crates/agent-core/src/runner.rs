//! Session Runner
//!
//! Binds a session store, the agent loop and the retry controller behind a
//! single `run(session, text) -> answer` operation.
//!
//! ```text
//! Idle ─▶ Submitted ─▶ (AwaitingToolResult ─▶ Submitted) ─▶ Answered
//!             │
//!             └─▶ Retrying ─▶ Submitted          (bounded)
//!             └─▶ Failed(sentinel)               (retries exhausted)
//! ```
//!
//! Calls for the same session are serialized; different sessions run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::reasoning::Agent;
use crate::retry::{RetryConfig, RetryController};
use crate::session::{SessionId, SessionStore};

/// Runner configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Serves `run` calls for any number of sessions
pub struct SessionRunner {
    agent: Agent,
    store: Arc<dyn SessionStore>,
    retry: RetryController,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionRunner {
    /// Runner with the production retry controller
    pub fn new(agent: Agent, store: Arc<dyn SessionStore>, config: &RunnerConfig) -> Result<Self> {
        Ok(Self::with_retry(agent, store, RetryController::from_config(&config.retry)?))
    }

    /// Runner with a caller-supplied retry controller
    pub fn with_retry(agent: Agent, store: Arc<dyn SessionStore>, retry: RetryController) -> Self {
        Self {
            agent,
            store,
            retry,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Answer one user utterance within a session.
    ///
    /// Transient model failures are retried and end, at worst, in the
    /// max-retries answer. `Err` means the call itself failed (bad input,
    /// store failure, permanent provider rejection).
    pub async fn run(&self, session: &SessionId, user_text: &str) -> Result<String> {
        let input = user_text.trim();
        if input.is_empty() {
            return Err(AgentError::InvalidInput("mensagem vazia".into()));
        }

        let lock = self.session_lock(session).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(session, input).await
        };
        self.release_lock(session, lock).await;
        result
    }

    async fn run_locked(&self, session: &SessionId, input: &str) -> Result<String> {
        let history = self.store.read_history(session).await?;
        tracing::debug!(%session, turns = history.len(), "Loaded history");

        let store = self.store.as_ref();
        let history = history.as_slice();
        self.retry
            .execute(|| self.agent.run(session, history, input, store))
            .await
    }

    /// Stored history of a session
    pub async fn history(&self, session: &SessionId) -> Result<Vec<Message>> {
        self.store.read_history(session).await
    }

    /// Bind a session id for repeated calls
    pub fn session(&self, id: SessionId) -> SessionHandle<'_> {
        SessionHandle { runner: self, id }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    async fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(session.clone()).or_default())
    }

    /// Forget the session's lock once no other call holds or awaits it
    async fn release_lock(&self, session: &SessionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(session);
        }
    }

    /// Number of sessions with a call in flight
    pub async fn active_sessions(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// A runner bound to one session id
pub struct SessionHandle<'a> {
    runner: &'a SessionRunner,
    id: SessionId,
}

impl SessionHandle<'_> {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub async fn run(&self, user_text: &str) -> Result<String> {
        self.runner.run(&self.id, user_text).await
    }

    pub async fn history(&self) -> Result<Vec<Message>> {
        self.runner.history(&self.id).await
    }
}
