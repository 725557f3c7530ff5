//! Session Management
//!
//! A session is a named, append-only log of turns. Stores only need two
//! operations: append a batch of turns and read the whole history back.
//! A batch is stored entirely or not at all, so a failed write never leaves
//! half an exchange behind.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;

const MAX_SESSION_ID_LEN: usize = 128;

/// Unique session identifier
///
/// Restricted to `[A-Za-z0-9_.-]` so it can double as a file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate a caller-supplied identifier
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

        if s.is_empty() || s.len() > MAX_SESSION_ID_LEN || !valid_chars || s.starts_with('.') {
            return Err(AgentError::Session(format!("invalid session id: {s:?}")));
        }
        Ok(Self(s))
    }

    /// A fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = AgentError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session store trait for persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append turns to the end of a session as one unit, creating it if needed
    async fn append_all(&self, id: &SessionId, messages: &[Message]) -> Result<()>;

    /// Append a single turn
    async fn append(&self, id: &SessionId, message: &Message) -> Result<()> {
        self.append_all(id, std::slice::from_ref(message)).await
    }

    /// Full history of a session, oldest first (empty if unknown)
    async fn read_history(&self, id: &SessionId) -> Result<Vec<Message>>;
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Vec<Message>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append_all(&self, id: &SessionId, messages: &[Message]) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(id.clone()).or_default().extend_from_slice(messages);
        Ok(())
    }

    async fn read_history(&self, id: &SessionId) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).cloned().unwrap_or_default())
    }
}

/// File-backed store: one `<session>.jsonl` file per session, one turn per line
pub struct JsonlSessionStore {
    dir: PathBuf,
}

impl JsonlSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", id.as_str()))
    }
}

fn store_error(context: &str, path: &Path, err: impl std::fmt::Display) -> AgentError {
    AgentError::Session(format!("{context} {}: {err}", path.display()))
}

/// Cut a torn last line left by an interrupted write so the next append
/// starts on a fresh line. Returns the number of bytes dropped.
async fn repair_tail(file: &mut File) -> std::io::Result<u64> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).await?;
    file.read_exact(&mut last).await?;
    if last[0] == b'\n' {
        return Ok(0);
    }

    let mut raw = Vec::new();
    file.seek(SeekFrom::Start(0)).await?;
    file.read_to_end(&mut raw).await?;
    let keep = raw.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1) as u64;
    file.set_len(keep).await?;
    Ok(len - keep)
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn append_all(&self, id: &SessionId, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let path = self.path_for(id);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| store_error("cannot create", &self.dir, e))?;

        let mut batch = String::new();
        for message in messages {
            batch.push_str(&serde_json::to_string(message)?);
            batch.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| store_error("cannot open", &path, e))?;

        let dropped = repair_tail(&mut file)
            .await
            .map_err(|e| store_error("cannot repair", &path, e))?;
        if dropped > 0 {
            tracing::warn!(session = %id, bytes = dropped, "Dropped torn last line before appending");
        }

        // One write per batch: an interrupted call leaves at most a torn tail,
        // which readers skip and the next append cuts.
        file.write_all(batch.as_bytes())
            .await
            .map_err(|e| store_error("cannot append to", &path, e))?;
        file.sync_data()
            .await
            .map_err(|e| store_error("cannot sync", &path, e))?;

        tracing::debug!(session = %id, turns = messages.len(), "Appended turns");
        Ok(())
    }

    async fn read_history(&self, id: &SessionId) -> Result<Vec<Message>> {
        let path = self.path_for(id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error("cannot read", &path, e)),
        };

        let complete = raw.ends_with('\n');
        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut history = Vec::with_capacity(lines.len());

        for (idx, line) in lines.iter().enumerate() {
            match serde_json::from_str::<Message>(line) {
                Ok(message) => history.push(message),
                Err(e) if idx + 1 == lines.len() && !complete => {
                    tracing::warn!(session = %id, error = %e, "Ignoring truncated last turn");
                }
                Err(e) => {
                    return Err(store_error(&format!("corrupt line {} in", idx + 1), &path, e));
                }
            }
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_session_id_validation() {
        assert!(SessionId::parse("sessao_001").is_ok());
        assert!(SessionId::parse("a.b-c_D9").is_ok());

        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("../etc/passwd").is_err());
        assert!(SessionId::parse(".hidden").is_err());
        assert!(SessionId::parse("com espaço").is_err());
        assert!(SessionId::parse("x".repeat(129)).is_err());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        let id = SessionId::parse("s1").unwrap();

        assert!(store.read_history(&id).await.unwrap().is_empty());

        store.append(&id, &Message::user("oi")).await.unwrap();
        store.append(&id, &Message::assistant("olá!")).await.unwrap();

        let first = store.read_history(&id).await.unwrap();
        let second = store.read_history(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, Role::User);
        assert_eq!(first[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_jsonl_store_round_trip_and_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path().join("history"));
        let a = SessionId::parse("a").unwrap();
        let b = SessionId::parse("b").unwrap();

        store.append(&a, &Message::user("pergunta")).await.unwrap();
        store.append(&a, &Message::tool("nutrition_advice", "resultado")).await.unwrap();
        store.append(&b, &Message::user("outra")).await.unwrap();

        let history = store.read_history(&a).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].name.as_deref(), Some("nutrition_advice"));
        assert_eq!(store.read_history(&b).await.unwrap().len(), 1);
        assert_eq!(history, store.read_history(&a).await.unwrap());
    }

    #[tokio::test]
    async fn test_jsonl_store_skips_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path());
        let id = SessionId::parse("s").unwrap();

        store.append(&id, &Message::user("oi")).await.unwrap();
        let path = dir.path().join("s.jsonl");
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str(r#"{"role":"assis"#);
        std::fs::write(&path, raw).unwrap();

        let history = store.read_history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_store_appends_cleanly_after_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path());
        let id = SessionId::parse("s").unwrap();

        store.append(&id, &Message::user("oi")).await.unwrap();
        let path = dir.path().join("s.jsonl");
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str(r#"{"role":"assis"#);
        std::fs::write(&path, raw).unwrap();

        store
            .append_all(&id, &[Message::user("de novo"), Message::assistant("claro")])
            .await
            .unwrap();

        let history = store.read_history(&id).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["oi", "de novo", "claro"]);
        assert!(std::fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[tokio::test]
    async fn test_jsonl_store_repairs_file_holding_only_a_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path());
        let id = SessionId::parse("s").unwrap();

        std::fs::write(dir.path().join("s.jsonl"), r#"{"role":"us"#).unwrap();
        store.append(&id, &Message::user("oi")).await.unwrap();

        let history = store.read_history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "oi");
    }

    #[tokio::test]
    async fn test_append_all_keeps_batch_order() {
        let store = MemorySessionStore::new();
        let id = SessionId::parse("s").unwrap();
        let batch = [
            Message::user("pergunta"),
            Message::tool("nutrition_advice", "dados"),
            Message::assistant("resposta"),
        ];

        store.append_all(&id, &batch).await.unwrap();
        assert_eq!(store.read_history(&id).await.unwrap(), batch);
    }

    #[tokio::test]
    async fn test_jsonl_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSessionStore::new(dir.path());
        let id = SessionId::parse("s").unwrap();

        std::fs::write(dir.path().join("s.jsonl"), "garbage\n").unwrap();
        assert!(matches!(
            store.read_history(&id).await,
            Err(AgentError::Session(_))
        ));
    }
}
