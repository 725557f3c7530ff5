//! Shared rendering of tool turns for providers that only know user/model text.

use agent_core::{Message, Role};

/// Text a tool turn is shown as when replayed from history
pub(crate) fn tool_context(name: Option<&str>, content: &str) -> String {
    match name {
        Some(name) => format!("[Resultado da ferramenta '{name}']\n{content}"),
        None => format!("[Resultado de ferramenta]\n{content}"),
    }
}

/// Content of a history turn as plain text for its provider-side role
pub(crate) fn turn_text(message: &Message) -> String {
    match message.role {
        Role::Tool => tool_context(message.name.as_deref(), &message.content),
        Role::User | Role::Assistant => message.content.clone(),
    }
}
