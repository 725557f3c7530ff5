//! Tool System
//!
//! Tools are text-in/text-out capabilities the model may ask for. They are
//! registered once at startup; after that the registry is shared read-only
//! (behind an `Arc`) by every session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    #[serde(rename = "tool", alias = "name")]
    pub name: String,

    /// Free-text query handed to the tool
    #[serde(default)]
    pub query: String,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }
}

/// Tool descriptor advertised to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// What the model should put in the `query` argument
    pub query_description: String,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's descriptor
    fn schema(&self) -> ToolSchema;

    /// Run the tool on a query
    async fn execute(&self, query: &str) -> Result<String>;
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(ToolSchema, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool. Names must be unique.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        if self.tools.iter().any(|(s, _)| s.name == schema.name) {
            return Err(AgentError::Config(format!(
                "duplicate tool name: {}",
                schema.name
            )));
        }
        self.tools.push((schema, tool));
        Ok(())
    }

    /// Get a tool by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|(schema, _)| schema.name == name)
            .map(|(_, tool)| Arc::clone(tool))
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// All tool descriptors, in registration order
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|(schema, _)| schema.clone()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// System prompt section describing the tools and the text tool-call
    /// protocol, for providers without native function calling
    pub fn prompt_section(&self) -> String {
        render_prompt_section(&self.list())
    }
}

/// Render the text tool-call protocol for a set of descriptors
pub fn render_prompt_section(schemas: &[ToolSchema]) -> String {
    let mut prompt = String::from("## Ferramentas disponíveis\n\n");
    prompt.push_str("Para usar uma ferramenta, responda APENAS com um bloco JSON neste formato:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"nome_da_ferramenta\", \"query\": \"pergunta\"}\n```\n\n");

    for schema in schemas {
        prompt.push_str(&format!("### {}\n", schema.name));
        prompt.push_str(&format!("{}\n", schema.description));
        prompt.push_str(&format!("- `query` (string): {}\n\n", schema.query_description));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                description: "Repete a consulta".into(),
                query_description: "Texto a repetir".into(),
            }
        }

        async fn execute(&self, query: &str) -> Result<String> {
            Ok(query.to_string())
        }
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo("echo")).unwrap();
        registry.register(Echo("eco")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("echo").is_ok());
        assert!(matches!(
            registry.lookup("unknown"),
            Err(AgentError::ToolNotFound(name)) if name == "unknown"
        ));

        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo", "eco"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo("echo")).unwrap();
        assert!(matches!(registry.register(Echo("echo")), Err(AgentError::Config(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo("echo")).unwrap();
        let tool = registry.lookup("echo").unwrap();
        assert_eq!(tool.execute("abacate").await.unwrap(), "abacate");
    }

    #[test]
    fn test_prompt_section_lists_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo("echo")).unwrap();
        let section = registry.prompt_section();
        assert!(section.contains("### echo"));
        assert!(section.contains("```tool"));
    }

    #[test]
    fn test_tool_call_wire_names() {
        let call: ToolCall = serde_json::from_str(r#"{"tool": "echo", "query": "x"}"#).unwrap();
        assert_eq!(call, ToolCall::new("echo", "x"));
        let call: ToolCall = serde_json::from_str(r#"{"name": "echo"}"#).unwrap();
        assert_eq!(call.query, "");
    }
}
