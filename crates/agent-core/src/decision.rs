//! Text Tool-Call Protocol
//!
//! Providers without native function calling let the model pick a tool by
//! emitting a fenced block:
//!
//! ````text
//! ```tool
//! {"tool": "nutrition_advice", "query": "fontes de ferro"}
//! ```
//! ````
//!
//! Anything else is a direct answer.

use crate::error::{AgentError, Result};
use crate::provider::Decision;
use crate::tool::ToolCall;

const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

/// Turn raw model text into a [`Decision`]
pub fn parse_text_decision(content: &str) -> Result<Decision> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AgentError::MalformedResponse("empty model output".into()));
    }

    if let Some(start_idx) = content.find(TOOL_FENCE) {
        let after_marker = &content[start_idx + TOOL_FENCE.len()..];
        let end_idx = after_marker.find(FENCE_END).ok_or_else(|| {
            AgentError::MalformedResponse("unterminated tool block".into())
        })?;
        let call = parse_call(after_marker[..end_idx].trim())?;
        return Ok(Decision::ToolInvocation(call));
    }

    if let Some(call) = parse_inline_call(content) {
        return Ok(Decision::ToolInvocation(call));
    }

    Ok(Decision::DirectAnswer(content.to_string()))
}

fn parse_call(json_str: &str) -> Result<ToolCall> {
    let call: ToolCall = serde_json::from_str(json_str)
        .map_err(|e| AgentError::MalformedResponse(format!("invalid tool block: {e}")))?;
    if call.name.trim().is_empty() {
        return Err(AgentError::MalformedResponse("tool block without a name".into()));
    }
    Ok(call)
}

/// A bare JSON object with a "tool" key, without the fence
fn parse_inline_call(content: &str) -> Option<ToolCall> {
    if !content.starts_with('{') || !content.contains(r#""tool""#) {
        return None;
    }

    let end = content.rfind('}')?;
    serde_json::from_str::<ToolCall>(&content[..=end])
        .ok()
        .filter(|call| !call.name.trim().is_empty())
}
