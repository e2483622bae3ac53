//! Tool catalog entries and call results

use rmcp::model::{CallToolResult, Content, RawContent, ResourceContents};
use serde_json::{json, Value};

use crate::{McpError, Result};

/// Tool as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq)]
pub struct McpTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl McpTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
        }
    }
}

impl From<rmcp::model::Tool> for McpTool {
    fn from(tool: rmcp::model::Tool) -> Self {
        let input_schema = if tool.input_schema.is_empty() {
            json!({"type": "object", "properties": {}})
        } else {
            Value::Object((*tool.input_schema).clone())
        };

        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema,
        }
    }
}

/// Text rendering: text blocks verbatim, other blocks as short placeholders.
/// A result without content falls back to its structured payload.
pub fn result_text(result: &CallToolResult) -> String {
    if result.content.is_empty() {
        return result
            .structured_content
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
    }

    result
        .content
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The rendered text, or `ToolFailed` when the server flagged an error
pub fn into_text(result: CallToolResult) -> Result<String> {
    let text = result_text(&result);
    if result.is_error.unwrap_or(false) {
        Err(McpError::ToolFailed(text))
    } else {
        Ok(text)
    }
}

fn render_block(block: &Content) -> String {
    match &block.raw {
        RawContent::Text(text) => text.text.clone(),
        RawContent::Image(image) => format!("[image: {}]", image.mime_type),
        RawContent::Audio(audio) => format!("[audio: {}]", audio.mime_type),
        RawContent::Resource(resource) => match &resource.resource {
            ResourceContents::TextResourceContents { text, .. } => text.clone(),
            ResourceContents::BlobResourceContents { uri, .. } => format!("[resource: {}]", uri),
        },
        RawContent::ResourceLink(link) => format!("[resource: {}]", link.uri),
    }
}

/// Remove null-valued object fields at every depth
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
