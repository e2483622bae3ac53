//! OPERATIVE TOOLKIT
//!
//! Every callable the model can reach, local or remote, is a
//! [`ToolDescriptor`]: a name, a description, a JSON-schema parameter
//! object and something that can be invoked with an argument mapping.

pub mod builtin;
pub mod function;
pub mod remote;
pub mod schema;

use async_trait::async_trait;
use indexmap::IndexMap;
use parley_mcp::{McpError, RemoteTool};
use parley_provider::Tool;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while invoking a tool. They never abort a conversation:
/// the loop renders them as the tool's result text.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("◆ TOOLKIT NOT FOUND: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Remote(#[from] McpError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can be called with an argument mapping
#[async_trait]
pub trait Invoke: Send + Sync {
    async fn invoke(&self, args: Map<String, Value>) -> Result<String, ToolError>;
}

/// A callable plus the metadata the model sees
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments
    pub parameters: Value,
    invoker: Arc<dyn Invoke>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        invoker: Arc<dyn Invoke>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            invoker,
        }
    }

    /// Function-calling schema sent with each request
    pub fn schema(&self) -> Tool {
        Tool::new(&self.name, &self.description, self.parameters.clone())
    }

    pub async fn invoke(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        self.invoker.invoke(args).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// TOOLKIT registry, owned by one agent instance
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote tools go in first under their `{server}_{tool}` names, then
    /// local tools, which replace any remote tool of the same name.
    pub fn build(locals: Vec<ToolDescriptor>, remotes: &[RemoteTool]) -> Self {
        let mut registry = Self::new();
        for tool in remotes {
            registry.register(remote::descriptor(tool));
        }
        for tool in locals {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. A later registration of the same name wins.
    pub fn register(&mut self, tool: ToolDescriptor) {
        if let Some(previous) = self.tools.insert(tool.name.clone(), tool) {
            debug!("◆ TOOLKIT '{}' OVERRIDDEN", previous.name);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ToolError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.values().map(ToolDescriptor::schema).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Copy of this registry with call-scoped tools layered on top
    pub fn with_overrides(&self, extra: &[ToolDescriptor]) -> Self {
        let mut merged = self.clone();
        for tool in extra {
            merged.register(tool.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(&'static str);

    #[async_trait]
    impl Invoke for Constant {
        async fn invoke(&self, _args: Map<String, Value>) -> Result<String, ToolError> {
            Ok(self.0.to_string())
        }
    }

    fn tool(name: &str, reply: &'static str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            format!("{} tool", name),
            json!({"type": "object", "properties": {}, "required": []}),
            Arc::new(Constant(reply)),
        )
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a", "from a"));

        let found = registry.resolve("a").unwrap();
        assert_eq!(found.invoke(Map::new()).await.unwrap(), "from a");
        assert!(matches!(registry.resolve("b"), Err(ToolError::NotFound(ref n)) if n == "b"));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a", "first"));
        registry.register(tool("b", "b"));
        registry.register(tool("a", "second"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        let result = registry.resolve("a").unwrap().invoke(Map::new()).await.unwrap();
        assert_eq!(result, "second");
    }

    #[tokio::test]
    async fn test_overrides_leave_original_untouched() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a", "base"));

        let merged = registry.with_overrides(&[tool("a", "scoped"), tool("c", "c")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged.resolve("a").unwrap().invoke(Map::new()).await.unwrap(),
            "scoped"
        );
        assert_eq!(registry.len(), 1);
        assert!(!registry.has("c"));
    }

    #[test]
    fn test_definitions_match_descriptors() {
        let registry = ToolRegistry::build(vec![tool("now", "x")], &[]);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].tool_type, "function");
        assert_eq!(defs[0].function.name, "now");
        assert_eq!(defs[0].function.description, "now tool");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ToolError::Failed("boom".into()).to_string(), "boom");
        assert_eq!(
            ToolError::MissingArgument("location".into()).to_string(),
            "missing required argument: location"
        );
        assert!(ToolError::NotFound("x".into()).to_string().contains("NOT FOUND"));
    }
}
