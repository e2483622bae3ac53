//! Remote tools as registry entries

use async_trait::async_trait;
use parley_mcp::RemoteTool;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Invoke, ToolDescriptor, ToolError};

struct RemoteInvoker(RemoteTool);

#[async_trait]
impl Invoke for RemoteInvoker {
    async fn invoke(&self, args: Map<String, Value>) -> Result<String, ToolError> {
        Ok(self.0.call(args).await?)
    }
}

/// Registered as `{server}_{tool}`; calls reach the server under its own name.
pub fn descriptor(tool: &RemoteTool) -> ToolDescriptor {
    ToolDescriptor::new(
        tool.qualified_name(),
        tool.description(),
        tool.parameters(),
        Arc::new(RemoteInvoker(tool.clone())),
    )
}
