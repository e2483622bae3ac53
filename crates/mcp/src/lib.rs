//! Remote tool servers
//!
//! Model Context Protocol clients built on the `rmcp` SDK. Each configured
//! server becomes a [`ToolSession`], reached over a child process's stdio
//! or over streamable HTTP; the [`ToolServerManager`] starts them, collects
//! their tool catalogs and stops them in reverse order.

use std::time::Duration;
use thiserror::Error;

pub mod manager;
pub mod session;
pub mod tool;

pub use manager::{qualified_tool_name, RemoteTool, ToolServerManager};
pub use session::{McpSession, ToolSession};
pub use tool::{strip_nulls, McpTool};

/// Name announced as `clientInfo.name`
pub const CLIENT_NAME: &str = "parley";

/// Per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Tool-server errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("LAUNCH FAILED: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SIGNAL LOST: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HANDSHAKE FAILED: {0}")]
    Handshake(String),

    #[error("REMOTE ERROR: {0}")]
    Service(#[from] rmcp::service::ServiceError),

    #[error("NO REPLY TO {0}")]
    Timeout(String),

    #[error("CHANNEL CLOSED")]
    Closed,

    #[error("INVALID SERVER CONFIG: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    ToolFailed(String),
}

pub type Result<T> = std::result::Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = McpError::Handshake("connection refused".to_string());
        assert_eq!(err.to_string(), "HANDSHAKE FAILED: connection refused");

        let err = McpError::Timeout("tools/call".to_string());
        assert_eq!(err.to_string(), "NO REPLY TO tools/call");

        let err = McpError::ToolFailed("division by zero".to_string());
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        use std::error::Error as _;
        let err = McpError::Spawn {
            command: "missing-binary".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("missing-binary"));
        assert!(err.source().is_some());
    }
}
