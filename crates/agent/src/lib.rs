//! Conversation core
//!
//! The tool-augmented streaming loop, the tool registry it dispatches
//! through and the transcript it reads and extends.

use thiserror::Error;

pub mod loop_agent;
pub mod stream;
pub mod tools;
pub mod transcript;

pub use loop_agent::{AgentEvent, AgentLoop, AgentLoopBuilder};
pub use stream::{ToolCallAccumulator, ToolCallRequest};
pub use tools::function::FunctionTool;
pub use tools::schema::{Param, ParamType, SchemaError};
pub use tools::{Invoke, ToolDescriptor, ToolError, ToolRegistry};
pub use transcript::{Transcript, TranscriptError};

/// Operative errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ UPLINK ERROR: {0}")]
    Provider(#[from] parley_provider::ProviderError),

    #[error("◆ TOOLKIT MISCONFIGURED: {0}")]
    Schema(#[from] SchemaError),

    #[error("◆ TRANSCRIPT CORRUPTED: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("◆ DATA LINK ERROR: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
