//! Per-round accumulation of streamed tool-call fragments

use parley_provider::{ToolCallDef, ToolCallDelta};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::tools::ToolError;

#[derive(Debug, Default, Clone)]
struct PartialCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Merges fragments by their `index`: `id` and `name` keep the first
/// non-empty value, `arguments` are concatenated in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ToolCallDelta) {
        let call = self.calls.entry(delta.index).or_default();

        if call.id.is_none() {
            call.id = delta.id.clone().filter(|id| !id.is_empty());
        }
        if call.name.is_none() {
            call.name = delta.name.clone().filter(|name| !name.is_empty());
        }
        if let Some(fragment) = &delta.arguments {
            call.arguments.push_str(fragment);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Completed calls ordered by index. Calls the endpoint never gave an
    /// id get a generated one.
    pub fn finish(self) -> Vec<ToolCallRequest> {
        self.calls
            .into_iter()
            .map(|(index, call)| ToolCallRequest {
                index,
                id: call
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.name.unwrap_or_default(),
                arguments: call.arguments,
            })
            .collect()
    }
}

/// A finalized tool call from one round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub index: u32,
    pub id: String,
    pub name: String,
    /// Raw JSON text exactly as streamed
    pub arguments: String,
}

impl ToolCallRequest {
    /// Parse the argument text into an object. Blank text means no arguments.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>, ToolError> {
        if self.arguments.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&self.arguments) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ToolError::InvalidArguments(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Err(e) => Err(ToolError::InvalidArguments(format!(
                "{} in {:?}",
                e, self.arguments
            ))),
        }
    }

    pub fn to_def(&self) -> ToolCallDef {
        ToolCallDef::new(&self.id, &self.name, &self.arguments)
    }
}
