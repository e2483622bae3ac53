//! Conversation history
//!
//! Owned by the caller and extended in place by the loop, so history
//! persists across prompts. Entries are only ever appended.

use parley_provider::{Message, Role, ToolCallDef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("system message at position {0}, only the first entry may be a system message")]
    MisplacedSystem(usize),

    #[error("tool result at position {0} does not follow an assistant tool call")]
    OrphanToolResult(usize),

    #[error("tool result at position {0} has no tool_call_id")]
    MissingToolCallId(usize),

    #[error("tool result at position {index} answers undeclared call {id}")]
    UnknownToolCallId { index: usize, id: String },
}

/// Ordered, role-tagged messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript opened by a system prompt
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Add the system prompt to an empty transcript. Returns whether it was added.
    pub fn start_with_system(&mut self, prompt: &str) -> bool {
        if !self.messages.is_empty() || prompt.is_empty() {
            return false;
        }
        self.messages.push(Message::system(prompt));
        true
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Assistant turn declaring tool calls
    pub fn push_tool_calls(&mut self, text: Option<String>, calls: Vec<ToolCallDef>) {
        self.messages.push(Message::assistant_tool_calls(text, calls));
    }

    pub fn push_tool_result(&mut self, call_id: &str, name: &str, content: impl Into<String>) {
        self.messages.push(Message::tool(call_id, name, content));
    }

    /// Text of the latest assistant message
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.content.as_deref())
    }

    /// Check ordering rules: a system message may only come first, and each
    /// tool result must sit in the block right after the assistant message
    /// that declared its call id.
    pub fn validate(&self) -> Result<(), TranscriptError> {
        let mut open_calls: Option<HashSet<&str>> = None;

        for (index, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::System => {
                    if index != 0 {
                        return Err(TranscriptError::MisplacedSystem(index));
                    }
                    open_calls = None;
                }
                Role::User => open_calls = None,
                Role::Assistant => {
                    open_calls = message
                        .tool_calls
                        .as_ref()
                        .map(|calls| calls.iter().map(|c| c.id.as_str()).collect());
                }
                Role::Tool => {
                    let declared = open_calls
                        .as_ref()
                        .ok_or(TranscriptError::OrphanToolResult(index))?;
                    let id = message
                        .tool_call_id
                        .as_deref()
                        .ok_or(TranscriptError::MissingToolCallId(index))?;
                    if !declared.contains(id) {
                        return Err(TranscriptError::UnknownToolCallId {
                            index,
                            id: id.to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCallDef {
        ToolCallDef::new(id, "search", "{}")
    }

    #[test]
    fn test_start_with_system_only_when_empty() {
        let mut transcript = Transcript::new();
        assert!(transcript.start_with_system("Be brief."));
        assert!(!transcript.start_with_system("Again"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::System);

        let mut transcript = Transcript::new();
        assert!(!transcript.start_with_system(""));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_valid_tool_round() {
        let mut transcript = Transcript::with_system("sys");
        transcript.push_user("find cats");
        transcript.push_tool_calls(None, vec![call("a"), call("b")]);
        transcript.push_tool_result("a", "search", "1");
        transcript.push_tool_result("b", "search", "2");
        transcript.push_assistant("done");

        assert_eq!(transcript.validate(), Ok(()));
        assert_eq!(transcript.last_assistant_text(), Some("done"));
    }

    #[test]
    fn test_misplaced_system() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.push(Message::system("late"));
        assert_eq!(
            transcript.validate(),
            Err(TranscriptError::MisplacedSystem(1))
        );
    }

    #[test]
    fn test_orphan_tool_result() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.push_tool_result("a", "search", "1");
        assert_eq!(
            transcript.validate(),
            Err(TranscriptError::OrphanToolResult(1))
        );
    }

    #[test]
    fn test_tool_result_after_plain_assistant() {
        let mut transcript = Transcript::new();
        transcript.push_tool_calls(None, vec![call("a")]);
        transcript.push_tool_result("a", "search", "1");
        transcript.push_assistant("text");
        transcript.push_tool_result("a", "search", "again");
        assert_eq!(
            transcript.validate(),
            Err(TranscriptError::OrphanToolResult(3))
        );
    }

    #[test]
    fn test_unknown_call_id() {
        let mut transcript = Transcript::new();
        transcript.push_tool_calls(None, vec![call("a")]);
        transcript.push_tool_result("z", "search", "1");
        assert_eq!(
            transcript.validate(),
            Err(TranscriptError::UnknownToolCallId {
                index: 1,
                id: "z".to_string()
            })
        );
    }

    #[test]
    fn test_missing_call_id() {
        let mut transcript = Transcript::new();
        transcript.push_tool_calls(None, vec![call("a")]);
        let mut result = Message::tool("a", "search", "1");
        result.tool_call_id = None;
        transcript.push(result);
        assert_eq!(
            transcript.validate(),
            Err(TranscriptError::MissingToolCallId(1))
        );
    }

    #[test]
    fn test_serializes_as_message_list() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        let value = serde_json::to_value(&transcript).unwrap();
        assert!(value.is_array());

        let back: Transcript = serde_json::from_value(value).unwrap();
        assert_eq!(back, transcript);
    }
}
