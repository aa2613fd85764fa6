//! Transcript-related types.

use loop_agent_model::{AssistantMessage, ModelMessage, ToolCallResult};

/// The ordered message history of one run.
///
/// A transcript starts with the system instructions followed by the user
/// request, and only grows afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ModelMessage>,
}

impl Transcript {
    pub(crate) fn new(system_prompt: &str, input: String) -> Self {
        Self {
            messages: vec![
                ModelMessage::System(system_prompt.to_owned()),
                ModelMessage::User(input),
            ],
        }
    }

    /// Returns all messages in order.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`, a transcript holds at least the system and user
    /// messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the last assistant message, if any.
    pub fn last_assistant(&self) -> Option<&AssistantMessage> {
        self.messages.iter().rev().find_map(ModelMessage::as_assistant)
    }

    #[inline]
    pub(crate) fn push_assistant(&mut self, message: AssistantMessage) {
        self.messages.push(ModelMessage::Assistant(message));
    }

    #[inline]
    pub(crate) fn push_tool_results(
        &mut self,
        results: impl IntoIterator<Item = ToolCallResult>,
    ) {
        self.messages
            .extend(results.into_iter().map(ModelMessage::Tool));
    }
}
