//! Conversation State
//!
//! The in-memory conversation: an optional server binding, the selected
//! model, and the ordered message sequence. Owned exclusively by the
//! coordinator; no other component mutates it.
//!
//! Messages are immutable once rendered. Re-rendering happens only by
//! reconstruction (e.g. a wholesale conversation load), never in place. The
//! one sanctioned mutation is widget interaction on a message's attached
//! action, which consumes the widget.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::ActionWidget;
use crate::render::{render, ViewNode};

/// Unique message identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generate a new unique message ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// The user.
    User,
    /// The assistant.
    Assistant,
}

/// One message in the conversation.
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique message ID.
    pub id: MessageId,
    /// Who authored it.
    pub role: MessageRole,
    /// Raw text as sent or received.
    pub raw_text: String,
    /// Structured rendered view of the text.
    pub rendered: Vec<ViewNode>,
    /// Interactive widget attached to an assistant reply, if any.
    pub action: Option<ActionWidget>,
}

impl Message {
    /// Build a user message. User text is presented verbatim, so the view is
    /// a single text node.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        let raw_text = text.into();
        let rendered = vec![ViewNode::Text(raw_text.clone())];
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            raw_text,
            rendered,
            action: None,
        }
    }

    /// Build an assistant message, rendering the text through the engine.
    #[must_use]
    pub fn assistant(text: impl Into<String>, action: Option<ActionWidget>) -> Self {
        let raw_text = text.into();
        let rendered = render(&raw_text);
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            raw_text,
            rendered,
            action,
        }
    }
}

/// The conversation owned by the coordinator.
#[derive(Clone, Debug)]
pub struct ConversationState {
    /// Server-side conversation binding. Unset until the first successful
    /// reply of a conversation; bound at most once per lifecycle.
    conversation_id: Option<String>,
    /// Model used for sends.
    pub selected_model: String,
    /// Ordered message sequence.
    messages: Vec<Message>,
}

impl ConversationState {
    /// Start an empty, unbound conversation.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            selected_model: model.into(),
            messages: Vec::new(),
        }
    }

    /// The bound conversation id, if any.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Bind the conversation id. Has effect only while unbound: the binding
    /// happens at most once per conversation lifecycle.
    pub fn bind_conversation(&mut self, id: impl Into<String>) {
        if self.conversation_id.is_none() {
            let id = id.into();
            tracing::debug!(conversation_id = %id, "Bound conversation");
            self.conversation_id = Some(id);
        }
    }

    /// Append a message, returning its id.
    pub fn push(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// All messages, in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message by id.
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Mutable lookup, for widget interaction.
    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    /// Mutable walk over all messages, for coordinator-driven widget ticks.
    pub(crate) fn messages_mut(&mut self) -> impl Iterator<Item = &mut Message> {
        self.messages.iter_mut()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Reset for a new conversation: clears the binding and the messages.
    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }

    /// Replace the message sequence wholesale from a server-provided list,
    /// preserving its order, and rebind the conversation id.
    pub fn replace(&mut self, conversation_id: impl Into<String>, messages: Vec<Message>) {
        self.conversation_id = Some(conversation_id.into());
        self.messages = messages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_user_message_is_verbatim_text() {
        let msg = Message::user("**not markdown**");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.rendered, vec![ViewNode::Text("**not markdown**".into())]);
    }

    #[test]
    fn test_assistant_message_is_rendered() {
        let msg = Message::assistant("line\nbreak", None);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.rendered.contains(&ViewNode::LineBreak));
    }

    #[test]
    fn test_binding_happens_at_most_once() {
        let mut state = ConversationState::new("gpt-4o");
        assert_eq!(state.conversation_id(), None);

        state.bind_conversation("first");
        state.bind_conversation("second");
        assert_eq!(state.conversation_id(), Some("first"));
    }

    #[test]
    fn test_reset_clears_binding_and_messages() {
        let mut state = ConversationState::new("gpt-4o");
        state.bind_conversation("c1");
        state.push(Message::user("hello"));

        state.reset();
        assert_eq!(state.conversation_id(), None);
        assert!(state.is_empty());

        // A fresh lifecycle may bind again.
        state.bind_conversation("c2");
        assert_eq!(state.conversation_id(), Some("c2"));
    }

    #[test]
    fn test_replace_preserves_server_order() {
        let mut state = ConversationState::new("gpt-4o");
        state.push(Message::user("old"));

        state.replace(
            "c9",
            vec![
                Message::user("first"),
                Message::assistant("second", None),
                Message::user("third"),
            ],
        );

        assert_eq!(state.conversation_id(), Some("c9"));
        let texts: Vec<_> = state.messages().iter().map(|m| m.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }
}
