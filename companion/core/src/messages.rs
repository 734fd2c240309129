//! Coordinator-to-Surface Messages
//!
//! Messages the coordinator sends to the presentation surface. The surface
//! is a pure renderer: it displays what it is told and reads richer state
//! (rendered views, widgets) back through the coordinator's accessors. It
//! has no business logic of its own.

use crate::animation::IndicatorId;
use crate::conversation::{MessageId, MessageRole};
use crate::protocol::ModelInfo;

/// Notification severity levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Updates from the coordinator to the UI surface.
#[derive(Clone, Debug)]
pub enum UiUpdate {
    /// A message was appended to the conversation.
    MessageAppended {
        /// The new message's id.
        id: MessageId,
        /// Who authored it.
        role: MessageRole,
    },

    /// The conversation was cleared (new conversation started).
    ConversationCleared,

    /// The conversation was replaced wholesale from the server.
    ConversationReplaced {
        /// The bound conversation id.
        conversation_id: String,
        /// How many messages were loaded.
        message_count: usize,
    },

    /// The thinking indicator appeared.
    ThinkingStarted {
        /// Identifier of the indicator instance.
        indicator: IndicatorId,
    },

    /// The thinking indicator was removed.
    ThinkingCleared,

    /// A message's avatar became active.
    AvatarActivated {
        /// The message whose avatar lit up.
        id: MessageId,
    },

    /// A message's avatar stopped being active.
    AvatarDeactivated {
        /// The message whose avatar dimmed.
        id: MessageId,
    },

    /// The available model list was (re)loaded.
    ModelsLoaded {
        /// Models the backend can serve.
        models: Vec<ModelInfo>,
    },

    /// The selected model changed.
    ModelSelected {
        /// Identifier of the now-selected model.
        id: String,
    },

    /// Spoken-reply setting state.
    TtsState {
        /// Whether TTS is enabled.
        enabled: bool,
    },

    /// Voice mode was toggled.
    VoiceState {
        /// Whether voice capture is active.
        active: bool,
    },

    /// A non-blocking notice for the user.
    Notify {
        /// Severity.
        level: NotifyLevel,
        /// Single, calm, non-technical sentence.
        message: String,
    },
}
