//! Backend Wire Protocol
//!
//! Serde types for every JSON payload exchanged with the assistant backend.
//! The backend is an HTTP service; all bodies are JSON and every response
//! carries a `status` field whose success value is the literal `"success"`.
//!
//! # Forward Compatibility
//!
//! `ui_action` payloads are decoded tolerantly: an unknown `type`
//! discriminant decays to "no action" so that older clients render the
//! message text and ignore widgets they do not understand.

use serde::{Deserialize, Serialize};

/// Status value the backend uses to signal success.
pub const STATUS_SUCCESS: &str = "success";

/// Request body for `POST /message`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    /// The user's message text.
    pub message: String,
    /// Model identifier to run the request against.
    pub model: String,
    /// Bound conversation, if one exists. Omitted on the first send of a
    /// fresh conversation; the backend allocates one and returns it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Auxiliary payload for confirmation round-trips: the edited email body
    /// accompanying a `"Yes"` send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_body: Option<String>,
}

impl MessageRequest {
    /// Build a plain message request.
    pub fn new(message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: model.into(),
            conversation_id: None,
            updated_body: None,
        }
    }

    /// Attach a conversation binding.
    #[must_use]
    pub fn with_conversation(mut self, id: Option<String>) -> Self {
        self.conversation_id = id;
        self
    }

    /// Attach an edited email body.
    #[must_use]
    pub fn with_updated_body(mut self, body: impl Into<String>) -> Self {
        self.updated_body = Some(body.into());
        self
    }
}

/// Response body for `POST /message`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Exchange status; `"success"` when the reply is usable.
    pub status: String,
    /// Assistant reply text.
    #[serde(default)]
    pub response: Option<String>,
    /// Conversation the reply belongs to. Present at least on the first
    /// reply of a new conversation.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Raw interactive action payload. Decoded on demand via
    /// [`MessageResponse::action`] so unknown types never fail the exchange.
    #[serde(default)]
    pub ui_action: Option<serde_json::Value>,
}

impl MessageResponse {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Decode the attached interactive action, if any.
    ///
    /// Unknown action types are ignored (logged at debug level) rather than
    /// treated as an error.
    #[must_use]
    pub fn action(&self) -> Option<UiAction> {
        let raw = self.ui_action.as_ref()?;
        match serde_json::from_value::<UiAction>(raw.clone()) {
            Ok(action) => Some(action),
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring unrecognized ui_action payload");
                None
            }
        }
    }
}

/// Interactive action attached to an assistant reply.
///
/// The wire format is `{"type": "...", "data": {...}}`. This is a closed sum
/// type: adding a new widget is a compile-time-checked decision, and every
/// consumer matches exhaustively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UiAction {
    /// Ask the user to confirm or cancel an outgoing email.
    EmailConfirmation {
        /// Recipient address (read-only in the widget).
        #[serde(default)]
        to: String,
        /// Subject line (read-only in the widget).
        #[serde(default)]
        subject: String,
        /// Draft body; the widget lets the user edit this before sending.
        #[serde(default)]
        body: String,
    },
    /// A track started playing; forward the metadata to the player.
    MusicPlaying {
        /// Opaque track metadata, passed through to the player collaborator.
        track_info: serde_json::Value,
    },
    /// Cited web search results backing the reply text.
    SearchResults {
        /// Ordered results; positions are 1-based and referenced by
        /// citation nodes in the reply.
        #[serde(default)]
        results: Vec<SearchResult>,
    },
}

/// A single web search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
}

/// Response body for `POST /conversation/new`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewConversationResponse {
    /// Exchange status.
    pub status: String,
    /// Identifier of the freshly created conversation.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// One entry in the recent-conversations list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation identifier (the backend's `_id` field).
    #[serde(rename = "_id")]
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Last-activity timestamp, as the backend formats it.
    pub updated_at: String,
}

/// Envelope for `GET /conversations?limit=N`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationsEnvelope {
    /// Exchange status.
    pub status: String,
    /// Recent conversations, most recent first.
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

/// A stored message inside a conversation history payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// `"user"` or `"assistant"` (anything else renders as assistant).
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Full message history of one conversation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    /// Messages in server order.
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// Envelope for `GET /conversation/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationEnvelope {
    /// Exchange status.
    pub status: String,
    /// The conversation payload.
    #[serde(default)]
    pub conversation: Option<ConversationHistory>,
}

/// Generic `{status, error?}` reply used by mutation endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Exchange status.
    pub status: String,
    /// Backend-reported failure detail, if any.
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// TTS settings payload for `GET`/`POST /settings/tts`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Exchange status (present on reads).
    #[serde(default)]
    pub status: Option<String>,
    /// Whether spoken replies are enabled.
    pub enabled: bool,
}

/// One selectable model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier sent with message requests.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
}

/// Envelope for `GET /models/available`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelsEnvelope {
    /// Exchange status.
    pub status: String,
    /// Models the backend can serve.
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Poll result from `GET /voice/listen`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoiceListenResponse {
    /// Recognized speech, when an utterance completed since the last poll.
    #[serde(default)]
    pub text: Option<String>,
}

/// Availability payload from `GET /features/{name}/status`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureStatusResponse {
    /// Explicit availability flag.
    #[serde(default)]
    pub available: Option<bool>,
    /// Exchange status; `"success"` also counts as available.
    #[serde(default)]
    pub status: Option<String>,
}

impl FeatureStatusResponse {
    /// Whether the feature's backend capability is usable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available == Some(true) || self.status.as_deref() == Some(STATUS_SUCCESS)
    }
}

/// Request body for `POST /email/send`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailRequest {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_request_omits_absent_fields() {
        let req = MessageRequest::new("hello", "gpt-4o");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "hello", "model": "gpt-4o"})
        );
    }

    #[test]
    fn test_message_request_carries_conversation_and_body() {
        let req = MessageRequest::new("Yes", "gpt-4o")
            .with_conversation(Some("c1".into()))
            .with_updated_body("edited");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["conversation_id"], "c1");
        assert_eq!(json["updated_body"], "edited");
    }

    #[test]
    fn test_email_confirmation_action_decodes() {
        let resp: MessageResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "response": "Here is the draft.",
                "ui_action": {
                    "type": "email_confirmation",
                    "data": {"to": "a@b.c", "subject": "Hi", "body": "Hello"}
                }
            }"#,
        )
        .unwrap();

        assert!(resp.is_success());
        assert_eq!(
            resp.action(),
            Some(UiAction::EmailConfirmation {
                to: "a@b.c".into(),
                subject: "Hi".into(),
                body: "Hello".into(),
            })
        );
    }

    #[test]
    fn test_search_results_action_decodes() {
        let resp: MessageResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "response": "See [1] and [2]",
                "ui_action": {
                    "type": "search_results",
                    "data": {"results": [
                        {"title": "A", "url": "http://a"},
                        {"title": "B", "url": "http://b"}
                    ]}
                }
            }"#,
        )
        .unwrap();

        match resp.action() {
            Some(UiAction::SearchResults { results }) => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].title, "A");
                assert_eq!(results[1].url, "http://b");
            }
            other => panic!("expected search results, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_type_is_ignored() {
        let resp: MessageResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "response": "ok",
                "ui_action": {"type": "hologram", "data": {"x": 1}}
            }"#,
        )
        .unwrap();

        assert!(resp.is_success());
        assert_eq!(resp.action(), None);
    }

    #[test]
    fn test_missing_action_fields_default() {
        let resp: MessageResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "ui_action": {"type": "email_confirmation", "data": {}}
            }"#,
        )
        .unwrap();

        assert_eq!(
            resp.action(),
            Some(UiAction::EmailConfirmation {
                to: String::new(),
                subject: String::new(),
                body: String::new(),
            })
        );
    }

    #[test]
    fn test_conversation_summary_maps_underscore_id() {
        let envelope: ConversationsEnvelope = serde_json::from_str(
            r#"{
                "status": "success",
                "conversations": [
                    {"_id": "abc", "title": "First chat", "updated_at": "2026-01-01T00:00:00Z"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(envelope.conversations[0].id, "abc");
    }

    #[test]
    fn test_feature_status_availability() {
        let explicit: FeatureStatusResponse =
            serde_json::from_str(r#"{"available": true}"#).unwrap();
        assert!(explicit.is_available());

        let by_status: FeatureStatusResponse =
            serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(by_status.is_available());

        let negative: FeatureStatusResponse =
            serde_json::from_str(r#"{"available": false, "status": "error"}"#).unwrap();
        assert!(!negative.is_available());
    }
}
