//! Assistant Backend Trait
//!
//! Trait definition for the assistant service the client talks to. The
//! abstraction covers the full endpoint surface the runtime consumes:
//! message exchange, conversation bookkeeping, settings, models, voice mode,
//! feature capability checks, and email dispatch.
//!
//! # Design Philosophy
//!
//! The coordinator is generic over this trait, which keeps all protocol and
//! state-machine logic testable against a scripted backend. Implementations
//! handle transport-specific details; every fallible method maps failures
//! into [`ClientError`]'s taxonomy (transport vs protocol).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::protocol::{
    ConversationHistory, ConversationSummary, MessageRequest, MessageResponse, ModelInfo,
};

/// The assistant service, as seen from the client runtime.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Backend name for logging (e.g. "http").
    fn name(&self) -> &str;

    /// Probe `/health`. True on any 2xx response, false on everything else
    /// including transport failures. Never errors: the readiness prober
    /// treats all failures the same way.
    async fn health_check(&self) -> bool;

    /// `POST /message`: run one message exchange.
    async fn send_message(&self, request: &MessageRequest)
        -> Result<MessageResponse, ClientError>;

    /// `POST /conversation/new`: allocate a conversation, returning its id.
    async fn new_conversation(&self) -> Result<String, ClientError>;

    /// `GET /conversations?limit=N`: recent conversations.
    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, ClientError>;

    /// `GET /conversation/{id}`: full message history.
    async fn conversation(&self, id: &str) -> Result<ConversationHistory, ClientError>;

    /// `PUT /conversation/{id}/rename`.
    async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), ClientError>;

    /// `DELETE /conversation/{id}`.
    async fn delete_conversation(&self, id: &str) -> Result<(), ClientError>;

    /// `GET /settings/tts`: whether spoken replies are enabled.
    async fn tts_status(&self) -> Result<bool, ClientError>;

    /// `POST /settings/tts`: enable or disable spoken replies.
    async fn set_tts_status(&self, enabled: bool) -> Result<(), ClientError>;

    /// `GET /models/available`: models the backend can serve.
    async fn available_models(&self) -> Result<Vec<ModelInfo>, ClientError>;

    /// `POST /voice/start`: begin voice capture.
    async fn start_voice(&self) -> Result<(), ClientError>;

    /// `POST /voice/stop`: end voice capture.
    async fn stop_voice(&self) -> Result<(), ClientError>;

    /// `GET /voice/listen`: poll for a recognized utterance.
    async fn listen_voice(&self) -> Result<Option<String>, ClientError>;

    /// Capability check against a feature-status endpoint (for example
    /// `/features/email/status`). False on any failure: an unreachable
    /// capability endpoint means the module must not initialize.
    async fn feature_available(&self, endpoint: &str) -> bool;

    /// `POST /email/send`.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ClientError>;
}

/// Shared-ownership backends are backends: every call forwards to the inner
/// value. Lets the coordinator (and its generic `B`) be driven through an
/// `Arc` when the backend must be observed from more than one place.
#[async_trait]
impl<T: AssistantBackend + ?Sized> AssistantBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn health_check(&self) -> bool {
        (**self).health_check().await
    }

    async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ClientError> {
        (**self).send_message(request).await
    }

    async fn new_conversation(&self) -> Result<String, ClientError> {
        (**self).new_conversation().await
    }

    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        (**self).list_conversations(limit).await
    }

    async fn conversation(&self, id: &str) -> Result<ConversationHistory, ClientError> {
        (**self).conversation(id).await
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), ClientError> {
        (**self).rename_conversation(id, title).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ClientError> {
        (**self).delete_conversation(id).await
    }

    async fn tts_status(&self) -> Result<bool, ClientError> {
        (**self).tts_status().await
    }

    async fn set_tts_status(&self, enabled: bool) -> Result<(), ClientError> {
        (**self).set_tts_status(enabled).await
    }

    async fn available_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        (**self).available_models().await
    }

    async fn start_voice(&self) -> Result<(), ClientError> {
        (**self).start_voice().await
    }

    async fn stop_voice(&self) -> Result<(), ClientError> {
        (**self).stop_voice().await
    }

    async fn listen_voice(&self) -> Result<Option<String>, ClientError> {
        (**self).listen_voice().await
    }

    async fn feature_available(&self, endpoint: &str) -> bool {
        (**self).feature_available(endpoint).await
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ClientError> {
        (**self).send_email(to, subject, body).await
    }
}
