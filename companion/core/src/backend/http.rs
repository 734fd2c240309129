//! HTTP Backend Implementation
//!
//! Production [`AssistantBackend`] talking JSON over HTTP to the assistant
//! service (a local FastAPI process in the desktop build).
//!
//! # Endpoints
//!
//! - `GET /health` - readiness probe
//! - `POST /message` - message exchange
//! - `POST /conversation/new`, `GET /conversations`,
//!   `GET|PUT|DELETE /conversation/{id}[...]` - conversation bookkeeping
//! - `GET|POST /settings/tts`, `GET /models/available` - settings
//! - `POST /voice/start|stop`, `GET /voice/listen` - voice mode
//! - `GET /features/{name}/status` - module capability checks
//! - `POST /email/send` - email dispatch

use std::time::Duration;

use async_trait::async_trait;

use super::traits::AssistantBackend;
use crate::error::ClientError;
use crate::protocol::{
    ConversationEnvelope, ConversationHistory, ConversationSummary, ConversationsEnvelope,
    EmailRequest, FeatureStatusResponse, MessageRequest, MessageResponse, ModelInfo,
    ModelsEnvelope, NewConversationResponse, StatusResponse, TtsSettings, VoiceListenResponse,
};

/// Per-request timeout for health probes. Probes must fail fast so the
/// retry loop, not the transport, paces startup.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the assistant backend.
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL, without trailing slash.
    base_url: String,
    /// Shared HTTP client.
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create from environment (`COMPANION_BACKEND_URL`, default
    /// `http://localhost:5000`).
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("COMPANION_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        Self::new(base_url)
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL for a path starting with `/`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read a JSON body, mapping HTTP-level failure to a protocol error.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Protocol {
                detail: format!("backend returned {status}: {body}"),
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Run a `{status, error?}` mutation and fold the status check.
    async fn expect_success(response: reqwest::Response) -> Result<(), ClientError> {
        let reply: StatusResponse = Self::read_json(response).await?;
        if reply.is_success() {
            Ok(())
        } else {
            Err(ClientError::Protocol {
                detail: reply
                    .error
                    .unwrap_or_else(|| format!("backend reported status {:?}", reply.status)),
            })
        }
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.url("/health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ClientError> {
        let response = self
            .http_client
            .post(self.url("/message"))
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn new_conversation(&self) -> Result<String, ClientError> {
        let response = self
            .http_client
            .post(self.url("/conversation/new"))
            .send()
            .await?;
        let reply: NewConversationResponse = Self::read_json(response).await?;
        if reply.status != crate::protocol::STATUS_SUCCESS {
            return Err(ClientError::bad_status(reply.status));
        }
        reply.conversation_id.ok_or_else(|| ClientError::Protocol {
            detail: "conversation/new reply carried no conversation_id".to_string(),
        })
    }

    async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        let response = self
            .http_client
            .get(self.url(&format!("/conversations?limit={limit}")))
            .send()
            .await?;
        let envelope: ConversationsEnvelope = Self::read_json(response).await?;
        if envelope.status != crate::protocol::STATUS_SUCCESS {
            return Err(ClientError::bad_status(envelope.status));
        }
        Ok(envelope.conversations)
    }

    async fn conversation(&self, id: &str) -> Result<ConversationHistory, ClientError> {
        let response = self
            .http_client
            .get(self.url(&format!("/conversation/{id}")))
            .send()
            .await?;
        let envelope: ConversationEnvelope = Self::read_json(response).await?;
        if envelope.status != crate::protocol::STATUS_SUCCESS {
            return Err(ClientError::bad_status(envelope.status));
        }
        envelope.conversation.ok_or_else(|| ClientError::Protocol {
            detail: "conversation reply carried no messages".to_string(),
        })
    }

    async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), ClientError> {
        let response = self
            .http_client
            .put(self.url(&format!("/conversation/{id}/rename")))
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http_client
            .delete(self.url(&format!("/conversation/{id}")))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn tts_status(&self) -> Result<bool, ClientError> {
        let response = self
            .http_client
            .get(self.url("/settings/tts"))
            .send()
            .await?;
        let settings: TtsSettings = Self::read_json(response).await?;
        Ok(settings.enabled)
    }

    async fn set_tts_status(&self, enabled: bool) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(self.url("/settings/tts"))
            .json(&serde_json::json!({ "enabled": enabled }))
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn available_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let response = self
            .http_client
            .get(self.url("/models/available"))
            .send()
            .await?;
        let envelope: ModelsEnvelope = Self::read_json(response).await?;
        if envelope.status != crate::protocol::STATUS_SUCCESS {
            return Err(ClientError::bad_status(envelope.status));
        }
        Ok(envelope.models)
    }

    async fn start_voice(&self) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(self.url("/voice/start"))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Protocol {
                detail: format!("voice/start returned {}", response.status()),
            })
        }
    }

    async fn stop_voice(&self) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(self.url("/voice/stop"))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Protocol {
                detail: format!("voice/stop returned {}", response.status()),
            })
        }
    }

    async fn listen_voice(&self) -> Result<Option<String>, ClientError> {
        let response = self
            .http_client
            .get(self.url("/voice/listen"))
            .send()
            .await?;
        let reply: VoiceListenResponse = Self::read_json(response).await?;
        Ok(reply.text.filter(|text| !text.trim().is_empty()))
    }

    async fn feature_available(&self, endpoint: &str) -> bool {
        let result = self.http_client.get(self.url(endpoint)).send().await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(endpoint, error = %err, "Backend capability check failed");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        match response.json::<FeatureStatusResponse>().await {
            Ok(reply) => reply.is_available(),
            Err(err) => {
                tracing::warn!(endpoint, error = %err, "Unreadable capability payload");
                false
            }
        }
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ClientError> {
        let request = EmailRequest {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let response = self
            .http_client
            .post(self.url("/email/send"))
            .json(&request)
            .send()
            .await?;
        Self::expect_success(response).await
    }
}
