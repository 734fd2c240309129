//! Backend Readiness Prober
//!
//! A bounded-retry health check gating dependent initialization. The client
//! starts before the backend finishes booting, so startup polls `/health`
//! until it answers or the retry budget runs out.
//!
//! Failure is non-fatal: callers must degrade gracefully (skip the model
//! list, TTS state, and module initialization) rather than abort the
//! application.

use std::time::Duration;

use crate::backend::AssistantBackend;
use crate::error::ClientError;

/// Readiness probe settings: fixed delay, no backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Maximum number of health-check attempts.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_retries: 30,
            delay: Duration::from_secs(1),
        }
    }
}

/// Poll the backend's health endpoint until it reports ready.
///
/// Returns `true` as soon as any probe sees a 2xx response, `false` once
/// `max_retries` attempts have failed. Side effects are limited to network
/// calls and logging.
pub async fn wait_for_backend<B>(backend: &B, config: &ProbeConfig) -> bool
where
    B: AssistantBackend + ?Sized,
{
    for attempt in 1..=config.max_retries {
        if backend.health_check().await {
            tracing::info!(attempt, "Backend is ready");
            return true;
        }

        tracing::debug!(
            attempt,
            max_retries = config.max_retries,
            "Backend not ready yet"
        );

        if attempt < config.max_retries {
            tokio::time::sleep(config.delay).await;
        }
    }

    tracing::warn!(
        attempts = config.max_retries,
        "Backend did not become ready; entering degraded mode"
    );
    false
}

/// Strict variant of [`wait_for_backend`] for callers that cannot degrade:
/// probe exhaustion becomes a typed [`ClientError::ReadinessTimeout`].
pub async fn require_backend<B>(backend: &B, config: &ProbeConfig) -> Result<(), ClientError>
where
    B: AssistantBackend + ?Sized,
{
    if wait_for_backend(backend, config).await {
        Ok(())
    } else {
        Err(ClientError::ReadinessTimeout {
            attempts: config.max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::error::ClientError;
    use crate::protocol::{
        ConversationHistory, ConversationSummary, MessageRequest, MessageResponse, ModelInfo,
    };

    /// Backend that becomes healthy after a fixed number of probes.
    struct FlakyBackend {
        healthy_after: u32,
        probes: AtomicU32,
    }

    impl FlakyBackend {
        fn new(healthy_after: u32) -> Self {
            Self {
                healthy_after,
                probes: AtomicU32::new(0),
            }
        }

        fn probe_count(&self) -> u32 {
            self.probes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssistantBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> bool {
            let seen = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
            seen > self.healthy_after
        }

        async fn send_message(
            &self,
            _request: &MessageRequest,
        ) -> Result<MessageResponse, ClientError> {
            unreachable!("probe tests never send messages")
        }

        async fn new_conversation(&self) -> Result<String, ClientError> {
            unreachable!()
        }

        async fn list_conversations(
            &self,
            _limit: usize,
        ) -> Result<Vec<ConversationSummary>, ClientError> {
            unreachable!()
        }

        async fn conversation(&self, _id: &str) -> Result<ConversationHistory, ClientError> {
            unreachable!()
        }

        async fn rename_conversation(&self, _id: &str, _title: &str) -> Result<(), ClientError> {
            unreachable!()
        }

        async fn delete_conversation(&self, _id: &str) -> Result<(), ClientError> {
            unreachable!()
        }

        async fn tts_status(&self) -> Result<bool, ClientError> {
            unreachable!()
        }

        async fn set_tts_status(&self, _enabled: bool) -> Result<(), ClientError> {
            unreachable!()
        }

        async fn available_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
            unreachable!()
        }

        async fn start_voice(&self) -> Result<(), ClientError> {
            unreachable!()
        }

        async fn stop_voice(&self) -> Result<(), ClientError> {
            unreachable!()
        }

        async fn listen_voice(&self) -> Result<Option<String>, ClientError> {
            unreachable!()
        }

        async fn feature_available(&self, _endpoint: &str) -> bool {
            unreachable!()
        }

        async fn send_email(
            &self,
            _to: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<(), ClientError> {
            unreachable!()
        }
    }

    fn fast_probe(max_retries: u32) -> ProbeConfig {
        ProbeConfig {
            max_retries,
            delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn test_ready_immediately() {
        let backend = FlakyBackend::new(0);
        assert!(wait_for_backend(&backend, &fast_probe(3)).await);
        assert_eq!(backend.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_ready() {
        let backend = FlakyBackend::new(2);
        assert!(wait_for_backend(&backend, &fast_probe(5)).await);
        assert_eq!(backend.probe_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let backend = FlakyBackend::new(10);
        assert!(!wait_for_backend(&backend, &fast_probe(4)).await);
        assert_eq!(backend.probe_count(), 4);
    }

    #[tokio::test]
    async fn test_require_backend_maps_exhaustion_to_error() {
        let backend = FlakyBackend::new(10);
        let result = require_backend(&backend, &fast_probe(3)).await;
        assert!(matches!(
            result,
            Err(ClientError::ReadinessTimeout { attempts: 3 })
        ));

        let backend = FlakyBackend::new(0);
        assert!(require_backend(&backend, &fast_probe(3)).await.is_ok());
    }
}
