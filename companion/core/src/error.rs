//! Client Error Taxonomy
//!
//! All runtime failures fall into one of four classes, each with a fixed
//! recovery strategy:
//!
//! - [`ClientError::Transport`]: network failure or timeout. Recovered
//!   locally by showing one fixed error message and clearing transient
//!   indicators. Sends are never retried automatically.
//! - [`ClientError::Protocol`]: the backend answered but the payload was
//!   unusable (`status != "success"` or malformed JSON). Treated identically
//!   to a transport failure.
//! - [`ClientError::ModuleLoad`]: an optional module failed to initialize.
//!   Isolated to that module, logged, never propagated.
//! - [`ClientError::ReadinessTimeout`]: the readiness prober exhausted its
//!   retries. Surfaced as a degraded-mode flag; dependent features skip
//!   initialization instead of crashing.
//!
//! User-visible failure text is always a single calm sentence. Raw error
//! payloads go to `tracing` only.

use thiserror::Error;

/// Errors produced by the conversation client runtime.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure reaching the backend (connection refused,
    /// timeout, DNS, TLS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend responded but the exchange failed at the protocol level:
    /// a non-success status, a non-2xx HTTP code, or a malformed body.
    #[error("protocol failure: {detail}")]
    Protocol {
        /// What the backend reported, or why the payload could not be read.
        detail: String,
    },

    /// An optional module failed during its capability check or `init`.
    #[error("module {name} failed to load: {reason}")]
    ModuleLoad {
        /// Name of the module that failed.
        name: String,
        /// Why it failed.
        reason: String,
    },

    /// The readiness prober exhausted its retry budget without seeing a
    /// healthy backend.
    #[error("backend did not become ready after {attempts} attempts")]
    ReadinessTimeout {
        /// How many probe attempts were made.
        attempts: u32,
    },
}

impl ClientError {
    /// Build a protocol error from a backend-reported status string.
    pub fn bad_status(status: impl Into<String>) -> Self {
        Self::Protocol {
            detail: format!("backend reported status {:?}", status.into()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol {
            detail: format!("malformed payload: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_message() {
        let err = ClientError::bad_status("error");
        assert_eq!(
            err.to_string(),
            "protocol failure: backend reported status \"error\""
        );
    }

    #[test]
    fn test_malformed_payload_maps_to_protocol() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ClientError::from(parse_err);
        assert!(matches!(err, ClientError::Protocol { .. }));
    }
}
