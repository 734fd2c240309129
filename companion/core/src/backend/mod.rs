//! Assistant Backend Abstraction
//!
//! The runtime talks to the assistant service exclusively through the
//! [`AssistantBackend`] trait, so the coordinator, prober, and module loader
//! never depend on a concrete transport. [`HttpBackend`] is the production
//! implementation; tests substitute scripted backends.

pub mod http;
pub mod traits;

pub use http::HttpBackend;
pub use traits::AssistantBackend;
