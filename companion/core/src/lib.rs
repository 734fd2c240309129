//! Companion Core - Conversation Client Runtime
//!
//! This crate is the client-side runtime of the Companion chat-assistant
//! desktop application: everything between "user presses send" and "pixels
//! reflect the assistant's reply", plus the bookkeeping that keeps a
//! long-lived conversation, optional feature modules, and ephemeral UI
//! state consistent while talking to the assistant backend over HTTP.
//!
//! It is completely independent of any UI framework: the same runtime can
//! drive the desktop shell, a TUI, or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Presentation Surfaces                       │
//! │        (desktop shell, CLI, headless test harness, ...)          │
//! │                             │                                    │
//! │                      UiUpdate (down)                             │
//! │               coordinator method calls (up)                      │
//! └─────────────────────────────┼────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼────────────────────────────────────┐
//! │                      COMPANION CORE                              │
//! │  ┌──────────────────────────┴─────────────────────────────────┐  │
//! │  │                    ChatCoordinator                         │  │
//! │  │  ┌──────────┐ ┌─────────┐ ┌──────────┐ ┌───────────────┐   │  │
//! │  │  │ Renderer │ │ Actions │ │Animation │ │ Conversation  │   │  │
//! │  │  └──────────┘ └─────────┘ └──────────┘ └───────────────┘   │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐   │
//! │  │   Prober     │  │ ModuleLoader │  │   AssistantBackend    │   │
//! │  └──────────────┘  └──────────────┘  └──────────┬────────────┘   │
//! └─────────────────────────────────────────────────┼────────────────┘
//!                                                   │ HTTP (reqwest)
//!                                          assistant backend service
//! ```
//!
//! # Key Types
//!
//! - [`ChatCoordinator`]: the top-level orchestrator owning conversation
//!   state and driving every other component
//! - [`AssistantBackend`] / [`HttpBackend`]: the backend boundary
//! - [`ViewNode`] / [`render`]: the markdown/code rendering engine
//! - [`UiAction`] / [`ActionWidget`]: interactive action payloads and the
//!   widgets they become
//! - [`AnimationState`]: avatar activity and the thinking indicator
//! - [`ModuleLoader`]: gated, isolated loading of optional feature modules
//!
//! # Module Overview
//!
//! - [`actions`]: interactive action renderer (email, music, search decks)
//! - [`animation`]: ephemeral animation state machine
//! - [`backend`]: assistant backend trait and HTTP implementation
//! - [`config`]: env + TOML configuration and feature flags
//! - [`conversation`]: conversation state and messages
//! - [`coordinator`]: the message exchange coordinator
//! - [`error`]: error taxonomy
//! - [`greeting`]: local time-of-day greeting
//! - [`messages`]: coordinator-to-surface updates
//! - [`modules`]: optional-module loader
//! - [`probe`]: backend readiness prober
//! - [`protocol`]: wire types
//! - [`render`]: markdown/code rendering engine

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod animation;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod coordinator;
pub mod error;
pub mod greeting;
pub mod messages;
pub mod modules;
pub mod probe;
pub mod protocol;
pub mod render;

// Re-exports for convenience
pub use actions::{ActionWidget, ConfirmationReply, EmailConfirmWidget, MusicPlayer, SearchCard, SearchDeck};
pub use animation::{AnimationState, AvatarTransition, IndicatorId};
pub use backend::{AssistantBackend, HttpBackend};
pub use config::{load_config, load_config_from_path, ClientConfig, ConfigError, FeatureFlags};
pub use conversation::{ConversationState, Message, MessageId, MessageRole};
pub use coordinator::{ChatCoordinator, ERROR_REPLY};
pub use error::ClientError;
pub use messages::{NotifyLevel, UiUpdate};
pub use modules::{LoadOutcome, LoadSummary, ModuleDescriptor, ModuleLoader, ModuleStatus};
pub use probe::{require_backend, wait_for_backend, ProbeConfig};
pub use protocol::{
    ConversationSummary, MessageRequest, MessageResponse, ModelInfo, SearchResult, UiAction,
};
pub use render::{escape_html, render, to_html, ViewNode};
