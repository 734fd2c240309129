//! Message Exchange Coordinator
//!
//! The top-level orchestrator of the conversation client. It owns the
//! conversation state, drives the rendering engine and action widgets,
//! coordinates the ephemeral animation state machine, and uses the
//! readiness prober before enabling backend-dependent features.
//!
//! # Send Lifecycle
//!
//! `idle -> sending -> {success | error} -> idle`, per pending send:
//!
//! 1. Whitespace-only input is a no-op (not an error).
//! 2. The user message is appended optimistically and never rolled back.
//! 3. The thinking indicator appears.
//! 4. One request goes out; on response the indicator is removed
//!    unconditionally and either the rendered reply or a single fixed error
//!    message is appended. Sends are never retried automatically.
//!
//! Sends are not serialized: a new send may start while a previous one is
//! outstanding. Each exchange awaits its own response, and indicator
//! handling always removes *the* current indicator rather than a specific
//! instance.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::actions::{ActionWidget, ConfirmationReply, MusicPlayer};
use crate::animation::{AnimationState, AvatarTransition};
use crate::backend::AssistantBackend;
use crate::config::ClientConfig;
use crate::conversation::{ConversationState, Message, MessageId, MessageRole};
use crate::error::ClientError;
use crate::greeting;
use crate::messages::{NotifyLevel, UiUpdate};
use crate::probe;
use crate::protocol::{ConversationSummary, MessageRequest, ModelInfo, UiAction};

/// The single fixed reply shown for any failed exchange. Calm and
/// non-technical; details go to the log.
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error. Please make sure the backend is running.";

/// The conversation client coordinator.
pub struct ChatCoordinator<B: AssistantBackend> {
    /// Runtime configuration.
    config: ClientConfig,
    /// The assistant backend.
    backend: Arc<B>,
    /// Conversation state. Owned exclusively here; no other component
    /// mutates it.
    conversation: ConversationState,
    /// Ephemeral animation state machine.
    animations: AnimationState,
    /// Channel to the presentation surface.
    tx: mpsc::Sender<UiUpdate>,
    /// Set when the readiness probe gave up; dependent features skip
    /// initialization.
    degraded: bool,
    /// Whether voice mode is active.
    voice_active: bool,
    /// Optional external music player collaborator.
    music_player: Option<Arc<dyn MusicPlayer>>,
}

impl<B: AssistantBackend + 'static> ChatCoordinator<B> {
    /// Create a coordinator over a backend.
    pub fn new(backend: B, config: ClientConfig, tx: mpsc::Sender<UiUpdate>) -> Self {
        let conversation = ConversationState::new(config.model.clone());
        Self {
            config,
            backend: Arc::new(backend),
            conversation,
            animations: AnimationState::new(),
            tx,
            degraded: false,
            voice_active: false,
            music_player: None,
        }
    }

    /// Attach a music player collaborator.
    #[must_use]
    pub fn with_music_player(mut self, player: Arc<dyn MusicPlayer>) -> Self {
        self.music_player = Some(player);
        self
    }

    /// Shared handle to the backend (e.g. for the module loader).
    #[must_use]
    pub fn backend(&self) -> Arc<B> {
        self.backend.clone()
    }

    /// The conversation state.
    #[must_use]
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// The animation state machine.
    #[must_use]
    pub fn animations(&self) -> &AnimationState {
        &self.animations
    }

    /// Whether the runtime is in degraded mode (backend never became ready).
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether voice mode is active.
    #[must_use]
    pub fn voice_active(&self) -> bool {
        self.voice_active
    }

    /// Start the coordinator: probe the backend, initialize dependent
    /// features when it is ready, and show the welcome greeting.
    ///
    /// Probe exhaustion is non-fatal: the runtime enters degraded mode and
    /// the model list and TTS state simply do not initialize.
    pub async fn start(&mut self) {
        let ready = probe::wait_for_backend(self.backend.as_ref(), &self.config.probe).await;
        self.degraded = !ready;

        if ready {
            if let Err(error) = self.refresh_models().await {
                tracing::warn!(error = %error, "Could not load model list");
            }
            match self.backend.tts_status().await {
                Ok(enabled) => self.emit(UiUpdate::TtsState { enabled }).await,
                Err(error) => tracing::warn!(error = %error, "Could not load TTS state"),
            }
        } else {
            self.notify(
                NotifyLevel::Warning,
                "Assistant features are limited until the backend is reachable.",
            )
            .await;
        }

        self.welcome().await;
    }

    /// Send a user message.
    ///
    /// Empty or whitespace-only input is ignored. The user message is
    /// appended immediately (optimistic; never rolled back on failure).
    pub async fn send(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        let id = self.conversation.push(Message::user(trimmed));
        self.emit(UiUpdate::MessageAppended {
            id,
            role: MessageRole::User,
        })
        .await;

        let indicator = self.animations.show_thinking();
        self.emit(UiUpdate::ThinkingStarted { indicator }).await;

        let request = MessageRequest::new(trimmed, self.conversation.selected_model.clone())
            .with_conversation(self.conversation.conversation_id().map(str::to_string));
        self.dispatch(request).await;
    }

    /// Run one exchange and fold the response into the conversation.
    async fn dispatch(&mut self, request: MessageRequest) {
        let result = self.backend.send_message(&request).await;

        // The indicator comes down unconditionally, success or error.
        if self.animations.clear_thinking() {
            self.emit(UiUpdate::ThinkingCleared).await;
        }

        match result {
            Ok(response) if response.is_success() => {
                if let Some(conversation_id) = response.conversation_id.clone() {
                    self.conversation.bind_conversation(conversation_id);
                }

                let text = response
                    .response
                    .clone()
                    .filter(|text| !text.trim().is_empty());
                match text {
                    Some(text) => {
                        let action = response.action();
                        self.append_assistant(&text, action).await;
                    }
                    None => {
                        tracing::warn!("Success reply carried no usable content");
                        self.append_assistant(ERROR_REPLY, None).await;
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(status = %response.status, "Message exchange failed");
                self.append_assistant(ERROR_REPLY, None).await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Message exchange failed");
                self.append_assistant(ERROR_REPLY, None).await;
            }
        }
    }

    /// Append an assistant reply: render the text, attach the action
    /// widget, and schedule the avatar timers.
    async fn append_assistant(&mut self, text: &str, action: Option<UiAction>) {
        let widget =
            action.and_then(|a| ActionWidget::from_action(a, self.music_player.as_deref()));
        let message = Message::assistant(text, widget);
        let id = message.id;
        self.conversation.push(message);
        self.animations.schedule_avatar(id, text, Instant::now());
        self.emit(UiUpdate::MessageAppended {
            id,
            role: MessageRole::Assistant,
        })
        .await;
    }

    /// Confirm an email draft: consumes the widget, echoes the user's
    /// acceptance, and sends the fixed confirmation token (with the edited
    /// body) through the normal exchange path. The follow-up reply renders
    /// recursively, including a possible new action.
    pub async fn confirm_email(&mut self, message_id: MessageId) {
        if let Some(reply) = self.take_email_reply(message_id, true) {
            self.send_confirmation(reply).await;
        }
    }

    /// Cancel an email draft: consumes the widget and sends the fixed
    /// rejection token.
    pub async fn cancel_email(&mut self, message_id: MessageId) {
        if let Some(reply) = self.take_email_reply(message_id, false) {
            self.send_confirmation(reply).await;
        }
    }

    /// Edit the body of a pending email widget.
    pub fn edit_email_body(&mut self, message_id: MessageId, body: impl Into<String>) {
        if let Some(message) = self.conversation.message_mut(&message_id) {
            if let Some(ActionWidget::Email(email)) = message.action.as_mut() {
                email.edit_body(body);
            }
        }
    }

    /// Resolve a widget click, removing the widget so it cannot be used
    /// twice.
    fn take_email_reply(&mut self, message_id: MessageId, confirm: bool) -> Option<ConfirmationReply> {
        let message = self.conversation.message_mut(&message_id)?;
        let ActionWidget::Email(email) = message.action.as_mut()? else {
            return None;
        };
        let reply = if confirm {
            email.confirm()
        } else {
            email.cancel()
        };
        let reply = reply?;
        // The widget comes down on the first click.
        message.action = None;
        Some(reply)
    }

    /// Echo the user's resolution and dispatch the confirmation token.
    async fn send_confirmation(&mut self, reply: ConfirmationReply) {
        let id = self.conversation.push(Message::user(reply.echo));
        self.emit(UiUpdate::MessageAppended {
            id,
            role: MessageRole::User,
        })
        .await;

        let mut request =
            MessageRequest::new(reply.token, self.conversation.selected_model.clone())
                .with_conversation(self.conversation.conversation_id().map(str::to_string));
        if let Some(body) = reply.updated_body {
            request = request.with_updated_body(body);
        }
        self.dispatch(request).await;
    }

    /// Resolve a citation click against the search deck attached to the
    /// same message. Returns the highlighted card position, or `None` when
    /// the citation does not resolve (a no-op, not an error).
    pub fn resolve_citation(
        &mut self,
        message_id: MessageId,
        index: usize,
        now: Instant,
    ) -> Option<usize> {
        let message = self.conversation.message_mut(&message_id)?;
        match message.action.as_mut() {
            Some(ActionWidget::SearchDeck(deck)) => deck.highlight_citation(index, now),
            _ => None,
        }
    }

    /// Advance timers: avatar transitions and highlight pulses.
    pub async fn tick(&mut self, now: Instant) {
        for transition in self.animations.tick(now) {
            let update = match transition {
                AvatarTransition::Activated(id) => UiUpdate::AvatarActivated { id },
                AvatarTransition::Deactivated(id) => UiUpdate::AvatarDeactivated { id },
            };
            self.emit(update).await;
        }

        for message in self.conversation.messages_mut() {
            if let Some(ActionWidget::SearchDeck(deck)) = message.action.as_mut() {
                deck.tick(now);
            }
        }
    }

    /// Start a fresh conversation: clears the binding, the messages, and
    /// all ephemeral state, then shows the welcome greeting.
    pub async fn new_conversation(&mut self) {
        if self.animations.clear_thinking() {
            self.emit(UiUpdate::ThinkingCleared).await;
        }
        self.animations.reset();
        self.conversation.reset();
        self.emit(UiUpdate::ConversationCleared).await;
        self.welcome().await;
    }

    /// Eagerly allocate a conversation on the server and bind to it.
    pub async fn start_conversation_on_server(&mut self) -> Result<String, ClientError> {
        let id = self.backend.new_conversation().await?;
        self.animations.reset();
        self.conversation.reset();
        self.conversation.bind_conversation(id.clone());
        self.emit(UiUpdate::ConversationCleared).await;
        Ok(id)
    }

    /// Load a stored conversation, replacing the in-memory sequence
    /// wholesale in server order and rebinding the conversation id.
    pub async fn load_conversation(&mut self, id: &str) -> Result<(), ClientError> {
        let history = self.backend.conversation(id).await?;

        let messages: Vec<Message> = history
            .messages
            .into_iter()
            .map(|stored| match stored.role.as_str() {
                "user" => Message::user(stored.content),
                _ => Message::assistant(stored.content, None),
            })
            .collect();
        let message_count = messages.len();

        self.animations.reset();
        self.conversation.replace(id, messages);
        self.emit(UiUpdate::ConversationReplaced {
            conversation_id: id.to_string(),
            message_count,
        })
        .await;
        Ok(())
    }

    /// Recent conversations, newest first.
    pub async fn list_recent(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        self.backend
            .list_conversations(self.config.history_limit)
            .await
    }

    /// Rename a stored conversation.
    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), ClientError> {
        self.backend.rename_conversation(id, title).await
    }

    /// Delete a stored conversation. Deleting the currently bound one
    /// resets the in-memory state and shows the welcome greeting.
    pub async fn delete_conversation(&mut self, id: &str) -> Result<(), ClientError> {
        self.backend.delete_conversation(id).await?;

        if self.conversation.conversation_id() == Some(id) {
            self.animations.reset();
            self.conversation.reset();
            self.emit(UiUpdate::ConversationCleared).await;
            self.welcome().await;
        }
        Ok(())
    }

    /// Reload the model list and announce it.
    pub async fn refresh_models(&mut self) -> Result<Vec<ModelInfo>, ClientError> {
        let models = self.backend.available_models().await?;
        self.emit(UiUpdate::ModelsLoaded {
            models: models.clone(),
        })
        .await;
        Ok(models)
    }

    /// Select the model used for subsequent sends.
    pub async fn select_model(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.conversation.selected_model = id.clone();
        self.emit(UiUpdate::ModelSelected { id }).await;
    }

    /// Current TTS setting.
    pub async fn tts_enabled(&self) -> Result<bool, ClientError> {
        self.backend.tts_status().await
    }

    /// Toggle TTS. Returns the effective state: on failure the previous
    /// value is kept and re-announced so the surface can snap its toggle
    /// back.
    pub async fn set_tts(&mut self, enabled: bool) -> bool {
        let effective = match self.backend.set_tts_status(enabled).await {
            Ok(()) => enabled,
            Err(error) => {
                tracing::warn!(error = %error, "Could not change TTS setting");
                !enabled
            }
        };
        self.emit(UiUpdate::TtsState { enabled: effective }).await;
        effective
    }

    /// Toggle voice mode. Returns the new state.
    pub async fn toggle_voice(&mut self) -> bool {
        if self.voice_active {
            self.voice_active = false;
            if let Err(error) = self.backend.stop_voice().await {
                tracing::warn!(error = %error, "Could not stop voice mode");
            }
            self.emit(UiUpdate::VoiceState { active: false }).await;
            self.append_assistant("Voice mode deactivated.", None).await;
        } else {
            match self.backend.start_voice().await {
                Ok(()) => {
                    self.voice_active = true;
                    self.emit(UiUpdate::VoiceState { active: true }).await;
                    self.append_assistant("Voice mode active. I'm listening.", None)
                        .await;
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Could not start voice mode");
                    self.notify(NotifyLevel::Warning, "Voice mode is unavailable right now.")
                        .await;
                }
            }
        }
        self.voice_active
    }

    /// One voice poll. A recognized utterance goes through the normal send
    /// path (user message, indicator, exchange). Callers back off to a
    /// slower cadence when this errors.
    pub async fn poll_voice_once(&mut self) -> Result<Option<String>, ClientError> {
        if !self.voice_active {
            return Ok(None);
        }
        let heard = self.backend.listen_voice().await?;
        if let Some(ref text) = heard {
            self.send(text).await;
        }
        Ok(heard)
    }

    /// Send an email directly (the compose flow of the email module, as
    /// opposed to the assistant-driven confirmation widget).
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ClientError> {
        self.backend.send_email(to, subject, body).await
    }

    /// Show the welcome greeting when the conversation is empty.
    async fn welcome(&mut self) {
        if !self.conversation.is_empty() {
            return;
        }
        let text = greeting::time_based_greeting();
        self.append_assistant(&text, None).await;
    }

    /// Emit a notice to the surface.
    async fn notify(&self, level: NotifyLevel, message: impl Into<String>) {
        self.emit(UiUpdate::Notify {
            level,
            message: message.into(),
        })
        .await;
    }

    /// Emit an update; a closed surface channel is not an error here.
    async fn emit(&self, update: UiUpdate) {
        let _ = self.tx.send(update).await;
    }
}
