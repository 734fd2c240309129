//! Ephemeral Animation State Machine
//!
//! Transient visual state coordinated across concurrent messages: per-reply
//! avatar activity and the single thinking indicator. Modeled as an explicit
//! deadline-driven state machine advanced by [`AnimationState::tick`], not
//! as ad-hoc timer chains.
//!
//! # Invariants
//!
//! - At most one avatar is active at any instant. Activating a newer one
//!   deactivates every other first.
//! - At most one thinking indicator exists. Showing a new one removes any
//!   existing one (idempotent), and it is removed unconditionally when a
//!   response arrives, success or error.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::conversation::MessageId;

/// Delay before a freshly rendered reply's avatar lights up, approximating
/// perceived response latency.
pub const ACTIVATION_DELAY: Duration = Duration::from_millis(500);

/// Minimum time an avatar stays active.
pub const MIN_ACTIVE: Duration = Duration::from_secs(2);

/// Additional active time per word of the reply.
pub const PER_WORD: Duration = Duration::from_millis(400);

/// Identifier of a thinking indicator instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndicatorId(pub Uuid);

/// A visible avatar transition produced by a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvatarTransition {
    /// This message's avatar became active.
    Activated(MessageId),
    /// This message's avatar stopped being active.
    Deactivated(MessageId),
}

/// Lifecycle of one message's avatar timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AvatarPhase {
    /// Waiting for the activation delay.
    Scheduled,
    /// Currently the active avatar.
    Active,
    /// Finished (deactivated or superseded).
    Done,
}

/// Timer entry for one message's avatar.
#[derive(Clone, Debug)]
struct AvatarTimer {
    message_id: MessageId,
    activate_at: Instant,
    deactivate_at: Instant,
    phase: AvatarPhase,
}

/// How long an avatar stays active for a reply of the given text.
#[must_use]
pub fn active_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count() as u32;
    MIN_ACTIVE.max(PER_WORD * words)
}

/// Coordinated ephemeral state for avatars and the thinking indicator.
#[derive(Debug, Default)]
pub struct AnimationState {
    timers: Vec<AvatarTimer>,
    thinking: Option<IndicatorId>,
}

impl AnimationState {
    /// Empty state: no timers, no indicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the avatar timers for a freshly rendered reply.
    pub fn schedule_avatar(&mut self, message_id: MessageId, text: &str, now: Instant) {
        let activate_at = now + ACTIVATION_DELAY;
        self.timers.push(AvatarTimer {
            message_id,
            activate_at,
            deactivate_at: activate_at + active_duration(text),
            phase: AvatarPhase::Scheduled,
        });
    }

    /// Advance time, applying due transitions in order.
    ///
    /// Returns the visible transitions so the surface can update. Finished
    /// timers are dropped.
    pub fn tick(&mut self, now: Instant) -> Vec<AvatarTransition> {
        let mut transitions = Vec::new();

        // Expire active avatars whose duration has elapsed.
        for timer in &mut self.timers {
            if timer.phase == AvatarPhase::Active && now >= timer.deactivate_at {
                timer.phase = AvatarPhase::Done;
                transitions.push(AvatarTransition::Deactivated(timer.message_id));
            }
        }

        // Apply due activations. Each activation deactivates every other
        // avatar first, so later (newer) activations supersede earlier ones
        // within the same tick.
        for i in 0..self.timers.len() {
            if self.timers[i].phase != AvatarPhase::Scheduled
                || now < self.timers[i].activate_at
            {
                continue;
            }

            for (j, timer) in self.timers.iter_mut().enumerate() {
                if j != i && timer.phase == AvatarPhase::Active {
                    timer.phase = AvatarPhase::Done;
                    transitions.push(AvatarTransition::Deactivated(timer.message_id));
                }
            }
            self.timers[i].phase = AvatarPhase::Active;
            transitions.push(AvatarTransition::Activated(self.timers[i].message_id));
        }

        self.timers.retain(|timer| timer.phase != AvatarPhase::Done);
        transitions
    }

    /// The message whose avatar is currently active, if any.
    #[must_use]
    pub fn active_avatar(&self) -> Option<MessageId> {
        self.timers
            .iter()
            .find(|timer| timer.phase == AvatarPhase::Active)
            .map(|timer| timer.message_id)
    }

    /// Number of active avatars (0 or 1 by invariant).
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers
            .iter()
            .filter(|timer| timer.phase == AvatarPhase::Active)
            .count()
    }

    /// Show the thinking indicator, replacing any existing one.
    pub fn show_thinking(&mut self) -> IndicatorId {
        let id = IndicatorId(Uuid::new_v4());
        if self.thinking.replace(id).is_some() {
            tracing::debug!("Replaced an existing thinking indicator");
        }
        id
    }

    /// Remove the current thinking indicator, whichever instance it is.
    /// Returns whether one was present.
    pub fn clear_thinking(&mut self) -> bool {
        self.thinking.take().is_some()
    }

    /// The current thinking indicator, if any.
    #[must_use]
    pub fn thinking(&self) -> Option<IndicatorId> {
        self.thinking
    }

    /// Drop all timers and the indicator (conversation reset).
    pub fn reset(&mut self) {
        self.timers.clear();
        self.thinking = None;
    }
}
