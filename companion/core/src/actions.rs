//! Interactive Action Renderer
//!
//! Turns a tagged [`UiAction`] payload into a stateful widget attached to
//! the assistant message that produced it. At most one widget exists per
//! message, appended after the text view.
//!
//! - Email confirmation: read-only to/subject, editable body, single-use
//!   Send/Cancel buttons resolving to fixed `"Yes"`/`"No"` tokens sent back
//!   through the coordinator.
//! - Music: the track metadata is forwarded to an external player
//!   collaborator and produces no widget.
//! - Search results: an ordered deck of cards labeled 1..N. Citation nodes
//!   in the message text resolve against these position labels and trigger
//!   a timed highlight pulse.

use std::time::{Duration, Instant};

use crate::protocol::{SearchResult, UiAction};

/// How long a citation highlight pulse stays on a card.
pub const HIGHLIGHT_PULSE: Duration = Duration::from_secs(2);

/// Fixed confirmation token sent when the user accepts an email draft.
pub const CONFIRM_TOKEN: &str = "Yes";
/// Fixed rejection token sent when the user cancels an email draft.
pub const CANCEL_TOKEN: &str = "No";

/// Chat echo shown as the user's message when confirming.
pub const CONFIRM_ECHO: &str = "Yes, send it.";
/// Chat echo shown as the user's message when cancelling.
pub const CANCEL_ECHO: &str = "No, cancel.";

/// External music player collaborator. Out of scope for this runtime; when
/// absent, music actions are a no-op.
pub trait MusicPlayer: Send + Sync {
    /// A track started playing; update the player UI.
    fn on_track_changed(&self, track_info: &serde_json::Value);
}

/// The stateful widget attached to an assistant message.
#[derive(Clone, Debug)]
pub enum ActionWidget {
    /// Email confirm/cancel widget.
    Email(EmailConfirmWidget),
    /// Cited search-result deck.
    SearchDeck(SearchDeck),
}

impl ActionWidget {
    /// Build the widget for an action payload.
    ///
    /// Music actions are forwarded to `player` (if any) and yield no widget.
    pub fn from_action(action: UiAction, player: Option<&dyn MusicPlayer>) -> Option<Self> {
        match action {
            UiAction::EmailConfirmation { to, subject, body } => {
                Some(Self::Email(EmailConfirmWidget::new(to, subject, body)))
            }
            UiAction::MusicPlaying { track_info } => {
                if let Some(player) = player {
                    player.on_track_changed(&track_info);
                } else {
                    tracing::debug!("No music player attached; ignoring track change");
                }
                None
            }
            UiAction::SearchResults { results } => {
                Some(Self::SearchDeck(SearchDeck::new(&results)))
            }
        }
    }
}

/// The user's resolution of an email confirmation widget, ready to be sent
/// back through the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationReply {
    /// Fixed token for the backend (`"Yes"` or `"No"`).
    pub token: &'static str,
    /// Text echoed into the conversation as the user's message.
    pub echo: &'static str,
    /// Edited body accompanying a confirmation.
    pub updated_body: Option<String>,
}

/// Email confirm/cancel widget.
///
/// Both buttons are single-use: the first click consumes the widget, so a
/// second click cannot double-submit.
#[derive(Clone, Debug)]
pub struct EmailConfirmWidget {
    /// Recipient (read-only).
    pub to: String,
    /// Subject (read-only).
    pub subject: String,
    /// Current body text (user-editable).
    body: String,
    /// Whether a button has been clicked.
    consumed: bool,
}

impl EmailConfirmWidget {
    /// Build a pending widget from the action payload.
    #[must_use]
    pub fn new(to: String, subject: String, body: String) -> Self {
        Self {
            to,
            subject,
            body,
            consumed: false,
        }
    }

    /// Current body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replace the editable body.
    pub fn edit_body(&mut self, body: impl Into<String>) {
        if !self.consumed {
            self.body = body.into();
        }
    }

    /// Whether a button has already been clicked.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Click Send. Returns the reply to dispatch, or `None` if the widget
    /// was already consumed.
    pub fn confirm(&mut self) -> Option<ConfirmationReply> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(ConfirmationReply {
            token: CONFIRM_TOKEN,
            echo: CONFIRM_ECHO,
            updated_body: Some(self.body.clone()),
        })
    }

    /// Click Cancel. Returns the reply to dispatch, or `None` if the widget
    /// was already consumed.
    pub fn cancel(&mut self) -> Option<ConfirmationReply> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(ConfirmationReply {
            token: CANCEL_TOKEN,
            echo: CANCEL_ECHO,
            updated_body: None,
        })
    }
}

/// One card in a search-result deck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCard {
    /// 1-based position label; the contract citation nodes resolve against.
    pub position: usize,
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Display label for the source, derived from the URL host. Cards with
    /// unresolvable domains degrade to a generic label.
    pub source_label: String,
}

/// Ordered horizontal deck of search-result cards.
#[derive(Clone, Debug)]
pub struct SearchDeck {
    cards: Vec<SearchCard>,
    /// Active highlight pulse, if a citation was clicked recently.
    pulse: Option<HighlightPulse>,
}

#[derive(Clone, Copy, Debug)]
struct HighlightPulse {
    position: usize,
    clear_at: Instant,
}

impl SearchDeck {
    /// Build a deck, labeling cards 1..N in result order.
    #[must_use]
    pub fn new(results: &[SearchResult]) -> Self {
        let cards = results
            .iter()
            .enumerate()
            .map(|(i, result)| SearchCard {
                position: i + 1,
                title: result.title.clone(),
                url: result.url.clone(),
                source_label: source_label(&result.url),
            })
            .collect();
        Self { cards, pulse: None }
    }

    /// The cards, in position order.
    #[must_use]
    pub fn cards(&self) -> &[SearchCard] {
        &self.cards
    }

    /// Resolve a citation click: locate the card whose position label equals
    /// `index`, start a highlight pulse on it, and report the position for
    /// scroll-into-view. An index with no matching card is a no-op.
    pub fn highlight_citation(&mut self, index: usize, now: Instant) -> Option<usize> {
        let card = self.cards.iter().find(|card| card.position == index)?;
        let position = card.position;
        self.pulse = Some(HighlightPulse {
            position,
            clear_at: now + HIGHLIGHT_PULSE,
        });
        Some(position)
    }

    /// Position of the currently highlighted card, if a pulse is active.
    #[must_use]
    pub fn highlighted(&self) -> Option<usize> {
        self.pulse.map(|p| p.position)
    }

    /// Advance time: clear an expired highlight pulse.
    pub fn tick(&mut self, now: Instant) {
        if let Some(pulse) = self.pulse {
            if now >= pulse.clear_at {
                self.pulse = None;
            }
        }
    }
}

/// Derive a source label from a URL: the host without a `www.` prefix, or a
/// generic label when the URL has no recognizable host.
fn source_label(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        "Source".to_string()
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult {
                title: "A".into(),
                url: "http://www.example.com/a".into(),
            },
            SearchResult {
                title: "B".into(),
                url: "not a url".into(),
            },
        ]
    }

    #[test]
    fn test_deck_positions_are_one_based() {
        let deck = SearchDeck::new(&results());
        assert_eq!(deck.cards()[0].position, 1);
        assert_eq!(deck.cards()[1].position, 2);
    }

    #[test]
    fn test_source_label_from_host() {
        let deck = SearchDeck::new(&results());
        assert_eq!(deck.cards()[0].source_label, "example.com");
        assert_eq!(deck.cards()[1].source_label, "Source");
    }

    #[test]
    fn test_citation_resolves_to_matching_card() {
        let mut deck = SearchDeck::new(&results());
        let now = Instant::now();
        assert_eq!(deck.highlight_citation(2, now), Some(2));
        assert_eq!(deck.highlighted(), Some(2));
    }

    #[test]
    fn test_out_of_range_citation_is_noop() {
        let mut deck = SearchDeck::new(&results());
        let now = Instant::now();
        assert_eq!(deck.highlight_citation(3, now), None);
        assert_eq!(deck.highlighted(), None);
    }

    #[test]
    fn test_pulse_clears_after_duration() {
        let mut deck = SearchDeck::new(&results());
        let now = Instant::now();
        deck.highlight_citation(1, now);

        deck.tick(now + Duration::from_millis(500));
        assert_eq!(deck.highlighted(), Some(1));

        deck.tick(now + HIGHLIGHT_PULSE);
        assert_eq!(deck.highlighted(), None);
    }

    #[test]
    fn test_email_confirm_is_single_use() {
        let mut widget = EmailConfirmWidget::new("a@b.c".into(), "Hi".into(), "draft".into());
        widget.edit_body("edited draft");

        let reply = widget.confirm().expect("first click resolves");
        assert_eq!(reply.token, CONFIRM_TOKEN);
        assert_eq!(reply.echo, CONFIRM_ECHO);
        assert_eq!(reply.updated_body.as_deref(), Some("edited draft"));

        assert!(widget.is_consumed());
        assert_eq!(widget.confirm(), None);
        assert_eq!(widget.cancel(), None);
    }

    #[test]
    fn test_email_cancel_sends_rejection_token() {
        let mut widget = EmailConfirmWidget::new("a@b.c".into(), "Hi".into(), "draft".into());
        let reply = widget.cancel().expect("first click resolves");
        assert_eq!(reply.token, CANCEL_TOKEN);
        assert_eq!(reply.echo, CANCEL_ECHO);
        assert_eq!(reply.updated_body, None);
    }

    #[test]
    fn test_body_edit_after_consumption_is_ignored() {
        let mut widget = EmailConfirmWidget::new("a@b.c".into(), "Hi".into(), "draft".into());
        widget.cancel();
        widget.edit_body("too late");
        assert_eq!(widget.body(), "draft");
    }

    #[test]
    fn test_music_action_forwards_to_player() {
        use std::sync::Mutex;

        struct RecordingPlayer {
            tracks: Mutex<Vec<serde_json::Value>>,
        }

        impl MusicPlayer for RecordingPlayer {
            fn on_track_changed(&self, track_info: &serde_json::Value) {
                self.tracks.lock().unwrap().push(track_info.clone());
            }
        }

        let player = RecordingPlayer {
            tracks: Mutex::new(Vec::new()),
        };
        let action = UiAction::MusicPlaying {
            track_info: serde_json::json!({"title": "Song"}),
        };

        let widget = ActionWidget::from_action(action, Some(&player));
        assert!(widget.is_none());
        assert_eq!(player.tracks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_music_action_without_player_is_noop() {
        let action = UiAction::MusicPlaying {
            track_info: serde_json::json!({}),
        };
        assert!(ActionWidget::from_action(action, None).is_none());
    }
}
