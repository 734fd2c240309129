//! Local Greeting
//!
//! Time-of-day greeting shown when a conversation is empty. This is the
//! client-side fallback: it needs no backend and is deliberately cheap.

use chrono::Timelike;
use rand::Rng;

/// Context lines for the morning hours.
const MORNING: &[&str] = &[
    "Ready to start the day?",
    "All systems are operational.",
    "How may I assist you today?",
    "What's on the agenda?",
    "Shall we begin?",
];

/// Context lines for the afternoon hours.
const AFTERNOON: &[&str] = &[
    "How's your day going?",
    "What can I help you with?",
    "Ready when you are.",
    "Let's keep the momentum going.",
    "What's next on your list?",
];

/// Context lines for the evening hours.
const EVENING: &[&str] = &[
    "Welcome back. How can I help?",
    "Ready to wrap up the day?",
    "At your service.",
    "Let's finish strong.",
    "What can I do for you tonight?",
];

/// Context lines for the night hours.
const NIGHT: &[&str] = &[
    "Burning the midnight oil?",
    "Still working? Let me help.",
    "Ready whenever you are.",
    "I'm here, no matter the hour.",
    "Night owl mode activated.",
];

/// Deterministic core: greeting for a given hour and phrase pick.
///
/// `pick` indexes into the period's phrase pool (wrapping), which keeps the
/// composition testable.
#[must_use]
pub fn greeting_for(hour: u32, pick: usize) -> String {
    let (salutation, pool) = match hour {
        5..=11 => ("Good morning.", MORNING),
        12..=16 => ("Good afternoon.", AFTERNOON),
        17..=20 => ("Good evening.", EVENING),
        _ => ("Good night.", NIGHT),
    };
    format!("{} {}", salutation, pool[pick % pool.len()])
}

/// A greeting for the current local time, with a randomly picked context
/// line.
#[must_use]
pub fn time_based_greeting() -> String {
    let hour = chrono::Local::now().hour();
    let pick = rand::thread_rng().gen_range(0..usize::MAX);
    greeting_for(hour, pick)
}
