//! Event system for the pet engine.
//!
//! The engine and its ticker publish state changes through this
//! channel so that a front end (CLI, desktop window) can react to mood
//! swings without polling.

use crate::stats::{Action, Mood, PetStats};
use tokio::sync::mpsc;

/// Default channel buffer size.
const DEFAULT_CHANNEL_SIZE: usize = 100;

/// Events emitted by the engine and the decay ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Elapsed time lowered at least one stat.
    Decayed {
        /// Stats before decay was applied.
        before: PetStats,
        /// Stats after decay was applied.
        after: PetStats,
    },

    /// The owner did something for the pet.
    ActionApplied {
        /// What was done.
        action: Action,
        /// Stats after the action.
        stats: PetStats,
    },

    /// The derived mood changed.
    MoodChanged {
        /// Mood before the change.
        previous: Mood,
        /// Mood after the change.
        current: Mood,
    },

    /// Writing the state record failed; the in-memory state is still current.
    PersistFailed {
        /// The storage error.
        message: String,
    },

    /// The background decay ticker has started.
    TickerStarted {
        /// Tick period in seconds.
        period_secs: f64,
    },

    /// The background decay ticker has stopped.
    TickerStopped {
        /// Number of ticks run.
        ticks: u64,
    },
}

/// Sender for events.
pub type EventSender = mpsc::Sender<Event>;

/// Receiver for events.
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create a new event channel with the default buffer size.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new event channel with a custom buffer size.
pub fn channel_with_size(size: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(size)
}

impl Event {
    /// Create a persist-failure event with the given message.
    pub fn persist_failed(message: impl Into<String>) -> Self {
        Self::PersistFailed {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Decayed { after, .. } => write!(
                f,
                "decayed to hunger {} energy {} affection {}",
                after.hunger, after.energy, after.affection
            ),
            Event::ActionApplied { action, stats } => write!(
                f,
                "{}: hunger {} energy {} affection {}",
                action, stats.hunger, stats.energy, stats.affection
            ),
            Event::MoodChanged { previous, current } => {
                write!(f, "mood changed from {} to {}", previous, current)
            }
            Event::PersistFailed { message } => write!(f, "failed to save state: {}", message),
            Event::TickerStarted { period_secs } => {
                write!(f, "decay ticker started ({}s period)", period_secs)
            }
            Event::TickerStopped { ticks } => write!(f, "decay ticker stopped after {} ticks", ticks),
        }
    }
}
