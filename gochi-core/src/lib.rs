//! Gochi core library
//!
//! This crate provides the virtual pet engine behind Gochi: stats that
//! decay with wall-clock time, actions that restore them, a mood derived
//! from the current stats, write-through persistence, and a background
//! ticker that keeps an idle pet's state current.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod stats;
pub mod store;
pub mod tasks;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::PetEngine;
pub use error::{Error, Result};
pub use event::{Event, EventReceiver, EventSender};
pub use stats::{Action, DecayPolicy, DecayRates, Mood, PetStats, MAX_STAT, MIN_STAT};
pub use store::{FileStore, MemoryStore, StateStore};
pub use tasks::TaskList;
pub use ticker::{DecayTicker, TickerHandle};
