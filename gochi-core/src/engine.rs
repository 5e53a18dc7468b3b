//! The pet state engine.
//!
//! [`PetEngine`] owns the single live copy of the pet's stats. Every
//! operation takes the engine lock, applies decay for the time elapsed
//! since the last update, applies its own change, writes the record
//! through to the store, and returns a copy. Nothing outside the lock ever
//! sees the live state.
//!
//! Storage is best-effort: a failed write is logged and reported as an
//! [`Event::PersistFailed`], but the in-memory change stands.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::event::{Event, EventSender};
use crate::stats::{Action, DecayCarry, DecayPolicy, DecayRates, Mood, PetStats};
use crate::store::{self, FileStore, StateStore};

/// Live state guarded by the engine lock.
#[derive(Debug)]
struct EngineState {
    stats: PetStats,
    carry: DecayCarry,
    mood: Mood,
}

/// Owns the pet's stats and serializes every read and write.
pub struct PetEngine {
    state: Mutex<EngineState>,
    store: Box<dyn StateStore>,
    clock: Arc<dyn Clock>,
    rates: DecayRates,
    policy: DecayPolicy,
    events: Option<EventSender>,
}

impl PetEngine {
    /// Open the engine on the configured state file with the system clock.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid. A
    /// missing or unreadable state file is not an error.
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::load(
            config,
            Box::new(FileStore::new(&config.state_path)),
            Arc::new(SystemClock),
        ))
    }

    /// Build the engine from `store`, falling back to default stats if the
    /// store is empty, unreadable, or holds a malformed record.
    pub fn load(config: &Config, store: Box<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        let persisted = match store::load(store.as_ref()) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "could not read pet state, starting fresh");
                None
            }
        };
        Self::initialize(config, store, clock, persisted)
    }

    /// Build the engine from an already loaded snapshot.
    ///
    /// Pending decay is applied straight away and the resulting state is
    /// written through once.
    pub fn initialize(
        config: &Config,
        store: Box<dyn StateStore>,
        clock: Arc<dyn Clock>,
        persisted: Option<PetStats>,
    ) -> Self {
        let now = clock.now();
        let stats = persisted.unwrap_or_else(|| {
            debug!("no saved pet state, adopting a new pet");
            PetStats::new_default(now)
        });

        let engine = Self {
            state: Mutex::new(EngineState {
                stats,
                carry: DecayCarry::default(),
                mood: stats.mood(),
            }),
            store,
            clock,
            rates: config.decay_rates,
            policy: config.decay_policy,
            events: None,
        };

        {
            let mut state = engine.lock();
            engine.decay_locked(&mut state, now);
            state.mood = state.stats.mood();
            engine.persist_locked(&state.stats);
        }
        engine
    }

    /// Publish engine events on `sender`.
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Apply pending decay and return the current stats.
    pub fn get_state(&self) -> PetStats {
        self.refresh().0
    }

    /// Apply pending decay and classify the mood.
    pub fn mood(&self) -> Mood {
        self.get_state().mood()
    }

    /// The background ticker path: decay and persist if anything changed.
    ///
    /// Returns `true` if any stat changed.
    pub fn tick(&self) -> bool {
        self.refresh().1
    }

    /// Feed the pet.
    pub fn feed(&self) -> PetStats {
        self.apply(Action::Feed)
    }

    /// Give the pet a treat.
    pub fn give_treat(&self) -> PetStats {
        self.apply(Action::Treat)
    }

    /// Put the pet to sleep.
    pub fn put_to_sleep(&self) -> PetStats {
        self.apply(Action::Sleep)
    }

    /// Apply pending decay, then `action`, then persist.
    pub fn apply(&self, action: Action) -> PetStats {
        let mut state = self.lock();
        let now = self.clock.now();
        self.decay_locked(&mut state, now);

        state.stats.apply_delta(action.delta());
        if now > state.stats.last_updated {
            state.stats.last_updated = now;
        }
        self.persist_locked(&state.stats);

        debug!(%action, hunger = state.stats.hunger, energy = state.stats.energy,
            affection = state.stats.affection, "applied action");
        self.emit(Event::ActionApplied {
            action,
            stats: state.stats,
        });
        self.note_mood(&mut state);
        state.stats
    }

    fn refresh(&self) -> (PetStats, bool) {
        let mut state = self.lock();
        let now = self.clock.now();
        let changed = self.decay_locked(&mut state, now);
        if changed {
            self.persist_locked(&state.stats);
        }
        self.note_mood(&mut state);
        (state.stats, changed)
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn decay_locked(&self, state: &mut EngineState, now: DateTime<Utc>) -> bool {
        let before = state.stats;
        let changed = state
            .stats
            .decay(now, &self.rates, self.policy, &mut state.carry);
        if changed {
            debug!(
                hunger = state.stats.hunger,
                energy = state.stats.energy,
                affection = state.stats.affection,
                "applied decay"
            );
            self.emit(Event::Decayed {
                before,
                after: state.stats,
            });
        }
        changed
    }

    fn persist_locked(&self, stats: &PetStats) {
        if let Err(e) = store::save(self.store.as_ref(), stats) {
            warn!(error = %e, "failed to save pet state");
            self.emit(Event::persist_failed(e.to_string()));
        }
    }

    fn note_mood(&self, state: &mut EngineState) {
        let current = state.stats.mood();
        if current != state.mood {
            debug!(previous = %state.mood, %current, "mood changed");
            self.emit(Event::MoodChanged {
                previous: state.mood,
                current,
            });
            state.mood = current;
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            if tx.try_send(event).is_err() {
                debug!("event channel full or closed, dropping event");
            }
        }
    }
}

impl std::fmt::Debug for PetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PetEngine")
            .field("state", &*self.lock())
            .field("rates", &self.rates)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;
    use crate::event::channel;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unplugged() -> std::io::Error {
        std::io::Error::other("disk unplugged")
    }

    /// A store whose reads and writes always fail.
    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn read(&self) -> Result<Option<Vec<u8>>> {
            Err(Error::StateRead {
                path: PathBuf::from("pet_state.json"),
                source: unplugged(),
            })
        }

        fn write(&self, _bytes: &[u8]) -> Result<()> {
            Err(Error::StateWrite {
                path: PathBuf::from("pet_state.json"),
                source: unplugged(),
            })
        }
    }

    /// Moves forward one minute every time it is read.
    struct SteppingClock {
        reads: AtomicUsize,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            t0() + Duration::minutes(n as i64)
        }
    }

    /// Shares a MemoryStore with the test so writes can be inspected.
    struct SharedStore(Arc<MemoryStore>);

    impl StateStore for SharedStore {
        fn read(&self) -> Result<Option<Vec<u8>>> {
            self.0.read()
        }

        fn write(&self, bytes: &[u8]) -> Result<()> {
            self.0.write(bytes)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn engine_with(stats: Option<PetStats>) -> (PetEngine, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::new());
        let engine = PetEngine::initialize(
            &Config::default(),
            Box::new(SharedStore(store.clone())),
            clock.clone(),
            stats,
        );
        (engine, clock, store)
    }

    fn stats(hunger: u8, energy: u8, affection: u8) -> PetStats {
        PetStats {
            hunger,
            energy,
            affection,
            last_updated: t0(),
        }
    }

    #[test]
    fn test_fresh_engine_uses_defaults_and_persists() {
        let (engine, _clock, store) = engine_with(None);
        let state = engine.get_state();
        assert_eq!((state.hunger, state.energy, state.affection), (80, 75, 70));
        assert_eq!(state.last_updated, t0());
        assert_eq!(engine.mood(), Mood::Neutral);

        let saved = store::decode(&store.contents().unwrap()).unwrap();
        assert_eq!(saved, state);
    }

    #[test]
    fn test_get_state_is_idempotent_without_elapsed_time() {
        let (engine, _clock, _store) = engine_with(Some(stats(55, 44, 33)));
        let first = engine.get_state();
        let second = engine.get_state();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_state_applies_decay() {
        let (engine, clock, store) = engine_with(Some(stats(80, 75, 70)));
        clock.advance(Duration::minutes(60));

        let state = engine.get_state();
        assert_eq!(state.hunger, 50);
        assert_eq!(state.last_updated, t0() + Duration::minutes(60));

        let saved = store::decode(&store.contents().unwrap()).unwrap();
        assert_eq!(saved.hunger, 50);
    }

    #[test]
    fn test_get_state_skips_write_when_nothing_changed() {
        let (engine, clock, store) = engine_with(Some(stats(80, 75, 70)));
        let written = store.contents();

        // 30 seconds is not enough for a whole point of any stat.
        clock.advance(Duration::seconds(30));
        let state = engine.get_state();
        assert_eq!(state.hunger, 80);
        assert_eq!(store.contents(), written);
    }

    #[test]
    fn test_feed_clamps_at_max() {
        let (engine, _clock, _store) = engine_with(Some(stats(85, 75, 98)));
        let state = engine.feed();
        assert_eq!(state.hunger, 100);
        assert_eq!(state.affection, 100);
    }

    #[test]
    fn test_give_treat() {
        let (engine, _clock, _store) = engine_with(Some(stats(50, 75, 40)));
        let state = engine.give_treat();
        assert_eq!(state.hunger, 45);
        assert_eq!(state.affection, 60);
        assert_eq!(state.energy, 75);
    }

    #[test]
    fn test_put_to_sleep() {
        let (engine, clock, _store) = engine_with(Some(stats(50, 20, 40)));
        clock.advance(Duration::minutes(10));
        let state = engine.put_to_sleep();
        // 20 - floor(10 * 0.4) + 40
        assert_eq!(state.energy, 56);
        assert_eq!(state.last_updated, t0() + Duration::minutes(10));
    }

    #[test]
    fn test_action_never_moves_timestamp_backward() {
        let (engine, clock, _store) = engine_with(Some(stats(50, 50, 50)));
        clock.advance(Duration::minutes(-5));
        let state = engine.feed();
        assert_eq!(state.last_updated, t0());
        assert_eq!(state.hunger, 80);
    }

    #[test]
    fn test_each_operation_reads_the_clock_once() {
        let clock = Arc::new(SteppingClock {
            reads: AtomicUsize::new(0),
        });
        let engine = PetEngine::initialize(
            &Config::default(),
            Box::new(MemoryStore::new()),
            clock.clone(),
            Some(stats(50, 50, 50)),
        );
        assert_eq!(clock.reads.load(Ordering::SeqCst), 1);

        let state = engine.feed();
        assert_eq!(clock.reads.load(Ordering::SeqCst), 2);
        // Decay and the action share the one reading.
        assert_eq!(state.last_updated, t0() + Duration::minutes(1));

        engine.get_state();
        assert_eq!(clock.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_persist_failure_does_not_fail_action() {
        let clock = Arc::new(ManualClock::new(t0()));
        let (tx, mut rx) = channel();
        let engine = PetEngine::load(&Config::default(), Box::new(BrokenStore), clock)
            .with_events(tx);

        let state = engine.feed();
        assert_eq!(state.hunger, 100);
        assert_eq!(engine.get_state().hunger, 100);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let Event::PersistFailed { message } = event {
                assert!(message.contains("disk unplugged"));
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[test]
    fn test_malformed_store_falls_back_to_defaults() {
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = PetEngine::load(
            &Config::default(),
            Box::new(MemoryStore::with_bytes("definitely not json")),
            clock,
        );
        let state = engine.get_state();
        assert_eq!((state.hunger, state.energy, state.affection), (80, 75, 70));
    }

    #[test]
    fn test_mood_change_event() {
        let (tx, mut rx) = channel();
        let (engine, clock, _store) = engine_with(Some(stats(35, 75, 70)));
        let engine = engine.with_events(tx);

        // 35 - floor(20 * 0.5) = 25 -> sad
        clock.advance(Duration::minutes(20));
        assert_eq!(engine.mood(), Mood::Sad);

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(matches!(events.first(), Some(Event::Decayed { .. })));
        assert!(events.contains(&Event::MoodChanged {
            previous: Mood::Neutral,
            current: Mood::Sad,
        }));
    }

    #[test]
    fn test_tick_reports_change() {
        let (engine, clock, _store) = engine_with(Some(stats(80, 75, 70)));
        assert!(!engine.tick());
        clock.advance(Duration::minutes(2));
        assert!(engine.tick());
        assert_eq!(engine.get_state().hunger, 79);
    }

    #[test]
    fn test_clamp_invariant_under_mixed_sequence() {
        let (engine, clock, _store) = engine_with(Some(stats(100, 100, 100)));
        let steps = [
            Duration::days(30),
            Duration::seconds(1),
            Duration::minutes(7),
            Duration::weeks(520),
        ];
        for (i, step) in steps.iter().enumerate() {
            clock.advance(*step);
            let state = match i % 3 {
                0 => engine.feed(),
                1 => engine.give_treat(),
                _ => engine.put_to_sleep(),
            };
            for value in [state.hunger, state.energy, state.affection] {
                assert!(value <= 100);
            }
            let again = engine.get_state();
            assert!(again.last_updated >= state.last_updated);
        }
    }

    #[test]
    fn test_concurrent_actions_are_serialized() {
        let (engine, _clock, _store) = engine_with(Some(stats(80, 50, 0)));
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    engine.give_treat();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = engine.get_state();
        assert_eq!(state.affection, 80);
        assert_eq!(state.hunger, 60);
    }
}
