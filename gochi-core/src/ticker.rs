//! Background decay ticker.
//!
//! Stats decay lazily whenever the engine is touched, but an idle pet still
//! needs its state file kept current. [`DecayTicker`] runs the engine's
//! tick path on a fixed period until its [`TickerHandle`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::PetEngine;
use crate::event::{Event, EventSender};

/// Shortest period the ticker will run at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Periodically forces decay and persistence on a [`PetEngine`].
#[derive(Debug)]
pub struct DecayTicker {
    /// The engine to tick.
    engine: Arc<PetEngine>,
    /// Time between ticks.
    period: Duration,
    /// Observed between ticks.
    cancel: CancellationToken,
    /// Lifecycle events.
    events: Option<EventSender>,
}

/// Handle for stopping a running ticker.
///
/// This handle can be cloned and used from another task or thread.
#[derive(Debug, Clone)]
pub struct TickerHandle {
    cancel: CancellationToken,
}

impl TickerHandle {
    /// Signal the ticker to stop before its next tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl DecayTicker {
    /// Create a ticker with its own cancellation token.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use gochi_core::{Config, DecayTicker, MemoryStore, PetEngine, SystemClock};
    ///
    /// let engine = PetEngine::load(
    ///     &Config::default(),
    ///     Box::new(MemoryStore::new()),
    ///     Arc::new(SystemClock),
    /// );
    /// let (_ticker, handle) = DecayTicker::new(Arc::new(engine), Duration::from_secs(30));
    /// handle.cancel();
    /// ```
    pub fn new(engine: Arc<PetEngine>, period: Duration) -> (Self, TickerHandle) {
        let cancel = CancellationToken::new();
        let handle = TickerHandle {
            cancel: cancel.clone(),
        };
        (Self::with_cancellation(engine, period, cancel), handle)
    }

    /// Create a ticker that stops when `cancel` (typically a child of the
    /// process shutdown token) is cancelled.
    pub fn with_cancellation(
        engine: Arc<PetEngine>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            period,
            cancel,
            events: None,
        }
    }

    /// Publish start and stop events on `sender`.
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Run on the current task until cancelled.
    ///
    /// Returns the number of ticks run.
    pub async fn run(self) -> u64 {
        if let Some(tx) = &self.events {
            let _ = tx
                .send(Event::TickerStarted {
                    period_secs: self.period.as_secs_f64(),
                })
                .await;
        }
        info!(period_secs = self.period.as_secs_f64(), "decay ticker started");

        // tokio intervals panic on a zero period.
        let period = self.period.max(MIN_PERIOD);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    // A tick may write the state file, which blocks.
                    let engine = self.engine.clone();
                    let changed = match tokio::task::spawn_blocking(move || engine.tick()).await {
                        Ok(changed) => changed,
                        Err(e) => {
                            warn!(error = %e, "decay tick failed");
                            false
                        }
                    };
                    ticks += 1;
                    debug!(ticks, changed, "decay tick");
                }
            }
        }

        info!(ticks, "decay ticker stopped");
        if let Some(tx) = &self.events {
            let _ = tx.send(Event::TickerStopped { ticks }).await;
        }
        ticks
    }

    /// Spawn the ticker onto the tokio runtime.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::Config;
    use crate::event::channel;
    use crate::stats::PetStats;
    use crate::error::Result;
    use crate::store::{MemoryStore, StateStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    /// Records which thread performed each write.
    #[derive(Default)]
    struct ThreadRecordingStore {
        writers: Mutex<Vec<ThreadId>>,
    }

    impl StateStore for Arc<ThreadRecordingStore> {
        fn read(&self) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn write(&self, _bytes: &[u8]) -> Result<()> {
            self.writers.lock().unwrap().push(thread::current().id());
            Ok(())
        }
    }

    fn engine_at_default(clock: Arc<ManualClock>) -> Arc<PetEngine> {
        let start = clock.now();
        Arc::new(PetEngine::initialize(
            &Config::default(),
            Box::new(MemoryStore::new()),
            clock,
            Some(PetStats::new_default(start)),
        ))
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_ticker_handle_cancel() {
        let (_ticker, handle) = DecayTicker::new(engine_at_default(clock()), Duration::from_secs(30));
        assert!(!handle.is_cancelled());

        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_ticker_cancelled_before_start_runs_no_ticks() {
        let (ticker, handle) = DecayTicker::new(engine_at_default(clock()), Duration::from_millis(5));
        handle.cancel();
        assert_eq!(ticker.run().await, 0);
    }

    #[tokio::test]
    async fn test_ticker_applies_decay_until_cancelled() {
        let clock = clock();
        let engine = engine_at_default(clock.clone());
        let (tx, mut rx) = channel();
        let (ticker, handle) = DecayTicker::new(engine.clone(), Duration::from_millis(10));
        let task = ticker.with_events(tx).spawn();

        clock.advance(chrono::Duration::minutes(60));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.cancel();
        let ticks = task.await.expect("ticker task should not panic");

        assert!(ticks >= 1);
        assert_eq!(engine.get_state().hunger, 50);

        let mut started = false;
        let mut stopped = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::TickerStarted { .. } => started = true,
                Event::TickerStopped { ticks } => stopped = Some(ticks),
                _ => {}
            }
        }
        assert!(started);
        assert_eq!(stopped, Some(ticks));
    }

    #[tokio::test]
    async fn test_ticker_writes_off_the_runtime_thread() {
        let clock = clock();
        let store = Arc::new(ThreadRecordingStore::default());
        let engine = Arc::new(PetEngine::initialize(
            &Config::default(),
            Box::new(store.clone()),
            clock.clone(),
            None,
        ));
        store.writers.lock().unwrap().clear();

        let (ticker, handle) = DecayTicker::new(engine, Duration::from_millis(10));
        let task = ticker.spawn();
        clock.advance(chrono::Duration::minutes(60));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.cancel();
        task.await.expect("ticker task should not panic");

        // The default test runtime drives every task on this thread.
        let writers = store.writers.lock().unwrap();
        assert!(!writers.is_empty());
        assert!(writers.iter().all(|id| *id != thread::current().id()));
    }

    #[tokio::test]
    async fn test_ticker_follows_parent_token() {
        let parent = CancellationToken::new();
        let ticker = DecayTicker::with_cancellation(
            engine_at_default(clock()),
            Duration::from_millis(5),
            parent.child_token(),
        );
        let task = ticker.spawn();
        parent.cancel();
        assert!(task.await.is_ok());
    }
}
