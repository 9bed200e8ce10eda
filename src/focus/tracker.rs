use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{error::StudyResult, settings::StudySettings};

use super::{report_misuse, FocusSnapshot, FocusState, FocusStatus, Visibility};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusEvent {
    #[serde(rename_all = "camelCase")]
    Tick { elapsed_seconds: u64 },
    /// Sustained time on task; the reader may offer a simplified explanation.
    #[serde(rename_all = "camelCase")]
    ConfusionNudge { elapsed_seconds: u64 },
    #[serde(rename_all = "camelCase")]
    Distracted { distraction_count: u32 },
    Stopped { snapshot: FocusSnapshot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusConfig {
    pub tick_interval: Duration,
    pub nudge_interval_secs: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self::from(&StudySettings::default())
    }
}

impl From<&StudySettings> for FocusConfig {
    fn from(settings: &StudySettings) -> Self {
        Self {
            tick_interval: Duration::from_millis(settings.tick_interval_ms.max(1)),
            nudge_interval_secs: settings.nudge_interval_secs,
        }
    }
}

/// Host-side handle for foreground/background notifications.
#[derive(Debug, Clone)]
pub struct VisibilitySender {
    tx: mpsc::UnboundedSender<Visibility>,
}

impl VisibilitySender {
    /// Never blocks. Notifications after the tracker stopped are dropped.
    pub fn notify(&self, visibility: Visibility) {
        let _ = self.tx.send(visibility);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs the focus state machine for one reading view.
///
/// Counting happens on a spawned task; every public method returns without
/// waiting on it. Dropping the tracker cancels the task.
pub struct FocusTracker {
    state: Arc<Mutex<FocusState>>,
    events: broadcast::Sender<FocusEvent>,
    visibility_tx: mpsc::UnboundedSender<Visibility>,
    visibility_rx: Mutex<Option<mpsc::UnboundedReceiver<Visibility>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
}

impl FocusTracker {
    pub fn new(config: FocusConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (visibility_tx, visibility_rx) = mpsc::unbounded_channel();

        Self {
            state: Arc::new(Mutex::new(FocusState::new(config.nudge_interval_secs))),
            events,
            visibility_tx,
            visibility_rx: Mutex::new(Some(visibility_rx)),
            ticker: Mutex::new(None),
            cancel_token: CancellationToken::new(),
            tick_interval: config.tick_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.events.subscribe()
    }

    pub fn visibility_sender(&self) -> VisibilitySender {
        VisibilitySender {
            tx: self.visibility_tx.clone(),
        }
    }

    /// Idle -> Running. Calling this outside a tokio runtime is misuse and
    /// leaves the tracker idle.
    pub fn start(&self) -> StudyResult<()> {
        if Handle::try_current().is_err() {
            return Err(report_misuse("start() called outside a tokio runtime"));
        }
        lock(&self.state).start()?;

        let Some(mut visibility_rx) = lock(&self.visibility_rx).take() else {
            return Err(report_misuse("visibility observer already consumed"));
        };
        // Changes reported before the session began are not distractions.
        while visibility_rx.try_recv().is_ok() {}

        let handle = tokio::spawn(focus_loop(
            self.state.clone(),
            self.events.clone(),
            visibility_rx,
            self.cancel_token.clone(),
            self.tick_interval,
        ));
        *lock(&self.ticker) = Some(handle);

        log_info!("Focus tracker started");
        Ok(())
    }

    /// Running -> Stopped. Idempotent; always returns the frozen counters.
    ///
    /// The status flips under the state lock before the task is cancelled, so
    /// a tick racing with this call can no longer change anything.
    pub fn stop(&self) -> FocusSnapshot {
        let (snapshot, was_running) = {
            let mut guard = lock(&self.state);
            let was_running = guard.status == FocusStatus::Running;
            (guard.stop(), was_running)
        };

        self.cancel_token.cancel();
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }

        if was_running {
            log_info!(
                "Focus tracker stopped after {}s with {} distractions",
                snapshot.elapsed_seconds,
                snapshot.distraction_count
            );
            let _ = self.events.send(FocusEvent::Stopped { snapshot });
        }
        snapshot
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn status(&self) -> FocusStatus {
        lock(&self.state).status
    }
}

impl Drop for FocusTracker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }
}

async fn focus_loop(
    state: Arc<Mutex<FocusState>>,
    events: broadcast::Sender<FocusEvent>,
    mut visibility_rx: mpsc::UnboundedReceiver<Visibility>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) {
    // First tick one full period after start, not immediately.
    let mut ticker = time::interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,

            _ = ticker.tick() => {
                let Some(outcome) = lock(&state).tick() else {
                    break;
                };
                log_debug!("focus tick {}", outcome.elapsed_seconds);

                let _ = events.send(FocusEvent::Tick {
                    elapsed_seconds: outcome.elapsed_seconds,
                });
                if outcome.nudge {
                    log_info!("Confusion nudge at {}s", outcome.elapsed_seconds);
                    let _ = events.send(FocusEvent::ConfusionNudge {
                        elapsed_seconds: outcome.elapsed_seconds,
                    });
                }
            }

            Some(visibility) = visibility_rx.recv() => {
                if let Some(distraction_count) = lock(&state).visibility(visibility) {
                    log_debug!("distraction #{distraction_count}");
                    let _ = events.send(FocusEvent::Distracted { distraction_count });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> FocusTracker {
        FocusTracker::new(FocusConfig {
            tick_interval: Duration::from_secs(1),
            nudge_interval_secs: 300,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn counts_one_second_ticks() {
        let tracker = tracker();
        tracker.start().unwrap();

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(tracker.snapshot().elapsed_seconds, 10);
        tracker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn emits_a_single_nudge_over_301_ticks() {
        let tracker = tracker();
        let mut events = tracker.subscribe();
        let collector = tokio::spawn(async move {
            let mut nudges = Vec::new();
            let mut ticks = 0u64;
            while let Ok(event) = events.recv().await {
                match event {
                    FocusEvent::Tick { .. } => ticks += 1,
                    FocusEvent::ConfusionNudge { elapsed_seconds } => nudges.push(elapsed_seconds),
                    FocusEvent::Stopped { .. } => break,
                    FocusEvent::Distracted { .. } => {}
                }
            }
            (ticks, nudges)
        });

        tracker.start().unwrap();
        time::sleep(Duration::from_millis(301_500)).await;
        let snapshot = tracker.stop();

        let (ticks, nudges) = collector.await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 301);
        assert_eq!(ticks, 301);
        assert_eq!(nudges, vec![300]);
        assert_eq!(snapshot.nudges_emitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_background_transitions() {
        let tracker = tracker();
        let visibility = tracker.visibility_sender();
        tracker.start().unwrap();

        for change in [
            Visibility::Hidden,
            Visibility::Visible,
            Visibility::Hidden,
            Visibility::Hidden,
            Visibility::Visible,
            Visibility::Hidden,
        ] {
            visibility.notify(change);
        }
        time::sleep(Duration::from_millis(500)).await;

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.distraction_count, 3);
        assert_eq!(snapshot.elapsed_seconds, 0);
        tracker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_before_start_are_discarded() {
        let tracker = tracker();
        let visibility = tracker.visibility_sender();
        visibility.notify(Visibility::Hidden);
        visibility.notify(Visibility::Visible);

        tracker.start().unwrap();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(tracker.snapshot().distraction_count, 0);
        tracker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_freezes_counters_and_cancels_the_ticker() {
        let tracker = tracker();
        let visibility = tracker.visibility_sender();
        tracker.start().unwrap();

        time::sleep(Duration::from_millis(3_500)).await;
        visibility.notify(Visibility::Hidden);
        time::sleep(Duration::from_millis(100)).await;

        let stopped = tracker.stop();
        assert_eq!(stopped.status, FocusStatus::Stopped);
        assert_eq!(stopped.elapsed_seconds, 3);
        assert_eq!(stopped.distraction_count, 1);

        visibility.notify(Visibility::Visible);
        visibility.notify(Visibility::Hidden);
        time::sleep(Duration::from_secs(30)).await;

        assert_eq!(tracker.snapshot(), stopped);
        assert_eq!(tracker.stop(), stopped);
        assert!(lock(&tracker.ticker).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_returns_zeroes() {
        let tracker = tracker();
        let snapshot = tracker.stop();
        assert_eq!(snapshot.status, FocusStatus::Stopped);
        assert_eq!(snapshot.elapsed_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_tracker_cancels_the_task() {
        let tracker = tracker();
        tracker.start().unwrap();
        let token = tracker.cancel_token.clone();
        drop(tracker);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    #[cfg_attr(debug_assertions, should_panic(expected = "already running"))]
    async fn double_start_is_misuse() {
        let tracker = tracker();
        tracker.start().unwrap();
        assert!(tracker.start().is_err());
        tracker.stop();
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "outside a tokio runtime"))]
    fn start_without_a_runtime_is_misuse() {
        let tracker = tracker();
        assert!(tracker.start().is_err());
        assert_eq!(tracker.status(), FocusStatus::Idle);
        assert!(lock(&tracker.visibility_rx).is_some());
    }

    #[test]
    fn config_follows_settings() {
        let settings = StudySettings {
            nudge_interval_secs: 120,
            tick_interval_ms: 250,
            ..StudySettings::default()
        };
        let config = FocusConfig::from(&settings);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.nudge_interval_secs, 120);
    }
}
