//! View/poll layer for the device-vitals panel.
//!
//! Per-view state machine: `Loading -> {Ready, Failed}`; `Ready` re-enters
//! `Loading` on a manual refresh or a fixed-interval timer, `Failed`
//! re-enters it on manual retry. Changing the interval aborts the previous
//! timer task before starting the new one, so two timers never run at once.
//!
//! Every dispatched fetch carries a monotonically increasing sequence
//! number and a response is applied only when its sequence is newer than
//! the last applied one. In-flight fetches are never aborted; a slow one
//! simply loses the sequence race instead of overwriting a newer result.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::feed::{FeedClient, FeedError};
use crate::models::VitalsReading;

/// Refresh intervals offered by the panel control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshInterval {
    OneSecond,
    FiveSeconds,
    TenSeconds,
    ThirtySeconds,
}

impl RefreshInterval {
    pub const DEFAULT: RefreshInterval = RefreshInterval::FiveSeconds;

    pub fn as_millis(self) -> u64 {
        match self {
            RefreshInterval::OneSecond => 1_000,
            RefreshInterval::FiveSeconds => 5_000,
            RefreshInterval::TenSeconds => 10_000,
            RefreshInterval::ThirtySeconds => 30_000,
        }
    }

    /// The control only offers the enumerated values.
    pub fn from_millis(ms: u64) -> Option<Self> {
        match ms {
            1_000 => Some(RefreshInterval::OneSecond),
            5_000 => Some(RefreshInterval::FiveSeconds),
            10_000 => Some(RefreshInterval::TenSeconds),
            30_000 => Some(RefreshInterval::ThirtySeconds),
            _ => None,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::from_millis(self.as_millis())
    }
}

/// Fetch state of one view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState<T> {
    Loading,
    Ready { data: T },
    Failed { error: String },
}

impl<T> ViewState<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready { .. })
    }
}

/// Source of vitals readings for the panel. The production source is the
/// feed client; tests substitute controllable fakes.
pub trait VitalsSource: Send + Sync + 'static {
    fn fetch(
        &self,
    ) -> impl Future<Output = Result<Vec<VitalsReading>, FeedError>> + Send;
}

impl VitalsSource for FeedClient {
    fn fetch(
        &self,
    ) -> impl Future<Output = Result<Vec<VitalsReading>, FeedError>> + Send {
        self.list_vitals()
    }
}

/// Serializable snapshot served to the panel view.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    #[serde(flatten)]
    pub view: ViewState<Vec<VitalsReading>>,
    pub interval_ms: u64,
}

struct PanelState {
    view: ViewState<Vec<VitalsReading>>,
    interval: RefreshInterval,
    next_seq: u64,
    applied_seq: u64,
    timer: Option<JoinHandle<()>>,
}

struct PanelInner<S> {
    source: S,
    state: Mutex<PanelState>,
}

/// The device-vitals panel: shared snapshot plus the polling machinery.
pub struct VitalsPanel<S: VitalsSource> {
    inner: Arc<PanelInner<S>>,
}

/// The panel the API layer serves.
pub type DeviceVitalsPanel = VitalsPanel<FeedClient>;

impl<S: VitalsSource> Clone for VitalsPanel<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: VitalsSource> VitalsPanel<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(PanelInner {
                source,
                state: Mutex::new(PanelState {
                    view: ViewState::Loading,
                    interval: RefreshInterval::DEFAULT,
                    next_seq: 0,
                    applied_seq: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// Dispatch the mount fetch and start the interval timer.
    pub fn start(&self) {
        self.refresh();
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        if state.timer.is_none() {
            state.timer = Some(spawn_timer(&self.inner, state.interval));
        }
    }

    /// Stop the interval timer. Already-dispatched fetches run to
    /// completion and still pass through the sequence check.
    pub fn stop(&self) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    /// Manual refresh, also the retry transition out of `Failed`.
    pub fn refresh(&self) {
        PanelInner::dispatch(&self.inner);
    }

    /// Change the polling interval, replacing the running timer.
    pub fn set_interval(&self, interval: RefreshInterval) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        if state.interval == interval {
            return;
        }
        state.interval = interval;
        let had_timer = state.timer.take().map(|t| t.abort()).is_some();
        if had_timer {
            state.timer = Some(spawn_timer(&self.inner, interval));
        }
    }

    pub fn interval(&self) -> RefreshInterval {
        self.inner
            .state
            .lock()
            .map(|s| s.interval)
            .unwrap_or(RefreshInterval::DEFAULT)
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        let Ok(state) = self.inner.state.lock() else {
            return PanelSnapshot {
                view: ViewState::Loading,
                interval_ms: RefreshInterval::DEFAULT.as_millis(),
            };
        };
        PanelSnapshot {
            view: state.view.clone(),
            interval_ms: state.interval.as_millis(),
        }
    }
}

impl<S: VitalsSource> PanelInner<S> {
    fn dispatch(inner: &Arc<Self>) {
        let seq = {
            let Ok(mut state) = inner.state.lock() else {
                return;
            };
            state.next_seq += 1;
            state.view = ViewState::Loading;
            state.next_seq
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let result = inner.source.fetch().await;
            inner.apply(seq, result);
        });
    }

    fn apply(&self, seq: u64, result: Result<Vec<VitalsReading>, FeedError>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if seq <= state.applied_seq {
            tracing::debug!(seq, applied = state.applied_seq, "Discarding stale vitals response");
            return;
        }
        state.applied_seq = seq;
        state.view = match result {
            Ok(readings) => ViewState::Ready { data: readings },
            Err(e) => {
                tracing::warn!("Vitals fetch failed: {e}");
                ViewState::Failed {
                    error: e.to_string(),
                }
            }
        };
    }
}

fn spawn_timer<S: VitalsSource>(
    inner: &Arc<PanelInner<S>>,
    interval: RefreshInterval,
) -> JoinHandle<()> {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the mount fetch already
        // covered it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            PanelInner::dispatch(&inner);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn reading(id: i64) -> VitalsReading {
        VitalsReading {
            id,
            subject_id: "PD01".into(),
            display_name: "Rahul".into(),
            heart_rate: 78.0,
            oxygen_saturation: 97.5,
            active: true,
            recorded_at: 1_767_000_000,
            condition: "Normal".into(),
        }
    }

    /// Records the virtual instant of every fetch; each call takes the
    /// next scripted step: a delay plus a result.
    struct ScriptedSource {
        calls: AtomicUsize,
        fetch_times: Mutex<Vec<Instant>>,
        steps: Vec<(Duration, Result<Vec<VitalsReading>, ()>)>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<(Duration, Result<Vec<VitalsReading>, ()>)>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fetch_times: Mutex::new(Vec::new()),
                steps,
            }
        }

        fn repeating(result: Vec<VitalsReading>) -> Self {
            Self::new(vec![(Duration::ZERO, Ok(result))])
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn times(&self) -> Vec<Instant> {
            self.fetch_times.lock().unwrap().clone()
        }
    }

    impl VitalsSource for Arc<ScriptedSource> {
        fn fetch(
            &self,
        ) -> impl Future<Output = Result<Vec<VitalsReading>, FeedError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.fetch_times.lock().unwrap().push(Instant::now());
            let step = self.steps[call.min(self.steps.len() - 1)].clone();
            async move {
                tokio::time::sleep(step.0).await;
                step.1.map_err(|_| FeedError::Network("scripted failure".into()))
            }
        }
    }

    async fn settle() {
        // Let spawned fetch tasks run under the paused clock.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn mount_fetch_transitions_loading_to_ready() {
        let source = Arc::new(ScriptedSource::repeating(vec![reading(1)]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        assert!(matches!(panel.snapshot().view, ViewState::Loading));
        panel.start();
        settle().await;

        match panel.snapshot().view {
            ViewState::Ready { data } => assert_eq!(data[0].id, 1),
            other => panic!("expected Ready, got {other:?}"),
        }
        panel.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn failure_transitions_to_failed_and_retry_recovers() {
        let source = Arc::new(ScriptedSource::new(vec![
            (Duration::ZERO, Err(())),
            (Duration::ZERO, Ok(vec![reading(2)])),
        ]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        panel.refresh();
        settle().await;
        match panel.snapshot().view {
            ViewState::Failed { error } => assert!(error.contains("scripted failure")),
            other => panic!("expected Failed, got {other:?}"),
        }

        panel.refresh();
        settle().await;
        assert!(panel.snapshot().view.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fetches_follow_the_configured_interval() {
        let source = Arc::new(ScriptedSource::repeating(vec![reading(1)]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        panel.start();
        tokio::time::sleep(Duration::from_millis(15_100)).await;
        panel.stop();

        // Mount fetch plus one tick per 5s default interval.
        assert_eq!(source.call_count(), 4);
        let times = source.times();
        for pair in times[1..].windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(5_000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_replaces_the_timer() {
        let source = Arc::new(ScriptedSource::repeating(vec![reading(1)]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        panel.start();
        settle().await;
        panel.set_interval(RefreshInterval::TenSeconds);

        let before = source.call_count();
        tokio::time::sleep(Duration::from_millis(30_100)).await;
        panel.stop();

        // Three ticks in 30s — a leftover 5s timer would have produced six.
        let ticks = source.call_count() - before;
        assert_eq!(ticks, 3);

        let times = source.times();
        for pair in times[before..].windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(10_000),
                "fetches spaced closer than the 10s interval"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let source = Arc::new(ScriptedSource::new(vec![
            (Duration::from_secs(5), Ok(vec![reading(1)])),
            (Duration::ZERO, Ok(vec![reading(2)])),
        ]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        panel.refresh(); // slow
        panel.refresh(); // fast, newer sequence
        settle().await;

        match panel.snapshot().view {
            ViewState::Ready { ref data } => assert_eq!(data[0].id, 2),
            ref other => panic!("expected Ready, got {other:?}"),
        }

        // Let the slow fetch complete; its response must not win.
        tokio::time::sleep(Duration::from_secs(6)).await;
        match panel.snapshot().view {
            ViewState::Ready { data } => assert_eq!(data[0].id, 2),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn setting_the_same_interval_keeps_the_timer() {
        let source = Arc::new(ScriptedSource::repeating(vec![reading(1)]));
        let panel = VitalsPanel::new(Arc::clone(&source));

        panel.start();
        settle().await;
        panel.set_interval(RefreshInterval::FiveSeconds);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        panel.stop();
        assert!(source.call_count() >= 2);
    }

    #[test]
    fn interval_enumeration_round_trips() {
        for interval in [
            RefreshInterval::OneSecond,
            RefreshInterval::FiveSeconds,
            RefreshInterval::TenSeconds,
            RefreshInterval::ThirtySeconds,
        ] {
            assert_eq!(RefreshInterval::from_millis(interval.as_millis()), Some(interval));
        }
        assert_eq!(RefreshInterval::from_millis(2_000), None);
    }

    #[test]
    fn snapshot_serializes_tagged_state() {
        let snapshot = PanelSnapshot {
            view: ViewState::Ready { data: vec![reading(1)] },
            interval_ms: 5_000,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["interval_ms"], 5_000);
        assert_eq!(json["data"][0]["subject_id"], "PD01");
    }
}
