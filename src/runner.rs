//! Simulated fire-and-forget actions.
//!
//! A run goes `Idle -> Running` on [`SimulatedActionRunner::start`] and ends in
//! exactly one of `Completed`, `Cancelled` or `Failed`. Completion is driven by
//! the injected [`Clock`]; the [`NotificationSink`] hears about it once.

use crate::clock::{CancelToken, Clock};
use crate::model::{ActionRequest, NotificationKind, RunState};
use crate::notify::NotificationSink;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunHandle(u64);

#[derive(Debug, Clone, Serialize)]
pub struct ActionRun {
    pub request: ActionRequest,
    pub state: RunState,
    #[serde(with = "humantime_serde")]
    pub started_at: Duration,
}

struct RunEntry {
    run: ActionRun,
    timer: Option<CancelToken>,
}

struct Shared {
    runs: Mutex<BTreeMap<RunHandle, RunEntry>>,
    sink: Arc<dyn NotificationSink>,
}

impl Shared {
    fn runs(&self) -> MutexGuard<'_, BTreeMap<RunHandle, RunEntry>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timer callback body. Only a `Running` run completes; anything else is a
    /// late or duplicate fire and is ignored.
    fn complete(&self, handle: RunHandle) {
        let message = {
            let mut runs = self.runs();
            let Some(entry) = runs.get_mut(&handle) else {
                return;
            };
            if entry.run.state != RunState::Running {
                tracing::trace!(?handle, state = ?entry.run.state, "ignoring timer for finished run");
                return;
            }
            entry.run.state = RunState::Completed;
            entry.timer = None;
            let request = &entry.run.request;
            tracing::info!(?handle, action_id = %request.action_id, kind = ?request.kind, "action completed");
            request.kind.success_message(&request.action_id)
        };
        self.sink.notify(&message, NotificationKind::Success);
    }
}

pub struct SimulatedActionRunner {
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl SimulatedActionRunner {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            clock,
            shared: Arc::new(Shared {
                runs: Mutex::new(BTreeMap::new()),
                sink,
            }),
            next_id: AtomicU64::new(0),
        }
    }

    /// Begin a run and schedule its completion. Returns without waiting.
    pub fn start(&self, request: ActionRequest) -> RunHandle {
        let handle = RunHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let delay = request.simulated_latency;
        tracing::info!(
            ?handle,
            action_id = %request.action_id,
            kind = ?request.kind,
            latency_ms = delay.as_millis() as u64,
            "starting action"
        );

        let mut run = ActionRun {
            request,
            state: RunState::Idle,
            started_at: self.clock.now(),
        };
        run.state = RunState::Running;
        self.shared
            .runs()
            .insert(handle, RunEntry { run, timer: None });

        // The callback holds a weak reference so a dropped runner does not
        // keep its runs alive inside the clock.
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let token = self.clock.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.complete(handle);
                }
            }),
        );

        if let Some(entry) = self.shared.runs().get_mut(&handle) {
            if entry.run.state == RunState::Running {
                entry.timer = Some(token);
            }
        }
        handle
    }

    /// Stop a running action without reporting it. Safe to call repeatedly
    /// and on handles that already finished.
    pub fn cancel(&self, handle: RunHandle) {
        let token = {
            let mut runs = self.shared.runs();
            let Some(entry) = runs.get_mut(&handle) else {
                return;
            };
            if entry.run.state != RunState::Running {
                return;
            }
            entry.run.state = RunState::Cancelled;
            tracing::info!(?handle, action_id = %entry.run.request.action_id, "action cancelled");
            entry.timer.take()
        };
        if let Some(token) = token {
            self.clock.cancel(token);
        }
    }

    /// Move a running action to `Failed` and report it as an error. The
    /// simulation never calls this; it is the hook a real backend reports
    /// through.
    #[allow(dead_code)]
    pub fn fail(&self, handle: RunHandle, reason: &str) {
        let (token, message) = {
            let mut runs = self.shared.runs();
            let Some(entry) = runs.get_mut(&handle) else {
                return;
            };
            if entry.run.state != RunState::Running {
                return;
            }
            entry.run.state = RunState::Failed;
            let request = &entry.run.request;
            tracing::warn!(?handle, action_id = %request.action_id, reason, "action failed");
            (
                entry.timer.take(),
                request.kind.failure_message(&request.action_id, reason),
            )
        };
        if let Some(token) = token {
            self.clock.cancel(token);
        }
        self.shared.sink.notify(&message, NotificationKind::Error);
    }

    pub fn state(&self, handle: RunHandle) -> Option<RunState> {
        self.shared.runs().get(&handle).map(|e| e.run.state)
    }

    pub fn run(&self, handle: RunHandle) -> Option<ActionRun> {
        self.shared.runs().get(&handle).map(|e| e.run.clone())
    }

    /// Number of runs still in flight. The UI shows its spinner while this is
    /// non-zero.
    pub fn running_count(&self) -> usize {
        self.shared
            .runs()
            .values()
            .filter(|e| e.run.state == RunState::Running)
            .count()
    }

    /// Most recently started run that is still in flight.
    pub fn latest_running(&self) -> Option<RunHandle> {
        self.shared
            .runs()
            .iter()
            .rev()
            .find(|(_, e)| e.run.state == RunState::Running)
            .map(|(h, _)| *h)
    }

    /// Forget every run that reached a terminal state.
    pub fn prune(&self) -> usize {
        let mut runs = self.shared.runs();
        let before = runs.len();
        runs.retain(|_, e| !e.run.state.is_terminal());
        before - runs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::model::{ActionKind, Notification};
    use crate::notify::RecordingSink;

    fn setup() -> (Arc<FakeClock>, Arc<RecordingSink>, SimulatedActionRunner) {
        let clock = Arc::new(FakeClock::new());
        let sink = Arc::new(RecordingSink::default());
        let runner = SimulatedActionRunner::new(clock.clone(), sink.clone());
        (clock, sink, runner)
    }

    fn req(id: &str, kind: ActionKind, ms: u64) -> ActionRequest {
        ActionRequest::new(id, kind, Duration::from_millis(ms))
    }

    #[test]
    fn completes_once_after_latency() {
        let (clock, sink, runner) = setup();
        let h = runner.start(req("CheckOSCompatibility.ps1", ActionKind::RemoteAction, 2000));
        assert_eq!(runner.state(h), Some(RunState::Running));

        clock.advance(Duration::from_millis(1999));
        assert!(sink.messages().is_empty());

        clock.advance(Duration::from_millis(1));
        let seen = sink.messages();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("CheckOSCompatibility.ps1"));
        assert_eq!(seen[0].1, NotificationKind::Success);
        assert_eq!(runner.state(h), Some(RunState::Completed));

        clock.advance(Duration::from_secs(60));
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn cancel_before_latency_reports_nothing() {
        let (clock, sink, runner) = setup();
        let h = runner.start(req("a", ActionKind::Automation, 2000));
        clock.advance(Duration::from_millis(500));
        runner.cancel(h);
        assert_eq!(runner.state(h), Some(RunState::Cancelled));
        assert_eq!(clock.pending_count(), 0);

        clock.advance(Duration::from_secs(10));
        assert!(sink.messages().is_empty());
        assert_eq!(runner.state(h), Some(RunState::Cancelled));
    }

    #[test]
    fn cancel_is_idempotent_and_ignores_finished_runs() {
        let (clock, sink, runner) = setup();
        let h = runner.start(req("a", ActionKind::Campaign, 10));
        clock.advance(Duration::from_millis(10));
        runner.cancel(h);
        runner.cancel(h);
        assert_eq!(runner.state(h), Some(RunState::Completed));
        assert_eq!(sink.messages().len(), 1);

        runner.cancel(RunHandle(999));
    }

    #[test]
    fn shorter_latency_notifies_first() {
        let (clock, sink, runner) = setup();
        runner.start(req("slow", ActionKind::RemoteAction, 100));
        runner.start(req("fast", ActionKind::RemoteAction, 50));
        clock.advance(Duration::from_millis(1000));
        let seen = sink.messages();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.contains("\"fast\""));
        assert!(seen[1].0.contains("\"slow\""));
    }

    #[test]
    fn equal_latency_completes_in_start_order() {
        let (clock, sink, runner) = setup();
        for id in ["first", "second", "third"] {
            runner.start(req(id, ActionKind::Automation, 2000));
        }
        clock.advance(Duration::from_millis(2000));
        let order: Vec<_> = sink
            .messages()
            .into_iter()
            .map(|(m, _)| m)
            .collect();
        assert_eq!(
            order,
            vec![
                ActionKind::Automation.success_message("first"),
                ActionKind::Automation.success_message("second"),
                ActionKind::Automation.success_message("third"),
            ]
        );
    }

    #[test]
    fn duplicate_timer_fire_is_a_no_op() {
        let (clock, sink, runner) = setup();
        let h = runner.start(req("a", ActionKind::RemoteAction, 5));
        clock.advance(Duration::from_millis(5));
        runner.shared.complete(h);
        runner.shared.complete(h);
        assert_eq!(sink.messages().len(), 1);

        let c = runner.start(req("b", ActionKind::RemoteAction, 5));
        runner.cancel(c);
        runner.shared.complete(c);
        assert_eq!(runner.state(c), Some(RunState::Cancelled));
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn fail_reports_error_and_suppresses_completion() {
        let (clock, sink, runner) = setup();
        let h = runner.start(req("a", ActionKind::Campaign, 100));
        runner.fail(h, "device offline");
        clock.advance(Duration::from_secs(1));
        let seen = sink.messages();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, NotificationKind::Error);
        assert!(seen[0].0.contains("device offline"));
        assert_eq!(runner.state(h), Some(RunState::Failed));

        runner.fail(h, "again");
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn running_count_drops_to_zero_for_every_kind() {
        let (clock, _sink, runner) = setup();
        for kind in [ActionKind::RemoteAction, ActionKind::Automation, ActionKind::Campaign] {
            runner.start(req("x", kind, 2000));
        }
        assert_eq!(runner.running_count(), 3);
        clock.advance(Duration::from_millis(2000));
        assert_eq!(runner.running_count(), 0);
        assert_eq!(runner.prune(), 3);
    }

    #[test]
    fn latest_running_skips_finished_runs() {
        let (clock, _sink, runner) = setup();
        let a = runner.start(req("a", ActionKind::RemoteAction, 1000));
        let b = runner.start(req("b", ActionKind::RemoteAction, 10));
        assert_eq!(runner.latest_running(), Some(b));
        clock.advance(Duration::from_millis(10));
        assert_eq!(runner.latest_running(), Some(a));
    }

    #[test]
    fn started_at_reads_the_clock() {
        let (clock, _sink, runner) = setup();
        clock.advance(Duration::from_millis(750));
        let h = runner.start(req("a", ActionKind::RemoteAction, 1));
        assert_eq!(runner.run(h).unwrap().started_at, Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_delivers_through_channel_sink() {
        let (clock, _driver) = crate::clock::TokioClock::spawn();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Notification>();
        let runner = SimulatedActionRunner::new(
            Arc::new(clock),
            Arc::new(crate::notify::ChannelSink::new(tx)),
        );
        let cancelled = runner.start(req("dropped", ActionKind::Campaign, 100));
        runner.start(req("kept", ActionKind::Automation, 2000));
        runner.cancel(cancelled);

        let n = rx.recv().await.unwrap();
        assert_eq!(n.message, ActionKind::Automation.success_message("kept"));
        assert_eq!(runner.running_count(), 0);
        assert!(rx.try_recv().is_err());
    }
}
