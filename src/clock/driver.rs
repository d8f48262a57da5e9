//! Tokio-backed clock.
//!
//! One driver task owns every pending timer and fires them from a `select!`
//! loop, so callbacks never race each other and equal deadlines keep their
//! scheduling order.

use super::{CancelToken, Clock, TimerCallback};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

enum TimerCommand {
    Schedule {
        seq: u64,
        deadline: Instant,
        callback: TimerCallback,
    },
    Cancel(u64),
}

pub(crate) struct TokioClock {
    origin: Instant,
    next_seq: AtomicU64,
    cmd_tx: UnboundedSender<TimerCommand>,
}

impl TokioClock {
    /// Spawn the driver task on the current runtime. The task exits once the
    /// clock is dropped.
    pub(crate) fn spawn() -> (Self, tokio::task::JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<TimerCommand>();
        let handle = tokio::spawn(drive_timers(cmd_rx));
        let clock = Self {
            origin: Instant::now(),
            next_seq: AtomicU64::new(0),
            cmd_tx,
        };
        (clock, handle)
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelToken {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        // Deadline is taken here, not in the driver, so queueing delay in the
        // channel cannot reorder timers.
        let deadline = Instant::now() + delay;
        if self
            .cmd_tx
            .send(TimerCommand::Schedule {
                seq,
                deadline,
                callback,
            })
            .is_err()
        {
            tracing::warn!(seq, "timer driver stopped; dropping scheduled callback");
        }
        CancelToken(seq)
    }

    fn cancel(&self, token: CancelToken) {
        let _ = self.cmd_tx.send(TimerCommand::Cancel(token.0));
    }
}

async fn drive_timers(mut cmd_rx: UnboundedReceiver<TimerCommand>) {
    let mut pending: BTreeMap<(Instant, u64), TimerCallback> = BTreeMap::new();
    let mut deadlines: HashMap<u64, Instant> = HashMap::new();

    loop {
        let next_deadline = pending.keys().next().map(|(deadline, _)| *deadline);

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(TimerCommand::Schedule { seq, deadline, callback }) => {
                        pending.insert((deadline, seq), callback);
                        deadlines.insert(seq, deadline);
                    }
                    Some(TimerCommand::Cancel(seq)) => {
                        if let Some(deadline) = deadlines.remove(&seq) {
                            pending.remove(&(deadline, seq));
                        }
                    }
                    None => break,
                }
            }
            _ = async {
                match next_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => futures::future::pending().await,
                }
            } => {
                let now = Instant::now();
                while let Some(key) = pending.keys().next().copied().filter(|(d, _)| *d <= now) {
                    deadlines.remove(&key.1);
                    if let Some(callback) = pending.remove(&key) {
                        callback();
                    }
                }
            }
        }
    }

    if !pending.is_empty() {
        tracing::debug!(dropped = pending.len(), "timer driver shut down with pending timers");
    }
}
