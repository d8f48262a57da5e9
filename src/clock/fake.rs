use super::{CancelToken, Clock, TimerCallback};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

/// Virtual-time clock. Nothing fires until [`FakeClock::advance`] is called.
#[derive(Default)]
pub(crate) struct FakeClock {
    inner: Mutex<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), TimerCallback>,
    deadlines: HashMap<u64, Duration>,
}

impl FakeClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.inner.lock().map(|i| i.pending.len()).unwrap_or(0)
    }

    /// Move time forward by `by`, firing every due timer in deadline order.
    /// Callbacks run without the clock lock held, so they may schedule again.
    pub(crate) fn advance(&self, by: Duration) {
        let target = match self.inner.lock() {
            Ok(inner) => inner.now + by,
            Err(_) => return,
        };
        loop {
            let due = {
                let Ok(mut guard) = self.inner.lock() else {
                    return;
                };
                let inner = &mut *guard;
                let next = inner
                    .pending
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                match next {
                    Some((deadline, seq)) => {
                        inner.deadlines.remove(&seq);
                        inner.now = deadline;
                        inner.pending.remove(&(deadline, seq))
                    }
                    None => {
                        inner.now = target;
                        None
                    }
                }
            };
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.inner.lock().map(|i| i.now).unwrap_or_default()
    }

    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelToken {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let deadline = inner.now + delay;
        inner.pending.insert((deadline, seq), callback);
        inner.deadlines.insert(seq, deadline);
        CancelToken(seq)
    }

    fn cancel(&self, token: CancelToken) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(deadline) = inner.deadlines.remove(&token.0) {
            inner.pending.remove(&(deadline, token.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> TimerCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let make = move |tag: &'static str| -> TimerCallback {
            let log = log2.clone();
            Box::new(move || log.lock().unwrap().push(tag))
        };
        (log, make)
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let clock = FakeClock::new();
        let (log, cb) = recorder();
        clock.schedule(Duration::from_millis(100), cb("slow"));
        clock.schedule(Duration::from_millis(50), cb("fast"));
        clock.schedule(Duration::from_millis(50), cb("fast-2"));
        clock.advance(Duration::from_millis(500));
        assert_eq!(*log.lock().unwrap(), vec!["fast", "fast-2", "slow"]);
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let clock = FakeClock::new();
        let (log, cb) = recorder();
        clock.schedule(Duration::from_millis(2000), cb("a"));
        clock.advance(Duration::from_millis(1999));
        assert!(log.lock().unwrap().is_empty());
        clock.advance(Duration::from_millis(1));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let clock = FakeClock::new();
        let (log, cb) = recorder();
        let token = clock.schedule(Duration::from_millis(10), cb("a"));
        clock.cancel(token);
        clock.cancel(token);
        clock.advance(Duration::from_secs(1));
        assert!(log.lock().unwrap().is_empty());
    }
}
