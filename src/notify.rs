//! Notification sinks: where user-facing toasts end up.

use crate::model::{Notification, NotificationKind};
use tokio::sync::mpsc::UnboundedSender;

pub trait NotificationSink: Send + Sync {
    /// Fire-and-forget; the runner never looks at the outcome.
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Forwards notifications to a presentation layer over an unbounded channel.
pub(crate) struct ChannelSink {
    tx: UnboundedSender<Notification>,
}

impl ChannelSink {
    pub(crate) fn new(tx: UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, message: &str, kind: NotificationKind) {
        if self.tx.send(Notification::new(message, kind)).is_err() {
            tracing::debug!(message, "notification receiver closed");
        }
    }
}

/// Emits notifications as log events only.
pub(crate) struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => tracing::info!(message, "notification"),
            NotificationKind::Warning => tracing::warn!(message, "notification"),
            NotificationKind::Error => tracing::error!(message, "notification"),
        }
    }
}

/// Fans one notification out to several sinks.
pub(crate) struct Tee<A, B>(pub A, pub B);

impl<A: NotificationSink, B: NotificationSink> NotificationSink for Tee<A, B> {
    fn notify(&self, message: &str, kind: NotificationKind) {
        self.0.notify(message, kind);
        self.1.notify(message, kind);
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    seen: std::sync::Mutex<Vec<(String, NotificationKind)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn messages(&self) -> Vec<(String, NotificationKind)> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str, kind: NotificationKind) {
        self.seen.lock().unwrap().push((message.to_string(), kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_message_and_kind() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = Tee(ChannelSink::new(tx), TracingSink);
        sink.notify("Campaign \"x\" created successfully", NotificationKind::Success);
        let n = rx.try_recv().unwrap();
        assert_eq!(n.message, "Campaign \"x\" created successfully");
        assert_eq!(n.kind, NotificationKind::Success);
        assert!(!n.timestamp_utc.is_empty());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        ChannelSink::new(tx).notify("lost", NotificationKind::Warning);
    }
}
