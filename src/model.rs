use crate::sort::SortDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub view: ViewKind,
    pub sort: SortDescriptor,
    #[serde(with = "humantime_serde")]
    pub simulated_latency: Duration,
    pub seed: Option<u64>,
    pub launch: Option<ActionKind>,
    pub target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Prophecy cards grouped by failure cause
    Cards,
    /// Flat device table with failure probabilities
    Table,
}

impl ViewKind {
    /// Sort field the view opens with.
    pub fn default_sort_field(self) -> &'static str {
        match self {
            ViewKind::Cards => "names.length",
            ViewKind::Table => "failureProbability",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    RemoteAction,
    Automation,
    Campaign,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::RemoteAction => "Remote action",
            ActionKind::Automation => "Automation",
            ActionKind::Campaign => "Campaign",
        }
    }

    /// Toast text shown when an action of this kind succeeds.
    pub fn success_message(self, action_id: &str) -> String {
        match self {
            ActionKind::RemoteAction => {
                format!("Remote action \"{action_id}\" launched successfully")
            }
            ActionKind::Automation => format!("Automation \"{action_id}\" created successfully"),
            ActionKind::Campaign => format!("Campaign \"{action_id}\" created successfully"),
        }
    }

    pub fn failure_message(self, action_id: &str, reason: &str) -> String {
        format!("{} \"{action_id}\" failed: {reason}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_id: String,
    pub kind: ActionKind,
    #[serde(with = "humantime_serde")]
    pub simulated_latency: Duration,
}

impl ActionRequest {
    pub fn new(action_id: impl Into<String>, kind: ActionKind, simulated_latency: Duration) -> Self {
        Self {
            action_id: action_id.into(),
            kind,
            simulated_latency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    /// Reserved for a real backend; the simulation itself never fails.
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub timestamp_utc: String,
}

impl Notification {
    pub fn new(message: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            message: message.into(),
            kind,
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
        }
    }
}
