//! Text summary builder for CLI output.
//!
//! Formats the sorted view and any notifications as human-readable lines.

use crate::catalog::MAX_VISIBLE_DEVICES;
use crate::model::{Notification, NotificationKind};
use crate::sort::SortDescriptor;
use crate::view::CatalogView;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn kind_tag(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Success => "ok",
        NotificationKind::Warning => "warning",
        NotificationKind::Error => "error",
    }
}

pub(crate) fn build_text_summary(
    view: &CatalogView,
    sort: &SortDescriptor,
    notifications: &[Notification],
) -> TextSummary {
    let mut lines = Vec::new();
    lines.push(format!("Sorted by {} {}", sort.field, sort.direction.arrow()));

    match view {
        CatalogView::Table(rows) => {
            lines.push(format!("{:<18} {:>20}", "Name", "Failure Probability"));
            for r in rows {
                lines.push(format!("{:<18} {:>19.1}%", r.name, r.failure_probability));
            }
        }
        CatalogView::Cards(cards) => {
            for (i, c) in cards.iter().enumerate() {
                lines.push(String::new());
                lines.push(format!("[{i}] {} device(s) at risk", c.names.len()));
                lines.push(format!("    {}", c.failure_details));
                if !c.script_name.is_empty() {
                    lines.push(format!("    Script: {}", c.script_name));
                }
                lines.push(format!("    Suggested: {}", c.ra_suggested));
                let shown: Vec<&str> = c
                    .names
                    .iter()
                    .take(MAX_VISIBLE_DEVICES)
                    .map(String::as_str)
                    .collect();
                let hidden = c.names.len().saturating_sub(MAX_VISIBLE_DEVICES);
                if hidden > 0 {
                    lines.push(format!("    Devices: {} (+{hidden} more)", shown.join(", ")));
                } else {
                    lines.push(format!("    Devices: {}", shown.join(", ")));
                }
            }
        }
    }

    for n in notifications {
        lines.push(format!("[{}] {}", kind_tag(n.kind), n.message));
    }

    TextSummary { lines }
}
