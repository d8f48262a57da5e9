//! Sorted, read-only snapshots of the catalog for the non-interactive modes.

use crate::catalog::{self, DeviceRisk, Prophecy, TABLE_ACTION};
use crate::model::{ActionKind, ActionRequest, AppConfig, ViewKind};
use crate::sort::{SortDescriptor, SortableListModel};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

pub(crate) enum CatalogView {
    Table(Vec<DeviceRisk>),
    Cards(Vec<Prophecy>),
}

impl CatalogView {
    /// Load the configured view and order it with the configured descriptor.
    pub(crate) fn load(cfg: &AppConfig) -> Result<Self> {
        let ctx = || format!("cannot sort {:?} view by {:?}", cfg.view, cfg.sort.field);
        Ok(match cfg.view {
            ViewKind::Table => {
                let model = SortableListModel::new(catalog::device_table(), cfg.sort.clone());
                CatalogView::Table(model.view().with_context(ctx)?)
            }
            ViewKind::Cards => {
                let model = SortableListModel::new(catalog::prophecies(cfg.seed), cfg.sort.clone());
                CatalogView::Cards(model.view().with_context(ctx)?)
            }
        })
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            CatalogView::Table(rows) => rows.len(),
            CatalogView::Cards(cards) => cards.len(),
        }
    }

    /// Build the request a click on row `index` would launch.
    pub(crate) fn action_for(
        &self,
        index: usize,
        kind: ActionKind,
        latency: Duration,
    ) -> Result<ActionRequest> {
        if index >= self.len() {
            return Err(anyhow!(
                "target {index} is out of range (view has {} entries)",
                self.len()
            ));
        }
        match self {
            CatalogView::Table(rows) => {
                if kind != ActionKind::RemoteAction {
                    return Err(anyhow!(
                        "the table view only offers remote actions, not {}",
                        kind.label().to_lowercase()
                    ));
                }
                Ok(table_request(&rows[index], latency))
            }
            CatalogView::Cards(cards) => Ok(ActionRequest::new(
                cards[index].action_id(),
                kind,
                latency,
            )),
        }
    }

    pub(crate) fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            CatalogView::Table(rows) => serde_json::to_value(rows)?,
            CatalogView::Cards(cards) => serde_json::to_value(cards)?,
        })
    }
}

/// Request for the table's per-row remote action.
pub(crate) fn table_request(row: &DeviceRisk, latency: Duration) -> ActionRequest {
    ActionRequest::new(
        format!("{TABLE_ACTION} on {}", row.name),
        ActionKind::RemoteAction,
        latency,
    )
}

pub(crate) fn default_descriptor(view: ViewKind) -> SortDescriptor {
    SortDescriptor::descending(view.default_sort_field())
}
