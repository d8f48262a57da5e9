use crate::catalog::{self, DeviceRisk, Prophecy, DEVICE_FIELDS, MAX_VISIBLE_DEVICES, PROPHECY_FIELDS};
use crate::model::{ActionKind, ActionRequest, AppConfig, Notification, ViewKind};
use crate::sort::{SortDescriptor, SortableListModel};
use crate::view::{default_descriptor, table_request};
use crossterm::event::KeyCode;
use std::collections::HashSet;
use std::time::{Duration, Instant};

pub const TAB_CARDS: usize = 0;
pub const TAB_TABLE: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    Launch(ActionRequest),
    CancelLatest,
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub latency: Duration,

    pub cards: SortableListModel<Prophecy>,
    pub table: SortableListModel<DeviceRisk>,
    // Sorted snapshots, rebuilt whenever a descriptor changes.
    pub cards_view: Vec<Prophecy>,
    pub table_view: Vec<DeviceRisk>,
    pub cards_selected: usize,
    pub table_selected: usize,

    // Keyed by failure details so expansion follows a card across re-sorts.
    pub expanded: HashSet<String>,
    /// Pending confirmation for a table remote action.
    pub modal: Option<ActionRequest>,
    pub toasts: Vec<Toast>,
}

impl UiState {
    pub fn new(cfg: &AppConfig) -> Self {
        let cards_sort = match cfg.view {
            ViewKind::Cards => cfg.sort.clone(),
            ViewKind::Table => default_descriptor(ViewKind::Cards),
        };
        let table_sort = match cfg.view {
            ViewKind::Table => cfg.sort.clone(),
            ViewKind::Cards => default_descriptor(ViewKind::Table),
        };
        let mut state = Self {
            tab: match cfg.view {
                ViewKind::Cards => TAB_CARDS,
                ViewKind::Table => TAB_TABLE,
            },
            info: String::new(),
            latency: cfg.simulated_latency,
            cards: SortableListModel::new(catalog::prophecies(cfg.seed), cards_sort),
            table: SortableListModel::new(catalog::device_table(), table_sort),
            cards_view: Vec::new(),
            table_view: Vec::new(),
            cards_selected: 0,
            table_selected: 0,
            expanded: HashSet::new(),
            modal: None,
            toasts: Vec::new(),
        };
        state.refresh_views();
        state
    }

    pub fn refresh_views(&mut self) {
        match self.cards.view() {
            Ok(v) => self.cards_view = v,
            Err(e) => self.info = format!("Sort failed: {e}"),
        }
        match self.table.view() {
            Ok(v) => self.table_view = v,
            Err(e) => self.info = format!("Sort failed: {e}"),
        }
    }

    pub fn active_descriptor(&self) -> Option<&SortDescriptor> {
        match self.tab {
            TAB_CARDS => Some(self.cards.descriptor()),
            TAB_TABLE => Some(self.table.descriptor()),
            _ => None,
        }
    }

    /// Advance to the next sortable column of the current tab.
    pub fn cycle_sort_field(&mut self) {
        fn next_field(fields: &[&'static str], current: &str) -> &'static str {
            let pos = fields.iter().position(|f| *f == current).unwrap_or(0);
            fields[(pos + 1) % fields.len()]
        }
        match self.tab {
            TAB_CARDS => {
                let f = next_field(PROPHECY_FIELDS, &self.cards.descriptor().field);
                self.cards.sort_by_column(f);
            }
            TAB_TABLE => {
                let f = next_field(DEVICE_FIELDS, &self.table.descriptor().field);
                self.table.sort_by_column(f);
            }
            _ => return,
        }
        self.after_sort();
    }

    pub fn flip_direction(&mut self) {
        match self.tab {
            TAB_CARDS => {
                let f = self.cards.descriptor().field.clone();
                self.cards.sort_by_column(&f);
            }
            TAB_TABLE => {
                let f = self.table.descriptor().field.clone();
                self.table.sort_by_column(&f);
            }
            _ => return,
        }
        self.after_sort();
    }

    fn after_sort(&mut self) {
        self.refresh_views();
        if let Some(d) = self.active_descriptor() {
            self.info = format!("Sorted by {} {}", d.field, d.direction.arrow());
        }
    }

    pub fn move_selection(&mut self, down: bool) {
        let (sel, len) = match self.tab {
            TAB_CARDS => (&mut self.cards_selected, self.cards_view.len()),
            TAB_TABLE => (&mut self.table_selected, self.table_view.len()),
            _ => return,
        };
        if down {
            if *sel + 1 < len {
                *sel += 1;
            }
        } else {
            *sel = sel.saturating_sub(1);
        }
    }

    pub fn is_collapsed(&self, card: &Prophecy) -> bool {
        card.names.len() > MAX_VISIBLE_DEVICES && !self.expanded.contains(&card.failure_details)
    }

    /// Show more / show less on the selected card.
    pub fn toggle_collapse(&mut self) {
        if self.tab != TAB_CARDS {
            return;
        }
        let Some(card) = self.cards_view.get(self.cards_selected) else {
            return;
        };
        if card.names.len() <= MAX_VISIBLE_DEVICES {
            return;
        }
        let key = card.failure_details.clone();
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
    }

    /// Request for `kind` on the current selection. Table rows only offer
    /// remote actions, and those go through the confirmation modal first.
    fn launch(&mut self, kind: ActionKind) -> Option<UiAction> {
        match self.tab {
            TAB_CARDS => {
                let card = self.cards_view.get(self.cards_selected)?;
                let req = ActionRequest::new(card.action_id(), kind, self.latency);
                self.info = format!("{} requested…", kind.label());
                Some(UiAction::Launch(req))
            }
            TAB_TABLE if kind == ActionKind::RemoteAction => {
                let row = self.table_view.get(self.table_selected)?;
                self.modal = Some(table_request(row, self.latency));
                None
            }
            _ => None,
        }
    }

    pub fn push_toast(&mut self, notification: Notification, now: Instant) {
        self.info = notification.message.clone();
        self.toasts.push(Toast {
            notification,
            shown_at: now,
        });
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < TOAST_DURATION);
    }

    /// Apply a key press. Anything the runner has to do is returned.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<UiAction> {
        if let Some(req) = self.modal.clone() {
            match code {
                KeyCode::Enter | KeyCode::Char('y') => {
                    self.modal = None;
                    self.info = format!("{} requested…", req.kind.label());
                    return Some(UiAction::Launch(req));
                }
                KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('q') => {
                    self.modal = None;
                    self.info = "Cancelled".into();
                }
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Char('q') => return Some(UiAction::Quit),
            KeyCode::Tab => self.tab = (self.tab + 1) % TAB_COUNT,
            KeyCode::Char('?') => self.tab = TAB_HELP,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char('s') => self.cycle_sort_field(),
            KeyCode::Char('o') => self.flip_direction(),
            KeyCode::Char(' ') => self.toggle_collapse(),
            KeyCode::Char('r') | KeyCode::Enter => return self.launch(ActionKind::RemoteAction),
            KeyCode::Char('a') => return self.launch(ActionKind::Automation),
            KeyCode::Char('m') => return self.launch(ActionKind::Campaign),
            KeyCode::Char('x') => return Some(UiAction::CancelLatest),
            _ => {}
        }
        None
    }
}
