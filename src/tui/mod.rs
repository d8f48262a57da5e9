mod help;
mod state;

use crate::catalog::{Prophecy, MAX_VISIBLE_DEVICES, TABLE_ACTION};
use crate::cli::{build_config, Cli};
use crate::clock::TokioClock;
use crate::model::{Notification, NotificationKind, RunState};
use crate::notify::{ChannelSink, Tee, TracingSink};
use crate::runner::SimulatedActionRunner;
use crate::view::CatalogView;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
        Tabs, Wrap,
    },
    Terminal,
};
use state::{UiAction, UiState, TAB_CARDS, TAB_TABLE};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    // Reject a bad --sort-field before the terminal switches to raw mode.
    CatalogView::load(&cfg)?;

    let (note_tx, note_rx) = mpsc::unbounded_channel::<Notification>();
    let (clock, driver) = TokioClock::spawn();
    let runner = SimulatedActionRunner::new(
        Arc::new(clock),
        Arc::new(Tee(ChannelSink::new(note_tx), TracingSink)),
    );
    let state = UiState::new(&cfg);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(state, runner, note_rx));

    // The timer driver exits once the UI thread drops the runner.
    let _ = driver.await;

    match tokio::task::spawn_blocking(move || ui_handle.join()).await {
        Ok(Ok(res)) => res,
        Ok(Err(_)) => Err(anyhow::anyhow!("TUI thread panicked")),
        Err(e) => Err(anyhow::anyhow!("TUI join failed: {e}")),
    }
}

/// Run the TUI loop on a dedicated thread. Owns the runner; notifications come
/// back over `note_rx` from the timer driver.
fn run_threaded(
    mut state: UiState,
    runner: SimulatedActionRunner,
    mut note_rx: UnboundedReceiver<Notification>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut frame: usize = 0;

    let res = loop {
        // Drain without blocking to keep the UI responsive.
        while let Ok(n) = note_rx.try_recv() {
            state.push_toast(n, Instant::now());
        }

        if last_tick.elapsed() >= tick_rate {
            let now = Instant::now();
            state.expire_toasts(now);
            runner.prune();
            frame = frame.wrapping_add(1);
            let spinner = (runner.running_count() > 0).then(|| SPINNER[frame % SPINNER.len()]);
            terminal.draw(|f| draw(f.area(), f, &state, spinner)).ok();
            last_tick = now;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
                    break Ok(());
                }
                match state.handle_key(k.code) {
                    Some(UiAction::Quit) => break Ok(()),
                    Some(UiAction::Launch(request)) => {
                        runner.start(request);
                    }
                    Some(UiAction::CancelLatest) => match runner.latest_running() {
                        Some(handle) => {
                            let id = runner
                                .run(handle)
                                .map(|r| r.request.action_id)
                                .unwrap_or_default();
                            runner.cancel(handle);
                            if runner.state(handle) == Some(RunState::Cancelled) {
                                state.info = format!("Cancelled \"{id}\"");
                            }
                        }
                        None => state.info = "Nothing running to cancel".into(),
                    },
                    None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Word-agnostic hard wrap of `value` into lines no wider than `width`,
/// the first one prefixed with `label`.
fn push_wrapped(out: &mut Vec<Line<'static>>, label: &str, value: &str, width: u16, style: Style) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    let usable_width = width.max(1);
    let label_width = label.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label.to_string(), Style::default().fg(Color::Gray)),
                Span::styled(line_text, style),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::styled(line_text, style)]));
        }

        remaining = rest;
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, spinner: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Prophecies"),
        Line::from("Devices"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("device-prophecy"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_CARDS => draw_cards(chunks[1], f, state),
        TAB_TABLE => draw_table(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    draw_status(chunks[2], f, state, spinner);
    draw_toasts(chunks[1], f, state);

    if let Some(req) = state.modal.as_ref() {
        let rect = centered(area, 60, 10);
        let p = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Are you sure you want to run this Remote Action?",
                Style::default().fg(Color::Yellow),
            )),
            Line::from(""),
            Line::from(req.action_id.clone()),
            Line::from(""),
            Line::from(vec![
                Span::styled("enter", Style::default().fg(Color::Magenta)),
                Span::raw(" ok   "),
                Span::styled("esc", Style::default().fg(Color::Magenta)),
                Span::raw(" cancel"),
            ]),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Run Remote Action"));
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

fn card_lines(card: &Prophecy, collapsed: bool, width: u16) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            card.names.len().to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" devices with issues"),
    ])];
    push_wrapped(&mut lines, "👁 ", &card.failure_details, width, Style::default());
    push_wrapped(
        &mut lines,
        "Fix: ",
        &card.ra_suggested,
        width,
        Style::default().add_modifier(Modifier::BOLD),
    );
    if !card.script_name.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Script: ", Style::default().fg(Color::Gray)),
            Span::raw(card.script_name.clone()),
        ]));
    }

    let shown = if collapsed {
        &card.names[..card.names.len().min(MAX_VISIBLE_DEVICES)]
    } else {
        &card.names[..]
    };
    // Device names are 14 chars wide plus a two-space gap.
    let per_line = ((width as usize).saturating_sub(2) / 16).max(1);
    for chunk in shown.chunks(per_line) {
        lines.push(Line::from(format!("  {}", chunk.join("  "))));
    }
    if card.names.len() > MAX_VISIBLE_DEVICES {
        let toggle = if collapsed {
            format!("  ▸ show {} more", card.names.len() - MAX_VISIBLE_DEVICES)
        } else {
            "  ▾ show less".to_string()
        };
        lines.push(Line::from(Span::styled(toggle, Style::default().fg(Color::Cyan))));
    }
    lines.push(Line::from(""));
    lines
}

fn draw_cards(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let width = area.width.saturating_sub(6);
    let items: Vec<ListItem> = state
        .cards_view
        .iter()
        .map(|c| ListItem::new(card_lines(c, state.is_collapsed(c), width)))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Failure Prophecy"),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▶ ");
    let mut list_state = ListState::default().with_selected(Some(state.cards_selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_table(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let d = state.table.descriptor();
    let header_cell = |field: &str, title: &str| -> Cell<'static> {
        if d.field == field {
            Cell::from(format!("{title} {}", d.direction.arrow()))
        } else {
            Cell::from(title.to_string())
        }
    };
    let header = Row::new(vec![
        header_cell("name", "Name"),
        header_cell("failureProbability", "Failure Probability"),
        Cell::from("Actions"),
    ])
    .style(Style::default().fg(Color::Yellow));

    let rows = state.table_view.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.name.clone()),
            Cell::from(format!("{:.1}%", r.failure_probability)),
            Cell::from(format!("Run: {TABLE_ACTION}")),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(22),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Act now to prevent failures! Devices at risk"),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("▶ ");
    let mut table_state = TableState::default().with_selected(Some(state.table_selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState, spinner: Option<&str>) {
    let mut first = Vec::new();
    if let Some(s) = spinner {
        first.push(Span::styled(format!("{s} "), Style::default().fg(Color::Cyan)));
    }
    first.push(Span::raw(state.info.clone()));
    let mut lines = vec![Line::from(first)];
    if let Some(d) = state.active_descriptor() {
        lines.push(Line::from(vec![
            Span::styled("Sort: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} {}", d.field, d.direction.arrow())),
            Span::raw("   "),
            Span::styled("s/o", Style::default().fg(Color::Magenta)),
            Span::raw(" sort  "),
            Span::styled("?", Style::default().fg(Color::Magenta)),
            Span::raw(" help"),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_toasts(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let width = area.width.min(60);
    for (i, toast) in state.toasts.iter().rev().take(4).enumerate() {
        let y = area.y + 1 + (i as u16) * 3;
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right().saturating_sub(width + 1), y, width, 3);
        let (color, title) = match toast.notification.kind {
            NotificationKind::Success => (Color::Green, "ok"),
            NotificationKind::Warning => (Color::Yellow, "warning"),
            NotificationKind::Error => (Color::Red, "error"),
        };
        let p = Paragraph::new(toast.notification.message.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_respects_width() {
        let mut out = Vec::new();
        push_wrapped(&mut out, "Fix: ", &"x".repeat(30), 15, Style::default());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].width(), 15);
        assert!(out.iter().all(|l| l.width() <= 15));
    }

    #[test]
    fn collapsed_card_shows_three_devices_and_toggle() {
        let card = crate::catalog::prophecies(Some(2)).remove(0);
        let lines = card_lines(&card, true, 200);
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        assert!(text.iter().any(|l| l.contains("show 297 more")));
        let device_count: usize = text.iter().map(|l| l.matches("NXT-").count()).sum();
        assert_eq!(device_count, 3);

        let expanded = card_lines(&card, false, 200);
        let device_count: usize = expanded
            .iter()
            .map(|l| l.to_string().matches("NXT-").count())
            .sum();
        assert_eq!(device_count, 300);
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let r = centered(Rect::new(0, 0, 40, 6), 60, 10);
        assert_eq!(r, Rect::new(0, 0, 40, 6));
        let r = centered(Rect::new(0, 0, 100, 30), 60, 10);
        assert_eq!(r, Rect::new(20, 10, 60, 10));
    }
}
