use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Select"),
        ]),
        key_line("s", 11, "Sort by next column"),
        key_line("o", 11, "Flip sort direction"),
        Line::from(""),
        Line::from("Prophecies tab:"),
        key_line("space", 7, "Show more / show less devices"),
        key_line("r", 11, "Run remote action"),
        key_line("a", 11, "Automate"),
        key_line("m", 11, "Create campaign"),
        key_line("x", 11, "Cancel the latest running action"),
        Line::from(""),
        Line::from("Devices tab:"),
        key_line("r", 11, "Run remote action (asks for confirmation)"),
        key_line("enter", 7, "Confirm in the dialog"),
        key_line("esc", 9, "Dismiss the dialog"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
