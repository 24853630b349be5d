//! Layout rendering (top bar, bottom navigation)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::model::{Mode, Screen};

const ACCENT: Color = Color::Rgb(0xFF, 0xCE, 0x00);

pub fn render_top_bar(frame: &mut Frame, area: Rect, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Group name
            Constraint::Length(14), // Loading / status
        ])
        .split(area);

    let group = if screen.view.group_name.is_empty() {
        "…"
    } else {
        screen.view.group_name.as_str()
    };

    let title = Paragraph::new(group)
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Group ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(title, chunks[0]);

    let (status, style) = if let Some(err) = screen.view.user_error.as_deref() {
        (err.to_string(), Style::default().fg(Color::Red))
    } else if screen.loading {
        ("Loading…".to_string(), Style::default().fg(Color::Yellow))
    } else {
        ("Synced".to_string(), Style::default().fg(Color::Green))
    };
    let status = Paragraph::new(status)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(" Status "));
    frame.render_widget(status, chunks[1]);
}

/// Bottom navigation, hidden while a song is open full screen.
pub fn render_bottom_nav(frame: &mut Frame, area: Rect, screen: &Screen) {
    let hints = match screen.selection.mode {
        Mode::Browsing => " ←/→ browse   Enter open   q quit ",
        Mode::Viewing => " ←/→ page   +/- zoom   wasd pan   0 reset   Esc back ",
    };
    let nav = Paragraph::new(hints)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(nav, area);
}
