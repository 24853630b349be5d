//! Main content area rendering (song carousel, sheet viewer)

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Wrap},
    Frame,
};

use crate::model::{Screen, Song, ZoomStrategy};
use super::utils::{disc_glyph, format_last_opened, page_dots, truncate_string};

pub fn render_carousel(frame: &mut Frame, area: Rect, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Song header
            Constraint::Min(0),    // Disc + caption
            Constraint::Length(1), // Page dots
        ])
        .split(area);

    let song = screen.current_song();
    let header = match song {
        Some(song) => format!("SONG: {}", song.name.to_uppercase()),
        None => "LOADING...".to_string(),
    };
    let header = Paragraph::new(truncate_string(&header, chunks[0].width.saturating_sub(4) as usize))
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let mut lines = vec![Line::from("")];
    match song {
        Some(song) => {
            lines.push(Line::from(Span::styled(
                disc_glyph(screen.spin_degrees).to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format_last_opened(screen.view.last_opened(&song.song_id)),
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(Span::styled(
                file_summary(song),
                Style::default().fg(Color::DarkGray),
            )));
        }
        None if !screen.loading => {
            lines.push(Line::from(Span::styled(
                "No songs in this group",
                Style::default().fg(Color::DarkGray),
            )));
        }
        None => {}
    }
    if let Some(err) = screen.view.songs_error.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(err, Style::default().fg(Color::Red))));
    }

    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().padding(Padding::horizontal(1)));
    frame.render_widget(body, chunks[1]);

    let carousel = &screen.selection.carousel;
    let dots = Paragraph::new(page_dots(carousel.index(), carousel.count()))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(dots, chunks[2]);
}

fn file_summary(song: &Song) -> String {
    match song.files.len() {
        0 => "No files".to_string(),
        1 => "1 file".to_string(),
        n => format!("{} files", n),
    }
}

/// Full screen page of the selected song.
pub fn render_viewer(frame: &mut Frame, area: Rect, screen: &Screen) {
    let Some(song) = screen.selection.selected_song.as_ref() else {
        return;
    };
    let pages = &screen.selection.pages;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Page
            Constraint::Length(1), // Previous / page x of y / Next
        ])
        .split(area);

    let mut lines = Vec::new();
    match song.files.get(pages.index()) {
        Some(file) => {
            lines.push(Line::from(Span::styled(
                file.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            match file.resolved_url.as_deref() {
                Some(url) => lines.push(Line::from(Span::styled(
                    url.to_string(),
                    Style::default().fg(Color::Cyan),
                ))),
                None => lines.push(Line::from(Span::styled(
                    "unavailable",
                    Style::default().fg(Color::DarkGray),
                ))),
            }
        }
        None => lines.push(Line::from(Span::styled(
            "This song has no files",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        transform_label(screen),
        Style::default().fg(Color::Gray),
    )));

    let page = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", song.name))
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(page, chunks[0]);

    let nav_style = |enabled: bool| {
        if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let position = if pages.count() == 0 {
        String::new()
    } else {
        format!("  {} / {}  ", pages.index() + 1, pages.count())
    };
    let nav = Paragraph::new(Line::from(vec![
        Span::styled("◀ Previous", nav_style(!pages.is_first())),
        Span::raw(position),
        Span::styled("Next ▶", nav_style(!pages.is_last())),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(nav, chunks[1]);
}

fn transform_label(screen: &Screen) -> String {
    let mode = match screen.zoom_strategy {
        ZoomStrategy::PinchPan => "pinch",
        ZoomStrategy::Zoomable => "zoom",
    };
    let t = screen.transform;
    format!(
        "{} {:.2}x  offset ({:.0}, {:.0})",
        mode, t.scale, t.translate_x, t.translate_y
    )
}
