//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared formatting helpers
//! - `layout`: Top bar and bottom navigation
//! - `content`: Song carousel and sheet viewer

mod utils;
mod layout;
mod content;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{Mode, Screen};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, screen: &Screen) {
        let nav_height = if screen.chrome_visible { 2 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),          // Group name + status
                Constraint::Min(0),             // Carousel or viewer
                Constraint::Length(nav_height), // Bottom navigation
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], screen);

        match screen.selection.mode {
            Mode::Browsing => content::render_carousel(frame, chunks[1], screen),
            Mode::Viewing => content::render_viewer(frame, chunks[1], screen),
        }

        if screen.chrome_visible {
            layout::render_bottom_nav(frame, chunks[2], screen);
        }
    }
}
