//! Utility functions for rendering UI components

use chrono::{DateTime, Local, Utc};

const DISC_FRAMES: [char; 4] = ['◐', '◓', '◑', '◒'];

pub fn format_last_opened(stamp: Option<DateTime<Utc>>) -> String {
    match stamp {
        Some(stamp) => format!(
            "Last opened: {}",
            stamp.with_timezone(&Local).format("%b %-d, %H:%M")
        ),
        None => "Last opened: never".to_string(),
    }
}

/// One dot per page, the current one filled
pub fn page_dots(index: usize, count: usize) -> String {
    (0..count)
        .map(|i| if i == index { "●" } else { "○" })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn disc_glyph(degrees: f32) -> char {
    let frame = (degrees.rem_euclid(360.0) / 90.0) as usize;
    DISC_FRAMES[frame.min(DISC_FRAMES.len() - 1)]
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_mark_current_page() {
        assert_eq!(page_dots(1, 3), "○ ● ○");
        assert_eq!(page_dots(0, 0), "");
    }

    #[test]
    fn disc_glyph_covers_full_turn() {
        assert_eq!(disc_glyph(0.0), '◐');
        assert_eq!(disc_glyph(100.0), '◓');
        assert_eq!(disc_glyph(359.9), '◒');
        assert_eq!(disc_glyph(-10.0), '◒');
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate_string("Lux Aurumque", 8), "Lux A...");
        assert_eq!(truncate_string("Ave", 8), "Ave");
    }
}
