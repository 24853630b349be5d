//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::Mode;
use super::AppController;

/// Distance of one keyboard pan step, in page units.
const PAN_STEP: f32 = 24.0;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if key.code == KeyCode::Char('q')
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.model.set_should_quit(true).await;
            return Ok(());
        }

        match self.model.mode().await {
            Mode::Browsing => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.prev_page().await,
                KeyCode::Right | KeyCode::Char('l') => self.next_page().await,
                KeyCode::Enter | KeyCode::Char(' ') => {
                    self.select_current_song().await;
                }
                _ => {}
            },
            Mode::Viewing => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => self.back().await,
                KeyCode::Left | KeyCode::Char('h') => self.prev_page().await,
                KeyCode::Right | KeyCode::Char('l') => self.next_page().await,
                KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(true).await,
                KeyCode::Char('-') => self.zoom(false).await,
                KeyCode::Char('0') => self.reset_zoom().await,
                KeyCode::Char('w') => self.pan(0.0, -PAN_STEP).await,
                KeyCode::Char('s') => self.pan(0.0, PAN_STEP).await,
                KeyCode::Char('a') => self.pan(-PAN_STEP, 0.0).await,
                KeyCode::Char('d') => self.pan(PAN_STEP, 0.0).await,
                _ => {}
            },
        }
        Ok(())
    }
}
