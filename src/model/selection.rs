//! Song selection state machine and page tracking
//!
//! Two modes only: `Browsing` the song carousel, or `Viewing` one song's
//! files. Selecting hands out a `SelectionTicket`; URL lookups for the song
//! commit through that ticket and are ignored once the user has moved on.

use super::types::{Mode, Song};

/// Current page of a horizontally paged sequence.
///
/// The index always stays below `count` (or at 0 when there are no pages).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pager {
    index: usize,
    count: usize,
}

impl Pager {
    pub fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.index = self.clamp(self.index);
    }

    pub fn go_to(&mut self, index: usize) {
        self.index = self.clamp(index);
    }

    pub fn next(&mut self) {
        self.go_to(self.index.saturating_add(1));
    }

    pub fn prev(&mut self) {
        self.go_to(self.index.saturating_sub(1));
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.count
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.count.saturating_sub(1))
    }
}

/// Identifies one selection of one song
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionTicket {
    pub seq: u64,
    pub song_id: String,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    pub mode: Mode,
    pub selected_song: Option<Song>,
    pub carousel: Pager,
    pub pages: Pager,
    seq: u64,
}

impl SelectionState {
    /// Browsing → Viewing. Cached URLs are dropped so every selection
    /// resolves its files from scratch. Returns `None` while already viewing.
    pub fn select(&mut self, song: &Song) -> Option<SelectionTicket> {
        if self.mode != Mode::Browsing {
            return None;
        }
        self.seq += 1;
        let song = song.without_urls();
        self.pages = Pager::new(song.files.len());
        let ticket = SelectionTicket {
            seq: self.seq,
            song_id: song.song_id.clone(),
        };
        self.selected_song = Some(song);
        self.mode = Mode::Viewing;
        Some(ticket)
    }

    /// Viewing → Browsing. Returns false when already browsing.
    pub fn back(&mut self) -> bool {
        if self.mode == Mode::Browsing {
            return false;
        }
        self.seq += 1;
        self.mode = Mode::Browsing;
        self.selected_song = None;
        self.pages = Pager::default();
        true
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.seq == self.seq
            && self
                .selected_song
                .as_ref()
                .is_some_and(|s| s.song_id == ticket.song_id)
    }

    /// Stores resolved URLs for the ticket's song. `None` entries leave the
    /// file's current URL untouched. Returns false for stale tickets.
    pub fn apply_resolved(&mut self, ticket: &SelectionTicket, urls: Vec<Option<String>>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let Some(song) = self.selected_song.as_mut() else {
            return false;
        };
        for (file, url) in song.files.iter_mut().zip(urls) {
            if url.is_some() {
                file.resolved_url = url;
            }
        }
        true
    }

    /// Pager for whatever is on screen: songs while browsing, files while viewing.
    pub fn active_pager(&self) -> &Pager {
        match self.mode {
            Mode::Browsing => &self.carousel,
            Mode::Viewing => &self.pages,
        }
    }

    pub fn active_pager_mut(&mut self) -> &mut Pager {
        match self.mode {
            Mode::Browsing => &mut self.carousel,
            Mode::Viewing => &mut self.pages,
        }
    }
}
