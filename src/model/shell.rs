//! Signals sent to the surrounding navigation shell

use std::sync::atomic::{AtomicBool, Ordering};

/// Callbacks the screen uses to coordinate with its host
pub trait HostShell: Send + Sync {
    fn set_loading(&self, loading: bool);
    fn set_chrome_visible(&self, visible: bool);
}

/// Shell state read by the terminal view
#[derive(Debug)]
pub struct ShellState {
    loading: AtomicBool,
    chrome_visible: AtomicBool,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            loading: AtomicBool::new(false),
            chrome_visible: AtomicBool::new(true),
        }
    }
}

impl ShellState {
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn is_chrome_visible(&self) -> bool {
        self.chrome_visible.load(Ordering::Relaxed)
    }
}

impl HostShell for ShellState {
    fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::Relaxed);
    }

    fn set_chrome_visible(&self, visible: bool) {
        self.chrome_visible.store(visible, Ordering::Relaxed);
    }
}
