//! Model module - Application state and data types
//!
//! This module contains all the data structures and state management for the application.
//! It is organized into submodules by responsibility:
//!
//! - `types`: Records mirrored from the document store (user, group, song, file)
//! - `view_state`: Local mirror kept in sync by the synchronizer, with sentinels
//! - `selection`: Browsing/Viewing state machine and page tracking
//! - `viewer`: Zoom/pan gestures and paging for the file viewer
//! - `animation`: Looping spin of the carousel disc
//! - `shell`: Loading/chrome signals for the host shell
//! - `app_model`: Main application model tying the pieces together

mod types;
mod view_state;
mod selection;
mod viewer;
mod animation;
mod shell;
mod app_model;

// Re-export all public types for convenient access
pub use types::{FileRef, Group, Mode, Song, UserRecord};

pub use view_state::{
    next_open_stamp, GroupChange, GroupTag, ViewState, GROUP_FETCH_ERROR, NO_GROUP_FOUND,
    NO_GROUP_SELECTED, SONGS_FETCH_ERROR, USER_LOAD_ERROR,
};

pub use selection::{Pager, SelectionState, SelectionTicket};

pub use viewer::{
    ImageViewer, PagingStrategy, PinchPan, Transform, ViewableItem, ZoomState, ZoomStrategy,
    Zoomable,
};

pub use animation::SpinAnimation;

pub use shell::{HostShell, ShellState};

#[cfg(test)]
pub(crate) use shell::testing;

pub use app_model::{AppModel, Screen};
