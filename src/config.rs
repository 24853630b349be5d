//! Runtime configuration and centralized defaults

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::model::{PagingStrategy, ZoomStrategy};

// ==========================================================================
// Viewer Defaults
// ==========================================================================

/// Lower bound of the zoomable container.
pub const MIN_ZOOM: f32 = 1.0;

/// Upper bound of the zoomable container.
pub const MAX_ZOOM: f32 = 30.0;

/// Bounds applied to a live pinch.
pub const PINCH_MIN_SCALE: f32 = 0.5;
pub const PINCH_MAX_SCALE: f32 = 5.0;

/// Scale factor of one keyboard zoom step.
pub const ZOOM_STEP_FACTOR: f32 = 1.25;

/// Duration of the animation back to the rest transform.
pub const REST_ANIMATION: Duration = Duration::from_millis(200);

/// Fraction of a page that must be visible for it to become current.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Logical width of one page (full screen width).
pub const DEFAULT_PAGE_WIDTH: f32 = 390.0;

/// Content box handed to the zoomable container.
pub const ZOOM_CONTENT_SIZE: (f32, f32) = (300.0, 150.0);

// ==========================================================================
// Animation Defaults
// ==========================================================================

/// One full sweep of the spinning disc.
pub const SPIN_PERIOD: Duration = Duration::from_secs(30);

/// Degrees covered during one sweep.
pub const SPIN_DEGREES_PER_PERIOD: f32 = 7000.0;

// ==========================================================================
// Paths
// ==========================================================================

pub const DEFAULT_DATA_FILE: &str = "songbook.json";
pub const DEFAULT_LOG_DIR: &str = ".logs";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub user_id: String,
    pub data_file: PathBuf,
    /// Local blob root. `None` resolves blobs from the fixture itself.
    pub blob_root: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub zoom: ZoomStrategy,
    pub paging: PagingStrategy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::parse(
            pico_args::Arguments::from_env(),
            |key| std::env::var(key).ok(),
        )
    }

    /// Flags win over environment variables, which win over defaults.
    pub fn parse(
        mut args: pico_args::Arguments,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let user_id: Option<String> = args.opt_value_from_str("--user")?;
        let data_file: Option<PathBuf> = args.opt_value_from_os_str("--data", to_path)?;
        let blob_root: Option<PathBuf> = args.opt_value_from_os_str("--blobs", to_path)?;
        let log_dir: Option<PathBuf> = args.opt_value_from_os_str("--logs", to_path)?;
        let zoom: Option<String> = args.opt_value_from_str("--zoom")?;
        let paging: Option<String> = args.opt_value_from_str("--paging")?;

        let leftover = args.finish();
        if !leftover.is_empty() {
            bail!("unexpected arguments: {:?}", leftover);
        }

        let user_id = user_id
            .or_else(|| env("SONGBOOK_USER"))
            .context("a user id is required (--user or SONGBOOK_USER)")?;

        let zoom = match zoom.as_deref() {
            None | Some("pinch") => ZoomStrategy::PinchPan,
            Some("zoomable") => ZoomStrategy::Zoomable,
            Some(other) => bail!("unknown zoom strategy '{other}' (expected pinch or zoomable)"),
        };
        let paging = match paging.as_deref() {
            None | Some("offset") => PagingStrategy::Offset,
            Some("visibility") => PagingStrategy::Visibility,
            Some(other) => bail!("unknown paging strategy '{other}' (expected offset or visibility)"),
        };

        Ok(Self {
            user_id,
            data_file: data_file
                .or_else(|| env("SONGBOOK_DATA").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            blob_root: blob_root.or_else(|| env("SONGBOOK_BLOBS").map(PathBuf::from)),
            log_dir: log_dir
                .or_else(|| env("SONGBOOK_LOGS").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            zoom,
            paging,
        })
    }
}

fn to_path(value: &std::ffi::OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(PathBuf::from(value))
}
