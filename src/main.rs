mod config;
mod controller;
mod gateway;
mod logging;
mod model;
mod view;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use config::{AppConfig, DEFAULT_PAGE_WIDTH};
use controller::AppController;
use gateway::{BlobStore, DocumentStore, LocalBlobStore, MemoryStore};
use model::{AppModel, HostShell};
use view::AppView;

/// Polls `$cond` until it holds, failing the test after two seconds.
#[cfg(test)]
#[macro_export]
macro_rules! eventually {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            if $cond {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not met: {}",
                stringify!($cond)
            );
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }};
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Songbook-RS Starting ===");
    tracing::debug!(?config, "configuration loaded");

    let store = MemoryStore::load_fixture(&config.data_file).await?;
    let blobs: Arc<dyn BlobStore> = match &config.blob_root {
        Some(root) => Arc::new(LocalBlobStore::new(root.clone())),
        None => Arc::new(store.clone()),
    };
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let model = Arc::new(AppModel::new(config.zoom, config.paging, DEFAULT_PAGE_WIDTH));
    let shell: Arc<dyn HostShell> = model.shell.clone();
    let controller = AppController::new(model.clone(), store, blobs, shell);

    controller.mount(&config.user_id).await;

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller.clone()).await;

    controller.unmount().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Songbook-RS shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let screen = model.get_screen(Instant::now()).await;

        terminal.draw(|f| {
            AppView::render(f, &screen);
        })?;

        // Short poll keeps the disc spinning smoothly
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "key handling failed");
                }
            }
        }

        if model.should_quit().await {
            break;
        }
    }

    Ok(())
}
