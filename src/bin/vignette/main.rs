//! vignette - narrated ambient scene in the terminal
//!
//! Run with: cargo run
//! Logs go to `vignette.log`; set `RUST_LOG` to change the level.

mod app;
mod captions;
mod ui;

use std::{fs::File, sync::Mutex};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing_subscriber::EnvFilter;

use app::Scene;
use vignette::SessionConfig;

const LOG_FILE: &str = "vignette.log";

fn init_logging() -> EyreResult<()> {
    let file = File::create(LOG_FILE).wrap_err_with(|| format!("failed to create {LOG_FILE}"))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vignette=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    init_logging()?;

    let mut scene = Scene::new(SessionConfig::default());
    let mut terminal = ratatui::init();
    let result = scene.run(&mut terminal);
    ratatui::restore();
    result
}
