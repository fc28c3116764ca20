//! clivm - chroot distro launcher
//!
//! Lists the configured distros, enters their chroots, runs their installers
//! and removes them, all from one full-screen menu.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use clivm::app;
use clivm::config::LauncherConfig;
use clivm::console::LineConsole;
use clivm::menu::Exit;
use clivm::terminal::Tui;

/// Environment variable holding the log filter
const LOG_ENV: &str = "CLIVM_LOG";

fn main() -> Result<()> {
    // The terminal belongs to the menu, so logs go to a file
    init_logging();

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        bail!("clivm needs an interactive terminal");
    }

    let config = LauncherConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        "Starting launcher with {} distros under {}",
        config.distros.len(),
        config.base_path.display()
    );

    let mut console = LineConsole::new(config.status_delay(), config.return_delay());
    let exit = {
        let mut tui = Tui::enter().context("Failed to initialize terminal")?;
        let exit = app::run(&config, &mut tui, &mut console);
        tui.restore().context("Failed to restore terminal")?;
        exit?
    };

    if exit == Exit::Interrupted {
        println!("\n{}", "Exiting launcher...".yellow());
    }

    Ok(())
}

fn log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clivm/launcher.log")
}

fn init_logging() {
    let path = log_path();
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}
