//! Launcher error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("{0} not installed.")]
    NotInstalled(String),

    #[error("Unknown distro: {0}")]
    UnknownDistro(String),

    #[error("Installer for {name} not found or not executable: {}", path.display())]
    InstallerUnavailable { name: String, path: PathBuf },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}", describe_code(*code))]
    ChildFailed { program: String, code: Option<i32> },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),

    /// The user pressed the interrupt key while a handoff owned the terminal
    #[error("Interrupted")]
    Interrupted,
}

impl LauncherError {
    /// Errors raised before any handoff; the menu must show them and wait for a key.
    pub fn needs_acknowledgment(&self) -> bool {
        matches!(
            self,
            LauncherError::NotInstalled(_)
                | LauncherError::UnknownDistro(_)
                | LauncherError::InstallerUnavailable { .. }
        )
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no exit status (killed by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
