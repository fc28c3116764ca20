//! Launcher configuration
//!
//! Built once at startup from defaults and an optional TOML file, then passed
//! by reference to every component. Nothing mutates it afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LauncherError, Result};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "CLIVM_CONFIG";

/// Per-distro entry of the launch table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroProfile {
    pub name: String,

    /// Chroot helper binary, looked up under `<base>/binaries/`
    #[serde(default = "default_helper")]
    pub helper: String,

    /// Shell argv started inside the chroot
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,
}

impl DistroProfile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            helper: default_helper(),
            shell: default_shell(),
        }
    }

    pub fn with_helper(mut self, helper: &str) -> Self {
        self.helper = helper.to_string();
        self
    }

    pub fn with_shell(mut self, shell: &[&str]) -> Self {
        self.shell = shell.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Complete launcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Directory holding environments, installers and helper binaries
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Privilege-escalation wrapper prefixed to elevated commands
    #[serde(default = "default_escalation")]
    pub escalation: String,

    /// Interpreter used to run installer scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Recursive forced removal, the environment directory is appended
    #[serde(default = "default_remove_command")]
    pub remove_command: Vec<String>,

    #[serde(default = "default_status_delay_ms")]
    pub status_delay_ms: u64,

    #[serde(default = "default_return_delay_ms")]
    pub return_delay_ms: u64,

    /// Known distros, in menu order
    #[serde(default = "default_distros")]
    pub distros: Vec<DistroProfile>,
}

fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clivm")
}

fn default_escalation() -> String {
    "sudo".to_string()
}

fn default_interpreter() -> String {
    "bash".to_string()
}

fn default_remove_command() -> Vec<String> {
    vec!["rm".to_string(), "-rf".to_string()]
}

fn default_status_delay_ms() -> u64 {
    1500
}

fn default_return_delay_ms() -> u64 {
    1000
}

fn default_helper() -> String {
    "clivm-chroot".to_string()
}

fn default_shell() -> Vec<String> {
    vec!["/bin/bash".to_string()]
}

fn default_distros() -> Vec<DistroProfile> {
    vec![
        DistroProfile::new("debian"),
        DistroProfile::new("arch"),
        DistroProfile::new("alpine")
            .with_helper("alpine-chroot")
            .with_shell(&["/bin/sh", "-l"]),
        DistroProfile::new("gentoo"),
        DistroProfile::new("ubuntu"),
    ]
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            escalation: default_escalation(),
            interpreter: default_interpreter(),
            remove_command: default_remove_command(),
            status_delay_ms: default_status_delay_ms(),
            return_delay_ms: default_return_delay_ms(),
            distros: default_distros(),
        }
    }
}

impl LauncherConfig {
    /// Load from `$CLIVM_CONFIG` or the user config dir, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(&path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("clivm/config.toml")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LauncherError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let mut config: LauncherConfig = toml::from_str(content)?;
        config.base_path = expand_home(&config.base_path);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.distros.is_empty() {
            return Err(LauncherError::Config("no distros configured".into()));
        }
        if self.escalation.trim().is_empty() {
            return Err(LauncherError::Config("escalation wrapper is empty".into()));
        }
        if self.interpreter.trim().is_empty() {
            return Err(LauncherError::Config("installer interpreter is empty".into()));
        }
        if self.remove_command.is_empty() {
            return Err(LauncherError::Config("remove_command is empty".into()));
        }

        let mut seen = HashSet::new();
        for distro in &self.distros {
            let name = distro.name.as_str();
            if name.is_empty() || name.contains('/') || name.starts_with('.') {
                return Err(LauncherError::Config(format!(
                    "invalid distro name '{}'",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(LauncherError::Config(format!("duplicate distro '{}'", name)));
            }
            if distro.helper.is_empty() || distro.helper.contains('/') {
                return Err(LauncherError::Config(format!(
                    "invalid chroot helper for '{}'",
                    name
                )));
            }
            if distro.shell.is_empty() {
                return Err(LauncherError::Config(format!("empty shell for '{}'", name)));
            }
        }
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&DistroProfile> {
        self.distros.iter().find(|d| d.name == name)
    }

    pub fn distro_names(&self) -> impl Iterator<Item = &str> {
        self.distros.iter().map(|d| d.name.as_str())
    }

    /// `<base>/.<name>`
    pub fn environment_dir(&self, name: &str) -> PathBuf {
        self.base_path.join(format!(".{}", name))
    }

    /// `<base>/installers/<name>.sh`
    pub fn installer_script(&self, name: &str) -> PathBuf {
        self.base_path
            .join("installers")
            .join(format!("{}.sh", name))
    }

    /// `<base>/binaries/<helper>`
    pub fn helper_path(&self, helper: &str) -> PathBuf {
        self.base_path.join("binaries").join(helper)
    }

    pub fn status_delay(&self) -> Duration {
        Duration::from_millis(self.status_delay_ms)
    }

    pub fn return_delay(&self) -> Duration {
        Duration::from_millis(self.return_delay_ms)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}
