//! Environment registry
//!
//! Answers which known distros are installed by stat'ing their directories.
//! Every query hits the filesystem; installers and manual removals can change
//! the answer between two renders.

use std::path::PathBuf;

use crate::config::LauncherConfig;

/// A known distro together with its on-disk state at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment<'a> {
    pub name: &'a str,
    pub installed: bool,
}

#[derive(Clone, Copy)]
pub struct Registry<'a> {
    config: &'a LauncherConfig,
}

impl<'a> Registry<'a> {
    pub fn new(config: &'a LauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a LauncherConfig {
        self.config
    }

    /// True iff the environment directory is present
    pub fn exists(&self, name: &str) -> bool {
        self.environment_dir(name).is_dir()
    }

    pub fn environment_dir(&self, name: &str) -> PathBuf {
        self.config.environment_dir(name)
    }

    /// Known distros with their existence flag, in menu order
    pub fn snapshot(&self) -> Vec<Environment<'a>> {
        self.config
            .distro_names()
            .map(|name| Environment {
                name,
                installed: self.exists(name),
            })
            .collect()
    }

    pub fn list_installed(&self) -> Vec<&'a str> {
        self.config
            .distro_names()
            .filter(|name| self.exists(name))
            .collect()
    }

    pub fn list_missing(&self) -> Vec<&'a str> {
        self.config
            .distro_names()
            .filter(|name| !self.exists(name))
            .collect()
    }
}
