//! clivm launcher library
//!
//! Terminal menu for entering, installing and removing chroot-based distro
//! environments. Exposes the components for the binary and for tests.

pub mod actions;
pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod handoff;
pub mod menu;
pub mod registry;
pub mod terminal;
pub mod ui;

pub use error::{LauncherError, Result};
