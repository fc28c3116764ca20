//! Enter, install and uninstall handlers
//!
//! Each handler checks its preconditions against the registry first and only
//! then hands the terminal to a child process.

use std::path::Path;

use nix::unistd::{access, AccessFlags};
use tracing::{info, warn};

use crate::config::DistroProfile;
use crate::console::{is_interrupt, Console};
use crate::error::{LauncherError, Result};
use crate::handoff::{AfterSuccess, CommandSpec, Handoff, TerminalControl};
use crate::registry::Registry;

/// Result of a handler that got past its preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The user said no at the confirmation prompt
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Enter,
    Install,
    Uninstall,
}

pub struct Actions<'a> {
    registry: Registry<'a>,
}

impl<'a> Actions<'a> {
    pub fn new(registry: Registry<'a>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry<'a> {
        &self.registry
    }

    pub fn dispatch<T, C>(
        &self,
        kind: ActionKind,
        name: &str,
        terminal: &mut T,
        console: &mut C,
    ) -> Result<ActionOutcome>
    where
        T: TerminalControl + ?Sized,
        C: Console + ?Sized,
    {
        match kind {
            ActionKind::Enter => self.enter(name, terminal, console),
            ActionKind::Install => self.install(name, terminal, console),
            ActionKind::Uninstall => self.uninstall(name, terminal, console),
        }
    }

    /// Open a shell inside the distro's chroot
    pub fn enter<T, C>(&self, name: &str, terminal: &mut T, console: &mut C) -> Result<ActionOutcome>
    where
        T: TerminalControl + ?Sized,
        C: Console + ?Sized,
    {
        let profile = self.profile(name)?;
        if !self.registry.exists(name) {
            return Err(LauncherError::NotInstalled(name.to_string()));
        }

        let command = self.chroot_command(profile);
        info!("Entering {} chroot", name);

        let mut handoff = Handoff::acquire(terminal)?;
        let outcome = handoff.run(
            console,
            &format!("Entering {} chroot...", name),
            &command,
            AfterSuccess::Acknowledge,
        );
        handoff.release()?;

        outcome.into_result(&command)?;
        Ok(ActionOutcome::Completed)
    }

    /// Run the distro's installer script, unelevated
    pub fn install<T, C>(&self, name: &str, terminal: &mut T, console: &mut C) -> Result<ActionOutcome>
    where
        T: TerminalControl + ?Sized,
        C: Console + ?Sized,
    {
        self.profile(name)?;
        let script = self.registry.config().installer_script(name);
        if !is_executable_file(&script) {
            warn!("Installer unavailable: {}", script.display());
            return Err(LauncherError::InstallerUnavailable {
                name: name.to_string(),
                path: script,
            });
        }

        let command = CommandSpec::new(&self.registry.config().interpreter).arg(&script);
        info!("Running installer for {}", name);

        let mut handoff = Handoff::acquire(terminal)?;
        let outcome = handoff.run(
            console,
            &format!("Running installer for {}...", name),
            &command,
            AfterSuccess::Return,
        );
        handoff.release()?;

        outcome.into_result(&command)?;
        Ok(ActionOutcome::Completed)
    }

    /// Delete the distro's directory tree after an explicit `y`
    pub fn uninstall<T, C>(&self, name: &str, terminal: &mut T, console: &mut C) -> Result<ActionOutcome>
    where
        T: TerminalControl + ?Sized,
        C: Console + ?Sized,
    {
        self.profile(name)?;
        if !self.registry.exists(name) {
            return Err(LauncherError::NotInstalled(name.to_string()));
        }

        let config = self.registry.config();
        let target = self.registry.environment_dir(name);
        let mut removal = config.remove_command.iter();
        let command = match removal.next() {
            Some(program) => CommandSpec::new(program)
                .args(removal)
                .arg(&target)
                .elevated(&config.escalation),
            None => return Err(LauncherError::Config("remove_command is empty".into())),
        };

        let mut handoff = Handoff::acquire(terminal)?;

        let prompt = format!("Are you sure you want to uninstall {}? [y/N]", name);
        let confirmed = match console.confirm(&prompt) {
            Ok(confirmed) => confirmed,
            Err(e) if is_interrupt(&e) => return Err(LauncherError::Interrupted),
            Err(e) => return Err(e.into()),
        };
        if handoff.interrupted() {
            return Err(LauncherError::Interrupted);
        }
        if !confirmed {
            info!("Uninstall of {} declined", name);
            console.notice("Uninstall canceled.");
            console.pause("Returning to launcher...");
            handoff.release()?;
            return Ok(ActionOutcome::Declined);
        }

        info!("Uninstalling {} ({})", name, target.display());
        let outcome = handoff.run(
            console,
            &format!("Uninstalling {}...", name),
            &command,
            AfterSuccess::Return,
        );
        handoff.release()?;

        outcome.into_result(&command)?;
        Ok(ActionOutcome::Completed)
    }

    /// `<escalation> <helper> <env dir> <shell...>` for the distro's table row
    pub fn chroot_command(&self, profile: &DistroProfile) -> CommandSpec {
        let config = self.registry.config();
        CommandSpec::new(config.helper_path(&profile.helper))
            .arg(self.registry.environment_dir(&profile.name))
            .args(&profile.shell)
            .elevated(&config.escalation)
    }

    fn profile(&self, name: &str) -> Result<&'a DistroProfile> {
        self.registry
            .config()
            .profile(name)
            .ok_or_else(|| LauncherError::UnknownDistro(name.to_string()))
    }
}

/// Regular file the current user may execute
fn is_executable_file(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
