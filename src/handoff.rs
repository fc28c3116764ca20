//! Process handoff
//!
//! Moves the terminal from the menu UI to a child process and back. A
//! [`Handoff`] is acquired by suspending the UI and always resumes it when
//! dropped, so every exit path (success, failed child, spawn error, early
//! return) leaves the terminal in UI mode again.
//!
//! While a handoff is held the interrupt key no longer kills the launcher.
//! SIGINT and SIGQUIT are only recorded, and an interrupt outside a running
//! child ends the session with [`ChildOutcome::Interrupted`].

use std::ffi::OsString;
use std::io;
use std::os::raw::c_int;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::{debug, error, info, warn};

use crate::console::{is_interrupt, Console};
use crate::error::LauncherError;

/// Something that owns the screen and can lend it out
pub trait TerminalControl {
    /// Save UI state and return the terminal to normal line mode
    fn suspend(&mut self) -> io::Result<()>;

    /// Take the screen back and restore the saved UI state
    fn resume(&mut self) -> io::Result<()>;
}

/// A program and its arguments, run with inherited stdio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Prefix with a privilege-escalation wrapper such as `sudo`
    pub fn elevated(self, wrapper: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: OsString::from(wrapper),
            args,
        }
    }

    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// How a child run ended
#[derive(Debug)]
pub enum ChildOutcome {
    Success,
    /// Non-zero exit, `None` when killed by a signal
    Failed { code: Option<i32> },
    SpawnFailed(io::Error),
    /// The user pressed the interrupt key outside the child
    Interrupted,
}

impl ChildOutcome {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            ChildOutcome::Success
        } else {
            ChildOutcome::Failed {
                code: status.code(),
            }
        }
    }

    pub fn into_result(self, command: &CommandSpec) -> Result<(), LauncherError> {
        match self {
            ChildOutcome::Success => Ok(()),
            ChildOutcome::Failed { code } => Err(LauncherError::ChildFailed {
                program: command.program_name(),
                code,
            }),
            ChildOutcome::SpawnFailed(source) => Err(LauncherError::Spawn {
                program: command.program_name(),
                source,
            }),
            ChildOutcome::Interrupted => Err(LauncherError::Interrupted),
        }
    }
}

/// What the user sees after a successful child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSuccess {
    /// Wait for Enter, the child's last output stays on screen
    Acknowledge,
    /// Print a short note and pause briefly
    Return,
}

/// Exclusive loan of the terminal to child processes
pub struct Handoff<'t, T: TerminalControl + ?Sized> {
    terminal: &'t mut T,
    recorder: Option<InterruptRecorder>,
    released: bool,
}

impl<'t, T: TerminalControl + ?Sized> Handoff<'t, T> {
    /// Suspend the UI. On error the UI is resumed before returning.
    pub fn acquire(terminal: &'t mut T) -> io::Result<Self> {
        debug!("Suspending terminal UI");
        if let Err(e) = terminal.suspend() {
            if let Err(resume_err) = terminal.resume() {
                error!("Failed to restore terminal UI: {}", resume_err);
            }
            return Err(e);
        }
        Ok(Self {
            terminal,
            recorder: Some(InterruptRecorder::install()),
            released: false,
        })
    }

    /// True once per interrupt key press seen since the last check
    pub fn interrupted(&mut self) -> bool {
        INTERRUPTED.swap(false, Ordering::SeqCst)
    }

    /// Run one child with inherited stdio, report failures and wait for acknowledgment
    pub fn run<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        status: &str,
        command: &CommandSpec,
        after: AfterSuccess,
    ) -> ChildOutcome {
        console.status(status);
        if self.interrupted() {
            info!("Interrupted before {} started", command.program_name());
            return ChildOutcome::Interrupted;
        }

        info!("Running: {}", command.display());
        let outcome = spawn_and_wait(command);
        // The interrupt key belonged to the child while it ran
        INTERRUPTED.store(false, Ordering::SeqCst);

        let reply = match &outcome {
            ChildOutcome::Success => {
                info!("{} finished", command.program_name());
                match after {
                    AfterSuccess::Acknowledge => {
                        console.acknowledge("Press Enter to return to launcher...")
                    }
                    AfterSuccess::Return => {
                        console.pause("Returning to launcher...");
                        Ok(())
                    }
                }
            }
            ChildOutcome::Failed { code } => {
                warn!("{} failed with code {:?}", command.program_name(), code);
                let err = LauncherError::ChildFailed {
                    program: command.program_name(),
                    code: *code,
                };
                console.failure(&err.to_string());
                console.acknowledge("Press Enter to return to launcher...")
            }
            ChildOutcome::SpawnFailed(e) => {
                error!("Failed to spawn {}: {}", command.display(), e);
                console.failure(&format!("Failed to run {}: {}", command.program_name(), e));
                console.acknowledge("Press Enter to return to launcher...")
            }
            ChildOutcome::Interrupted => Ok(()),
        };

        match reply {
            Err(e) if is_interrupt(&e) => {
                info!("Interrupted after {} ({:?})", command.program_name(), outcome);
                return ChildOutcome::Interrupted;
            }
            Err(e) => warn!("Failed to read acknowledgment: {}", e),
            Ok(()) => {}
        }
        if self.interrupted() {
            return ChildOutcome::Interrupted;
        }

        outcome
    }

    /// Resume the UI now and surface any error instead of logging it
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        self.recorder.take();
        debug!("Resuming terminal UI");
        self.terminal.resume()
    }
}

impl<T: TerminalControl + ?Sized> Drop for Handoff<'_, T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.recorder.take();
        debug!("Resuming terminal UI");
        if let Err(e) = self.terminal.resume() {
            error!("Failed to restore terminal UI: {}", e);
        }
    }
}

fn spawn_and_wait(command: &CommandSpec) -> ChildOutcome {
    // Caught signals revert to their defaults across exec, so the child
    // still dies on the interrupt key
    let mut child = match command.to_command().spawn() {
        Ok(child) => child,
        Err(e) => return ChildOutcome::SpawnFailed(e),
    };

    match child.wait() {
        Ok(status) => ChildOutcome::from_status(status),
        Err(e) => ChildOutcome::SpawnFailed(e),
    }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn record_interrupt(_: c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Records SIGINT and SIGQUIT while held, restores previous dispositions on drop
struct InterruptRecorder {
    previous: Vec<(Signal, SigAction)>,
}

impl InterruptRecorder {
    fn install() -> Self {
        INTERRUPTED.store(false, Ordering::SeqCst);
        let record = SigAction::new(
            SigHandler::Handler(record_interrupt),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let mut previous = Vec::with_capacity(2);
        for sig in [Signal::SIGINT, Signal::SIGQUIT] {
            // SAFETY: the handler only stores to an atomic
            match unsafe { signal::sigaction(sig, &record) } {
                Ok(old) => previous.push((sig, old)),
                Err(e) => warn!("Failed to catch {}: {}", sig, e),
            }
        }
        Self { previous }
    }
}

impl Drop for InterruptRecorder {
    fn drop(&mut self) {
        for (sig, action) in self.previous.drain(..) {
            // SAFETY: reinstalls the disposition that was active before install()
            if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
                warn!("Failed to restore {}: {}", sig, e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::console::tests::ScriptedConsole;

    /// Records suspend/resume calls and tracks whether the UI owns the screen
    #[derive(Default)]
    pub(crate) struct FakeTerminal {
        pub calls: Vec<&'static str>,
        pub suspended: bool,
        pub fail_suspend: bool,
    }

    impl TerminalControl for FakeTerminal {
        fn suspend(&mut self) -> io::Result<()> {
            self.calls.push("suspend");
            if self.fail_suspend {
                return Err(io::Error::new(io::ErrorKind::Other, "no tty"));
            }
            self.suspended = true;
            Ok(())
        }

        fn resume(&mut self) -> io::Result<()> {
            self.calls.push("resume");
            self.suspended = false;
            Ok(())
        }
    }

    fn run_once(command: &CommandSpec, after: AfterSuccess) -> (FakeTerminal, ScriptedConsole, ChildOutcome) {
        let mut terminal = FakeTerminal::default();
        let mut console = ScriptedConsole::default();
        let outcome = {
            let mut handoff = Handoff::acquire(&mut terminal).unwrap();
            handoff.run(&mut console, "Working...", command, after)
        };
        (terminal, console, outcome)
    }

    #[test]
    fn test_success_restores_ui() {
        let (terminal, console, outcome) = run_once(&CommandSpec::new("true"), AfterSuccess::Return);

        assert!(matches!(outcome, ChildOutcome::Success));
        assert!(!terminal.suspended);
        assert_eq!(terminal.calls, ["suspend", "resume"]);
        assert_eq!(console.acknowledged, 0);
        assert_eq!(console.paused, 1);
    }

    #[test]
    fn test_success_can_wait_for_acknowledgment() {
        let (_, console, outcome) = run_once(&CommandSpec::new("true"), AfterSuccess::Acknowledge);

        assert!(matches!(outcome, ChildOutcome::Success));
        assert_eq!(console.acknowledged, 1);
    }

    #[test]
    fn test_nonzero_exit_is_reported_and_restores_ui() {
        let command = CommandSpec::new("sh").args(["-c", "exit 3"]);
        let (terminal, console, outcome) = run_once(&command, AfterSuccess::Return);

        assert!(matches!(outcome, ChildOutcome::Failed { code: Some(3) }));
        assert!(!terminal.suspended);
        assert_eq!(terminal.calls, ["suspend", "resume"]);
        assert_eq!(console.failures, ["sh exited with status 3"]);
        assert_eq!(console.acknowledged, 1);
    }

    #[test]
    fn test_spawn_failure_is_reported_and_restores_ui() {
        let command = CommandSpec::new("/nonexistent/clivm-helper").arg("x");
        let (terminal, console, outcome) = run_once(&command, AfterSuccess::Return);

        assert!(matches!(outcome, ChildOutcome::SpawnFailed(_)));
        assert!(!terminal.suspended);
        assert_eq!(terminal.calls, ["suspend", "resume"]);
        assert_eq!(console.failures.len(), 1);
        assert_eq!(console.acknowledged, 1);

        let err = outcome.into_result(&command).unwrap_err();
        assert!(matches!(err, LauncherError::Spawn { .. }));
    }

    #[test]
    fn test_interrupt_at_acknowledgment_ends_session() {
        let command = CommandSpec::new("sh").args(["-c", "exit 2"]);
        let mut terminal = FakeTerminal::default();
        let mut console = ScriptedConsole::interrupting();
        let outcome = {
            let mut handoff = Handoff::acquire(&mut terminal).unwrap();
            handoff.run(&mut console, "Working...", &command, AfterSuccess::Acknowledge)
        };

        assert!(matches!(outcome, ChildOutcome::Interrupted));
        assert_eq!(console.failures, ["sh exited with status 2"]);
        assert_eq!(console.acknowledged, 0);
        assert!(!terminal.suspended);
        assert_eq!(terminal.calls, ["suspend", "resume"]);

        let err = outcome.into_result(&command).unwrap_err();
        assert!(matches!(err, LauncherError::Interrupted));
    }

    #[test]
    fn test_early_return_restores_ui() {
        fn bail_out(terminal: &mut FakeTerminal) -> Result<(), LauncherError> {
            let _handoff = Handoff::acquire(terminal)?;
            Err(LauncherError::Config("boom".into()))
        }

        let mut terminal = FakeTerminal::default();
        assert!(bail_out(&mut terminal).is_err());
        assert!(!terminal.suspended);
        assert_eq!(terminal.calls, ["suspend", "resume"]);
    }

    #[test]
    fn test_explicit_release_resumes_once() {
        let mut terminal = FakeTerminal::default();
        let handoff = Handoff::acquire(&mut terminal).unwrap();
        handoff.release().unwrap();

        assert_eq!(terminal.calls, ["suspend", "resume"]);
    }

    #[test]
    fn test_failed_suspend_still_resumes() {
        let mut terminal = FakeTerminal {
            fail_suspend: true,
            ..FakeTerminal::default()
        };
        assert!(Handoff::acquire(&mut terminal).is_err());
        assert_eq!(terminal.calls, ["suspend", "resume"]);
    }

    #[test]
    fn test_elevated_prefixes_wrapper() {
        let command = CommandSpec::new("/base/binaries/clivm-chroot")
            .arg("/base/.debian")
            .arg("/bin/bash")
            .elevated("sudo");

        assert_eq!(command.program, "sudo");
        assert_eq!(
            command.display(),
            "sudo /base/binaries/clivm-chroot /base/.debian /bin/bash"
        );
        assert_eq!(command.program_name(), "sudo");
    }
}
