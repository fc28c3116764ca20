//! Launcher main loop

use std::io;

use tracing::info;

use crate::actions::Actions;
use crate::config::LauncherConfig;
use crate::console::Console;
use crate::error::{LauncherError, Result};
use crate::handoff::TerminalControl;
use crate::menu::{Controller, Exit, Key, Step};
use crate::registry::Registry;
use crate::terminal::Tui;
use crate::ui;

/// Screen the menus render to and read keys from
pub trait Frontend: TerminalControl {
    fn render(&mut self, controller: &Controller) -> io::Result<()>;

    fn next_key(&mut self) -> io::Result<Key>;
}

impl Frontend for Tui {
    fn render(&mut self, controller: &Controller) -> io::Result<()> {
        self.draw(|frame| ui::draw(frame, controller))
    }

    fn next_key(&mut self) -> io::Result<Key> {
        Tui::next_key(self)
    }
}

/// Run the menus until the user quits or interrupts
pub fn run<F, C>(config: &LauncherConfig, frontend: &mut F, console: &mut C) -> Result<Exit>
where
    F: Frontend + ?Sized,
    C: Console + ?Sized,
{
    let actions = Actions::new(Registry::new(config));
    let mut controller = Controller::new(Registry::new(config));

    loop {
        controller.refresh();
        frontend.render(&controller)?;

        match controller.handle_key(frontend.next_key()?) {
            Step::Continue => {}
            Step::Dispatch(kind, name) => {
                info!("{:?} {}", kind, name);
                match actions.dispatch(kind, name, frontend, console) {
                    Err(LauncherError::Interrupted) => {
                        info!("Interrupted during {:?} {}", kind, name);
                        return Ok(Exit::Interrupted);
                    }
                    result => controller.report(kind, name, result)?,
                }
            }
            Step::Exit(exit) => {
                info!("Leaving launcher ({:?})", exit);
                return Ok(exit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::tests::ScriptedConsole;
    use crate::handoff::tests::FakeTerminal;
    use std::collections::VecDeque;
    use std::path::Path;

    /// Replays keys and checks the UI owns the screen whenever it renders
    #[derive(Default)]
    struct ScriptedFrontend {
        terminal: FakeTerminal,
        keys: VecDeque<Key>,
        frames: usize,
    }

    impl ScriptedFrontend {
        fn with_keys(keys: &[Key]) -> Self {
            Self {
                keys: keys.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl TerminalControl for ScriptedFrontend {
        fn suspend(&mut self) -> io::Result<()> {
            self.terminal.suspend()
        }

        fn resume(&mut self) -> io::Result<()> {
            self.terminal.resume()
        }
    }

    impl Frontend for ScriptedFrontend {
        fn render(&mut self, _controller: &Controller) -> io::Result<()> {
            assert!(!self.terminal.suspended, "rendered while handed off");
            self.frames += 1;
            Ok(())
        }

        fn next_key(&mut self) -> io::Result<Key> {
            self.keys
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "out of keys"))
        }
    }

    fn sandbox(dir: &Path) -> LauncherConfig {
        LauncherConfig {
            base_path: dir.to_path_buf(),
            escalation: "env".to_string(),
            interpreter: "sh".to_string(),
            status_delay_ms: 0,
            return_delay_ms: 0,
            ..LauncherConfig::default()
        }
    }

    #[test]
    fn test_quit_and_interrupt() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        let mut console = ScriptedConsole::default();

        let mut frontend = ScriptedFrontend::with_keys(&[Key::Down, Key::Quit]);
        assert_eq!(run(&config, &mut frontend, &mut console).unwrap(), Exit::Quit);
        assert_eq!(frontend.frames, 2);

        let mut frontend = ScriptedFrontend::with_keys(&[Key::Up, Key::Activate, Key::Interrupt]);
        assert_eq!(
            run(&config, &mut frontend, &mut console).unwrap(),
            Exit::Interrupted
        );
    }

    #[test]
    fn test_uninstall_round_trip_through_menus() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        std::fs::create_dir(dir.path().join(".gentoo")).unwrap();
        std::fs::create_dir(dir.path().join(".ubuntu")).unwrap();

        // Main -> Uninstall distro -> second entry (ubuntu) -> confirm
        let mut frontend =
            ScriptedFrontend::with_keys(&[Key::Up, Key::Activate, Key::Down, Key::Activate, Key::Quit]);
        let mut console = ScriptedConsole::answering("y");

        assert_eq!(run(&config, &mut frontend, &mut console).unwrap(), Exit::Quit);
        assert!(!dir.path().join(".ubuntu").exists());
        assert!(dir.path().join(".gentoo").exists());
        assert_eq!(frontend.terminal.calls, ["suspend", "resume"]);
        assert!(!frontend.terminal.suspended);
    }

    #[test]
    fn test_failed_installer_returns_to_menu() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        let script = config.installer_script("debian");
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "exit 1\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        // Main -> Install new distro -> debian; then keep navigating
        let mut frontend = ScriptedFrontend::with_keys(&[
            Key::Up,
            Key::Up,
            Key::Activate,
            Key::Activate,
            Key::Down,
            Key::Back,
        ]);
        let mut console = ScriptedConsole::default();

        assert_eq!(run(&config, &mut frontend, &mut console).unwrap(), Exit::Quit);
        assert_eq!(console.failures, ["sh exited with status 1"]);
        assert_eq!(frontend.terminal.calls, ["suspend", "resume"]);
        assert_eq!(frontend.frames, 6);
    }

    #[test]
    fn test_interrupt_at_failure_prompt_exits() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        let script = config.installer_script("debian");
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "exit 1\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        // The remaining key is never read
        let mut frontend =
            ScriptedFrontend::with_keys(&[Key::Up, Key::Up, Key::Activate, Key::Activate, Key::Quit]);
        let mut console = ScriptedConsole::interrupting();

        assert_eq!(
            run(&config, &mut frontend, &mut console).unwrap(),
            Exit::Interrupted
        );
        assert_eq!(console.failures, ["sh exited with status 1"]);
        assert_eq!(frontend.terminal.calls, ["suspend", "resume"]);
        assert!(!frontend.terminal.suspended);
        assert_eq!(frontend.keys.len(), 1);
    }

    #[test]
    fn test_interrupted_confirmation_exits() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        std::fs::create_dir(dir.path().join(".arch")).unwrap();

        let mut frontend = ScriptedFrontend::with_keys(&[Key::Up, Key::Activate, Key::Activate]);
        let mut console = ScriptedConsole::interrupting();

        assert_eq!(
            run(&config, &mut frontend, &mut console).unwrap(),
            Exit::Interrupted
        );
        assert!(dir.path().join(".arch").exists());
        assert_eq!(
            console.prompts,
            ["Are you sure you want to uninstall arch? [y/N]"]
        );
        assert!(!frontend.terminal.suspended);
    }

    #[test]
    fn test_key_read_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let config = sandbox(dir.path());
        let mut frontend = ScriptedFrontend::default();
        let mut console = ScriptedConsole::default();

        assert!(run(&config, &mut frontend, &mut console).is_err());
    }
}
