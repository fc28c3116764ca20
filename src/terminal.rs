//! Terminal ownership for the menu UI

use std::io::{self, stdout, Stdout};

use crossterm::{
    event::{self, Event},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{debug, error};

use crate::handoff::TerminalControl;
use crate::menu::Key;

/// Full-screen UI state that must survive a handoff
#[derive(Debug, Clone, Copy)]
struct UiState {
    cursor_hidden: bool,
}

/// Owns the terminal while the launcher runs and restores it on drop
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: UiState,
    saved: Option<UiState>,
    active: bool,
}

impl Tui {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        undo_on_error(stdout().execute(EnterAlternateScreen).map(drop), || {
            let _ = disable_raw_mode();
        })?;
        let terminal = undo_on_error(Terminal::new(CrosstermBackend::new(stdout())), || {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = disable_raw_mode();
        })?;

        // From here on Drop restores the terminal
        let mut tui = Self {
            terminal,
            state: UiState {
                cursor_hidden: false,
            },
            saved: None,
            active: true,
        };
        tui.terminal.hide_cursor()?;
        tui.state.cursor_hidden = true;
        tui.terminal.clear()?;
        debug!("Terminal UI started");
        Ok(tui)
    }

    pub fn draw<F>(&mut self, render: F) -> io::Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Block until a key the menus understand arrives
    pub fn next_key(&mut self) -> io::Result<Key> {
        loop {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(key) = Key::from_event(key) {
                        return Ok(key);
                    }
                }
                Event::Resize(_, _) => self.terminal.autoresize()?,
                _ => {}
            }
        }
    }

    /// Give the terminal back to the shell for good
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        debug!("Terminal UI stopped");
        Ok(())
    }
}

impl TerminalControl for Tui {
    fn suspend(&mut self) -> io::Result<()> {
        self.saved = Some(self.state);
        self.terminal.show_cursor()?;
        stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        let state = self.saved.take().unwrap_or(self.state);
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        self.active = true;
        if state.cursor_hidden {
            self.terminal.hide_cursor()?;
        }
        self.state = state;
        // Force a full repaint, the child drew over everything
        self.terminal.clear()
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!("Failed to restore terminal: {}", e);
        }
    }
}

/// Run `undo` before passing an error up, nothing owns the terminal yet
fn undo_on_error<T>(result: io::Result<T>, undo: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_is_rolled_back() {
        let mut undone = 0;
        let err = undo_on_error::<()>(Err(io::Error::new(io::ErrorKind::Other, "no tty")), || {
            undone += 1
        });
        assert!(err.is_err());
        assert_eq!(undone, 1);

        assert_eq!(undo_on_error(Ok(5), || undone += 1).unwrap(), 5);
        assert_eq!(undone, 1);
    }
}
