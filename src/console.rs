//! Line-mode console used while a child owns the terminal

use std::io;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use console::{Key, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// Interactions available between suspending and resuming the UI
///
/// Reads fail with [`io::ErrorKind::Interrupted`] when the user presses the
/// interrupt key at the prompt.
pub trait Console {
    /// Short cosmetic progress indication before a child starts
    fn status(&mut self, message: &str);

    fn notice(&mut self, message: &str);

    fn failure(&mut self, message: &str);

    /// Block until the user presses Enter
    fn acknowledge(&mut self, message: &str) -> io::Result<()>;

    /// Ask a yes/no question and return the raw answer
    fn ask(&mut self, prompt: &str) -> io::Result<String>;

    /// Print a note and wait briefly without input
    fn pause(&mut self, message: &str);

    /// Yes only for an explicit `y`/`Y`. An unreadable answer declines, an
    /// interrupted one is passed up.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        match self.ask(prompt) {
            Ok(answer) => Ok(is_affirmative(&answer)),
            Err(e) if is_interrupt(&e) => Err(e),
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                Ok(false)
            }
        }
    }
}

/// Default-no confirmation: only `y` or `Y` (surrounding whitespace ignored) accepts
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

pub fn is_interrupt(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Interrupted
}

/// Real console on stdout/stdin
pub struct LineConsole {
    status_delay: Duration,
    return_delay: Duration,
}

impl LineConsole {
    pub fn new(status_delay: Duration, return_delay: Duration) -> Self {
        Self {
            status_delay,
            return_delay,
        }
    }
}

impl Console for LineConsole {
    fn status(&mut self, message: &str) {
        println!();
        if self.status_delay.is_zero() {
            println!("{} {}", "::".bright_blue(), message);
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{msg} {spinner:.cyan}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(BRAILLE_FRAMES),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        thread::sleep(self.status_delay);
        spinner.finish_with_message(format!("{} done.", message));
    }

    fn notice(&mut self, message: &str) {
        println!();
        println!("{}", message.yellow());
    }

    fn failure(&mut self, message: &str) {
        println!();
        println!("{} {}", "error:".bright_red().bold(), message);
    }

    fn acknowledge(&mut self, message: &str) -> io::Result<()> {
        let term = Term::stdout();
        println!();
        term.write_str(message)?;
        if !term.is_term() {
            term.read_line()?;
            return Ok(());
        }

        // read_key reads in raw mode, Ctrl-C comes back as Interrupted
        while term.read_key()? != Key::Enter {}
        term.write_line("")
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        println!();
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|dialoguer::Error::IO(e)| e)
    }

    fn pause(&mut self, message: &str) {
        println!();
        println!("{}", message.dimmed());
        thread::sleep(self.return_delay);
    }
}
