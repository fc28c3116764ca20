//! Menu controller
//!
//! One controller drives all three screens. Each screen keeps its own
//! selection; item lists are rebuilt from the registry before every render.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::actions::{ActionKind, ActionOutcome};
use crate::error::{LauncherError, Result};
use crate::registry::Registry;

/// Keys the menus react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Activate,
    Back,
    Quit,
    Interrupt,
    Other,
}

impl Key {
    /// `None` for key releases
    pub fn from_event(event: KeyEvent) -> Option<Key> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let key = match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
            KeyCode::Up | KeyCode::Char('k') => Key::Up,
            KeyCode::Down | KeyCode::Char('j') => Key::Down,
            KeyCode::Enter | KeyCode::Char('\n') | KeyCode::Char('\r') => Key::Activate,
            KeyCode::Esc => Key::Back,
            KeyCode::Char('q') => Key::Quit,
            _ => Key::Other,
        };
        Some(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Main,
    InstallPicker,
    UninstallPicker,
}

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Main => "-- clivm launcher --",
            Screen::InstallPicker => "-- Install New Distro --",
            Screen::UninstallPicker => "-- Uninstall Distro --",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Screen::Main => {
                "Use ↑↓ arrows to navigate, Enter to launch/install, q or ESC to quit."
            }
            Screen::InstallPicker => "Use ↑↓ arrows to select, Enter to install, ESC to return.",
            Screen::UninstallPicker => "Use ↑↓ arrows to select, Enter to uninstall, ESC to return.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem<'a> {
    Environment { name: &'a str, installed: bool },
    OpenInstall,
    OpenUninstall,
}

impl MenuItem<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Environment { .. } => "",
            MenuItem::OpenInstall => "Install new distro",
            MenuItem::OpenUninstall => "Uninstall distro",
        }
    }
}

/// One screen's items and selection, `selected < items.len()` when non-empty
#[derive(Debug, Clone)]
pub struct Menu<'a> {
    screen: Screen,
    items: Vec<MenuItem<'a>>,
    selected: usize,
}

impl<'a> Menu<'a> {
    pub fn new(screen: Screen, items: Vec<MenuItem<'a>>) -> Self {
        Self {
            screen,
            items,
            selected: 0,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn items(&self) -> &[MenuItem<'a>] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<MenuItem<'a>> {
        self.items.get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }

    /// Replace the items, keeping the selection in range
    pub fn set_items(&mut self, items: Vec<MenuItem<'a>>) {
        self.items = items;
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

/// Bottom-line message; a blocking one swallows the next key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
    pub blocking: bool,
}

impl Message {
    fn blocking(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            blocking: true,
        }
    }

    fn status(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            blocking: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Interrupted,
}

/// What the run loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Continue,
    Dispatch(ActionKind, &'a str),
    Exit(Exit),
}

pub struct Controller<'a> {
    registry: Registry<'a>,
    /// Main at the bottom, at most one picker above it
    stack: Vec<Menu<'a>>,
    message: Option<Message>,
}

impl<'a> Controller<'a> {
    pub fn new(registry: Registry<'a>) -> Self {
        let main = Menu::new(Screen::Main, Self::items_for(&registry, Screen::Main));
        Self {
            registry,
            stack: vec![main],
            message: None,
        }
    }

    pub fn current(&self) -> &Menu<'a> {
        self.stack.last().unwrap_or(&self.stack[0])
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    fn items_for(registry: &Registry<'a>, screen: Screen) -> Vec<MenuItem<'a>> {
        match screen {
            Screen::Main => registry
                .snapshot()
                .into_iter()
                .map(|env| MenuItem::Environment {
                    name: env.name,
                    installed: env.installed,
                })
                .chain([MenuItem::OpenInstall, MenuItem::OpenUninstall])
                .collect(),
            Screen::InstallPicker => registry
                .list_missing()
                .into_iter()
                .map(|name| MenuItem::Environment {
                    name,
                    installed: false,
                })
                .collect(),
            Screen::UninstallPicker => registry
                .list_installed()
                .into_iter()
                .map(|name| MenuItem::Environment {
                    name,
                    installed: true,
                })
                .collect(),
        }
    }

    /// Re-read the filesystem for every open screen
    pub fn refresh(&mut self) {
        for menu in &mut self.stack {
            let items = Self::items_for(&self.registry, menu.screen);
            menu.set_items(items);
        }

        if self.stack.len() > 1 && self.current().items().is_empty() {
            let screen = self.current().screen();
            debug!("{:?} became empty, returning to main menu", screen);
            self.stack.truncate(1);
            self.message = Some(Message::status(MessageKind::Info, empty_picker_text(screen)));
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Step<'a> {
        if key == Key::Interrupt {
            return Step::Exit(Exit::Interrupted);
        }

        if let Some(message) = self.message.take() {
            if message.blocking {
                return Step::Continue;
            }
        }

        let on_main = self.stack.len() == 1;
        match key {
            Key::Up => self.current_mut().select_prev(),
            Key::Down => self.current_mut().select_next(),
            Key::Back if on_main => return Step::Exit(Exit::Quit),
            Key::Back => self.pop(),
            Key::Quit if on_main => return Step::Exit(Exit::Quit),
            Key::Activate => return self.activate(),
            _ => {}
        }
        Step::Continue
    }

    fn activate(&mut self) -> Step<'a> {
        let menu = self.current();
        let screen = menu.screen();
        let item = match menu.selected_item() {
            Some(item) => item,
            None => return Step::Continue,
        };

        match (screen, item) {
            (Screen::Main, MenuItem::Environment { name, .. }) => {
                if self.registry.exists(name) {
                    Step::Dispatch(ActionKind::Enter, name)
                } else {
                    self.message = Some(Message::blocking(
                        MessageKind::Error,
                        format!("{} not installed.", name),
                    ));
                    Step::Continue
                }
            }
            (Screen::Main, MenuItem::OpenInstall) => {
                self.open_picker(Screen::InstallPicker);
                Step::Continue
            }
            (Screen::Main, MenuItem::OpenUninstall) => {
                self.open_picker(Screen::UninstallPicker);
                Step::Continue
            }
            (Screen::InstallPicker, MenuItem::Environment { name, .. }) => {
                self.pop();
                Step::Dispatch(ActionKind::Install, name)
            }
            (Screen::UninstallPicker, MenuItem::Environment { name, .. }) => {
                self.pop();
                Step::Dispatch(ActionKind::Uninstall, name)
            }
            _ => Step::Continue,
        }
    }

    fn open_picker(&mut self, screen: Screen) {
        let items = Self::items_for(&self.registry, screen);
        if items.is_empty() {
            self.message = Some(Message::blocking(
                MessageKind::Info,
                format!("{} Press any key to return.", empty_picker_text(screen)),
            ));
            return;
        }
        self.stack.push(Menu::new(screen, items));
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn current_mut(&mut self) -> &mut Menu<'a> {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Turn an action result into a status message. Terminal failures are fatal.
    pub fn report(
        &mut self,
        kind: ActionKind,
        name: &str,
        result: Result<ActionOutcome>,
    ) -> Result<()> {
        self.message = match result {
            Ok(ActionOutcome::Completed) => Some(Message::status(
                MessageKind::Success,
                completion_text(kind, name),
            )),
            Ok(ActionOutcome::Declined) => None,
            Err(LauncherError::Terminal(e)) => return Err(LauncherError::Terminal(e)),
            Err(e) if e.needs_acknowledgment() => Some(Message::blocking(
                MessageKind::Error,
                format!("{} Press any key to continue.", e),
            )),
            Err(e) => Some(Message::status(MessageKind::Error, e.to_string())),
        };
        Ok(())
    }
}

fn empty_picker_text(screen: Screen) -> &'static str {
    match screen {
        Screen::UninstallPicker => "No distros to uninstall.",
        _ => "All distros installed.",
    }
}

fn completion_text(kind: ActionKind, name: &str) -> String {
    match kind {
        ActionKind::Enter => format!("Left {} chroot.", name),
        ActionKind::Install => format!("Installer for {} finished.", name),
        ActionKind::Uninstall => format!("{} uninstalled.", name),
    }
}
