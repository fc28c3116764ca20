//! Menu rendering

use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};

use crate::menu::{Controller, MenuItem, MessageKind, Screen};

pub fn draw(frame: &mut Frame, controller: &Controller) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Padding
            Constraint::Length(1), // Title
            Constraint::Length(1), // Padding
            Constraint::Min(1),    // Items
            Constraint::Length(1), // Help
            Constraint::Length(1), // Message
        ])
        .split(frame.area());

    let menu = controller.current();

    let title = Paragraph::new(menu.screen().title())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(title, chunks[1]);

    let lines: Vec<Line> = menu
        .items()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let selected = idx == menu.selected();
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(row_text(menu.screen(), item, selected), style))
        })
        .collect();
    let items_area = chunks[3].inner(Margin {
        horizontal: 4,
        vertical: 0,
    });
    frame.render_widget(Paragraph::new(lines), items_area);

    let help = Paragraph::new(format!("  {}", menu.screen().help()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);

    if let Some(message) = controller.message() {
        let color = match message.kind {
            MessageKind::Info => Color::White,
            MessageKind::Success => Color::Green,
            MessageKind::Error => Color::Red,
        };
        let line = Paragraph::new(format!("  {}", message.text))
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: false });
        frame.render_widget(line, chunks[5]);
    }
}

/// Text of one menu row, `▶` marks the selection
pub fn row_text(screen: Screen, item: &MenuItem, selected: bool) -> String {
    let marker = if selected { "▶" } else { " " };
    match item {
        MenuItem::Environment { name, installed } if screen == Screen::Main => {
            let status = if *installed { "(found)" } else { "(missing)" };
            format!("{} {:<8} {}", marker, capitalize(name), status)
        }
        MenuItem::Environment { name, .. } => format!("{} {}", marker, capitalize(name)),
        other => format!("{} {}", marker, other.label()),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;
    use crate::registry::Registry;
    use ratatui::backend::TestBackend;

    fn screen_text(controller: &Controller) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 14)).unwrap();
        terminal.draw(|f| draw(f, controller)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_row_text() {
        let arch = MenuItem::Environment {
            name: "arch",
            installed: true,
        };
        let gentoo = MenuItem::Environment {
            name: "gentoo",
            installed: false,
        };
        assert_eq!(row_text(Screen::Main, &arch, true), "▶ Arch     (found)");
        assert_eq!(row_text(Screen::Main, &gentoo, false), "  Gentoo   (missing)");
        assert_eq!(row_text(Screen::InstallPicker, &gentoo, true), "▶ Gentoo");
        assert_eq!(
            row_text(Screen::Main, &MenuItem::OpenUninstall, false),
            "  Uninstall distro"
        );
    }

    #[test]
    fn test_main_screen_shows_found_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = LauncherConfig {
            base_path: dir.path().to_path_buf(),
            ..LauncherConfig::default()
        };
        std::fs::create_dir(dir.path().join(".arch")).unwrap();
        let controller = Controller::new(Registry::new(&config));

        let text = screen_text(&controller);
        assert!(text.contains("-- clivm launcher --"));
        assert!(text.contains("▶ Debian   (missing)"));
        assert!(text.contains("Arch     (found)"));
        for name in ["Alpine", "Gentoo", "Ubuntu"] {
            assert!(text.contains(&format!("{:<8} (missing)", name)));
        }
        assert!(text.contains("Install new distro"));
        assert!(text.contains("q or ESC to quit"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("debian"), "Debian");
        assert_eq!(capitalize(""), "");
    }
}
