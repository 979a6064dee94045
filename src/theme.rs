//! Process-wide rendering context
//!
//! Colors and chart markers are registered once at startup with [`init`];
//! every renderer reads them through [`get`]. If nothing was registered the
//! default theme is installed on first use.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub title: Style,
    pub user: Style,
    pub bot: Style,
    pub error: Style,
    pub muted: Style,
    pub accent: Color,
    pub input: Style,
    pub chart_line: Style,
    pub chart_marker: Marker,
    pub table_header: Style,
    pub table_stripe: Style,
    pub key_hint: Style,
    pub key_label: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            user: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            bot: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            error: Style::default().fg(Color::Red),
            muted: Style::default().fg(Color::DarkGray),
            accent: Color::Cyan,
            input: Style::default().fg(Color::Cyan),
            // rgb(102, 126, 234), the web client's line color
            chart_line: Style::default().fg(Color::Rgb(102, 126, 234)),
            chart_marker: Marker::Braille,
            table_header: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            table_stripe: Style::default().bg(Color::Rgb(30, 30, 40)),
            key_hint: Style::default().bg(Color::DarkGray).fg(Color::White),
            key_label: Style::default().bg(Color::Black).fg(Color::White),
        }
    }
}

/// Register the theme. Returns `false` if one was already in place.
pub fn init(theme: Theme) -> bool {
    THEME.set(theme).is_ok()
}

pub fn get() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}
