use crate::config::Config;
use crate::ui::{centered_rect, theme::Theme};
use ratatui::{
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(62, 28, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_focused)
        .title(Span::styled(" zdash keybindings (? or Esc to close) ", theme.title));

    let config = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no config directory)".into());

    let lines = vec![
        key_line(theme, "Global", ""),
        key_line(theme, "  q / Ctrl-C",      "Quit"),
        key_line(theme, "  r / F5",          "Refresh now"),
        key_line(theme, "  t",               "Cycle color theme"),
        key_line(theme, "  ? / F1",          "Toggle this help"),
        Line::from(""),
        key_line(theme, "Pools", ""),
        key_line(theme, "  Tab / Shift-Tab", "Next / previous pool"),
        key_line(theme, "  ← → / h l",       "Next / previous pool"),
        key_line(theme, "  PgUp / PgDn",     "Scroll the VDEV table"),
        Line::from(""),
        key_line(theme, "Datasets", ""),
        key_line(theme, "  ↑↓ / j k",        "Move selection"),
        key_line(theme, "  g / G",           "First / last dataset"),
        key_line(theme, "  /",               "Search (type to filter)"),
        key_line(theme, "  Enter / Esc",     "Keep / clear the search"),
        Line::from(""),
        key_line(theme, "Diagnostics", ""),
        key_line(theme, "  w",               "Parse warnings of the last poll"),
        Line::from(""),
        key_line(theme, "Config", ""),
        Line::from(Span::styled(format!("  {config}"), theme.text_dim)),
        Line::from(Span::styled("  Log level: ZDASH_LOG (e.g. debug)", theme.text_dim)),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn key_line<'a>(theme: &Theme, key: &'a str, desc: &'a str) -> Line<'a> {
    if desc.is_empty() {
        // Section header
        Line::from(vec![
            Span::styled(key, theme.title),
        ])
    } else {
        Line::from(vec![
            Span::styled(format!("{:<20}", key), theme.footer_key),
            Span::styled(desc, theme.text_dim),
        ])
    }
}
