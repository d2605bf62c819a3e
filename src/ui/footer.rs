use crate::ui::theme::Theme;
use crate::view_model::StatusLine;
use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Banner line: the last collection error, if any, else the last good poll.
pub fn render_status(f: &mut Frame, area: Rect, status: &StatusLine, polling: bool, theme: &Theme) {
    let busy = if polling { "  ⟳ polling…" } else { "" };
    let line = match &status.banner {
        Some(b) => {
            let style = if b.critical { theme.banner_crit } else { theme.banner };
            let prefix = if b.critical { " ✖ " } else { " ! " };
            let since = status.last_success
                .map(|t| format!("  (showing data from {})", local_time(t)))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(format!("{prefix}{}{since}{busy} ", b.text), style),
            ])
        }
        None => {
            let when = status.last_success
                .map(local_time)
                .unwrap_or_else(|| "never".into());
            let mut spans = vec![
                Span::styled(format!(" updated {when}  cycle {}", status.cycle), theme.text_dim),
            ];
            if status.warning_count > 0 {
                spans.push(Span::styled(
                    format!("  {} parse warning(s), w to view", status.warning_count),
                    theme.warn,
                ));
            }
            spans.push(Span::styled(busy, theme.text_dim));
            Line::from(spans)
        }
    };
    f.render_widget(Paragraph::new(line), area);
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%H:%M:%S").to_string()
}

pub fn render_footer(f: &mut Frame, area: Rect, searching: bool, theme: &Theme) {
    let keys: &[(&str, &str)] = if searching {
        &[("Enter", "Keep"), ("Esc", "Clear"), ("Bksp", "Delete")]
    } else {
        &[
            ("q", "Quit"), ("r", "Refresh"), ("Tab/←→", "Pool"), ("↑↓/jk", "Dataset"),
            ("PgUp/Dn", "VDEVs"), ("/", "Search"), ("w", "Warnings"), ("t", "Theme"), ("?", "Help"),
        ]
    };

    let mut spans: Vec<Span> = vec![Span::styled(" ", theme.footer_bg)];
    for (key, desc) in keys {
        spans.push(Span::styled(format!(" {} ", key), theme.footer_key));
        spans.push(Span::styled(format!("{}  ", desc), theme.footer_text));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).style(theme.footer_bg), area);
}
