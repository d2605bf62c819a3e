use crate::ui::theme::Theme;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Parse warnings from the last successful cycle.
pub fn render_diagnostics(f: &mut Frame, area: Rect, warnings: &[String], theme: &Theme) {
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_focused)
        .title(Span::styled(
            format!(" Diagnostics: {} parse warning(s)  (w / Esc to close) ", warnings.len()),
            theme.title,
        ));

    let lines: Vec<Line> = if warnings.is_empty() {
        vec![Line::from(Span::styled("All tool output parsed cleanly.", theme.ok))]
    } else {
        warnings.iter()
            .map(|w| Line::from(vec![
                Span::styled("• ", theme.warn),
                Span::styled(w.clone(), theme.text),
            ]))
            .collect()
    };

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}
