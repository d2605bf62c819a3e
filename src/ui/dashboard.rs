use crate::app::App;
use crate::ui::{
    centered_rect,
    dataset_panel::render_dataset_panel,
    diagnostics::render_diagnostics,
    footer::{render_footer, render_status},
    help,
    pool_panel::render_pool_panel,
};
use crate::util::human::fmt_bytes;
use chrono::{Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let area  = f.area();
    let theme = &app.theme;
    let view  = app.view();

    // ── Root: header | tabs | body | status | footer ───────────────
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    // ── Header: title + fleet summary + clock ──────────────────────
    let left  = format!(" zdash v{}  {} ", env!("CARGO_PKG_VERSION"), app.theme_variant.name());
    let total: u64 = view.tabs.iter().map(|t| t.capacity.size_bytes).sum();
    let summary = format!(
        " {} pool(s)  {} dataset(s)  {} raw ",
        view.header.pool_count, view.header.dataset_count, fmt_bytes(total),
    );
    let worst = format!(" {} ", view.header.worst.label());
    let right = format!(" {} ", Local::now().format("%H:%M:%S"));
    let pad = (area.width as usize)
        .saturating_sub(left.chars().count() + summary.chars().count() + worst.chars().count() + right.chars().count());

    let header = Line::from(vec![
        Span::styled(left, theme.title),
        Span::styled(summary, theme.text_dim),
        Span::styled(worst, theme.health_style(view.header.worst)),
        Span::styled(" ".repeat(pad), theme.header),
        Span::styled(right, theme.text_dim),
    ]);
    f.render_widget(Paragraph::new(header).style(theme.header), root[0]);

    // ── Pool tabs ──────────────────────────────────────────────────
    let titles: Vec<Line> = view.tabs.iter()
        .map(|t| Line::from(vec![
            Span::styled("● ", theme.health_style(t.health)),
            Span::styled(t.name.clone(), theme.text),
        ]))
        .collect();
    let tabs = Tabs::new(titles)
        .select(view.active)
        .highlight_style(theme.tab_active)
        .divider(Span::styled("│", theme.border));
    f.render_widget(tabs, root[1]);

    // ── Body ───────────────────────────────────────────────────────
    let body = root[2];
    match view.active_tab() {
        Some(tab) => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
                .split(body);
            render_pool_panel(f, cols[0], tab, theme);
            render_dataset_panel(f, cols[1], tab, &app.selection.search, app.searching, Utc::now(), theme);
        }
        None => {
            let msg = match (app.scheduler.pool_filter(), view.status.last_success) {
                (Some(p), Some(_)) => format!("No pool named `{p}`."),
                (_, Some(_))       => "No pools found.".to_string(),
                (_, None)          => "Waiting for the first successful poll…".to_string(),
            };
            let area = centered_rect(48, 3, body);
            f.render_widget(Paragraph::new(Span::styled(msg, theme.text_dim)).centered(), area);
        }
    }

    render_status(f, root[3], &view.status, app.polling(), theme);
    render_footer(f, root[4], app.searching, theme);

    // ── Overlays ───────────────────────────────────────────────────
    if app.show_diagnostics {
        let h = (view.diagnostics.len() as u16 + 2).clamp(4, body.height.max(4));
        let area = centered_rect(body.width.saturating_sub(4), h, body);
        render_diagnostics(f, area, &view.diagnostics, theme);
    }
    if app.show_help {
        help::render(f, theme);
    }
}
