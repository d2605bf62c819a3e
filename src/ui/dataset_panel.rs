use crate::models::dataset::DatasetKind;
use crate::ui::{theme::Theme, truncate};
use crate::util::human::{fmt_age, fmt_bytes};
use crate::view_model::PoolTab;
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

pub fn render_dataset_panel(
    f: &mut Frame,
    area: Rect,
    tab: &PoolTab,
    search: &str,
    searching: bool,
    now: DateTime<Utc>,
    theme: &Theme,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),       // dataset tree
            Constraint::Length(7),    // properties
            Constraint::Length(8),    // snapshots
        ])
        .split(area);

    render_tree(f, rows[0], tab, search, searching, theme);
    render_detail(f, rows[1], tab, theme);
    render_snapshots(f, rows[2], tab, now, theme);
}

fn render_tree(f: &mut Frame, area: Rect, tab: &PoolTab, search: &str, searching: bool, theme: &Theme) {
    let title = if searching {
        format!(" Datasets  /{}▏", search)
    } else if !search.is_empty() {
        format!(" Datasets  [/{}] ", search)
    } else {
        format!(" Datasets ({}) ", tab.datasets.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if searching { theme.border_focused } else { theme.border })
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if tab.datasets.is_empty() {
        let msg = if search.is_empty() { "no datasets" } else { "no dataset matches" };
        f.render_widget(Paragraph::new(Span::styled(msg, theme.text_dim)), inner);
        return;
    }

    let header = Row::new(
        ["Name", "Used", "Avail", "Snaps"].map(|h| Cell::from(h).style(theme.text_dim)),
    );

    // Keep the cursor on screen.
    let visible = (inner.height as usize).saturating_sub(1).max(1);
    let selected = tab.selected.unwrap_or(0);
    let offset = (selected + 1).saturating_sub(visible);

    let body: Vec<Row> = tab.datasets.iter().enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, d)| {
            let marker = if d.kind == DatasetKind::Volume { "▣ " } else { "" };
            let name = format!("{}{}{}", "  ".repeat(d.depth), marker, d.short_name);
            let row = Row::new(vec![
                Cell::from(truncate(&name, 32)),
                Cell::from(fmt_bytes(d.used_bytes)),
                Cell::from(fmt_bytes(d.avail_bytes)),
                Cell::from(if d.snapshot_count > 0 { d.snapshot_count.to_string() } else { String::new() }),
            ]);
            if Some(i) == tab.selected { row.style(theme.selected) } else { row.style(theme.text) }
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(5),
    ];
    f.render_widget(Table::new(body, widths).header(header).column_spacing(1), inner);
}

fn render_detail(f: &mut Frame, area: Rect, tab: &PoolTab, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(" Properties ", theme.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(d) = &tab.detail else { return };
    let prop = |k: &'static str, v: String| Line::from(vec![
        Span::styled(format!("{:<12}", k), theme.text_dim),
        Span::styled(v, theme.text),
    ]);
    let lines = vec![
        prop("name", d.name.clone()),
        prop("type", d.kind.label().to_string()),
        prop("used", format!("{}   refer {}", fmt_bytes(d.used_bytes), fmt_bytes(d.refer_bytes))),
        prop("avail", fmt_bytes(d.avail_bytes)),
        prop("mountpoint", d.mountpoint.clone().unwrap_or_else(|| "-".into())),
        prop("compression", d.compression.clone()),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_snapshots(f: &mut Frame, area: Rect, tab: &PoolTab, now: DateTime<Utc>, theme: &Theme) {
    let title = match &tab.detail {
        Some(d) => format!(" Snapshots of {} ({}) ", d.name, tab.snapshots.len()),
        None    => " Snapshots ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if tab.snapshots.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("none", theme.text_dim)), inner);
        return;
    }

    let header = Row::new(["Name", "Age", "Used", "Refer"].map(|h| Cell::from(h).style(theme.text_dim)));
    let body: Vec<Row> = tab.snapshots.iter()
        .map(|s| Row::new(vec![
            Cell::from(s.name.clone()).style(theme.text),
            Cell::from(s.created.map(|t| fmt_age(t, now)).unwrap_or_else(|| "?".into())).style(theme.text_dim),
            Cell::from(fmt_bytes(s.used_bytes)).style(theme.text),
            Cell::from(fmt_bytes(s.refer_bytes)).style(theme.text_dim),
        ]))
        .collect();
    let widths = [
        Constraint::Min(16),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(9),
    ];
    f.render_widget(Table::new(body, widths).header(header).column_spacing(1), inner);
}
