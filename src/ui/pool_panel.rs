use crate::ui::{spark_text, theme::Theme, truncate};
use crate::util::human::{fmt_bytes, fmt_iops, fmt_rate};
use crate::view_model::{PoolTab, VdevRow};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table},
    Frame,
};

const SPARK_W: usize = 10;

pub fn render_pool_panel(f: &mut Frame, area: Rect, tab: &PoolTab, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),   // summary + capacity gauge
            Constraint::Length(6),   // pool I/O sparklines
            Constraint::Min(4),      // vdev tree
        ])
        .split(area);

    render_summary(f, rows[0], tab, theme);
    render_io(f, rows[1], tab, theme);
    render_vdevs(f, rows[2], tab, theme);
}

fn render_summary(f: &mut Frame, area: Rect, tab: &PoolTab, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_focused)
        .title(Span::styled(
            if tab.aggregate { " All pools ".to_string() } else { format!(" Pool {} ", tab.name) },
            theme.title,
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let mut line1 = vec![
        Span::styled(format!("{:<9}", tab.health.label()), theme.health_style(tab.health)),
        Span::styled("  scan: ", theme.text_dim),
        Span::styled(tab.scan.clone(), theme.text),
    ];
    if let Some(root) = &tab.altroot {
        line1.push(Span::styled("  altroot: ", theme.text_dim));
        line1.push(Span::styled(root.clone(), theme.text));
    }
    f.render_widget(Paragraph::new(Line::from(line1)), parts[0]);

    let cap = &tab.capacity;
    let pct = cap.ratio * 100.0;
    let gauge = Gauge::default()
        .gauge_style(theme.capacity_style(pct))
        .ratio(cap.ratio)
        .label(format!("{}  {} / {}", cap.label, fmt_bytes(cap.alloc_bytes), fmt_bytes(cap.size_bytes)));
    f.render_widget(gauge, parts[1]);

    let frag = cap.frag_pct.map(|p| format!("{p}%")).unwrap_or_else(|| "-".into());
    let line3 = Line::from(vec![
        Span::styled("free ", theme.text_dim),
        Span::styled(fmt_bytes(cap.free_bytes), theme.text),
        Span::styled("   frag ", theme.text_dim),
        Span::styled(frag, theme.text),
    ]);
    f.render_widget(Paragraph::new(line3), parts[2]);
}

fn render_io(f: &mut Frame, area: Rect, tab: &PoolTab, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(" I/O ", theme.title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(inner);

    spark_row(f, rows[0], "Read  ", tab.io.read_ops, tab.io.read_bytes, &tab.read_series, theme.read_spark, theme);
    spark_row(f, rows[1], "Write ", tab.io.write_ops, tab.io.write_bytes, &tab.write_series, theme.write_spark, theme);
}

#[allow(clippy::too_many_arguments)]
fn spark_row(
    f: &mut Frame,
    area: Rect,
    label: &str,
    ops: u64,
    bytes: u64,
    series: &[u64],
    style: Style,
    theme: &Theme,
) {
    let text = Line::from(vec![
        Span::styled(label.to_string(), style),
        Span::styled(format!("{:>6} ops/s  ", fmt_iops(ops)), theme.text),
        Span::styled(fmt_rate(bytes as f64), theme.text_dim),
    ]);
    f.render_widget(Paragraph::new(text), Rect { height: 1, ..area });

    if area.height < 2 { return; }
    // Newest samples on the right edge.
    let width = area.width as usize;
    let data = &series[series.len().saturating_sub(width)..];
    let spark = Sparkline::default()
        .data(data)
        .max(data.iter().copied().max().unwrap_or(1).max(1))
        .style(style);
    f.render_widget(spark, Rect { y: area.y + 1, height: 1, ..area });
}

fn render_vdevs(f: &mut Frame, area: Rect, tab: &PoolTab, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(
            format!(" VDEVs ({})  PgUp/PgDn ", tab.vdevs.len()),
            theme.title,
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if tab.vdevs.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("no vdevs reported", theme.text_dim)), inner);
        return;
    }

    let header = Row::new(
        ["Name", "Kind", "State", "R", "W", "CK", "rOps", "wOps", "rBW", "wBW", "r hist", "w hist"]
            .map(|h| Cell::from(h).style(theme.text_dim)),
    )
    .height(1);

    let visible = (inner.height as usize).saturating_sub(1);
    let rows: Vec<Row> = tab.vdevs.iter()
        .skip(tab.vdev_scroll)
        .take(visible)
        .map(|v| vdev_row(v, theme))
        .collect();

    let widths = [
        Constraint::Min(14),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(SPARK_W as u16),
        Constraint::Length(SPARK_W as u16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1);
    f.render_widget(table, inner);
}

fn vdev_row<'a>(v: &VdevRow, theme: &Theme) -> Row<'a> {
    let name = format!("{}{}", "  ".repeat(v.depth), v.label);
    let name_style = if v.kind.is_group() { theme.title } else { theme.text };
    Row::new(vec![
        Cell::from(truncate(&name, 28)).style(name_style),
        Cell::from(v.kind.label()).style(theme.text_dim),
        Cell::from(v.state.label()).style(theme.health_style(v.state)),
        Cell::from(v.read_errors.to_string()).style(theme.errors_style(v.read_errors)),
        Cell::from(v.write_errors.to_string()).style(theme.errors_style(v.write_errors)),
        Cell::from(v.cksum_errors.to_string()).style(theme.errors_style(v.cksum_errors)),
        Cell::from(fmt_iops(v.io.read_ops)).style(theme.read_spark),
        Cell::from(fmt_iops(v.io.write_ops)).style(theme.write_spark),
        Cell::from(fmt_rate(v.io.read_bytes as f64)).style(theme.text_dim),
        Cell::from(fmt_rate(v.io.write_bytes as f64)).style(theme.text_dim),
        Cell::from(spark_text(&v.read_series, SPARK_W)).style(theme.read_spark),
        Cell::from(spark_text(&v.write_series, SPARK_W)).style(theme.write_spark),
    ])
}
