pub mod dashboard;
pub mod dataset_panel;
pub mod diagnostics;
pub mod footer;
pub mod help;
pub mod pool_panel;
pub mod theme;

use ratatui::layout::Rect;

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Inline sparkline of the last `width` samples, scaled to their own max.
/// Left-padded so columns line up while history is still filling.
pub fn spark_text(samples: &[u64], width: usize) -> String {
    let tail = &samples[samples.len().saturating_sub(width)..];
    let max = tail.iter().copied().max().unwrap_or(0).max(1);
    let mut out: String = " ".repeat(width - tail.len());
    out.extend(tail.iter().map(|&v| SPARKS[((v * 7) / max).min(7) as usize]));
    out
}

/// Shorten to `max` chars, marking the cut with '…'.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// A Rect of at most `width` × `height`, centered in `r`.
pub fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let w = width.min(r.width);
    let h = height.min(r.height);
    let x = r.x + (r.width.saturating_sub(w)) / 2;
    let y = r.y + (r.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
