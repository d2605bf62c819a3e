use crate::models::pool::Health;
use ratatui::style::{Color, Modifier, Style};

// ── Helper: build an Rgb Color from a hex literal ──────────────────────

const fn rgb(hex: u32) -> Color {
    Color::Rgb(
        ((hex >> 16) & 0xFF) as u8,
        ((hex >>  8) & 0xFF) as u8,
        ( hex        & 0xFF) as u8,
    )
}

// ── Theme variant selector ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Default,
    Dracula,
    Gruvbox,
    Nord,
}

impl ThemeVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Dracula => "Dracula",
            Self::Gruvbox => "Gruvbox",
            Self::Nord    => "Nord",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Default => Self::Dracula,
            Self::Dracula => Self::Gruvbox,
            Self::Gruvbox => Self::Nord,
            Self::Nord    => Self::Default,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "dracula" => Some(Self::Dracula),
            "gruvbox" => Some(Self::Gruvbox),
            "nord"    => Some(Self::Nord),
            _         => None,
        }
    }
}

// ── Palettes ────────────────────────────────────────────────────────────

/// The handful of colours a theme is derived from.
struct Palette {
    bar:    Color,   // header / footer background
    fg:     Color,
    dim:    Color,
    accent: Color,
    ok:     Color,
    warn:   Color,
    high:   Color,
    crit:   Color,
    read:   Color,
    write:  Color,
    sel:    Color,   // selection background
    sel_fg: Color,
}

const DEFAULT: Palette = Palette {
    bar: Color::DarkGray, fg: Color::White, dim: Color::DarkGray, accent: Color::Cyan,
    ok: Color::Green, warn: Color::Yellow, high: Color::LightRed, crit: Color::Red,
    read: Color::Cyan, write: Color::Yellow, sel: Color::Cyan, sel_fg: Color::Black,
};

// https://draculatheme.com/
const DRACULA: Palette = Palette {
    bar: rgb(0x44475a), fg: rgb(0xf8f8f2), dim: rgb(0x6272a4), accent: rgb(0xbd93f9),
    ok: rgb(0x50fa7b), warn: rgb(0xf1fa8c), high: rgb(0xffb86c), crit: rgb(0xff5555),
    read: rgb(0x8be9fd), write: rgb(0xffb86c), sel: rgb(0xff79c6), sel_fg: rgb(0x282a36),
};

// https://github.com/morhetz/gruvbox
const GRUVBOX: Palette = Palette {
    bar: rgb(0x3c3836), fg: rgb(0xebdbb2), dim: rgb(0xa89984), accent: rgb(0x83a598),
    ok: rgb(0xb8bb26), warn: rgb(0xfabd2f), high: rgb(0xfe8019), crit: rgb(0xfb4934),
    read: rgb(0x83a598), write: rgb(0xfe8019), sel: rgb(0xd79921), sel_fg: rgb(0x282828),
};

// https://www.nordtheme.com/
const NORD: Palette = Palette {
    bar: rgb(0x3b4252), fg: rgb(0xe5e9f0), dim: rgb(0x4c566a), accent: rgb(0x88c0d0),
    ok: rgb(0xa3be8c), warn: rgb(0xebcb8b), high: rgb(0xd08770), crit: rgb(0xbf616a),
    read: rgb(0x88c0d0), write: rgb(0xd08770), sel: rgb(0x88c0d0), sel_fg: rgb(0x2e3440),
};

// ── Theme struct ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Theme {
    pub border:         Style,
    pub border_focused: Style,
    pub title:          Style,
    pub text:           Style,
    pub text_dim:       Style,
    pub selected:       Style,
    pub header:         Style,
    pub tab_active:     Style,
    pub ok:             Style,
    pub warn:           Style,
    pub crit:           Style,
    pub read_spark:     Style,
    pub write_spark:    Style,
    pub bar_low:        Style,
    pub bar_mid:        Style,
    pub bar_high:       Style,
    pub bar_crit:       Style,
    pub banner:         Style,
    pub banner_crit:    Style,
    pub footer_bg:      Style,
    pub footer_key:     Style,
    pub footer_text:    Style,
}

impl Theme {
    pub fn for_variant(v: ThemeVariant) -> Self {
        match v {
            ThemeVariant::Default => Self::from_palette(&DEFAULT),
            ThemeVariant::Dracula => Self::from_palette(&DRACULA),
            ThemeVariant::Gruvbox => Self::from_palette(&GRUVBOX),
            ThemeVariant::Nord    => Self::from_palette(&NORD),
        }
    }

    fn from_palette(p: &Palette) -> Self {
        let fg = |c: Color| Style::default().fg(c);
        let bold = Modifier::BOLD;
        Self {
            border:         fg(p.dim),
            border_focused: fg(p.accent),
            title:          fg(p.fg).add_modifier(bold),
            text:           fg(p.fg),
            text_dim:       fg(p.dim),
            selected:       fg(p.sel_fg).bg(p.sel),
            header:         fg(p.fg).bg(p.bar).add_modifier(bold),
            tab_active:     fg(p.accent).add_modifier(bold | Modifier::UNDERLINED),
            ok:             fg(p.ok),
            warn:           fg(p.warn),
            crit:           fg(p.crit).add_modifier(bold),
            read_spark:     fg(p.read),
            write_spark:    fg(p.write),
            bar_low:        fg(p.ok),
            bar_mid:        fg(p.warn),
            bar_high:       fg(p.high),
            bar_crit:       fg(p.crit).add_modifier(bold),
            banner:         fg(p.sel_fg).bg(p.warn),
            banner_crit:    fg(p.fg).bg(p.crit).add_modifier(bold),
            footer_bg:      fg(p.fg).bg(p.bar),
            footer_key:     fg(p.accent).bg(p.bar).add_modifier(bold),
            footer_text:    fg(p.dim).bg(p.bar),
        }
    }

    /// Capacity gradient for a 0–100 fill level. ZFS slows down past ~80%.
    pub fn capacity_style(&self, pct: f64) -> Style {
        if      pct >= 90.0 { self.bar_crit }
        else if pct >= 80.0 { self.bar_high }
        else if pct >= 60.0 { self.bar_mid  }
        else                 { self.bar_low  }
    }

    pub fn health_style(&self, h: Health) -> Style {
        match h.severity() {
            0 => self.ok,
            1 => self.text_dim,
            2 => self.warn,
            _ => self.crit,
        }
    }

    pub fn errors_style(&self, count: u64) -> Style {
        if count == 0 { self.text_dim } else { self.crit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_cycle_through_all_four() {
        let mut v = ThemeVariant::Default;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(v.name());
            v = v.next();
        }
        assert_eq!(v, ThemeVariant::Default);
        assert_eq!(seen, vec!["Default", "Dracula", "Gruvbox", "Nord"]);
    }

    #[test]
    fn parse_is_case_insensitive_and_strict() {
        assert_eq!(ThemeVariant::parse("Gruvbox"), Some(ThemeVariant::Gruvbox));
        assert_eq!(ThemeVariant::parse("solarized"), None);
    }

    #[test]
    fn health_maps_to_severity_styles() {
        let t = Theme::for_variant(ThemeVariant::Nord);
        assert_eq!(t.health_style(Health::Online), t.ok);
        assert_eq!(t.health_style(Health::Degraded), t.warn);
        assert_eq!(t.health_style(Health::Faulted), t.crit);
        assert_eq!(t.capacity_style(95.0), t.bar_crit);
    }
}
