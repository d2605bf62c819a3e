use chrono::{DateTime, Utc};

/// Format bytes/s into a human-readable string: "12.5 MB/s"
pub fn fmt_rate(bytes_per_sec: f64) -> String {
    fmt_bytes_f(bytes_per_sec) + "/s"
}

/// Format a raw byte count into a human-readable string: "12.5 MB"
pub fn fmt_bytes(bytes: u64) -> String {
    fmt_bytes_f(bytes as f64)
}

fn fmt_bytes_f(b: f64) -> String {
    const PB: f64 = 1_125_899_906_842_624.0;
    const TB: f64 = 1_099_511_627_776.0;
    const GB: f64 = 1_073_741_824.0;
    const MB: f64 = 1_048_576.0;
    const KB: f64 = 1_024.0;
    if b >= PB      { format!("{:.1} PB", b / PB) }
    else if b >= TB { format!("{:.1} TB", b / TB) }
    else if b >= GB { format!("{:.1} GB", b / GB) }
    else if b >= MB { format!("{:.1} MB", b / MB) }
    else if b >= KB { format!("{:.1} KB", b / KB) }
    else            { format!("{:.0} B",  b) }
}

/// Format IOPS: "1.2K"
pub fn fmt_iops(iops: u64) -> String {
    if iops >= 1_000_000 { format!("{:.1}M", iops as f64 / 1_000_000.0) }
    else if iops >= 1_000 { format!("{:.1}K", iops as f64 / 1_000.0) }
    else { format!("{}", iops) }
}

/// Format a percentage without decimals: "84%"
pub fn fmt_pct(pct: f64) -> String {
    format!("{:.0}%", pct)
}

/// Compact age of a timestamp relative to `now`: "3d", "5h", "12m", "40s".
pub fn fmt_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs >= 86_400 * 365 { format!("{}y", secs / (86_400 * 365)) }
    else if secs >= 86_400  { format!("{}d", secs / 86_400) }
    else if secs >= 3_600   { format!("{}h", secs / 3_600) }
    else if secs >= 60      { format!("{}m", secs / 60) }
    else                    { format!("{}s", secs) }
}

/// Parse a counter the way `zpool status` prints it: "0", "12", "1.2K", "3M".
pub fn parse_count(s: &str) -> Option<u64> {
    let s = s.trim();
    let (num, mult) = match s.chars().last()? {
        'K' => (&s[..s.len() - 1], 1e3),
        'M' => (&s[..s.len() - 1], 1e6),
        'G' => (&s[..s.len() - 1], 1e9),
        'T' => (&s[..s.len() - 1], 1e12),
        _   => return s.parse().ok(),
    };
    let v: f64 = num.parse().ok()?;
    if v < 0.0 { return None; }
    Some((v * mult).round() as u64)
}

/// Parse a `-p` numeric column where "-" means "not applicable".
pub fn parse_dash(s: &str) -> Option<u64> {
    match s.trim() {
        "-" | "" => Some(0),
        v        => v.trim_end_matches('%').parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bytes_scale_by_1024() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(1536), "1.5 KB");
        assert_eq!(fmt_bytes(5 * 1_099_511_627_776), "5.0 TB");
        assert_eq!(fmt_rate(2_097_152.0), "2.0 MB/s");
    }

    #[test]
    fn iops_are_compact() {
        assert_eq!(fmt_iops(999), "999");
        assert_eq!(fmt_iops(1_247), "1.2K");
        assert_eq!(fmt_iops(3_400_000), "3.4M");
    }

    #[test]
    fn counters_accept_zpool_suffixes() {
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count("17"), Some(17));
        assert_eq!(parse_count("1.2K"), Some(1_200));
        assert_eq!(parse_count("3M"), Some(3_000_000));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn dash_means_zero() {
        assert_eq!(parse_dash("-"), Some(0));
        assert_eq!(parse_dash("42%"), Some(42));
        assert_eq!(parse_dash("x"), None);
    }

    #[test]
    fn ages() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let then = Utc.with_ymd_and_hms(2026, 2, 7, 11, 0, 0).unwrap();
        assert_eq!(fmt_age(then, now), "3d");
        assert_eq!(fmt_age(now, now), "0s");
        assert_eq!(fmt_age(now, then), "0s");
    }
}
