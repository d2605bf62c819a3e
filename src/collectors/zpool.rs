//! Parsers for `zpool list`, `zpool status` and `zpool iostat -v`.

use super::ParseWarning;
use crate::models::pool::{Health, IoStats, Pool, Vdev, VdevKind};
use crate::util::human::{parse_count, parse_dash};
use std::collections::HashMap;

pub const LIST_ARGS:   &[&str] = &["list", "-Hp", "-o", "name,size,alloc,free,frag,cap,health,altroot"];
pub const STATUS_ARGS: &[&str] = &["status"];
/// One report covering a one-second window; `-y` skips the since-boot averages.
pub const IOSTAT_ARGS: &[&str] = &["iostat", "-v", "-p", "-y", "1", "1"];

const SRC_LIST:   &str = "zpool list";
const SRC_STATUS: &str = "zpool status";
const SRC_IOSTAT: &str = "zpool iostat";

/// Group headers that appear at pool level in `status` and `iostat -v`.
const SECTIONS: &[&str] = &["logs", "cache", "spares", "special", "dedup"];

// ── zpool list ────────────────────────────────────────────────────────

/// Parse `zpool list -Hp -o name,size,alloc,free,frag,cap,health,altroot`.
/// Vdevs and datasets are left empty; the caller attaches them.
pub fn parse_list(text: &str, warnings: &mut Vec<ParseWarning>) -> Vec<Pool> {
    let mut pools = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() < 8 {
            warnings.push(ParseWarning::new(SRC_LIST, i + 1, line, "expected 8 tab-separated fields"));
            continue;
        }
        let (Some(size), Some(alloc), Some(free)) = (parse_dash(f[1]), parse_dash(f[2]), parse_dash(f[3])) else {
            warnings.push(ParseWarning::new(SRC_LIST, i + 1, line, "size columns are not numeric"));
            continue;
        };
        pools.push(Pool {
            name:        f[0].to_string(),
            size_bytes:  size,
            alloc_bytes: alloc,
            free_bytes:  free,
            frag_pct:    pct_field(f[4]),
            cap_pct:     pct_field(f[5]),
            health:      Health::parse(f[6]),
            altroot:     Some(f[7].trim()).filter(|s| !s.is_empty() && *s != "-").map(str::to_string),
            scan:        "no scrub".to_string(),
            io:          IoStats::default(),
            vdevs:       Vec::new(),
            datasets:    Vec::new(),
        });
    }
    pools
}

fn pct_field(s: &str) -> Option<u8> {
    s.trim().trim_end_matches('%').parse().ok()
}

// ── zpool status ──────────────────────────────────────────────────────

/// Per-pool result of `zpool status`.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStatus {
    pub state: Health,
    pub scan:  String,
    pub vdevs: Vec<Vdev>,
}

/// Parse plain `zpool status` into a vdev tree per pool.
///
/// Nesting comes from indentation inside the `config:` table: the pool row
/// and group headers (`logs`, `cache`, `spares`, …) sit at depth 0, top-level
/// vdevs at depth 1, and so on in steps of two spaces.
pub fn parse_status(text: &str, warnings: &mut Vec<ParseWarning>) -> HashMap<String, PoolStatus> {
    let mut out: HashMap<String, PoolStatus> = HashMap::new();
    let mut current: Option<String> = None;
    let mut in_config = false;
    let mut path = VdevPath::default();
    let mut flat: Vec<(usize, Vdev)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw.trim();

        if let Some(name) = trimmed.strip_prefix("pool:") {
            finish_pool(&mut out, current.take(), &mut flat);
            let name = name.trim().to_string();
            out.insert(name.clone(), PoolStatus { state: Health::Unknown, scan: "no scrub".into(), vdevs: Vec::new() });
            path = VdevPath::for_pool(&name);
            current = Some(name);
            in_config = false;
            continue;
        }
        let Some(pool) = current.clone() else { continue };

        if !in_config {
            if let Some(state) = trimmed.strip_prefix("state:") {
                if let Some(st) = out.get_mut(&pool) { st.state = Health::parse(state); }
            } else if let Some(scan) = trimmed.strip_prefix("scan:") {
                if let Some(st) = out.get_mut(&pool) { st.scan = parse_scan_line(scan.trim()); }
            } else if trimmed.starts_with("config:") {
                in_config = true;
            }
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with("NAME") { continue; }
        if trimmed.starts_with("errors:") {
            in_config = false;
            continue;
        }

        let depth = indent_depth(raw.strip_prefix('\t').unwrap_or(raw));
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let label = parts[0];

        if depth == 0 {
            if label == pool {
                path.section = None;
            } else if SECTIONS.contains(&label) {
                path.section = Some(label.to_string());
            } else {
                warnings.push(ParseWarning::new(SRC_STATUS, line_no, raw, "unexpected entry at pool level"));
            }
            path.stack.clear();
            continue;
        }

        let id = match path.enter(depth, label) {
            Ok(id) => id,
            Err(reason) => {
                warnings.push(ParseWarning::new(SRC_STATUS, line_no, raw, reason));
                continue;
            }
        };

        let state = parts.get(1).map(|s| Health::parse(s)).unwrap_or(Health::Unknown);
        // Spares print a note (`INUSE currently in use`) where counters would be.
        let counters: Vec<Option<u64>> = match state {
            Health::Avail | Health::InUse => Vec::new(),
            _ => parts.iter().skip(2).take(3).map(|s| parse_count(s)).collect(),
        };
        if counters.iter().any(|c| c.is_none()) {
            warnings.push(ParseWarning::new(SRC_STATUS, line_no, raw, "error counters are not numeric"));
        }
        let counter = |n: usize| counters.get(n).copied().flatten().unwrap_or(0);

        flat.push((depth, Vdev {
            id,
            label:        label.to_string(),
            kind:         classify(label, path.section.as_deref()),
            state,
            read_errors:  counter(0),
            write_errors: counter(1),
            cksum_errors: counter(2),
            io:           IoStats::default(),
            children:     Vec::new(),
        }));
    }
    finish_pool(&mut out, current, &mut flat);
    out
}

fn finish_pool(out: &mut HashMap<String, PoolStatus>, pool: Option<String>, flat: &mut Vec<(usize, Vdev)>) {
    let rows = std::mem::take(flat);
    let Some(pool) = pool else { return };
    if let Some(st) = out.get_mut(&pool) {
        st.vdevs = nest(rows);
    }
}

/// Turn `(depth, vdev)` rows (depth ≥ 1, validated by [`VdevPath`]) into a tree.
fn nest(rows: Vec<(usize, Vdev)>) -> Vec<Vdev> {
    let mut roots: Vec<Vdev> = Vec::new();
    let mut open: Vec<(usize, Vdev)> = Vec::new();

    fn close(open: &mut Vec<(usize, Vdev)>, roots: &mut Vec<Vdev>) {
        if let Some((_, done)) = open.pop() {
            match open.last_mut() {
                Some((_, parent)) => parent.children.push(done),
                None              => roots.push(done),
            }
        }
    }

    for (depth, vdev) in rows {
        while open.last().is_some_and(|(d, _)| *d >= depth) {
            close(&mut open, &mut roots);
        }
        open.push((depth, vdev));
    }
    while !open.is_empty() {
        close(&mut open, &mut roots);
    }
    roots
}

/// Tracks the label path of the row being parsed so vdev ids are stable
/// across cycles and identical between `status` and `iostat`.
#[derive(Debug, Default)]
struct VdevPath {
    pool:    String,
    section: Option<String>,
    stack:   Vec<String>,
}

impl VdevPath {
    fn for_pool(pool: &str) -> Self {
        Self { pool: pool.to_string(), section: None, stack: Vec::new() }
    }

    /// Enter `label` at `depth` (≥ 1) and return its id.
    fn enter(&mut self, depth: usize, label: &str) -> Result<String, &'static str> {
        if depth > self.stack.len() + 1 {
            return Err("indentation skips a level; no parent vdev");
        }
        self.stack.truncate(depth - 1);
        if self.stack.iter().any(|a| a == label) {
            return Err("vdev repeats an ancestor label (cycle)");
        }
        self.stack.push(label.to_string());

        let mut id = self.pool.clone();
        if let Some(section) = &self.section {
            id.push('/');
            id.push_str(section);
        }
        for part in &self.stack {
            id.push('/');
            id.push_str(part);
        }
        Ok(id)
    }
}

fn indent_depth(s: &str) -> usize {
    s.chars().take_while(|c| *c == ' ').count() / 2
}

fn classify(label: &str, section: Option<&str>) -> VdevKind {
    let group = label.split('-').next().unwrap_or(label);
    match group {
        "mirror"                       => return VdevKind::Mirror,
        "raidz" | "raidz1"             => return VdevKind::RaidZ1,
        "raidz2"                       => return VdevKind::RaidZ2,
        "raidz3"                       => return VdevKind::RaidZ3,
        "spare"                        => return VdevKind::Spare,
        _ => {}
    }
    // dRAID groups ("draid2:4d:8c:1s-0") carry the same parity levels as raidz.
    if let Some(rest) = group.strip_prefix("draid") {
        return match rest.chars().next() {
            Some('2') => VdevKind::RaidZ2,
            Some('3') => VdevKind::RaidZ3,
            _         => VdevKind::RaidZ1,
        };
    }
    match section {
        Some("logs")   => VdevKind::Log,
        Some("cache")  => VdevKind::Cache,
        Some("spares") => VdevKind::Spare,
        _              => VdevKind::Disk,
    }
}

/// Convert a raw "scan:" value into a short human-readable string.
pub fn parse_scan_line(scan: &str) -> String {
    if scan.starts_with("scrub in progress") || scan.starts_with("resilver in progress") {
        let verb = if scan.starts_with("scrub") { "scrubbing" } else { "resilvering" };
        return match extract_pct(scan) {
            Some(pct) => format!("{} {:.1}%", verb, pct),
            None      => format!("{}…", verb),
        };
    }
    if scan.starts_with("scrub repaired") || scan.starts_with("scrub canceled")
        || scan.starts_with("resilvered")
    {
        let status = if scan.starts_with("scrub canceled") { "canceled" }
                     else if scan.starts_with("resilvered") { "resilvered" }
                     else { "ok" };
        return match extract_short_date(scan) {
            Some(date) => format!("{} ({})", status, date),
            None       => status.to_string(),
        };
    }
    if scan == "none requested" || scan.is_empty() {
        return "no scrub".to_string();
    }
    scan.chars().take(24).collect()
}

fn extract_pct(s: &str) -> Option<f64> {
    s.split_whitespace()
        .filter_map(|part| part.strip_suffix('%'))
        .find_map(|v| v.parse::<f64>().ok())
}

fn extract_short_date(s: &str) -> Option<String> {
    let words: Vec<&str> = s.split_whitespace().collect();
    let year_idx = words.iter().rposition(|w| {
        w.len() == 4 && w.chars().all(|c| c.is_ascii_digit())
    })?;
    // "... on Sun Feb  9 00:25:01 2026" → "Feb 9 2026"
    if year_idx >= 3 && words[year_idx - 1].contains(':') {
        let month = words[year_idx - 3];
        let day   = words[year_idx - 2].trim_start_matches('0');
        return Some(format!("{} {} {}", month, day, words[year_idx]));
    }
    Some(words[year_idx].to_string())
}

// ── zpool iostat -v ───────────────────────────────────────────────────

/// Parse `zpool iostat -v -p` into per-id stats. Pool rows are keyed by pool
/// name, vdev rows by the same ids `parse_status` produces.
pub fn parse_iostat(text: &str, warnings: &mut Vec<ParseWarning>) -> HashMap<String, IoStats> {
    let mut out = HashMap::new();
    let mut data_started = false;
    let mut path: Option<VdevPath> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw.trim();
        if trimmed.starts_with("---") {
            data_started = true;
            continue;
        }
        if !data_started || trimmed.is_empty() { continue; }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let depth = indent_depth(raw);
        let label = parts[0];

        if depth == 0 && SECTIONS.contains(&label) {
            if let Some(p) = path.as_mut() {
                p.section = Some(label.to_string());
                p.stack.clear();
            }
            continue;
        }
        if parts.len() < 7 {
            warnings.push(ParseWarning::new(SRC_IOSTAT, line_no, raw, "expected 7 columns"));
            continue;
        }
        let nums: Option<Vec<u64>> = parts[3..7].iter().map(|s| parse_dash(s)).collect();
        let Some(nums) = nums else {
            warnings.push(ParseWarning::new(SRC_IOSTAT, line_no, raw, "operation columns are not numeric"));
            continue;
        };
        let stats = IoStats { read_ops: nums[0], write_ops: nums[1], read_bytes: nums[2], write_bytes: nums[3] };

        if depth == 0 {
            path = Some(VdevPath::for_pool(label));
            out.insert(label.to_string(), stats);
            continue;
        }
        let Some(p) = path.as_mut() else {
            warnings.push(ParseWarning::new(SRC_IOSTAT, line_no, raw, "vdev row before any pool row"));
            continue;
        };
        match p.enter(depth, label) {
            Ok(id)      => { out.insert(id, stats); }
            Err(reason) => warnings.push(ParseWarning::new(SRC_IOSTAT, line_no, raw, reason)),
        }
    }
    out
}

/// Copy iostat figures onto a vdev tree by id.
pub fn apply_iostat(vdevs: &mut [Vdev], stats: &HashMap<String, IoStats>) {
    for v in vdevs {
        if let Some(s) = stats.get(&v.id) { v.io = *s; }
        apply_iostat(&mut v.children, stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATUS: &str = "  pool: tank
 state: ONLINE
  scan: scrub repaired 0B in 00:00:01 with 0 errors on Sun Feb  9 00:25:01 2026
config:

\tNAME        STATE     READ WRITE CKSUM
\ttank        ONLINE       0     0     0
\t  mirror-0  ONLINE       0     0     0
\t    sda     ONLINE       0     0     0
\t    sdb     ONLINE       0     0     2
\tlogs
\t  mirror-1  ONLINE       0     0     0
\t    nvme0n1 ONLINE       0     0     0
\t    nvme1n1 ONLINE       0     0     0
\tcache
\t  sdc       ONLINE       0     0     0
\tspares
\t  sdd       AVAIL

errors: No known data errors

  pool: backup
 state: DEGRADED
  scan: scrub in progress since Sun Feb  9 00:24:00 2026
\t66.7% done, 00:01:00 to go
config:

\tNAME          STATE     READ WRITE CKSUM
\tbackup        DEGRADED     0     0     0
\t  raidz2-0    DEGRADED     0     0     0
\t    sde       ONLINE       0     0     0
\t    sdf       FAULTED    1.2K    3     0  too many errors
\t    sdg       ONLINE       0     0     0

errors: No known data errors
";

    const IOSTAT: &str = "              capacity     operations     bandwidth
pool        alloc   free   read  write   read  write
----------  -----  -----  -----  -----  -----  -----
tank         1000   9000     12     30   4096   8192
  mirror-0   1000   9000     12     30   4096   8192
    sda         -      -      6     15   2048   4096
    sdb         -      -      6     15   2048   4096
logs            -      -      -      -      -      -
  mirror-1      0   1000      0      5      0    512
    nvme0n1     -      -      0      3      0    256
    nvme1n1     -      -      0      2      0    256
cache           -      -      -      -      -      -
  sdc           0   5000      1      0    100      0
----------  -----  -----  -----  -----  -----  -----
";

    #[test]
    fn list_parses_parsable_columns() {
        let mut w = Vec::new();
        let pools = parse_list("tank\t10995116277760\t5497558138880\t5497558138880\t10\t50\tONLINE\t-\n", &mut w);
        assert!(w.is_empty());
        assert_eq!(pools.len(), 1);
        let p = &pools[0];
        assert_eq!(p.name, "tank");
        assert_eq!(p.size_bytes, 10_995_116_277_760);
        assert_eq!(p.frag_pct, Some(10));
        assert_eq!(p.cap_pct, Some(50));
        assert_eq!(p.health, Health::Online);
        assert_eq!(p.altroot, None);
        assert!((p.use_pct() - 50.0).abs() < 0.01);
    }

    #[test]
    fn list_skips_short_and_garbled_lines() {
        let mut w = Vec::new();
        let text = "short\tline\ntank\t100\t50\t50\t-\t50\tONLINE\t/mnt\nbad\tx\ty\tz\t-\t-\tONLINE\t-\n";
        let pools = parse_list(text, &mut w);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].frag_pct, None);
        assert_eq!(pools[0].altroot.as_deref(), Some("/mnt"));
        assert_eq!(w.len(), 2);
        assert_eq!(w[0].line_no, 1);
        assert_eq!(w[1].line_no, 3);
    }

    #[test]
    fn status_builds_nested_tree_with_sections() {
        let mut w = Vec::new();
        let map = parse_status(STATUS, &mut w);
        assert!(w.is_empty(), "{w:?}");

        let tank = &map["tank"];
        assert_eq!(tank.state, Health::Online);
        assert_eq!(tank.scan, "ok (Feb 9 2026)");
        let top: Vec<(&str, VdevKind)> = tank.vdevs.iter().map(|v| (v.label.as_str(), v.kind)).collect();
        assert_eq!(top, vec![
            ("mirror-0", VdevKind::Mirror),
            ("mirror-1", VdevKind::Mirror),
            ("sdc",      VdevKind::Cache),
            ("sdd",      VdevKind::Spare),
        ]);
        assert_eq!(tank.vdevs[0].children.len(), 2);
        assert_eq!(tank.vdevs[0].children[1].id, "tank/mirror-0/sdb");
        assert_eq!(tank.vdevs[0].children[1].cksum_errors, 2);
        assert_eq!(tank.vdevs[1].id, "tank/logs/mirror-1");
        assert_eq!(tank.vdevs[1].children[0].kind, VdevKind::Log);
        assert_eq!(tank.vdevs[3].state, Health::Avail);
    }

    #[test]
    fn status_reads_suffixed_counters_and_trailing_notes() {
        let mut w = Vec::new();
        let map = parse_status(STATUS, &mut w);
        let backup = &map["backup"];
        assert_eq!(backup.state, Health::Degraded);
        assert_eq!(backup.scan, "scrubbing…");
        let raidz = &backup.vdevs[0];
        assert_eq!(raidz.kind, VdevKind::RaidZ2);
        let sdf = &raidz.children[1];
        assert_eq!(sdf.state, Health::Faulted);
        assert_eq!(sdf.read_errors, 1_200);
        assert_eq!(sdf.write_errors, 3);
    }

    #[test]
    fn in_use_spare_note_is_not_read_as_counters() {
        let mut w = Vec::new();
        let text = STATUS.replace("sdd       AVAIL", "sdd       INUSE     currently in use");
        let map = parse_status(&text, &mut w);
        assert!(w.is_empty(), "{w:?}");
        let sdd = &map["tank"].vdevs[3];
        assert_eq!(sdd.state, Health::InUse);
        assert_eq!((sdd.read_errors, sdd.write_errors, sdd.cksum_errors), (0, 0, 0));
    }

    #[test]
    fn status_rejects_level_jumps_and_cycles() {
        let text = "  pool: tank
config:

\tNAME        STATE     READ WRITE CKSUM
\ttank        ONLINE       0     0     0
\t      sdz   ONLINE       0     0     0
\t  mirror-0  ONLINE       0     0     0
\t    mirror-0 ONLINE      0     0     0
\t    sda     ONLINE       0     0     0
";
        let mut w = Vec::new();
        let map = parse_status(text, &mut w);
        assert_eq!(w.len(), 2);
        assert!(w[0].reason.contains("skips a level"));
        assert!(w[1].reason.contains("cycle"));
        let tank = &map["tank"];
        assert_eq!(tank.vdevs.len(), 1);
        assert_eq!(tank.vdevs[0].children.len(), 1);
        assert_eq!(tank.vdevs[0].children[0].label, "sda");
    }

    #[test]
    fn iostat_keys_match_status_ids() {
        let mut w = Vec::new();
        let stats = parse_iostat(IOSTAT, &mut w);
        assert!(w.is_empty(), "{w:?}");
        assert_eq!(stats["tank"].write_ops, 30);
        assert_eq!(stats["tank/mirror-0/sda"].read_bytes, 2048);
        assert_eq!(stats["tank/logs/mirror-1"].write_ops, 5);
        assert_eq!(stats["tank/logs/mirror-1/nvme1n1"].write_bytes, 256);
        assert_eq!(stats["tank/cache/sdc"].read_ops, 1);

        let mut status = parse_status(STATUS, &mut w);
        let tank = status.get_mut("tank").unwrap();
        apply_iostat(&mut tank.vdevs, &stats);
        assert_eq!(tank.vdevs[0].children[0].io.write_ops, 15);
        assert_eq!(tank.vdevs[1].io.write_bytes, 512);
    }

    #[test]
    fn scan_lines() {
        assert_eq!(parse_scan_line("none requested"), "no scrub");
        assert_eq!(parse_scan_line("scrub in progress since Sun, 66.7% done"), "scrubbing 66.7%");
        assert_eq!(
            parse_scan_line("scrub canceled on Mon Jan  5 10:00:00 2026"),
            "canceled (Jan 5 2026)",
        );
        assert_eq!(
            parse_scan_line("resilver in progress since Sun Feb  9 00:24:00 2026"),
            "resilvering…",
        );
    }

    #[test]
    fn classify_by_label_and_section() {
        assert_eq!(classify("raidz1-0", None), VdevKind::RaidZ1);
        assert_eq!(classify("raidz3-1", None), VdevKind::RaidZ3);
        assert_eq!(classify("draid2:4d:8c:1s-0", None), VdevKind::RaidZ2);
        assert_eq!(classify("spare-2", None), VdevKind::Spare);
        assert_eq!(classify("sda", Some("logs")), VdevKind::Log);
        assert_eq!(classify("sda", None), VdevKind::Disk);
    }
}
