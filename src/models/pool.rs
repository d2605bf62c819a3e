use serde::Serialize;

// ── Health ───────────────────────────────────────────────────────────

/// Pool or vdev state as printed by `zpool list` / `zpool status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Online,
    Degraded,
    Faulted,
    Offline,
    Unavail,
    Removed,
    /// Hot spare waiting in the `spares` section.
    Avail,
    /// Hot spare currently standing in for a failed disk.
    InUse,
    Unknown,
}

impl Health {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONLINE"   => Self::Online,
            "DEGRADED" => Self::Degraded,
            "FAULTED"  => Self::Faulted,
            "OFFLINE"  => Self::Offline,
            "UNAVAIL"  => Self::Unavail,
            "REMOVED"  => Self::Removed,
            "AVAIL"    => Self::Avail,
            "INUSE"    => Self::InUse,
            _          => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Online   => "ONLINE",
            Self::Degraded => "DEGRADED",
            Self::Faulted  => "FAULTED",
            Self::Offline  => "OFFLINE",
            Self::Unavail  => "UNAVAIL",
            Self::Removed  => "REMOVED",
            Self::Avail    => "AVAIL",
            Self::InUse    => "INUSE",
            Self::Unknown  => "UNKNOWN",
        }
    }

    /// Ordering used to pick the "worst" state across pools: higher is worse.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Online | Self::Avail | Self::InUse => 0,
            Self::Unknown                            => 1,
            Self::Degraded | Self::Offline           => 2,
            Self::Removed                            => 3,
            Self::Faulted | Self::Unavail            => 4,
        }
    }
}

// ── VDEV ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VdevKind {
    Mirror,
    RaidZ1,
    RaidZ2,
    RaidZ3,
    Disk,
    Spare,
    Cache,
    Log,
}

impl VdevKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mirror => "mirror",
            Self::RaidZ1 => "raidz1",
            Self::RaidZ2 => "raidz2",
            Self::RaidZ3 => "raidz3",
            Self::Disk   => "disk",
            Self::Spare  => "spare",
            Self::Cache  => "cache",
            Self::Log    => "log",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Mirror | Self::RaidZ1 | Self::RaidZ2 | Self::RaidZ3)
    }
}

/// I/O figures from one `zpool iostat` report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IoStats {
    pub read_ops:    u64,
    pub write_ops:   u64,
    pub read_bytes:  u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vdev {
    /// Stable identity: `pool[/section]/ancestors…/label`.
    pub id:           String,
    pub label:        String,
    pub kind:         VdevKind,
    pub state:        Health,
    pub read_errors:  u64,
    pub write_errors: u64,
    pub cksum_errors: u64,
    pub io:           IoStats,
    pub children:     Vec<Vdev>,
}

impl Vdev {
    /// Depth-first walk yielding `(depth, vdev)`, parents before children.
    pub fn walk(&self) -> Vec<(usize, &Vdev)> {
        let mut out = Vec::new();
        walk_into(self, 0, &mut out);
        out
    }
}

fn walk_into<'a>(v: &'a Vdev, depth: usize, out: &mut Vec<(usize, &'a Vdev)>) {
    out.push((depth, v));
    for c in &v.children {
        walk_into(c, depth + 1, out);
    }
}

// ── Pool ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pool {
    pub name:        String,
    pub size_bytes:  u64,
    pub alloc_bytes: u64,
    pub free_bytes:  u64,
    pub frag_pct:    Option<u8>,   // "-" for pools without spacemap histograms
    pub cap_pct:     Option<u8>,
    pub health:      Health,
    pub altroot:     Option<String>,
    pub scan:        String,       // e.g. "ok (Feb 9 2026)", "scrubbing 66.7%", "no scrub"
    pub io:          IoStats,
    pub vdevs:       Vec<Vdev>,
    pub datasets:    Vec<super::dataset::Dataset>,
}

impl Pool {
    pub fn use_pct(&self) -> f64 {
        if self.size_bytes == 0 { return 0.0; }
        self.alloc_bytes as f64 / self.size_bytes as f64 * 100.0
    }

    /// All vdevs in display order with their nesting depth.
    pub fn vdev_rows(&self) -> Vec<(usize, &Vdev)> {
        self.vdevs.iter().flat_map(|v| v.walk()).collect()
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.iter().map(|d| d.subtree_len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(id: &str) -> Vdev {
        Vdev {
            id: id.into(), label: id.rsplit('/').next().unwrap_or(id).into(),
            kind: VdevKind::Disk, state: Health::Online,
            read_errors: 0, write_errors: 0, cksum_errors: 0,
            io: IoStats::default(), children: Vec::new(),
        }
    }

    #[test]
    fn health_parse_is_case_insensitive() {
        assert_eq!(Health::parse("online"), Health::Online);
        assert_eq!(Health::parse(" DEGRADED "), Health::Degraded);
        assert_eq!(Health::parse("wat"), Health::Unknown);
    }

    #[test]
    fn faulted_is_worse_than_degraded() {
        assert!(Health::Faulted.severity() > Health::Degraded.severity());
        assert!(Health::Degraded.severity() > Health::Online.severity());
    }

    #[test]
    fn walk_is_depth_first() {
        let mut mirror = disk("tank/mirror-0");
        mirror.kind = VdevKind::Mirror;
        mirror.children = vec![disk("tank/mirror-0/sda"), disk("tank/mirror-0/sdb")];
        let rows: Vec<(usize, &str)> = mirror.walk().into_iter()
            .map(|(d, v)| (d, v.label.as_str()))
            .collect();
        assert_eq!(rows, vec![(0, "mirror-0"), (1, "sda"), (1, "sdb")]);
    }
}
