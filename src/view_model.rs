//! Pure mapping from filtered pool state to what the terminal draws.
//!
//! [`build`] has no side effects: identical inputs give an identical
//! [`ViewModel`]. Formatting of numbers and ages is left to the widgets.

use crate::filter::{self, FilteredView};
use crate::history::History;
use crate::models::dataset::{Dataset, DatasetKind};
use crate::models::pool::{Health, IoStats, Pool, VdevKind};
use crate::util::human::fmt_pct;
use chrono::{DateTime, Utc};

/// Consecutive failed cycles after which the banner turns critical.
pub const CRITICAL_AFTER: u32 = 3;

/// Title of the aggregate tab shown first when more than one pool is visible.
pub const ALL_TAB: &str = "All";

/// UI cursor state the model is built against. Out-of-range values are clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub tab:         usize,
    pub dataset:     usize,
    pub vdev_scroll: usize,
    pub search:      String,
}

/// Scheduler bookkeeping shown in the header and status line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStatus {
    pub cycle:                u64,
    pub last_success:         Option<DateTime<Utc>>,
    pub error:                Option<String>,
    pub consecutive_failures: u32,
    pub warnings:             Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewModel {
    pub tabs:        Vec<PoolTab>,
    pub active:      usize,
    pub header:      Header,
    pub status:      StatusLine,
    pub diagnostics: Vec<String>,
}

impl ViewModel {
    pub fn active_tab(&self) -> Option<&PoolTab> { self.tabs.get(self.active) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub pool_count:    usize,
    pub dataset_count: usize,
    pub worst:         Health,
}

impl Default for Header {
    fn default() -> Self { Self { pool_count: 0, dataset_count: 0, worst: Health::Unknown } }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub cycle:         u64,
    pub last_success:  Option<DateTime<Utc>>,
    pub banner:        Option<Banner>,
    pub warning_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text:     String,
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolTab {
    pub name:         String,
    /// The "All" tab: every visible pool summed into one.
    pub aggregate:    bool,
    pub health:       Health,
    pub capacity:     Capacity,
    pub scan:         String,
    pub altroot:      Option<String>,
    pub io:           IoStats,
    pub read_series:  Vec<u64>,
    pub write_series: Vec<u64>,
    pub vdevs:        Vec<VdevRow>,
    pub vdev_scroll:  usize,
    pub datasets:     Vec<DatasetRow>,
    pub selected:     Option<usize>,
    pub detail:       Option<DatasetDetail>,
    pub snapshots:    Vec<SnapshotRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capacity {
    pub ratio:       f64,   // 0.0..=1.0
    pub label:       String,
    pub alloc_bytes: u64,
    pub size_bytes:  u64,
    pub free_bytes:  u64,
    pub frag_pct:    Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VdevRow {
    pub depth:        usize,
    pub id:           String,
    pub label:        String,
    pub kind:         VdevKind,
    pub state:        Health,
    pub read_errors:  u64,
    pub write_errors: u64,
    pub cksum_errors: u64,
    pub io:           IoStats,
    pub read_series:  Vec<u64>,
    pub write_series: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub depth:          usize,
    pub name:           String,
    pub short_name:     String,
    pub kind:           DatasetKind,
    pub used_bytes:     u64,
    pub avail_bytes:    u64,
    pub snapshot_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDetail {
    pub name:        String,
    pub kind:        DatasetKind,
    pub used_bytes:  u64,
    pub avail_bytes: u64,
    pub refer_bytes: u64,
    pub mountpoint:  Option<String>,
    pub compression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub name:        String,
    pub created:     Option<DateTime<Utc>>,
    pub used_bytes:  u64,
    pub refer_bytes: u64,
}

// ── Build ─────────────────────────────────────────────────────────────

pub fn build(view: &FilteredView, history: &History, sel: &Selection, status: &CycleStatus) -> ViewModel {
    let searched = filter::search(view, &sel.search);
    let mut tabs: Vec<PoolTab> = Vec::with_capacity(searched.pools.len() + 1);
    if searched.pools.len() > 1 {
        let mut all = pool_tab(&aggregate(&searched.pools), history, sel);
        all.aggregate = true;
        (all.read_series, all.write_series) = summed_series(history, &searched.pools);
        tabs.push(all);
    }
    tabs.extend(searched.pools.iter().map(|p| pool_tab(p, history, sel)));
    let active = sel.tab.min(tabs.len().saturating_sub(1));

    let header = Header {
        pool_count:    view.pools.len(),
        dataset_count: view.pools.iter().map(|p| p.dataset_count()).sum(),
        worst:         worst_health(&view.pools),
    };

    let banner = status.error.as_ref().map(|e| Banner {
        text:     if status.consecutive_failures > 1 {
            format!("{e} ({} consecutive failures)", status.consecutive_failures)
        } else {
            e.clone()
        },
        critical: status.consecutive_failures >= CRITICAL_AFTER,
    });

    ViewModel {
        tabs,
        active,
        header,
        status: StatusLine {
            cycle:         status.cycle,
            last_success:  status.last_success,
            banner,
            warning_count: status.warnings.len(),
        },
        diagnostics: status.warnings.clone(),
    }
}

fn pool_tab(pool: &Pool, history: &History, sel: &Selection) -> PoolTab {
    let (read_series, write_series) = series(history, &pool.name);

    let vdevs: Vec<VdevRow> = pool.vdev_rows().into_iter()
        .map(|(depth, v)| {
            let (read_series, write_series) = series(history, &v.id);
            VdevRow {
                depth,
                id:           v.id.clone(),
                label:        v.label.clone(),
                kind:         v.kind,
                state:        v.state,
                read_errors:  v.read_errors,
                write_errors: v.write_errors,
                cksum_errors: v.cksum_errors,
                io:           v.io,
                read_series,
                write_series,
            }
        })
        .collect();

    let mut flat: Vec<(usize, &Dataset)> = Vec::new();
    for root in &pool.datasets {
        flatten(root, 0, &mut flat);
    }
    let selected = if flat.is_empty() { None } else { Some(sel.dataset.min(flat.len() - 1)) };
    let current = selected.and_then(|i| flat.get(i)).map(|(_, d)| *d);

    let datasets = flat.iter()
        .map(|(depth, d)| DatasetRow {
            depth:          *depth,
            name:           d.name.clone(),
            short_name:     d.short_name().to_string(),
            kind:           d.kind,
            used_bytes:     d.used_bytes,
            avail_bytes:    d.avail_bytes,
            snapshot_count: d.snapshots.len(),
        })
        .collect();

    let detail = current.map(|d| DatasetDetail {
        name:        d.name.clone(),
        kind:        d.kind,
        used_bytes:  d.used_bytes,
        avail_bytes: d.avail_bytes,
        refer_bytes: d.refer_bytes,
        mountpoint:  d.mountpoint.clone(),
        compression: d.compression.clone(),
    });

    // Newest first.
    let mut snapshots: Vec<SnapshotRow> = current
        .map(|d| d.snapshots.iter().map(|s| SnapshotRow {
            name:        s.name.clone(),
            created:     s.created,
            used_bytes:  s.used_bytes,
            refer_bytes: s.refer_bytes,
        }).collect())
        .unwrap_or_default();
    snapshots.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.name.cmp(&b.name)));

    let ratio = (pool.use_pct() / 100.0).clamp(0.0, 1.0);

    PoolTab {
        name:     pool.name.clone(),
        aggregate: false,
        health:   pool.health,
        capacity: Capacity {
            ratio,
            label:       fmt_pct(ratio * 100.0),
            alloc_bytes: pool.alloc_bytes,
            size_bytes:  pool.size_bytes,
            free_bytes:  pool.free_bytes,
            frag_pct:    pool.frag_pct,
        },
        scan:        pool.scan.clone(),
        altroot:     pool.altroot.clone(),
        io:          pool.io,
        read_series,
        write_series,
        vdev_scroll: sel.vdev_scroll.min(vdevs.len().saturating_sub(1)),
        vdevs,
        datasets,
        selected,
        detail,
        snapshots,
    }
}

fn series(history: &History, id: &str) -> (Vec<u64>, Vec<u64>) {
    history.series(id).iter().map(|s| (s.read_ops, s.write_ops)).unzip()
}

/// One pool standing for all of `pools`: summed space and I/O, worst health,
/// every vdev and dataset root. Top-level vdev labels carry their pool name.
fn aggregate(pools: &[Pool]) -> Pool {
    let mut io = IoStats::default();
    for p in pools {
        io.read_ops    += p.io.read_ops;
        io.write_ops   += p.io.write_ops;
        io.read_bytes  += p.io.read_bytes;
        io.write_bytes += p.io.write_bytes;
    }
    let vdevs = pools.iter()
        .flat_map(|p| p.vdevs.iter().map(move |v| {
            let mut v = v.clone();
            v.label = format!("{}/{}", p.name, v.label);
            v
        }))
        .collect();

    Pool {
        name:        ALL_TAB.to_string(),
        size_bytes:  pools.iter().map(|p| p.size_bytes).sum(),
        alloc_bytes: pools.iter().map(|p| p.alloc_bytes).sum(),
        free_bytes:  pools.iter().map(|p| p.free_bytes).sum(),
        frag_pct:    None,
        cap_pct:     None,
        health:      worst_health(pools),
        altroot:     None,
        scan:        pools.iter().map(|p| format!("{}: {}", p.name, p.scan)).collect::<Vec<_>>().join("  "),
        io,
        vdevs,
        datasets:    pools.iter().flat_map(|p| p.datasets.iter().cloned()).collect(),
    }
}

/// Per-pool series summed sample by sample, aligned on the newest.
fn summed_series(history: &History, pools: &[Pool]) -> (Vec<u64>, Vec<u64>) {
    let all: Vec<(Vec<u64>, Vec<u64>)> = pools.iter().map(|p| series(history, &p.name)).collect();
    let len = all.iter().map(|(r, _)| r.len()).max().unwrap_or(0);
    let mut reads  = vec![0; len];
    let mut writes = vec![0; len];
    for (r, w) in &all {
        let off = len - r.len();
        for (i, (rv, wv)) in r.iter().zip(w).enumerate() {
            reads[off + i]  += rv;
            writes[off + i] += wv;
        }
    }
    (reads, writes)
}

fn worst_health(pools: &[Pool]) -> Health {
    pools.iter()
        .map(|p| p.health)
        .max_by_key(|h| h.severity())
        .unwrap_or(Health::Unknown)
}

fn flatten<'a>(d: &'a Dataset, depth: usize, out: &mut Vec<(usize, &'a Dataset)>) {
    out.push((depth, d));
    for c in &d.children {
        flatten(c, depth + 1, out);
    }
}
