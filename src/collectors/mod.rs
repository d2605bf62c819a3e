pub mod command;
pub mod zfs;
pub mod zpool;

use crate::models::dataset::Dataset;
use crate::models::pool::{Health, Pool};
use chrono::{DateTime, Utc};
use command::{display_command, CancelToken, CommandRunner};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("`{tool}` not found in PATH")]
    ToolUnavailable { tool: String },

    #[error("`{command}` failed ({}): {stderr}", exit_label(.code))]
    CommandFailed { command: String, code: Option<i32>, stderr: String },

    #[error("`{command}`: {source}")]
    Io { command: String, #[source] source: std::io::Error },

    #[error("collection cancelled")]
    Cancelled,

    #[error("collector thread exited without a result")]
    WorkerLost,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit {c}"),
        None    => "killed by signal".to_string(),
    }
}

/// A line of tool output that could not be used. Never fails the poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub source:  &'static str,
    pub line_no: usize,   // 1-based; 0 when the problem is not tied to one line
    pub line:    String,
    pub reason:  String,
}

impl ParseWarning {
    pub fn new(source: &'static str, line_no: usize, line: &str, reason: &str) -> Self {
        Self { source, line_no, line: line.trim().to_string(), reason: reason.to_string() }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line_no > 0 {
            write!(f, "{}:{}: {} ({})", self.source, self.line_no, self.reason, self.line)
        } else {
            write!(f, "{}: {} ({})", self.source, self.reason, self.line)
        }
    }
}

// ── Collection ────────────────────────────────────────────────────────

/// Result of one poll cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub pools:        Vec<Pool>,
    pub warnings:     Vec<ParseWarning>,
    /// Pools that one of the tools reported but another did not.
    pub incomplete:   Vec<String>,
    /// False when `zpool iostat` gave nothing; `io` fields are then zero, not measured.
    pub io_measured:  bool,
    pub collected_at: DateTime<Utc>,
}

pub trait Collector: Send + Sync {
    fn collect(&self, cancel: &CancelToken) -> Result<Collection, CollectError>;
}

/// Raw stdout of every command in one cycle.
#[derive(Debug, Default, Clone)]
pub struct RawOutputs {
    pub list:      String,
    pub status:    String,
    /// `None` when `zpool iostat` failed; the cycle continues without I/O figures.
    pub iostat:    Option<String>,
    pub datasets:  String,
    pub snapshots: String,
}

/// Collects by shelling out to `zpool` and `zfs` through a [`CommandRunner`].
pub struct ZfsCollector<R> {
    runner: R,
    zpool:  String,
    zfs:    String,
}

impl<R: CommandRunner> ZfsCollector<R> {
    pub fn new(runner: R, zpool: impl Into<String>, zfs: impl Into<String>) -> Self {
        Self { runner, zpool: zpool.into(), zfs: zfs.into() }
    }

    fn gather(&self, cancel: &CancelToken) -> Result<RawOutputs, CollectError> {
        let list   = self.runner.run(&self.zpool, zpool::LIST_ARGS, cancel)?;
        let status = self.runner.run(&self.zpool, zpool::STATUS_ARGS, cancel)?;
        let iostat = match self.runner.run(&self.zpool, zpool::IOSTAT_ARGS, cancel) {
            Ok(text) => Some(text),
            Err(e @ CollectError::CommandFailed { .. }) => {
                warn!(error = %e, "iostat failed; continuing without I/O figures");
                None
            }
            Err(e) => return Err(e),
        };
        let datasets  = self.runner.run(&self.zfs, zfs::LIST_ARGS, cancel)?;
        let snapshots = self.runner.run(&self.zfs, zfs::SNAPSHOT_ARGS, cancel)?;
        Ok(RawOutputs { list, status, iostat, datasets, snapshots })
    }
}

impl<R: CommandRunner> Collector for ZfsCollector<R> {
    fn collect(&self, cancel: &CancelToken) -> Result<Collection, CollectError> {
        let raw = self.gather(cancel)?;
        let mut out = assemble(&raw, Utc::now());
        if raw.iostat.is_none() {
            out.warnings.push(ParseWarning::new(
                "zpool iostat", 0, &display_command(&self.zpool, zpool::IOSTAT_ARGS), "command failed; I/O figures omitted",
            ));
        }
        debug!(pools = out.pools.len(), warnings = out.warnings.len(), "collection assembled");
        Ok(out)
    }
}

/// Turn one cycle's raw output into a consistent set of pools.
///
/// A pool missing from `zpool status`, or one that `zpool status` / `zfs list`
/// report but `zpool list` did not (a garbled line), is left out of `pools`
/// and named in `incomplete` so the caller can keep its previous version whole.
pub fn assemble(raw: &RawOutputs, now: DateTime<Utc>) -> Collection {
    let mut warnings = Vec::new();

    let listed     = zpool::parse_list(&raw.list, &mut warnings);
    let mut status = zpool::parse_status(&raw.status, &mut warnings);
    let io = raw.iostat.as_deref()
        .map(|t| zpool::parse_iostat(t, &mut warnings))
        .unwrap_or_default();

    let mut flat  = zfs::parse_datasets(&raw.datasets, &mut warnings);
    let snapshots = zfs::parse_snapshots(&raw.snapshots, &mut warnings);
    zfs::attach_snapshots(&mut flat, snapshots, &mut warnings);
    let roots = zfs::build_tree(flat, &mut warnings);

    let mut by_pool: HashMap<String, Vec<Dataset>> = HashMap::new();
    for root in roots {
        by_pool.entry(root.pool_name().to_string()).or_default().push(root);
    }

    let mut pools = Vec::with_capacity(listed.len());
    let mut incomplete = Vec::new();
    for mut pool in listed {
        let Some(st) = status.remove(&pool.name) else {
            warnings.push(ParseWarning::new("zpool status", 0, &pool.name, "pool missing from status output"));
            incomplete.push(pool.name);
            continue;
        };
        if pool.health == Health::Unknown {
            pool.health = st.state;
        }
        pool.scan  = st.scan;
        pool.vdevs = st.vdevs;
        zpool::apply_iostat(&mut pool.vdevs, &io);
        if let Some(stats) = io.get(&pool.name) {
            pool.io = *stats;
        }
        pool.datasets = by_pool.remove(&pool.name).unwrap_or_default();
        pools.push(pool);
    }

    let mut unlisted: Vec<String> = status.into_keys()
        .chain(by_pool.into_keys())
        .filter(|name| !incomplete.contains(name))
        .collect();
    unlisted.sort();
    unlisted.dedup();
    for pool in unlisted {
        warnings.push(ParseWarning::new("zpool list", 0, &pool, "pool reported by status or zfs list but not by zpool list"));
        incomplete.push(pool);
    }

    Collection { pools, warnings, incomplete, io_measured: raw.iostat.is_some(), collected_at: now }
}
