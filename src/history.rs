//! Bounded per-device IOPS history feeding the sparklines.

use crate::collectors::Collection;
use crate::models::pool::IoStats;
use crate::util::ring_buffer::RingBuffer;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_CAPACITY: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySample {
    pub at:        DateTime<Utc>,
    pub read_ops:  u64,
    pub write_ops: u64,
}

impl HistorySample {
    pub fn from_io(at: DateTime<Utc>, io: &IoStats) -> Self {
        Self { at, read_ops: io.read_ops, write_ops: io.write_ops }
    }
}

/// Series keyed by pool name (pool aggregate) or vdev id.
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    series:   HashMap<String, RingBuffer<HistorySample>>,
}

impl Default for History {
    fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), series: HashMap::new() }
    }

    /// Append a sample. Returns `false` (and keeps nothing) when its
    /// timestamp is not after the newest sample already held for `id`.
    pub fn record(&mut self, id: &str, sample: HistorySample) -> bool {
        let cap = self.capacity;
        let ring = self.series
            .entry(id.to_string())
            .or_insert_with(|| RingBuffer::new(cap));
        if ring.newest().is_some_and(|last| sample.at <= last.at) {
            return false;
        }
        ring.push(sample);
        true
    }

    /// Oldest-first samples; empty for unknown ids.
    pub fn series(&self, id: &str) -> Vec<HistorySample> {
        self.series.get(id).map(|r| r.to_vec()).unwrap_or_default()
    }

    /// Drop series whose id is not in `live`.
    pub fn retain_ids(&mut self, live: &HashSet<String>) {
        self.series.retain(|id, _| live.contains(id));
    }

    /// Record every pool and vdev of a successful collection and prune the rest.
    /// Without measured I/O nothing is recorded, but live series are kept.
    pub fn record_collection(&mut self, c: &Collection) {
        let mut live = HashSet::new();
        for pool in &c.pools {
            if c.io_measured {
                self.record(&pool.name, HistorySample::from_io(c.collected_at, &pool.io));
            }
            live.insert(pool.name.clone());
            for (_, v) in pool.vdev_rows() {
                if c.io_measured {
                    self.record(&v.id, HistorySample::from_io(c.collected_at, &v.io));
                }
                live.insert(v.id.clone());
            }
        }
        // Incomplete pools keep their old vdevs on screen; keep their series too.
        let kept: Vec<String> = self.series.keys()
            .filter(|id| c.incomplete.iter().any(|p| id.as_str() == p.as_str() || id.starts_with(&format!("{p}/"))))
            .cloned()
            .collect();
        live.extend(kept);
        self.retain_ids(&live);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.series.len() }
}
