use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Filesystem,
    Volume,
}

impl DatasetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "filesystem" => Some(Self::Filesystem),
            "volume"     => Some(Self::Volume),
            _            => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Volume     => "volume",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub dataset:     String,
    pub name:        String,
    pub created:     Option<DateTime<Utc>>,
    pub used_bytes:  u64,
    pub refer_bytes: u64,
}

impl Snapshot {
    pub fn full_name(&self) -> String { format!("{}@{}", self.dataset, self.name) }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub name:        String,   // full path, e.g. "tank/home"
    pub kind:        DatasetKind,
    pub used_bytes:  u64,
    pub avail_bytes: u64,
    pub refer_bytes: u64,
    pub mountpoint:  Option<String>,   // None for volumes and "-" / "none"
    pub compression: String,
    pub children:    Vec<Dataset>,
    pub snapshots:   Vec<Snapshot>,
}

impl Dataset {
    /// Last path component ("bob" for "tank/home/bob").
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Pool this dataset lives in (first path component).
    pub fn pool_name(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }

    /// Number of datasets in this subtree, self included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }

    #[cfg(test)]
    pub fn find(&self, name: &str) -> Option<&Dataset> {
        if self.name == name { return Some(self); }
        if !name.starts_with(&self.name) { return None; }
        self.children.iter().find_map(|c| c.find(name))
    }
}
