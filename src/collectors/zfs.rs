//! Parsers for `zfs list` (datasets and snapshots) and the dataset tree.

use super::ParseWarning;
use crate::models::dataset::{Dataset, DatasetKind, Snapshot};
use chrono::DateTime;
use std::collections::HashMap;

pub const LIST_ARGS: &[&str] = &[
    "list", "-Hp", "-t", "filesystem,volume",
    "-o", "name,type,used,avail,refer,mountpoint,compression",
];
pub const SNAPSHOT_ARGS: &[&str] = &["list", "-Hp", "-t", "snapshot", "-o", "name,creation,used,refer"];

const SRC_LIST: &str = "zfs list";
const SRC_SNAP: &str = "zfs list -t snapshot";

/// Parse `zfs list -Hp -o name,type,used,avail,refer,mountpoint,compression`
/// into a flat list in input order.
pub fn parse_datasets(text: &str, warnings: &mut Vec<ParseWarning>) -> Vec<Dataset> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() < 7 {
            warnings.push(ParseWarning::new(SRC_LIST, i + 1, line, "expected 7 tab-separated fields"));
            continue;
        }
        let Some(kind) = DatasetKind::parse(f[1]) else {
            warnings.push(ParseWarning::new(SRC_LIST, i + 1, line, "unknown dataset type"));
            continue;
        };
        let (Ok(used), Ok(avail), Ok(refer)) = (f[2].parse(), f[3].parse(), f[4].parse()) else {
            warnings.push(ParseWarning::new(SRC_LIST, i + 1, line, "space columns are not numeric"));
            continue;
        };
        let mountpoint = match f[5].trim() {
            "-" | "none" | "" => None,
            m                 => Some(m.to_string()),
        };
        out.push(Dataset {
            name:        f[0].to_string(),
            kind,
            used_bytes:  used,
            avail_bytes: avail,
            refer_bytes: refer,
            mountpoint,
            compression: f[6].trim().to_string(),
            children:    Vec::new(),
            snapshots:   Vec::new(),
        });
    }
    out
}

/// Parse `zfs list -Hp -t snapshot -o name,creation,used,refer`.
pub fn parse_snapshots(text: &str, warnings: &mut Vec<ParseWarning>) -> Vec<Snapshot> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() < 4 {
            warnings.push(ParseWarning::new(SRC_SNAP, i + 1, line, "expected 4 tab-separated fields"));
            continue;
        }
        let Some((dataset, name)) = f[0].split_once('@') else {
            warnings.push(ParseWarning::new(SRC_SNAP, i + 1, line, "snapshot name has no '@'"));
            continue;
        };
        let (Ok(used), Ok(refer)) = (f[2].parse(), f[3].parse()) else {
            warnings.push(ParseWarning::new(SRC_SNAP, i + 1, line, "space columns are not numeric"));
            continue;
        };
        let created = f[1].trim().parse::<i64>().ok().and_then(|s| DateTime::from_timestamp(s, 0));
        out.push(Snapshot {
            dataset:     dataset.to_string(),
            name:        name.to_string(),
            created,
            used_bytes:  used,
            refer_bytes: refer,
        });
    }
    out
}

/// Attach snapshots to their datasets (flat list). Snapshots of unlisted
/// datasets are reported and dropped.
pub fn attach_snapshots(datasets: &mut [Dataset], snapshots: Vec<Snapshot>, warnings: &mut Vec<ParseWarning>) {
    let index: HashMap<String, usize> = datasets.iter().enumerate()
        .map(|(i, d)| (d.name.clone(), i))
        .collect();
    for snap in snapshots {
        match index.get(&snap.dataset) {
            Some(&i) => datasets[i].snapshots.push(snap),
            None => warnings.push(ParseWarning::new(
                SRC_SNAP, 0, &snap.full_name(), "snapshot of a dataset that was not listed",
            )),
        }
    }
}

/// Organise a flat dataset list into trees by path.
///
/// Parents are resolved through an index arena, so ownership is strictly
/// acyclic: a parent name is always a proper prefix of the child's. A dataset
/// whose parent is not listed becomes a root; duplicate names are dropped.
/// Children keep input order.
pub fn build_tree(flat: Vec<Dataset>, warnings: &mut Vec<ParseWarning>) -> Vec<Dataset> {
    let mut nodes: Vec<Option<Dataset>> = Vec::with_capacity(flat.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for ds in flat {
        if index.contains_key(&ds.name) {
            warnings.push(ParseWarning::new(SRC_LIST, 0, &ds.name, "duplicate dataset name"));
            continue;
        }
        index.insert(ds.name.clone(), nodes.len());
        nodes.push(Some(ds));
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let Some(ds) = node else { continue };
        match ds.name.rsplit_once('/') {
            Some((parent, _)) => match index.get(parent) {
                Some(&p) => children[p].push(i),
                None => {
                    warnings.push(ParseWarning::new(
                        SRC_LIST, 0, &ds.name, "parent dataset not listed; shown as a root",
                    ));
                    roots.push(i);
                }
            },
            None => roots.push(i),
        }
    }

    fn take(i: usize, nodes: &mut [Option<Dataset>], children: &[Vec<usize>]) -> Option<Dataset> {
        let mut ds = nodes[i].take()?;
        ds.children = children[i].iter().filter_map(|&c| take(c, nodes, children)).collect();
        Some(ds)
    }

    roots.into_iter().filter_map(|r| take(r, &mut nodes, &children)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIST: &str = "\
tank\tfilesystem\t5497558138880\t5497558138880\t107374182400\t/tank\toff\n\
tank/home\tfilesystem\t4398046511104\t1099511627776\t4398046511104\t/tank/home\tlz4\n\
tank/home/bob\tfilesystem\t1024\t1099511627776\t1024\t/tank/home/bob\tlz4\n\
tank/vm\tvolume\t21474836480\t1099511627776\t8192\t-\tlz4\n\
tank/var\tfilesystem\t2048\t1099511627776\t2048\tnone\toff\n";

    const SNAPS: &str = "\
tank/home@daily-1\t1738944000\t1073741824\t4398046511104\n\
tank/home@daily-2\t1739030400\t2147483648\t4398046511104\n";

    fn names(ds: &[Dataset]) -> Vec<String> {
        fn walk(d: &Dataset, out: &mut Vec<String>) {
            out.push(d.name.clone());
            d.children.iter().for_each(|c| walk(c, out));
        }
        let mut out = Vec::new();
        ds.iter().for_each(|d| walk(d, &mut out));
        out
    }

    #[test]
    fn datasets_parse_kinds_and_mountpoints() {
        let mut w = Vec::new();
        let flat = parse_datasets(LIST, &mut w);
        assert!(w.is_empty());
        assert_eq!(flat.len(), 5);
        assert_eq!(flat[1].compression, "lz4");
        assert_eq!(flat[3].kind, DatasetKind::Volume);
        assert_eq!(flat[3].mountpoint, None);
        assert_eq!(flat[4].mountpoint, None);
        assert_eq!(flat[0].mountpoint.as_deref(), Some("/tank"));
    }

    #[test]
    fn tree_follows_paths() {
        let mut w = Vec::new();
        let roots = build_tree(parse_datasets(LIST, &mut w), &mut w);
        assert!(w.is_empty());
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 3);
        assert_eq!(roots[0].children[0].children[0].name, "tank/home/bob");
        assert_eq!(names(&roots), vec!["tank", "tank/home", "tank/home/bob", "tank/vm", "tank/var"]);
    }

    #[test]
    fn orphan_becomes_root_and_duplicates_drop() {
        let text = "tank/a/b\tfilesystem\t1\t1\t1\t-\toff\ntank\tfilesystem\t1\t1\t1\t-\toff\ntank\tfilesystem\t1\t1\t1\t-\toff\n";
        let mut w = Vec::new();
        let roots = build_tree(parse_datasets(text, &mut w), &mut w);
        assert_eq!(names(&roots), vec!["tank/a/b", "tank"]);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn snapshots_attach_to_datasets() {
        let mut w = Vec::new();
        let mut flat = parse_datasets(LIST, &mut w);
        let snaps = parse_snapshots(SNAPS, &mut w);
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].name, "daily-1");
        assert_eq!(snaps[0].created.map(|t| t.timestamp()), Some(1_738_944_000));
        attach_snapshots(&mut flat, snaps, &mut w);
        assert!(w.is_empty());
        assert_eq!(flat[1].snapshots.len(), 2);
        assert_eq!(flat[1].snapshots[1].used_bytes, 2_147_483_648);
    }

    #[test]
    fn malformed_lines_are_skipped_with_warnings() {
        let text = "tank\tfilesystem\t1\t1\t1\t/tank\toff\ngarbage\nx\tbogus\t1\t1\t1\t-\toff\n";
        let mut w = Vec::new();
        let flat = parse_datasets(text, &mut w);
        assert_eq!(flat.len(), 1);
        assert_eq!(w.iter().map(|w| w.line_no).collect::<Vec<_>>(), vec![2, 3]);

        let snaps = parse_snapshots("nosnap\t1\t1\t1\ntank@s\tnever\t1\t1\n", &mut w);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].created, None);
    }
}
