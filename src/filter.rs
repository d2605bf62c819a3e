//! Pool and dataset filtering applied between collection and rendering.

use crate::models::dataset::Dataset;
use crate::models::pool::Pool;
use regex::Regex;

/// Pools that survived filtering, each with its dataset tree pruned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    pub pools: Vec<Pool>,
}

/// Startup filters, validated once.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub pool:    Option<String>,
    pub dataset: Option<Regex>,
}

impl Filters {
    pub fn apply(&self, pools: &[Pool]) -> FilteredView {
        apply(pools, self.pool.as_deref(), self.dataset.as_ref())
    }
}

/// Keep the pool named exactly `pool` (all pools when `None`), then keep
/// each dataset whose full path matches `dataset` or that has a matching
/// descendant.
pub fn apply(pools: &[Pool], pool: Option<&str>, dataset: Option<&Regex>) -> FilteredView {
    let pools = pools.iter()
        .filter(|p| pool.map_or(true, |want| p.name == want))
        .map(|p| {
            let mut p = p.clone();
            if let Some(re) = dataset {
                p.datasets = prune(&p.datasets, &|d: &Dataset| re.is_match(&d.name));
            }
            p
        })
        .collect();
    FilteredView { pools }
}

/// Case-insensitive substring search over dataset paths, same retention
/// rule as [`apply`]. An empty query returns the view unchanged.
pub fn search(view: &FilteredView, query: &str) -> FilteredView {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return view.clone();
    }
    let pools = view.pools.iter()
        .map(|p| {
            let mut p = p.clone();
            p.datasets = prune(&p.datasets, &|d: &Dataset| d.name.to_lowercase().contains(&needle));
            p
        })
        .collect();
    FilteredView { pools }
}

fn prune(datasets: &[Dataset], keep: &dyn Fn(&Dataset) -> bool) -> Vec<Dataset> {
    datasets.iter()
        .filter_map(|d| {
            let children = prune(&d.children, keep);
            if children.is_empty() && !keep(d) {
                return None;
            }
            Some(Dataset { children, ..d.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::fixtures;
    use pretty_assertions::assert_eq;

    fn names(view: &FilteredView) -> Vec<String> {
        fn walk(d: &Dataset, out: &mut Vec<String>) {
            out.push(d.name.clone());
            d.children.iter().for_each(|c| walk(c, out));
        }
        let mut out = Vec::new();
        for p in &view.pools {
            p.datasets.iter().for_each(|d| walk(d, &mut out));
        }
        out
    }

    #[test]
    fn dataset_regex_keeps_ancestors_of_matches() {
        let c = fixtures::collection();
        let re = Regex::new("^tank/home").unwrap();
        let view = apply(&c.pools, None, Some(&re));
        assert_eq!(names(&view), vec!["tank", "tank/home", "tank/home/bob"]);
        assert_eq!(view.pools.len(), 2, "pools are not dropped by the dataset filter");
    }

    #[test]
    fn pool_filter_is_exact() {
        let c = fixtures::collection();
        let view = apply(&c.pools, Some("tank"), None);
        assert_eq!(view.pools.len(), 1);
        assert_eq!(view.pools[0].name, "tank");
        assert!(apply(&c.pools, Some("tan"), None).pools.is_empty());
    }

    #[test]
    fn no_filters_is_identity() {
        let c = fixtures::collection();
        assert_eq!(apply(&c.pools, None, None).pools, c.pools);
    }

    #[test]
    fn search_is_case_insensitive() {
        let c = fixtures::collection();
        let view = apply(&c.pools, None, None);
        assert_eq!(names(&search(&view, "BOB")), vec!["tank", "tank/home", "tank/home/bob"]);
        assert_eq!(names(&search(&view, "vm")), vec!["backup", "backup/vm"]);
        assert_eq!(search(&view, "  "), view);
        assert!(names(&search(&view, "zzz")).is_empty());
    }
}
