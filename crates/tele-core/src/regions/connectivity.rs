//! Directed graph of the strongest links between regions.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::RegionLabel;
use crate::grid::PointId;

/// A weighted link between two grid points, directed from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from: PointId,
    pub to: PointId,
    /// Teleconnectivity at `from`; never negative.
    pub weight: f32,
}

impl Link {
    pub fn new(from: PointId, to: PointId, weight: f32) -> Self {
        Self { from, to, weight }
    }
}

/// Best link per ordered `(region_from, region_to)` pair.
///
/// Entries are never removed; a pair's stored weight only grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionConnectivity {
    links: BTreeMap<(RegionLabel, RegionLabel), Link>,
}

impl RegionConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `link` for `(from, to)` unless a link at least as heavy is
    /// already stored. Returns true if `link` was stored.
    pub fn suggest_link(&mut self, from: RegionLabel, to: RegionLabel, link: Link) -> bool {
        match self.links.get(&(from, to)) {
            Some(old) if old.weight >= link.weight => false,
            _ => {
                self.links.insert((from, to), link);
                true
            }
        }
    }

    pub fn get_link(&self, from: RegionLabel, to: RegionLabel) -> Option<&Link> {
        self.links.get(&(from, to))
    }

    /// All stored links, ordered by `(from, to)` region pair.
    pub fn links(&self) -> Vec<Link> {
        self.links.values().copied().collect()
    }

    /// Stored links with their region pairs, ordered by pair.
    pub fn iter(&self) -> impl Iterator<Item = (RegionLabel, RegionLabel, &Link)> {
        self.links.iter().map(|(&(a, b), link)| (a, b, link))
    }

    /// All stored links, heaviest first; equal weights keep pair order.
    pub fn links_by_weight(&self) -> Vec<Link> {
        let mut links = self.links();
        links.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Regions reachable from `region` through links in either direction,
    /// `region` included.
    pub fn component(&self, region: RegionLabel) -> BTreeSet<RegionLabel> {
        let mut component = BTreeSet::from([region]);
        let mut frontier = vec![region];
        while let Some(r) = frontier.pop() {
            for &(a, b) in self.links.keys() {
                let other = if a == r {
                    b
                } else if b == r {
                    a
                } else {
                    continue;
                };
                if component.insert(other) {
                    frontier.push(other);
                }
            }
        }
        component
    }
}

impl fmt::Display for RegionConnectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ((from, to), link)) in self.links.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{from} -> {to}: point {} to point {}, teleconnectivity is {}",
                link.from, link.to, link.weight
            )?;
        }
        Ok(())
    }
}
