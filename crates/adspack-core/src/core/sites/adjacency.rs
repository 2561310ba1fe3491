use crate::core::models::ids::SiteId;
use crate::core::models::site::{ActiveSite, SiteType, SiteTypes};
use itertools::Itertools;
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, instrument};

/// Origins closer than this are treated as the same anchor and never connected.
pub const MIN_SEPARATION: f64 = 0.1;
/// Upper band for Vertex–Vertex pairs, as a multiple of the adjacency threshold.
pub const VERTEX_PAIR_SCALE: f64 = 1.01;
/// Extra factor on the Vertex–Vertex band for any pair involving an Edge or Face site.
pub const MIXED_PAIR_SCALE: f64 = 0.75;

/// Undirected neighbor graph between active sites.
#[derive(Debug, Clone, Default)]
pub struct SiteAdjacency {
    neighbors: SecondaryMap<SiteId, Vec<SiteId>>,
    site_types: SecondaryMap<SiteId, SiteType>,
    edge_count: usize,
}

impl SiteAdjacency {
    /// Neighbors of `site` in catalog order; empty for unknown sites.
    pub fn neighbors(&self, site: SiteId) -> &[SiteId] {
        self.neighbors.get(site).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_edge(&self, a: SiteId, b: SiteId) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Every edge whose endpoints both pass `types`, each reported once.
    pub fn edges_among(&self, types: SiteTypes) -> Vec<(SiteId, SiteId)> {
        let passes = |id: SiteId| {
            self.site_types
                .get(id)
                .is_some_and(|&site_type| types.matches(site_type))
        };
        let mut edges = Vec::new();
        for (a, list) in &self.neighbors {
            if !passes(a) {
                continue;
            }
            for &b in list {
                if a < b && passes(b) {
                    edges.push((a, b));
                }
            }
        }
        edges
    }

    fn add_edge(&mut self, a: SiteId, b: SiteId) {
        if let Some(list) = self.neighbors.get_mut(a) {
            list.push(b);
        }
        if let Some(list) = self.neighbors.get_mut(b) {
            list.push(a);
        }
        self.edge_count += 1;
    }
}

/// The upper distance bound for connecting two sites of the given types.
pub fn upper_bound(a: SiteType, b: SiteType, threshold: f64) -> f64 {
    let vertex_band = threshold * VERTEX_PAIR_SCALE;
    if a == SiteType::Vertex && b == SiteType::Vertex {
        vertex_band
    } else {
        vertex_band * MIXED_PAIR_SCALE
    }
}

/// Connects every pair of sites whose origins are strictly between [`MIN_SEPARATION`] and
/// the type-dependent [`upper_bound`].
#[instrument(skip_all, name = "site_adjacency", fields(threshold = threshold))]
pub fn build(sites: &SlotMap<SiteId, ActiveSite>, order: &[SiteId], threshold: f64) -> SiteAdjacency {
    let mut adjacency = SiteAdjacency::default();
    for &id in order {
        if let Some(site) = sites.get(id) {
            adjacency.neighbors.insert(id, Vec::new());
            adjacency.site_types.insert(id, site.site_type());
        }
    }

    for (&a, &b) in order.iter().tuple_combinations() {
        let (Some(site_a), Some(site_b)) = (sites.get(a), sites.get(b)) else {
            continue;
        };
        let distance = (site_a.origin() - site_b.origin()).norm();
        let upper = upper_bound(site_a.site_type(), site_b.site_type(), threshold);
        if MIN_SEPARATION < distance && distance < upper {
            adjacency.add_edge(a, b);
        }
    }

    debug!(
        nodes = adjacency.node_count(),
        edges = adjacency.edge_count(),
        "Built site adjacency."
    );
    adjacency
}
