use super::adjacency::{self, SiteAdjacency};
use crate::core::models::ids::SiteId;
use crate::core::models::site::{ActiveSite, SiteTypes};
use slotmap::SlotMap;

/// The active sites of one surface together with their adjacency graph.
///
/// A catalog is built once and only read afterwards. Packing sessions refer to sites by
/// [`SiteId`] and keep their own per-site state, so one catalog can back any number of
/// concurrent sessions.
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    sites: SlotMap<SiteId, ActiveSite>,
    order: Vec<SiteId>,
    adjacency: SiteAdjacency,
}

impl SiteCatalog {
    /// Stores `sites` in the given order and connects them with
    /// [`adjacency::build`] using `adjacency_threshold`.
    pub fn new(sites: Vec<ActiveSite>, adjacency_threshold: f64) -> Self {
        let mut arena = SlotMap::with_capacity_and_key(sites.len());
        let order: Vec<SiteId> = sites.into_iter().map(|s| arena.insert(s)).collect();
        let adjacency = adjacency::build(&arena, &order, adjacency_threshold);
        Self {
            sites: arena,
            order,
            adjacency,
        }
    }

    pub fn site(&self, id: SiteId) -> Option<&ActiveSite> {
        self.sites.get(id)
    }

    pub fn contains(&self, id: SiteId) -> bool {
        self.sites.contains_key(id)
    }

    /// Site handles in generation order.
    pub fn ids(&self) -> &[SiteId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &ActiveSite)> {
        self.order
            .iter()
            .filter_map(|&id| self.sites.get(id).map(|site| (id, site)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn adjacency(&self) -> &SiteAdjacency {
        &self.adjacency
    }

    /// Sites whose type passes `types`, in generation order.
    pub fn sites_of_type(&self, types: SiteTypes) -> Vec<SiteId> {
        self.iter()
            .filter(|(_, site)| types.matches(site.site_type()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Graph neighbors of `site` whose type passes `types`.
    pub fn neighbors_of(&self, site: SiteId, types: SiteTypes) -> Vec<SiteId> {
        self.adjacency
            .neighbors(site)
            .iter()
            .copied()
            .filter(|&id| {
                self.sites
                    .get(id)
                    .is_some_and(|s| types.matches(s.site_type()))
            })
            .collect()
    }
}
