use super::collision;
use super::config::PackingConfig;
use super::conformation::{AtomSource, Conformation, ConformationAtom};
use super::error::PackingError;
use super::status::SiteStatus;
use crate::core::models::adsorbate::Adsorbate;
use crate::core::models::ids::{AdsorbateId, SiteId};
use crate::core::models::site::SiteTypes;
use crate::core::models::substrate::Substrate;
use crate::core::sites::catalog::SiteCatalog;
use itertools::Itertools;
use nalgebra::Point3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, instrument, trace, warn};

/// One entry of the occupation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupation {
    pub site: SiteId,
    pub adsorbate: AdsorbateId,
}

/// A packing session: assigns adsorbates to the sites of a shared [`SiteCatalog`].
///
/// The session owns its adsorbates, the status of every site, the occupation ledger, and
/// its random source. The substrate and catalog are only borrowed, so many sessions can
/// run side by side over the same surface.
///
/// Invariants maintained by every public operation:
/// - an adsorbate is placed if and only if it appears in the ledger;
/// - a site is `Occupied` exactly by the adsorbate the ledger pairs it with;
/// - each placed adsorbate contributes one hindering cause to every graph neighbor;
/// - no two placed adsorbates have atoms closer than the collision threshold.
pub struct AdsorbatePacker<'a> {
    substrate: &'a Substrate,
    catalog: &'a SiteCatalog,
    adsorbates: SlotMap<AdsorbateId, Adsorbate>,
    order: Vec<AdsorbateId>,
    status: SecondaryMap<SiteId, SiteStatus>,
    ledger: Vec<Occupation>,
    placed_positions: SecondaryMap<AdsorbateId, Vec<Point3<f64>>>,
    config: PackingConfig,
    rng: StdRng,
}

impl<'a> AdsorbatePacker<'a> {
    /// Starts a session with every site available and every adsorbate free.
    ///
    /// Adsorbates keep their input order, which is the order random packing fills them in.
    pub fn new(
        substrate: &'a Substrate,
        catalog: &'a SiteCatalog,
        adsorbates: Vec<Adsorbate>,
        config: PackingConfig,
    ) -> Self {
        let mut arena = SlotMap::with_capacity_and_key(adsorbates.len());
        let order = adsorbates
            .into_iter()
            .map(|mut adsorbate| {
                adsorbate.detach();
                arena.insert(adsorbate)
            })
            .collect();
        let status = catalog
            .ids()
            .iter()
            .map(|&id| (id, SiteStatus::Available))
            .collect();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            substrate,
            catalog,
            adsorbates: arena,
            order,
            status,
            ledger: Vec::new(),
            placed_positions: SecondaryMap::new(),
            config,
            rng,
        }
    }

    pub fn substrate(&self) -> &'a Substrate {
        self.substrate
    }

    pub fn catalog(&self) -> &'a SiteCatalog {
        self.catalog
    }

    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// Replaces the session's random source with one seeded from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Adsorbate handles in input order.
    pub fn adsorbate_ids(&self) -> &[AdsorbateId] {
        &self.order
    }

    pub fn adsorbate(&self, id: AdsorbateId) -> Option<&Adsorbate> {
        self.adsorbates.get(id)
    }

    pub fn status(&self, site: SiteId) -> Option<&SiteStatus> {
        self.status.get(site)
    }

    /// The occupation ledger, oldest placement first.
    pub fn occupations(&self) -> &[Occupation] {
        &self.ledger
    }

    /// Attaches `adsorbate` to `site` unless it would collide with a placed adsorbate.
    ///
    /// On success the site becomes `Occupied`, every graph neighbor records `site` as a
    /// hindering cause, and the pair is appended to the ledger.
    ///
    /// # Errors
    ///
    /// - [`PackingError::Collision`] if any atom would come closer than the collision
    ///   threshold to an atom of another placed adsorbate. Nothing is changed.
    /// - A precondition error if the site or adsorbate is unknown, the adsorbate is already
    ///   placed, the site is not `Available`, or the site type does not match.
    #[instrument(level = "trace", skip(self))]
    pub fn place(&mut self, adsorbate: AdsorbateId, site: SiteId) -> Result<(), PackingError> {
        let catalog = self.catalog;
        let active_site = catalog.site(site).ok_or(PackingError::UnknownSite(site))?;
        let candidate = self
            .adsorbates
            .get(adsorbate)
            .ok_or(PackingError::UnknownAdsorbate(adsorbate))?;
        if let Some(current) = self.site_below_ads(adsorbate) {
            return Err(PackingError::AlreadyPlaced {
                adsorbate,
                site: current,
            });
        }
        if !self.status.get(site).is_some_and(SiteStatus::is_available) {
            return Err(PackingError::SiteUnavailable(site));
        }
        if candidate.site_type() != active_site.site_type() {
            return Err(PackingError::TypeMismatch {
                adsorbate,
                site,
                required: candidate.site_type(),
                found: active_site.site_type(),
            });
        }

        let mut trial = candidate.clone();
        trial.place_on(active_site);
        let positions = trial.absolute_positions().unwrap_or_default();
        if let Some((other, distance)) = self.first_collision(adsorbate, &positions) {
            trace!(?other, distance, "Placement collides.");
            return Err(PackingError::Collision {
                site,
                other,
                distance,
            });
        }

        if let Some(status) = self.status.get_mut(site) {
            status.occupy(adsorbate)?;
        }
        for &neighbor in catalog.adjacency().neighbors(site) {
            if let Some(status) = self.status.get_mut(neighbor) {
                status.hinder(site);
            }
        }
        if let Some(slot) = self.adsorbates.get_mut(adsorbate) {
            *slot = trial;
        }
        self.placed_positions.insert(adsorbate, positions);
        self.ledger.push(Occupation { site, adsorbate });
        Ok(())
    }

    /// Detaches a placed adsorbate and returns the site it occupied.
    ///
    /// The site becomes `Available` and its hindering contribution is withdrawn from every
    /// neighbor; a neighbor returns to `Available` once no cause is left.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, adsorbate: AdsorbateId) -> Result<SiteId, PackingError> {
        if !self.adsorbates.contains_key(adsorbate) {
            return Err(PackingError::UnknownAdsorbate(adsorbate));
        }
        let index = self
            .ledger
            .iter()
            .position(|o| o.adsorbate == adsorbate)
            .ok_or(PackingError::NotPlaced(adsorbate))?;
        let site = self.ledger[index].site;

        self.status
            .get_mut(site)
            .ok_or(PackingError::UnknownSite(site))?
            .release()?;
        for &neighbor in self.catalog.adjacency().neighbors(site) {
            if let Some(status) = self.status.get_mut(neighbor) {
                status.unhinder(site)?;
            }
        }

        self.ledger.remove(index);
        self.placed_positions.remove(adsorbate);
        if let Some(slot) = self.adsorbates.get_mut(adsorbate) {
            slot.detach();
        }
        Ok(site)
    }

    /// Removes the most recent placement. Returns `None` when nothing is placed.
    pub fn undo(&mut self) -> Result<Option<Occupation>, PackingError> {
        let Some(&last) = self.ledger.last() else {
            return Ok(None);
        };
        self.remove(last.adsorbate)?;
        Ok(Some(last))
    }

    /// Removes every adsorbate in reverse placement order.
    ///
    /// Afterwards the ledger is empty, every site is `Available`, and every adsorbate is
    /// free.
    #[instrument(level = "debug", skip_all)]
    pub fn reset(&mut self) {
        while let Some(&last) = self.ledger.last() {
            if let Err(e) = self.remove(last.adsorbate) {
                warn!(error = %e, "Inconsistent occupation ledger, dropping entry.");
                self.ledger.pop();
            }
        }
        for status in self.status.values_mut() {
            *status = SiteStatus::Available;
        }
        for adsorbate in self.adsorbates.values_mut() {
            adsorbate.detach();
        }
        self.placed_positions.clear();
    }

    /// Resets, then places every adsorbate in input order on a uniformly random available
    /// site of its type, resampling after collisions.
    ///
    /// # Errors
    ///
    /// Returns [`PackingError::Infeasible`] if an adsorbate finds no available site of its
    /// type, or is not placed within `max_placement_attempts` samples. The session is reset
    /// before any error is returned.
    #[instrument(level = "debug", skip_all)]
    pub fn random_packing(&mut self) -> Result<(), PackingError> {
        self.reset();
        let order = self.order.clone();
        for id in order {
            if let Err(e) = self.pack_one(id) {
                self.reset();
                return Err(e);
            }
        }
        debug!(placed = self.ledger.len(), "Random packing complete.");
        Ok(())
    }

    fn pack_one(&mut self, id: AdsorbateId) -> Result<(), PackingError> {
        let adsorbate = self
            .adsorbates
            .get(id)
            .ok_or(PackingError::UnknownAdsorbate(id))?;
        let name = adsorbate.name().to_string();
        let types = SiteTypes::only(adsorbate.site_type());
        let max_attempts = self.config.max_placement_attempts;

        for attempt in 1..=max_attempts {
            let candidates = self.available_sites(types);
            let Some(&site) = candidates.choose(&mut self.rng) else {
                warn!(adsorbate = %name, "No available site of the required type.");
                return Err(PackingError::Infeasible {
                    name,
                    attempts: attempt - 1,
                });
            };
            match self.place(id, site) {
                Ok(()) => {
                    trace!(adsorbate = %name, attempt, "Placed adsorbate.");
                    return Ok(());
                }
                Err(PackingError::Collision { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        warn!(
            adsorbate = %name,
            attempts = max_attempts,
            "Placement attempts exhausted."
        );
        Err(PackingError::Infeasible {
            name,
            attempts: max_attempts,
        })
    }

    /// Distorts every placed adsorbate once, undoing each distortion that collides with
    /// another placed adsorbate. Returns how many distortions were kept.
    #[instrument(level = "debug", skip_all)]
    pub fn randomize_conformation(&mut self) -> Result<usize, PackingError> {
        let placed: Vec<AdsorbateId> = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.placed_positions.contains_key(id))
            .collect();

        let mut kept = 0;
        for id in placed {
            let Some(adsorbate) = self.adsorbates.get_mut(id) else {
                continue;
            };
            if !adsorbate.distort(&mut self.rng)? {
                continue;
            }
            let positions = adsorbate.absolute_positions().unwrap_or_default();

            if let Some((other, distance)) = self.first_collision(id, &positions) {
                trace!(?id, ?other, distance, "Distortion collides, undoing.");
                if let Some(adsorbate) = self.adsorbates.get_mut(id) {
                    if let Err(e) = adsorbate.undistort() {
                        debug!(error = %e, "Undo skipped.");
                    }
                }
            } else {
                kept += 1;
            }
            self.refresh_positions(id);
        }
        Ok(kept)
    }

    fn refresh_positions(&mut self, id: AdsorbateId) {
        let Some(adsorbate) = self.adsorbates.get_mut(id) else {
            return;
        };
        if adsorbate.take_geometry_changed() {
            if let Some(positions) = adsorbate.absolute_positions() {
                self.placed_positions.insert(id, positions);
            }
        }
    }

    /// The first placed adsorbate other than `moving` with an atom too close to
    /// `positions`, and the offending distance.
    fn first_collision(
        &self,
        moving: AdsorbateId,
        positions: &[Point3<f64>],
    ) -> Option<(AdsorbateId, f64)> {
        let threshold = self.config.collision_threshold;
        self.ledger
            .iter()
            .filter(|o| o.adsorbate != moving)
            .find_map(|o| {
                let other = self.placed_positions.get(o.adsorbate)?;
                collision::collision_distance(positions, other, threshold)
                    .map(|d| (o.adsorbate, d))
            })
    }

    /// Whether any two placed adsorbates collide. Always `false` for a consistent session.
    pub fn has_collision(&self) -> bool {
        let threshold = self.config.collision_threshold;
        self.ledger
            .iter()
            .filter_map(|o| self.placed_positions.get(o.adsorbate))
            .tuple_combinations()
            .any(|(a, b)| collision::collides(a, b, threshold))
    }

    /// Every substrate atom, then the atoms of each placed adsorbate in input order.
    pub fn conformation(&self) -> Conformation {
        let mut atoms: Vec<ConformationAtom> = self
            .substrate
            .atoms_iter()
            .map(|(id, atom)| ConformationAtom {
                element: atom.element.clone(),
                position: atom.position,
                source: AtomSource::Substrate(id),
            })
            .collect();
        for &id in &self.order {
            if let Ok(mut adsorbate_atoms) = self.adsorbate_conformation(id) {
                atoms.append(&mut adsorbate_atoms);
            }
        }
        Conformation { atoms }
    }

    /// Lab-frame atoms of one adsorbate.
    pub fn adsorbate_conformation(
        &self,
        id: AdsorbateId,
    ) -> Result<Vec<ConformationAtom>, PackingError> {
        let adsorbate = self
            .adsorbates
            .get(id)
            .ok_or(PackingError::UnknownAdsorbate(id))?;
        let positions = adsorbate
            .absolute_positions()
            .ok_or(PackingError::FreeAdsorbate(id))?;
        Ok(adsorbate
            .elements()
            .iter()
            .zip(positions)
            .map(|(element, position)| ConformationAtom {
                element: element.clone(),
                position,
                source: AtomSource::Adsorbate(id),
            })
            .collect())
    }

    pub fn neighbors_of(&self, site: SiteId, types: SiteTypes) -> Vec<SiteId> {
        self.catalog.neighbors_of(site, types)
    }

    pub fn ads_above_site(&self, site: SiteId) -> Option<AdsorbateId> {
        self.status.get(site).and_then(SiteStatus::occupant)
    }

    pub fn site_below_ads(&self, adsorbate: AdsorbateId) -> Option<SiteId> {
        self.ledger
            .iter()
            .find(|o| o.adsorbate == adsorbate)
            .map(|o| o.site)
    }

    pub fn sites_of_type(&self, types: SiteTypes) -> Vec<SiteId> {
        self.catalog.sites_of_type(types)
    }

    /// Available sites whose type passes `types`, in catalog order.
    pub fn available_sites(&self, types: SiteTypes) -> Vec<SiteId> {
        self.catalog
            .iter()
            .filter(|(id, site)| {
                types.matches(site.site_type())
                    && self.status.get(*id).is_some_and(SiteStatus::is_available)
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn occupied_sites(&self) -> Vec<SiteId> {
        self.ledger.iter().map(|o| o.site).collect()
    }

    pub fn placed_adsorbates(&self) -> Vec<AdsorbateId> {
        self.ledger.iter().map(|o| o.adsorbate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distortion::{DistortionOp, Distortor};
    use crate::core::models::atom::Atom;
    use crate::core::models::site::SiteType;
    use crate::core::sites::face::{self, FaceOptions};
    use crate::core::sites::test_surfaces::close_packed;
    use crate::core::sites::vertex;
    use nalgebra::Vector3;
    use std::f64::consts::TAU;

    const SPACING: f64 = 2.5;

    /// `n` atoms along `x`, bonded in sequence.
    fn line(n: usize) -> Substrate {
        let mut substrate = Substrate::new();
        let ids: Vec<_> = (0..n)
            .map(|i| substrate.add_atom(Atom::new("Cu", Point3::new(i as f64 * SPACING, 0.0, 0.0))))
            .collect();
        for pair in ids.windows(2) {
            substrate.add_bond(pair[0], pair[1]).unwrap();
        }
        substrate
    }

    fn vertex_catalog(substrate: &Substrate, threshold: f64) -> SiteCatalog {
        let layer = substrate.surface_layer(0.1).unwrap();
        SiteCatalog::new(vertex::generate(&layer, 1.0).unwrap(), threshold)
    }

    fn carbon_monoxide() -> Adsorbate {
        Adsorbate::new(
            "CO",
            SiteType::Vertex,
            vec!["C".to_string(), "O".to_string()],
            vec![Vector3::zeros(), Vector3::new(0.0, 0.0, 1.15)],
        )
        .unwrap()
    }

    /// A flat adsorbate whose second atom reaches one lattice spacing along local `x`.
    fn arm() -> Adsorbate {
        Adsorbate::new(
            "arm",
            SiteType::Vertex,
            vec!["C".to_string(), "H".to_string()],
            vec![Vector3::zeros(), Vector3::new(SPACING, 0.0, 0.0)],
        )
        .unwrap()
    }

    fn hydrogen() -> Adsorbate {
        Adsorbate::new(
            "H",
            SiteType::Face,
            vec!["H".to_string()],
            vec![Vector3::zeros()],
        )
        .unwrap()
    }

    fn seeded(seed: u64) -> PackingConfig {
        PackingConfig {
            seed: Some(seed),
            ..PackingConfig::default()
        }
    }

    fn statuses(packer: &AdsorbatePacker) -> Vec<SiteStatus> {
        packer
            .catalog()
            .ids()
            .iter()
            .map(|&id| packer.status(id).cloned().unwrap())
            .collect()
    }

    #[test]
    fn place_occupies_site_and_hinders_neighbors() {
        let substrate = line(3);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer =
            AdsorbatePacker::new(&substrate, &catalog, vec![carbon_monoxide()], seeded(1));
        let co = packer.adsorbate_ids()[0];
        let s = catalog.ids().to_vec();

        packer.place(co, s[1]).unwrap();

        assert_eq!(packer.status(s[1]), Some(&SiteStatus::Occupied(co)));
        assert_eq!(packer.status(s[0]), Some(&SiteStatus::Hindered(vec![s[1]])));
        assert_eq!(packer.status(s[2]), Some(&SiteStatus::Hindered(vec![s[1]])));
        assert_eq!(packer.occupations(), &[Occupation { site: s[1], adsorbate: co }]);
        assert_eq!(packer.ads_above_site(s[1]), Some(co));
        assert_eq!(packer.site_below_ads(co), Some(s[1]));
        assert!(!packer.adsorbate(co).unwrap().is_free());
        assert!(packer.available_sites(SiteTypes::any()).is_empty());
    }

    #[test]
    fn place_then_remove_restores_previous_state() {
        let substrate = line(5);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide()],
            seeded(1),
        );
        let (first, second) = (packer.adsorbate_ids()[0], packer.adsorbate_ids()[1]);
        let s = catalog.ids().to_vec();

        packer.place(first, s[0]).unwrap();
        let before = statuses(&packer);
        let first_atoms = packer.adsorbate_conformation(first).unwrap();

        packer.place(second, s[2]).unwrap();
        assert_eq!(packer.status(s[1]).unwrap().hindering_sites().len(), 2);
        assert_eq!(packer.remove(second), Ok(s[2]));

        assert_eq!(statuses(&packer), before);
        assert_eq!(packer.status(s[1]), Some(&SiteStatus::Hindered(vec![s[0]])));
        assert_eq!(packer.adsorbate_conformation(first).unwrap(), first_atoms);
        assert!(packer.adsorbate(second).unwrap().is_free());
        assert_eq!(packer.occupations().len(), 1);
    }

    #[test]
    fn placement_preconditions_are_enforced() {
        let substrate = line(3);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide(), hydrogen()],
            seeded(1),
        );
        let ids = packer.adsorbate_ids().to_vec();
        let s = catalog.ids().to_vec();

        assert_eq!(
            packer.place(ids[0], SiteId::default()),
            Err(PackingError::UnknownSite(SiteId::default()))
        );
        assert_eq!(
            packer.place(AdsorbateId::default(), s[0]),
            Err(PackingError::UnknownAdsorbate(AdsorbateId::default()))
        );
        assert!(matches!(
            packer.place(ids[2], s[0]),
            Err(PackingError::TypeMismatch {
                required: SiteType::Face,
                found: SiteType::Vertex,
                ..
            })
        ));
        assert_eq!(packer.remove(ids[0]), Err(PackingError::NotPlaced(ids[0])));

        packer.place(ids[0], s[0]).unwrap();
        assert_eq!(
            packer.place(ids[0], s[2]),
            Err(PackingError::AlreadyPlaced {
                adsorbate: ids[0],
                site: s[0]
            })
        );
        assert_eq!(
            packer.place(ids[1], s[0]),
            Err(PackingError::SiteUnavailable(s[0]))
        );
        assert_eq!(
            packer.place(ids[1], s[1]),
            Err(PackingError::SiteUnavailable(s[1]))
        );
        packer.place(ids[1], s[2]).unwrap();
    }

    #[test]
    fn colliding_placement_is_rolled_back() {
        let substrate = line(2);
        // A tiny threshold leaves the sites unconnected, so only geometry can block.
        let catalog = vertex_catalog(&substrate, 0.2);
        let mut packer = AdsorbatePacker::new(&substrate, &catalog, vec![arm(), arm()], seeded(1));
        let (a, b) = (packer.adsorbate_ids()[0], packer.adsorbate_ids()[1]);
        let s = catalog.ids().to_vec();

        packer.place(a, s[0]).unwrap();
        let before = statuses(&packer);
        let a_atoms = packer.adsorbate_conformation(a).unwrap();

        let result = packer.place(b, s[1]);
        match result {
            Err(PackingError::Collision {
                site,
                other,
                distance,
            }) => {
                assert_eq!(site, s[1]);
                assert_eq!(other, a);
                assert!(distance < 1e-9);
            }
            other => panic!("expected a collision, got {other:?}"),
        }

        assert!(packer.adsorbate(b).unwrap().is_free());
        assert_eq!(packer.adsorbate_conformation(a).unwrap(), a_atoms);
        assert_eq!(statuses(&packer), before);
        assert_eq!(packer.occupations().len(), 1);
        assert!(!packer.has_collision());
    }

    #[test]
    fn undo_pops_the_latest_placement() {
        let substrate = line(5);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide()],
            seeded(1),
        );
        let ids = packer.adsorbate_ids().to_vec();
        let s = catalog.ids().to_vec();

        assert_eq!(packer.undo(), Ok(None));
        packer.place(ids[0], s[0]).unwrap();
        packer.place(ids[1], s[4]).unwrap();

        assert_eq!(
            packer.undo(),
            Ok(Some(Occupation {
                site: s[4],
                adsorbate: ids[1]
            }))
        );
        assert_eq!(packer.placed_adsorbates(), vec![ids[0]]);
        assert_eq!(packer.occupied_sites(), vec![s[0]]);
    }

    #[test]
    fn random_packing_is_collision_free_and_reproducible() {
        let substrate = close_packed(4, 4, SPACING);
        let layer = substrate.surface_layer(0.1).unwrap();
        let mut sites = vertex::generate(&layer, 1.0).unwrap();
        sites.extend(face::generate(&layer, 1.0, &FaceOptions::default()).unwrap());
        let catalog = SiteCatalog::new(sites, SPACING);
        let adsorbates = vec![
            hydrogen(),
            carbon_monoxide(),
            carbon_monoxide(),
            carbon_monoxide(),
        ];

        let mut packer =
            AdsorbatePacker::new(&substrate, &catalog, adsorbates.clone(), seeded(11));
        packer.random_packing().unwrap();

        assert_eq!(packer.occupations().len(), 4);
        assert!(!packer.has_collision());
        for occupation in packer.occupations() {
            let site = catalog.site(occupation.site).unwrap();
            let adsorbate = packer.adsorbate(occupation.adsorbate).unwrap();
            assert_eq!(site.site_type(), adsorbate.site_type());
            assert_eq!(
                packer.status(occupation.site),
                Some(&SiteStatus::Occupied(occupation.adsorbate))
            );
            for neighbor in packer.neighbors_of(occupation.site, SiteTypes::any()) {
                assert!(!packer.status(neighbor).unwrap().is_available());
            }
        }

        let mut twin = AdsorbatePacker::new(&substrate, &catalog, adsorbates, seeded(11));
        twin.random_packing().unwrap();
        assert_eq!(twin.occupied_sites(), packer.occupied_sites());
    }

    #[test]
    fn reset_empties_ledger_and_frees_every_site() {
        let substrate = close_packed(4, 4, SPACING);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide()],
            seeded(3),
        );
        packer.random_packing().unwrap();
        packer.reset();

        assert!(packer.occupations().is_empty());
        assert!(statuses(&packer).iter().all(SiteStatus::is_available));
        for &id in packer.adsorbate_ids() {
            assert!(packer.adsorbate(id).unwrap().is_free());
        }
        assert_eq!(packer.conformation().len(), substrate.atom_count());
    }

    #[test]
    fn packing_without_a_free_site_is_infeasible_and_resets() {
        let substrate = line(2);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide()],
            seeded(5),
        );

        assert_eq!(
            packer.random_packing(),
            Err(PackingError::Infeasible {
                name: "CO".to_string(),
                attempts: 0
            })
        );
        assert!(packer.occupations().is_empty());
        assert!(statuses(&packer).iter().all(SiteStatus::is_available));
    }

    #[test]
    fn packing_stops_after_the_attempt_cap() {
        let substrate = line(2);
        let catalog = vertex_catalog(&substrate, 0.2);
        let config = PackingConfig {
            max_placement_attempts: 5,
            ..seeded(5)
        };
        let mut packer = AdsorbatePacker::new(&substrate, &catalog, vec![arm(), arm()], config);

        assert_eq!(
            packer.random_packing(),
            Err(PackingError::Infeasible {
                name: "arm".to_string(),
                attempts: 5
            })
        );
        assert!(packer.occupations().is_empty());
    }

    #[test]
    fn randomize_conformation_never_keeps_a_collision() {
        let substrate = line(2);
        let catalog = vertex_catalog(&substrate, 0.2);
        // Ten atoms on a circle of one lattice spacing, with the neighbor site mid-gap.
        let ring: Vec<Vector3<f64>> = std::iter::once(Vector3::zeros())
            .chain((0..10).map(|k| {
                let angle = TAU / 20.0 + k as f64 * TAU / 10.0;
                Vector3::new(SPACING * angle.cos(), SPACING * angle.sin(), 0.0)
            }))
            .collect();
        let wheel = Adsorbate::new("wheel", SiteType::Vertex, vec!["C".to_string(); 11], ring)
            .unwrap()
            .with_distortor(Distortor::new().with_op(DistortionOp::Spin {
                max_angle_deg: 180.0,
            }))
            .unwrap();
        let h = Adsorbate::new("H", SiteType::Vertex, vec!["H".to_string()], vec![Vector3::zeros()])
            .unwrap();

        let mut packer = AdsorbatePacker::new(&substrate, &catalog, vec![wheel, h], seeded(17));
        let ids = packer.adsorbate_ids().to_vec();
        let s = catalog.ids().to_vec();
        packer.place(ids[0], s[0]).unwrap();
        packer.place(ids[1], s[1]).unwrap();

        let rounds = 50;
        let mut kept = 0;
        for _ in 0..rounds {
            let n = packer.randomize_conformation().unwrap();
            assert!(n <= 1);
            kept += n;
            assert!(!packer.has_collision());
        }
        // Most spins bring a wheel atom onto the neighbor and must be undone.
        assert!(kept < rounds);
    }

    #[test]
    fn conformation_lists_substrate_then_placed_adsorbates() {
        let substrate = line(3);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut packer = AdsorbatePacker::new(
            &substrate,
            &catalog,
            vec![carbon_monoxide(), carbon_monoxide()],
            seeded(1),
        );
        let ids = packer.adsorbate_ids().to_vec();
        let s = catalog.ids().to_vec();
        packer.place(ids[0], s[0]).unwrap();

        let conformation = packer.conformation();
        assert_eq!(conformation.len(), 3 + 2);
        assert_eq!(conformation.adsorbate_atom_count(), 2);
        assert!(matches!(conformation.atoms[0].source, AtomSource::Substrate(_)));
        assert_eq!(conformation.atoms[3].source, AtomSource::Adsorbate(ids[0]));
        assert_eq!(conformation.atoms[3].position, Point3::new(0.0, 0.0, 1.0));
        assert!((conformation.atoms[4].position - Point3::new(0.0, 0.0, 2.15)).norm() < 1e-12);

        assert_eq!(
            packer.adsorbate_conformation(ids[1]),
            Err(PackingError::FreeAdsorbate(ids[1]))
        );
    }

    #[test]
    fn sessions_over_one_catalog_are_independent() {
        let substrate = line(3);
        let catalog = vertex_catalog(&substrate, SPACING);
        let mut first =
            AdsorbatePacker::new(&substrate, &catalog, vec![carbon_monoxide()], seeded(1));
        let second =
            AdsorbatePacker::new(&substrate, &catalog, vec![carbon_monoxide()], seeded(2));

        let id = first.adsorbate_ids()[0];
        first.place(id, catalog.ids()[1]).unwrap();

        assert_eq!(second.available_sites(SiteTypes::any()).len(), 3);
        assert!(second.occupations().is_empty());
    }
}
