use super::atom::Atom;
use super::ids::AtomId;
use itertools::Itertools;
use nalgebra::{Point3, Unit, Vector3};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_SURFACE_TOLERANCE: f64 = 0.1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubstrateError {
    #[error("Atom {0:?} does not exist in the substrate")]
    AtomNotFound(AtomId),
    #[error("Cannot bond atom {0:?} to itself")]
    SelfBond(AtomId),
    #[error("Positive direction must have a non-zero length")]
    ZeroPositiveDirection,
    #[error("Substrate contains no atoms")]
    Empty,
    #[error("Bond cutoff must be a positive finite number, got {0}")]
    InvalidCutoff(f64),
}

/// Read access to the topmost layer of a surface.
///
/// The site-generation stages depend only on this trait, so any atom store that can
/// report positions, layer connectivity, and an outward direction can be analysed.
pub trait Surface {
    /// The surface atoms in a stable order. Site generation follows this order.
    fn atoms(&self) -> &[AtomId];

    /// The Cartesian position of a surface atom, or `None` if it is not part of the surface.
    fn position(&self, atom: AtomId) -> Option<Point3<f64>>;

    /// The surface atoms bonded to `atom`. Unknown atoms have no neighbors.
    fn neighbors(&self, atom: AtomId) -> &[AtomId];

    /// The outward ("positive") direction of the surface.
    fn positive_direction(&self) -> Unit<Vector3<f64>>;

    /// Every surface bond exactly once, ordered by the position of its first atom in
    /// [`Surface::atoms`]. The first atom of each pair precedes the second.
    fn bonds(&self) -> Vec<(AtomId, AtomId)> {
        let rank: HashMap<AtomId, usize> = self
            .atoms()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut bonds = Vec::new();
        for (i, &atom) in self.atoms().iter().enumerate() {
            for &neighbor in self.neighbors(atom) {
                if rank.get(&neighbor).is_some_and(|&j| j > i) {
                    bonds.push((atom, neighbor));
                }
            }
        }
        bonds
    }
}

/// The three lattice vectors of the periodic cell, in Angstroms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub a: Vector3<f64>,
    pub b: Vector3<f64>,
    pub c: Vector3<f64>,
}

impl Default for Lattice {
    fn default() -> Self {
        Self {
            a: Vector3::x(),
            b: Vector3::y(),
            c: Vector3::z(),
        }
    }
}

/// A periodic slab: atoms, their bond graph, the lattice, and the outward direction.
///
/// This is the default surface provider. Sites are never derived from the whole slab,
/// only from the layer returned by [`Substrate::surface_layer`].
#[derive(Debug, Clone)]
pub struct Substrate {
    atoms: SlotMap<AtomId, Atom>,
    /// Insertion order of atoms, used for deterministic iteration and output.
    order: Vec<AtomId>,
    bonds: Vec<(AtomId, AtomId)>,
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
    lattice: Lattice,
    positive_direction: Unit<Vector3<f64>>,
}

impl Default for Substrate {
    fn default() -> Self {
        Self {
            atoms: SlotMap::with_key(),
            order: Vec::new(),
            bonds: Vec::new(),
            bond_adjacency: SecondaryMap::new(),
            lattice: Lattice::default(),
            positive_direction: Vector3::z_axis(),
        }
    }
}

impl Substrate {
    /// Creates an empty substrate with a unit lattice and `+z` as the positive direction.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lattice(lattice: Lattice) -> Self {
        Self {
            lattice,
            ..Self::default()
        }
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn positive_direction(&self) -> Unit<Vector3<f64>> {
        self.positive_direction
    }

    /// Sets the outward direction of the surface. The vector is normalized.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::ZeroPositiveDirection`] for a (near) zero vector.
    pub fn set_positive_direction(&mut self, direction: Vector3<f64>) -> Result<(), SubstrateError> {
        self.positive_direction = Unit::try_new(direction, f64::EPSILON)
            .ok_or(SubstrateError::ZeroPositiveDirection)?;
        Ok(())
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Iterates over atoms in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.order.iter().map(move |&id| (id, &self.atoms[id]))
    }

    pub fn atom_count(&self) -> usize {
        self.order.len()
    }

    pub fn bonds(&self) -> &[(AtomId, AtomId)] {
        &self.bonds
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let id = self.atoms.insert(atom);
        self.order.push(id);
        self.bond_adjacency.insert(id, Vec::new());
        id
    }

    /// Adds an undirected bond. Adding a bond that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either atom is unknown or both ids are the same atom.
    pub fn add_bond(&mut self, first: AtomId, second: AtomId) -> Result<(), SubstrateError> {
        if !self.atoms.contains_key(first) {
            return Err(SubstrateError::AtomNotFound(first));
        }
        if !self.atoms.contains_key(second) {
            return Err(SubstrateError::AtomNotFound(second));
        }
        if first == second {
            return Err(SubstrateError::SelfBond(first));
        }
        if self.bond_adjacency[first].contains(&second) {
            return Ok(());
        }

        self.bonds.push((first, second));
        self.bond_adjacency[first].push(second);
        self.bond_adjacency[second].push(first);
        Ok(())
    }

    /// Connects every pair of atoms closer than `cutoff`. Returns the number of new bonds.
    pub fn infer_bonds(&mut self, cutoff: f64) -> Result<usize, SubstrateError> {
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(SubstrateError::InvalidCutoff(cutoff));
        }
        let cutoff_sq = cutoff * cutoff;
        let before = self.bonds.len();

        let pairs: Vec<(AtomId, AtomId)> = self
            .order
            .iter()
            .tuple_combinations()
            .filter(|&(&a, &b)| {
                (self.atoms[a].position - self.atoms[b].position).norm_squared() < cutoff_sq
            })
            .map(|(&a, &b)| (a, b))
            .collect();

        for (a, b) in pairs {
            self.add_bond(a, b)?;
        }
        Ok(self.bonds.len() - before)
    }

    pub fn bonded_neighbors(&self, id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(id).map(Vec::as_slice)
    }

    /// Height of an atom measured along the positive direction.
    fn height_of(&self, atom: &Atom) -> f64 {
        atom.position.coords.dot(&self.positive_direction)
    }

    /// Atoms whose height along the positive direction lies strictly inside
    /// `(height - tolerance, height + tolerance)`, in insertion order.
    pub fn atoms_in_band(&self, height: f64, tolerance: f64) -> Vec<AtomId> {
        let (lower, upper) = (height - tolerance, height + tolerance);
        self.atoms_iter()
            .filter(|(_, atom)| {
                let h = self.height_of(atom);
                lower < h && h < upper
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Extracts the topmost layer: the band of atoms within `tolerance` of the highest atom.
    ///
    /// The returned view only keeps bonds whose both ends lie in the layer.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::Empty`] when the substrate has no atoms.
    pub fn surface_layer(&self, tolerance: f64) -> Result<SurfaceLayer<'_>, SubstrateError> {
        let top = self
            .atoms_iter()
            .map(|(_, atom)| self.height_of(atom))
            .fold(f64::NEG_INFINITY, f64::max);
        if !top.is_finite() {
            return Err(SubstrateError::Empty);
        }
        Ok(SurfaceLayer::new(self, self.atoms_in_band(top, tolerance)))
    }

    /// The topmost layer with the default band half-width of 0.1 Angstrom.
    pub fn top_layer(&self) -> Result<SurfaceLayer<'_>, SubstrateError> {
        self.surface_layer(DEFAULT_SURFACE_TOLERANCE)
    }
}

/// A subset of substrate atoms with the connectivity induced on that subset.
#[derive(Debug, Clone)]
pub struct SurfaceLayer<'a> {
    substrate: &'a Substrate,
    atoms: Vec<AtomId>,
    adjacency: HashMap<AtomId, Vec<AtomId>>,
}

impl<'a> SurfaceLayer<'a> {
    /// Builds a layer from an explicit atom selection. Ids absent from the substrate are dropped.
    pub fn new(substrate: &'a Substrate, atoms: Vec<AtomId>) -> Self {
        let atoms: Vec<AtomId> = atoms
            .into_iter()
            .filter(|&id| substrate.atom(id).is_some())
            .unique()
            .collect();

        let adjacency = atoms
            .iter()
            .map(|&id| {
                let neighbors = substrate
                    .bonded_neighbors(id)
                    .unwrap_or(&[])
                    .iter()
                    .copied()
                    .filter(|n| atoms.contains(n))
                    .collect();
                (id, neighbors)
            })
            .collect();

        Self {
            substrate,
            atoms,
            adjacency,
        }
    }

    pub fn substrate(&self) -> &'a Substrate {
        self.substrate
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl Surface for SurfaceLayer<'_> {
    fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    fn position(&self, atom: AtomId) -> Option<Point3<f64>> {
        if self.adjacency.contains_key(&atom) {
            self.substrate.atom(atom).map(|a| a.position)
        } else {
            None
        }
    }

    fn neighbors(&self, atom: AtomId) -> &[AtomId] {
        self.adjacency.get(&atom).map(Vec::as_slice).unwrap_or(&[])
    }

    fn positive_direction(&self) -> Unit<Vector3<f64>> {
        self.substrate.positive_direction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer_slab() -> (Substrate, Vec<AtomId>, Vec<AtomId>) {
        let mut substrate = Substrate::new();
        let bottom: Vec<AtomId> = (0..3)
            .map(|i| substrate.add_atom(Atom::new("Cu", Point3::new(i as f64 * 2.5, 0.0, 0.0))))
            .collect();
        let top: Vec<AtomId> = (0..3)
            .map(|i| substrate.add_atom(Atom::new("Cu", Point3::new(i as f64 * 2.5, 1.0, 2.0))))
            .collect();
        (substrate, bottom, top)
    }

    #[test]
    fn add_bond_rejects_self_bonds_and_ignores_duplicates() {
        let (mut substrate, bottom, _) = two_layer_slab();

        assert_eq!(
            substrate.add_bond(bottom[0], bottom[0]),
            Err(SubstrateError::SelfBond(bottom[0]))
        );

        substrate.add_bond(bottom[0], bottom[1]).unwrap();
        substrate.add_bond(bottom[1], bottom[0]).unwrap();
        assert_eq!(substrate.bonds().len(), 1);
        assert_eq!(substrate.bonded_neighbors(bottom[0]).unwrap(), &[bottom[1]]);
        assert_eq!(substrate.bonded_neighbors(bottom[1]).unwrap(), &[bottom[0]]);
    }

    #[test]
    fn add_bond_rejects_unknown_atoms() {
        let (mut substrate, bottom, _) = two_layer_slab();
        let unknown = AtomId::default();

        assert!(substrate.atom(unknown).is_none());
        assert_eq!(
            substrate.add_bond(bottom[0], unknown),
            Err(SubstrateError::AtomNotFound(unknown))
        );
    }

    #[test]
    fn infer_bonds_connects_pairs_within_cutoff() {
        let (mut substrate, bottom, top) = two_layer_slab();
        let created = substrate.infer_bonds(2.6).unwrap();

        // Two bonds per row plus one between each stacked pair, sqrt(5) apart.
        assert_eq!(created, 7);
        assert!(substrate.bonded_neighbors(bottom[1]).unwrap().contains(&bottom[0]));
        assert!(substrate.bonded_neighbors(bottom[0]).unwrap().contains(&top[0]));
        assert!(!substrate.bonded_neighbors(bottom[0]).unwrap().contains(&bottom[2]));

        assert_eq!(
            substrate.infer_bonds(0.0),
            Err(SubstrateError::InvalidCutoff(0.0))
        );
    }

    #[test]
    fn surface_layer_keeps_only_top_atoms_and_their_bonds() {
        let (mut substrate, bottom, top) = two_layer_slab();
        substrate.infer_bonds(2.6).unwrap();

        let layer = substrate.top_layer().unwrap();
        assert_eq!(layer.atoms(), top.as_slice());
        assert_eq!(layer.neighbors(top[1]).len(), 2);
        assert_eq!(layer.neighbors(top[0]), &[top[1]]);
        assert!(layer.position(bottom[0]).is_none());
        assert!(layer.neighbors(bottom[0]).is_empty());
        assert_eq!(layer.bonds(), vec![(top[0], top[1]), (top[1], top[2])]);
    }

    #[test]
    fn atoms_in_band_follows_the_positive_direction() {
        let (mut substrate, bottom, _) = two_layer_slab();
        substrate
            .set_positive_direction(Vector3::new(0.0, 0.0, -3.0))
            .unwrap();

        // Along -z the bottom row is now the outermost one.
        let layer = substrate.top_layer().unwrap();
        assert_eq!(layer.atoms(), bottom.as_slice());
        assert_eq!(substrate.atoms_in_band(-2.0, 0.05).len(), 3);
        assert!(substrate.atoms_in_band(-1.0, 0.05).is_empty());
    }

    #[test]
    fn zero_positive_direction_and_empty_substrate_are_errors() {
        let mut substrate = Substrate::new();
        assert_eq!(
            substrate.set_positive_direction(Vector3::zeros()),
            Err(SubstrateError::ZeroPositiveDirection)
        );
        assert!(matches!(
            substrate.top_layer(),
            Err(SubstrateError::Empty)
        ));
    }
}
