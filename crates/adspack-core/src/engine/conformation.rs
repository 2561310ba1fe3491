use crate::core::models::ids::{AdsorbateId, AtomId};
use nalgebra::Point3;

/// Where an atom of a conformation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomSource {
    Substrate(AtomId),
    Adsorbate(AdsorbateId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConformationAtom {
    pub element: String,
    pub position: Point3<f64>,
    pub source: AtomSource,
}

/// One sampled arrangement: every substrate atom followed by the atoms of every placed
/// adsorbate, all in lab coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conformation {
    pub atoms: Vec<ConformationAtom>,
}

impl Conformation {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.atoms.iter().map(|a| a.position)
    }

    /// Number of atoms contributed by adsorbates.
    pub fn adsorbate_atom_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|a| matches!(a.source, AtomSource::Adsorbate(_)))
            .count()
    }
}
