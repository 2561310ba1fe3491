//! # Site Discovery
//!
//! Stages that derive typed, oriented active sites from the connectivity of a surface
//! layer, and the adjacency graph between them.
//!
//! Each stage is a pure function of a [`Surface`] and its options. Callers compose the
//! stages they need and hand the combined site list to [`catalog::SiteCatalog::new`],
//! which builds the adjacency graph once.
//!
//! - [`vertex`] - one site above every surface atom ("top")
//! - [`edge`] - one or two sites above every surface bond ("bridge")
//! - [`face`] - one or N sites above every accepted N-ring ("hollow")
//! - [`adjacency`] - distance-band neighbor graph between sites
//! - [`catalog`] - the read-only site collection shared by packing sessions

pub mod adjacency;
pub mod catalog;
pub mod edge;
pub mod face;
pub mod vertex;

use crate::core::models::ids::AtomId;
use crate::core::models::site::SiteError;
use crate::core::models::substrate::Surface;
use crate::core::utils::geometry::{GeometryError, find_normal};
use nalgebra::{Point3, Unit, Vector3};
use std::collections::HashMap;
use thiserror::Error;

const MIN_BOND_LENGTH: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SiteGenerationError {
    #[error("Atom {0:?} is not part of the surface")]
    UnknownAtom(AtomId),
    #[error("Atoms {0:?} and {1:?} coincide")]
    CoincidentAtoms(AtomId, AtomId),
    #[error("Geometry failure near atom {atom:?}: {source}")]
    Geometry {
        atom: AtomId,
        #[source]
        source: GeometryError,
    },
    #[error("Invalid site: {0}")]
    Site(#[from] SiteError),
}

pub(crate) fn position_of<S: Surface + ?Sized>(
    surface: &S,
    atom: AtomId,
) -> Result<Point3<f64>, SiteGenerationError> {
    surface
        .position(atom)
        .ok_or(SiteGenerationError::UnknownAtom(atom))
}

/// Unit vectors from `atom` to each of its surface neighbors.
pub fn neighbor_vectors<S: Surface + ?Sized>(
    surface: &S,
    atom: AtomId,
) -> Result<Vec<Vector3<f64>>, SiteGenerationError> {
    let center = position_of(surface, atom)?;
    surface
        .neighbors(atom)
        .iter()
        .map(|&neighbor| {
            let offset = position_of(surface, neighbor)? - center;
            Unit::try_new(offset, MIN_BOND_LENGTH)
                .map(Unit::into_inner)
                .ok_or(SiteGenerationError::CoincidentAtoms(atom, neighbor))
        })
        .collect()
}

/// The local surface normal at `atom`, fitted to its neighbor directions.
pub fn atom_normal<S: Surface + ?Sized>(
    surface: &S,
    atom: AtomId,
) -> Result<Unit<Vector3<f64>>, SiteGenerationError> {
    let vectors = neighbor_vectors(surface, atom)?;
    find_normal(&vectors, &surface.positive_direction())
        .map_err(|source| SiteGenerationError::Geometry { atom, source })
}

pub(crate) fn atom_normals<S: Surface + ?Sized>(
    surface: &S,
) -> Result<HashMap<AtomId, Unit<Vector3<f64>>>, SiteGenerationError> {
    surface
        .atoms()
        .iter()
        .map(|&atom| Ok((atom, atom_normal(surface, atom)?)))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_surfaces::*;
    use super::*;

    #[test]
    fn neighbor_vectors_are_unit_directions() {
        let (substrate, ids) = triangle();
        let layer = substrate.surface_layer(0.1).unwrap();
        let vectors = neighbor_vectors(&layer, ids[0]).unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| (v.norm() - 1.0).abs() < 1e-12));
        assert!(vectors.iter().any(|v| (v - Vector3::x()).norm() < 1e-12));
    }

    #[test]
    fn atom_normal_of_flat_triangle_points_up() {
        let (substrate, ids) = triangle();
        let layer = substrate.surface_layer(0.1).unwrap();
        for id in ids {
            let normal = atom_normal(&layer, id).unwrap();
            assert!((normal.into_inner() - Vector3::z()).norm() < 1e-9);
        }
    }

    #[test]
    fn unknown_atom_is_reported() {
        let (substrate, _) = triangle();
        let layer = substrate.surface_layer(0.1).unwrap();
        assert_eq!(
            neighbor_vectors(&layer, AtomId::default()),
            Err(SiteGenerationError::UnknownAtom(AtomId::default()))
        );
    }
}
