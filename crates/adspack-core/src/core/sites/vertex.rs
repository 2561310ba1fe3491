use super::{SiteGenerationError, atom_normal, position_of};
use crate::core::models::site::{ActiveSite, SiteType};
use crate::core::models::substrate::Surface;
use crate::core::utils::geometry::perpendicular_to;
use tracing::{debug, instrument};

/// Places one Vertex site `surface_distance` above every surface atom, along the atom's
/// fitted normal.
///
/// Vertex sites have no preferred in-plane direction; their tangent is a deterministic
/// perpendicular to the normal.
#[instrument(skip_all, name = "vertex_sites")]
pub fn generate<S: Surface + ?Sized>(
    surface: &S,
    surface_distance: f64,
) -> Result<Vec<ActiveSite>, SiteGenerationError> {
    let mut sites = Vec::with_capacity(surface.atoms().len());

    for &atom in surface.atoms() {
        let normal = atom_normal(surface, atom)?;
        let origin = position_of(surface, atom)? + normal.as_ref() * surface_distance;
        sites.push(ActiveSite::new(
            SiteType::Vertex,
            origin,
            normal.into_inner(),
            perpendicular_to(&normal).into_inner(),
            vec![atom],
        )?);
    }

    debug!(count = sites.len(), "Generated vertex sites.");
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sites::test_surfaces::{close_packed, triangle};
    use nalgebra::{Point3, Vector3};

    #[test]
    fn one_site_per_atom_above_its_position() {
        let (substrate, ids) = triangle();
        let layer = substrate.surface_layer(0.1).unwrap();
        let sites = generate(&layer, 1.5).unwrap();

        assert_eq!(sites.len(), 3);
        for (site, id) in sites.iter().zip(&ids) {
            let atom = substrate.atom(*id).unwrap().position;
            assert_eq!(site.site_type(), SiteType::Vertex);
            assert_eq!(site.bound_atoms(), &[*id]);
            assert!((site.origin() - (atom + Vector3::z() * 1.5)).norm() < 1e-9);
        }
    }

    #[test]
    fn frames_are_orthonormal() {
        let substrate = close_packed(3, 3, 2.7);
        let layer = substrate.surface_layer(0.1).unwrap();
        for site in generate(&layer, 1.0).unwrap() {
            assert!((site.normal().norm() - 1.0).abs() < 1e-6);
            assert!((site.tangent().norm() - 1.0).abs() < 1e-6);
            assert!(site.normal().dot(&site.tangent()).abs() < 1e-9);
        }
    }

    #[test]
    fn isolated_atom_uses_positive_direction() {
        let mut substrate = crate::core::models::substrate::Substrate::new();
        substrate.add_atom(crate::core::models::atom::Atom::new(
            "Au",
            Point3::new(0.0, 0.0, 0.0),
        ));
        let layer = substrate.surface_layer(0.1).unwrap();
        let sites = generate(&layer, 2.0).unwrap();
        assert_eq!(sites[0].origin(), Point3::new(0.0, 0.0, 2.0));
    }
}
