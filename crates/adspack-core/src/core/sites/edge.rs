use super::{SiteGenerationError, atom_normals, position_of};
use crate::core::models::site::{ActiveSite, SiteType};
use crate::core::models::substrate::Surface;
use crate::core::utils::geometry::GeometryError;
use nalgebra::{Point3, Unit};
use tracing::{debug, instrument};

const MIN_TANGENT_NORM: f64 = 1e-9;

/// Places Edge sites above the midpoint of every surface bond.
///
/// The site normal is the normalized sum of the two endpoint normals. For a bond `(a, b)`
/// the tangent points from `b` to `a`, projected into the plane of the normal. Unless
/// `two_fold_symmetric` is set, a second site with the opposite tangent is emitted right
/// after the first.
#[instrument(skip_all, name = "edge_sites")]
pub fn generate<S: Surface + ?Sized>(
    surface: &S,
    surface_distance: f64,
    two_fold_symmetric: bool,
) -> Result<Vec<ActiveSite>, SiteGenerationError> {
    let normals = atom_normals(surface)?;
    let bonds = surface.bonds();
    let per_bond = if two_fold_symmetric { 1 } else { 2 };
    let mut sites = Vec::with_capacity(bonds.len() * per_bond);

    for (a, b) in bonds {
        let (pa, pb) = (position_of(surface, a)?, position_of(surface, b)?);
        let (na, nb) = match (normals.get(&a), normals.get(&b)) {
            (Some(na), Some(nb)) => (na, nb),
            (None, _) => return Err(SiteGenerationError::UnknownAtom(a)),
            (_, None) => return Err(SiteGenerationError::UnknownAtom(b)),
        };

        let normal = Unit::try_new(na.as_ref() + nb.as_ref(), MIN_TANGENT_NORM).ok_or(
            SiteGenerationError::Geometry {
                atom: a,
                source: GeometryError::DegenerateNormal("endpoint normals cancel"),
            },
        )?;
        let midpoint = Point3::from((pa.coords + pb.coords) / 2.0);
        let origin = midpoint + normal.as_ref() * surface_distance;

        let bond = pa - pb;
        let in_plane = bond - normal.as_ref() * normal.dot(&bond);
        let tangent = Unit::try_new(in_plane, MIN_TANGENT_NORM).ok_or(
            SiteGenerationError::Geometry {
                atom: a,
                source: GeometryError::ZeroVector,
            },
        )?;

        sites.push(ActiveSite::new(
            SiteType::Edge,
            origin,
            normal.into_inner(),
            tangent.into_inner(),
            vec![a, b],
        )?);
        if !two_fold_symmetric {
            sites.push(ActiveSite::new(
                SiteType::Edge,
                origin,
                normal.into_inner(),
                -tangent.into_inner(),
                vec![a, b],
            )?);
        }
    }

    debug!(count = sites.len(), "Generated edge sites.");
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sites::test_surfaces::{close_packed, dimer, triangle};
    use nalgebra::Vector3;

    #[test]
    fn bond_yields_two_opposite_sites_sharing_origin_and_normal() {
        let (substrate, ids) = dimer();
        let layer = substrate.surface_layer(0.1).unwrap();
        let sites = generate(&layer, 1.0, false).unwrap();

        assert_eq!(sites.len(), 2);
        let (forward, backward) = (&sites[0], &sites[1]);
        assert_eq!(forward.origin(), Point3::new(1.0, 0.0, 1.0));
        assert_eq!(forward.origin(), backward.origin());
        assert_eq!(forward.normal(), backward.normal());
        assert_eq!(forward.tangent().into_inner(), -backward.tangent().into_inner());
        assert_eq!(forward.tangent().into_inner(), -Vector3::x());
        assert_eq!(forward.bound_atoms(), ids.as_slice());
        assert_ne!(forward, backward);
    }

    #[test]
    fn two_fold_symmetric_adsorbates_get_one_site_per_bond() {
        let (substrate, _) = triangle();
        let layer = substrate.surface_layer(0.1).unwrap();
        assert_eq!(generate(&layer, 1.0, true).unwrap().len(), 3);
        assert_eq!(generate(&layer, 1.0, false).unwrap().len(), 6);
    }

    #[test]
    fn frames_are_orthonormal_on_close_packed_patch() {
        let substrate = close_packed(3, 4, 2.5);
        let layer = substrate.surface_layer(0.1).unwrap();
        let sites = generate(&layer, 1.2, false).unwrap();

        assert_eq!(sites.len(), 2 * layer.bonds().len());
        for site in &sites {
            assert!((site.normal().norm() - 1.0).abs() < 1e-6);
            assert!((site.tangent().norm() - 1.0).abs() < 1e-6);
            assert!(site.normal().dot(&site.tangent()).abs() < 1e-9);
            assert!((site.origin().z - 1.2).abs() < 1e-9);
        }
    }
}
