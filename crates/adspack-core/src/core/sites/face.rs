use super::{SiteGenerationError, position_of};
use crate::core::models::ids::AtomId;
use crate::core::models::site::{ActiveSite, SiteType};
use crate::core::models::substrate::Surface;
use crate::core::utils::geometry::{GeometryError, centroid_frame, circumcircle, rotation_about};
use nalgebra::{Point3, Unit};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use tracing::{debug, instrument};

const MIN_TANGENT_NORM: f64 = 1e-9;

/// How the center of a ring is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaceCenter {
    /// Mean position of the ring atoms.
    #[default]
    Centroid,
    /// Circumcenter of the triangle. Rings with more than three atoms use the centroid.
    Circumcenter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceOptions {
    /// Ring sizes that receive Face sites.
    pub ring_sizes: Vec<usize>,
    /// Ring sizes whose adsorbates have N-fold symmetry: one site per ring instead of N.
    pub symmetric_ring_sizes: Vec<usize>,
    pub center: FaceCenter,
}

impl Default for FaceOptions {
    fn default() -> Self {
        Self {
            ring_sizes: vec![3],
            symmetric_ring_sizes: Vec::new(),
            center: FaceCenter::Centroid,
        }
    }
}

/// Places Face sites above every chordless ring whose size is in `options.ring_sizes`.
///
/// The first site's tangent is the in-plane direction from the ring center to the ring's
/// first atom. For an N-ring without N-fold symmetry, N sites share origin and normal,
/// with tangents rotated by `k·2π/N` about the normal.
#[instrument(skip_all, name = "face_sites")]
pub fn generate<S: Surface + ?Sized>(
    surface: &S,
    surface_distance: f64,
    options: &FaceOptions,
) -> Result<Vec<ActiveSite>, SiteGenerationError> {
    let max_size = options.ring_sizes.iter().copied().max().unwrap_or(0);
    let rings: Vec<Vec<AtomId>> = chordless_cycles(surface, max_size)
        .into_iter()
        .filter(|ring| options.ring_sizes.contains(&ring.len()))
        .collect();

    let mut sites = Vec::new();
    for ring in rings {
        let points = ring
            .iter()
            .map(|&atom| position_of(surface, atom))
            .collect::<Result<Vec<Point3<f64>>, _>>()?;
        let geometry_error = |source: GeometryError| SiteGenerationError::Geometry {
            atom: ring[0],
            source,
        };

        let positive = surface.positive_direction().into_inner();
        let frame = match (options.center, points.as_slice()) {
            (FaceCenter::Circumcenter, [r0, r1, r2]) => circumcircle(r0, r1, r2, &positive),
            _ => centroid_frame(&points, &positive),
        }
        .map_err(geometry_error)?;

        let normal = frame.normal;
        let origin = frame.origin + normal.as_ref() * surface_distance;
        let lead = points[0] - frame.origin;
        let tangent = Unit::try_new(
            lead - normal.as_ref() * normal.dot(&lead),
            MIN_TANGENT_NORM,
        )
        .ok_or_else(|| geometry_error(GeometryError::ZeroVector))?;

        let copies = if options.symmetric_ring_sizes.contains(&ring.len()) {
            1
        } else {
            ring.len()
        };
        for k in 0..copies {
            let rotation = rotation_about(&normal, k as f64 * TAU / ring.len() as f64);
            sites.push(ActiveSite::new(
                SiteType::Face,
                origin,
                normal.into_inner(),
                rotation * tangent.into_inner(),
                ring.clone(),
            )?);
        }
    }

    debug!(count = sites.len(), "Generated face sites.");
    Ok(sites)
}

/// Enumerates the chordless simple cycles of the surface graph with at most `max_len`
/// atoms.
///
/// A cycle is reported once. It starts at its atom that comes first in
/// [`Surface::atoms`] and runs toward the lower-ranked of that atom's two ring neighbors.
/// Cycles are ordered by start atom, then by depth-first discovery.
pub fn chordless_cycles<S: Surface + ?Sized>(surface: &S, max_len: usize) -> Vec<Vec<AtomId>> {
    let mut cycles = Vec::new();
    if max_len < 3 {
        return cycles;
    }

    let rank: HashMap<AtomId, usize> = surface
        .atoms()
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let adjacent: HashMap<AtomId, HashSet<AtomId>> = surface
        .atoms()
        .iter()
        .map(|&id| (id, surface.neighbors(id).iter().copied().collect()))
        .collect();
    let is_bonded = |a: AtomId, b: AtomId| adjacent.get(&a).is_some_and(|set| set.contains(&b));

    for (start_rank, &start) in surface.atoms().iter().enumerate() {
        let mut path = vec![start];
        extend_path(
            surface,
            &rank,
            &is_bonded,
            start_rank,
            max_len,
            &mut path,
            &mut cycles,
        );
    }
    cycles
}

fn extend_path<S: Surface + ?Sized>(
    surface: &S,
    rank: &HashMap<AtomId, usize>,
    is_bonded: &impl Fn(AtomId, AtomId) -> bool,
    start_rank: usize,
    max_len: usize,
    path: &mut Vec<AtomId>,
    cycles: &mut Vec<Vec<AtomId>>,
) {
    let start = path[0];
    let Some(&last) = path.last() else {
        return;
    };

    for &next in surface.neighbors(last) {
        if rank.get(&next).is_none_or(|&r| r <= start_rank) || path.contains(&next) {
            continue;
        }
        // Interior atoms other than the tip must not bond to `next`, or the ring has a chord.
        let interior: &[AtomId] = if path.len() > 2 {
            &path[1..path.len() - 1]
        } else {
            &[]
        };
        if interior.iter().any(|&atom| is_bonded(atom, next)) {
            continue;
        }

        if path.len() >= 2 && is_bonded(next, start) {
            // Closing here; any longer ring through `next` would carry the chord `start-next`.
            if rank.get(&path[1]) < rank.get(&next) {
                let mut ring = path.clone();
                ring.push(next);
                cycles.push(ring);
            }
            continue;
        }

        if path.len() < max_len - 1 {
            path.push(next);
            extend_path(surface, rank, is_bonded, start_rank, max_len, path, cycles);
            path.pop();
        }
    }
}
