use itertools::Itertools;
use nalgebra::Point3;

/// The smallest distance between any atom of `a` and any atom of `b`.
pub fn min_distance(a: &[Point3<f64>], b: &[Point3<f64>]) -> Option<f64> {
    a.iter()
        .cartesian_product(b)
        .map(|(p, q)| nalgebra::distance_squared(p, q))
        .min_by(f64::total_cmp)
        .map(f64::sqrt)
}

/// The closest pair distance if any atom of `a` lies strictly within `threshold` of an
/// atom of `b`.
pub fn collision_distance(a: &[Point3<f64>], b: &[Point3<f64>], threshold: f64) -> Option<f64> {
    let limit = threshold * threshold;
    a.iter()
        .cartesian_product(b)
        .map(|(p, q)| nalgebra::distance_squared(p, q))
        .filter(|&d2| d2 < limit)
        .min_by(f64::total_cmp)
        .map(f64::sqrt)
}

pub fn collides(a: &[Point3<f64>], b: &[Point3<f64>], threshold: f64) -> bool {
    collision_distance(a, b, threshold).is_some()
}
