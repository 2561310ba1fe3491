use nalgebra::{Matrix3, Point3, Rotation3, SymmetricEigen, Unit, Vector3};
use thiserror::Error;

/// Below this cross-product magnitude two neighbor directions count as collinear.
const COLLINEAR_THRESHOLD: f64 = 0.01;
const MIN_VECTOR_NORM: f64 = 1e-9;
const EIGEN_EPSILON: f64 = 1e-12;
const EIGEN_MAX_ITERATIONS: usize = 512;
/// Relative gap under which two eigenvalues of the fit matrix are treated as equal.
const DEGENERACY_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Reference direction has zero length")]
    ZeroReference,
    #[error("Cannot normalize a zero-length vector")]
    ZeroVector,
    #[error("Normal fit did not converge within {iterations} iterations")]
    FitDidNotConverge { iterations: usize },
    #[error("Normal is undetermined: {0}")]
    DegenerateNormal(&'static str),
    #[error("At least {required} points are required, got {found}")]
    InsufficientPoints { required: usize, found: usize },
    #[error("Reference index {index} is out of range for {len} points")]
    ReferenceOutOfRange { index: usize, len: usize },
    #[error("Points are collinear; no circumcircle exists")]
    CollinearPoints,
}

/// Center, normal, and radius of a planar polygon or circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonFrame {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    pub radius: f64,
}

/// Finds the unit vector most perpendicular to `vectors`, oriented along `positive`.
///
/// With two vectors this is their normalized cross product. Nearly collinear pairs fall
/// back to `positive` itself, as do inputs with fewer than two vectors. With three or
/// more vectors the result minimizes `Σ (n·v)²` over unit vectors `n`, which is the
/// eigenvector of `Σ v vᵀ` with the smallest eigenvalue. When that eigenvalue is
/// degenerate, the two-vector estimate is projected onto its eigenspace.
///
/// # Errors
///
/// Fails when `positive` has zero length, the eigen solver does not converge, or the
/// fitted vector vanishes or is not finite.
pub fn find_normal(
    vectors: &[Vector3<f64>],
    positive: &Vector3<f64>,
) -> Result<Unit<Vector3<f64>>, GeometryError> {
    let positive =
        Unit::try_new(*positive, MIN_VECTOR_NORM).ok_or(GeometryError::ZeroReference)?;
    if vectors.len() < 2 {
        return Ok(positive);
    }

    let cross = vectors[0].cross(&vectors[1]);
    let seed = if cross.norm() < COLLINEAR_THRESHOLD {
        positive.into_inner()
    } else {
        cross
    };

    let fitted = if vectors.len() == 2 {
        seed
    } else {
        fit_normal(vectors, &seed)?
    };
    orient_along(fitted, &positive)
}

fn fit_normal(vectors: &[Vector3<f64>], seed: &Vector3<f64>) -> Result<Vector3<f64>, GeometryError> {
    let scatter = vectors
        .iter()
        .fold(Matrix3::zeros(), |acc: Matrix3<f64>, v| acc + v * v.transpose());

    let eigen = SymmetricEigen::try_new(scatter, EIGEN_EPSILON, EIGEN_MAX_ITERATIONS).ok_or(
        GeometryError::FitDidNotConverge {
            iterations: EIGEN_MAX_ITERATIONS,
        },
    )?;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let smallest = eigen.eigenvalues[order[0]];
    let tolerance = DEGENERACY_TOLERANCE * eigen.eigenvalues[order[2]].abs().max(1.0);

    let minimal: Vec<Vector3<f64>> = order
        .iter()
        .take_while(|&&i| eigen.eigenvalues[i] - smallest <= tolerance)
        .map(|&i| eigen.eigenvectors.column(i).into_owned())
        .collect();

    if minimal.len() == 1 {
        return Ok(minimal[0]);
    }
    Ok(minimal.iter().map(|e| e * e.dot(seed)).sum())
}

fn orient_along(
    vector: Vector3<f64>,
    positive: &Unit<Vector3<f64>>,
) -> Result<Unit<Vector3<f64>>, GeometryError> {
    if !vector.iter().all(|c| c.is_finite()) {
        return Err(GeometryError::DegenerateNormal("fitted vector is not finite"));
    }
    let vector = if vector.dot(positive) < 0.0 {
        -vector
    } else {
        vector
    };
    Unit::try_new(vector, MIN_VECTOR_NORM)
        .ok_or(GeometryError::DegenerateNormal("fitted vector vanishes"))
}

/// Mean position of `points`, the best-fit normal of the polygon they span, and the mean
/// vertex-to-centroid distance.
pub fn centroid_frame(
    points: &[Point3<f64>],
    positive: &Vector3<f64>,
) -> Result<PolygonFrame, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::InsufficientPoints {
            required: 3,
            found: points.len(),
        });
    }
    let n = points.len() as f64;
    let origin = Point3::from(points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n);
    let offsets: Vec<Vector3<f64>> = points.iter().map(|p| p - origin).collect();

    let normal = find_normal(&offsets, positive)?;
    let radius = offsets.iter().map(|v| v.norm()).sum::<f64>() / n;

    Ok(PolygonFrame {
        origin,
        normal,
        radius,
    })
}

/// Circumcenter, normal, and circumradius of the triangle `r0 r1 r2`.
///
/// The center uses the barycentric closed form
/// `α = |r1−r2|² (r0−r1)·(r0−r2) / 2|(r0−r1)×(r1−r2)|²` and its cyclic counterparts.
pub fn circumcircle(
    r0: &Point3<f64>,
    r1: &Point3<f64>,
    r2: &Point3<f64>,
    positive: &Vector3<f64>,
) -> Result<PolygonFrame, GeometryError> {
    let v10 = r0 - r1;
    let v20 = r0 - r2;
    let v21 = r1 - r2;

    let denom = v10.cross(&v21).norm();
    if denom < MIN_VECTOR_NORM {
        return Err(GeometryError::CollinearPoints);
    }
    let denom2 = 2.0 * denom * denom;

    let normal = find_normal(&[v10, v20, v21], positive)?;

    let (n10, n20, n21) = (v10.norm(), v20.norm(), v21.norm());
    let radius = n10 * n20 * n21 / (2.0 * denom);
    let alpha = n21 * n21 * v10.dot(&v20) / denom2;
    let beta = n20 * n20 * (-v10).dot(&v21) / denom2;
    let gamma = n10 * n10 * v20.dot(&v21) / denom2;
    let origin = Point3::from(alpha * r0.coords + beta * r1.coords + gamma * r2.coords);

    Ok(PolygonFrame {
        origin,
        normal,
        radius,
    })
}

/// A deterministic unit vector orthogonal to `normal`.
///
/// Projects the global `y` axis into the plane of `normal`, switching to `x` when `normal`
/// is close to `y`. For a `+z` normal this yields `+y`.
pub fn perpendicular_to(normal: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let reference = if normal.y.abs() < 0.9 {
        Vector3::y()
    } else {
        Vector3::x()
    };
    Unit::new_normalize(reference - normal.as_ref() * normal.dot(&reference))
}

/// Rotation by `angle` radians about `axis` (Rodrigues' formula).
pub fn rotation_about(axis: &Unit<Vector3<f64>>, angle: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(axis, angle)
}

/// Expresses `points` in a local frame rooted at `points[0]`.
///
/// The local `z` axis is the normalized sum of unit vectors from `points[0]` toward the
/// `reference` points. With several references, `y` is perpendicular to `z` and to the last
/// reference direction; with one, it is [`perpendicular_to`] `z`. The frame is right-handed
/// with `x = y × z`. The output is suitable as an adsorbate template whose binding atom is
/// `points[0]`.
pub fn orient_template(
    points: &[Point3<f64>],
    reference: &[usize],
) -> Result<Vec<Vector3<f64>>, GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::InsufficientPoints {
            required: 2,
            found: points.len(),
        });
    }
    if reference.is_empty() {
        return Err(GeometryError::InsufficientPoints {
            required: 1,
            found: 0,
        });
    }
    if let Some(&index) = reference.iter().find(|&&i| i == 0 || i >= points.len()) {
        return Err(GeometryError::ReferenceOutOfRange {
            index,
            len: points.len(),
        });
    }

    let translated: Vec<Vector3<f64>> = points.iter().map(|p| p - points[0]).collect();

    let mut z_sum = Vector3::zeros();
    for &i in reference {
        z_sum += Unit::try_new(translated[i], MIN_VECTOR_NORM)
            .ok_or(GeometryError::ZeroVector)?
            .into_inner();
    }
    let z = Unit::try_new(z_sum, MIN_VECTOR_NORM).ok_or(GeometryError::ZeroVector)?;

    let y = match reference.last() {
        Some(&last) if reference.len() > 1 => {
            Unit::try_new(z.cross(&translated[last]), MIN_VECTOR_NORM)
                .unwrap_or_else(|| perpendicular_to(&z))
        }
        _ => perpendicular_to(&z),
    };
    let x = y.cross(&z);

    Ok(translated
        .iter()
        .map(|t| Vector3::new(t.dot(&x), t.dot(&y), t.dot(&z)))
        .collect())
}
