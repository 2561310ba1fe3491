//! Reversible perturbation of adsorbate internal geometry.
//!
//! A [`Distortor`] is an ordered composition of [`DistortionOp`]s acting on an adsorbate's
//! local template coordinates. Each application records the geometry it started from, so
//! the most recent distortion can be undone exactly, once.

use crate::core::utils::geometry::rotation_about;
use nalgebra::{Unit, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistortionError {
    #[error("No recorded geometry to undo")]
    NothingToUndo,
    #[error("Atom index {index} is out of range for a template of {atom_count} atoms")]
    AtomIndexOutOfRange { index: usize, atom_count: usize },
    #[error("Torsion axis atoms {from} and {to} do not define a direction")]
    DegenerateAxis { from: usize, to: usize },
    #[error("Invalid distortion parameter: {0}")]
    InvalidParameter(String),
}

/// One elementary distortion in the adsorbate's local frame.
///
/// The local frame has the binding atom at the origin and the site normal along `z`.
/// Angles are drawn uniformly from `[-max_angle_deg, max_angle_deg]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case",
    deny_unknown_fields
)]
pub enum DistortionOp {
    /// Rotates the whole template about the site normal.
    Spin { max_angle_deg: f64 },
    /// Rotates the whole template about a random in-plane axis through the binding atom.
    Tilt { max_angle_deg: f64 },
    /// Rotates the `moving` atoms about the bond from `axis[0]` to `axis[1]`.
    Torsion {
        axis: [usize; 2],
        moving: Vec<usize>,
        max_angle_deg: f64,
    },
    /// Displaces every atom except the binding atom by a uniform offset in `[-amplitude, amplitude]³`.
    Jitter { amplitude: f64 },
}

impl DistortionOp {
    fn validate(&self, atom_count: usize) -> Result<(), DistortionError> {
        let check_index = |index: usize| {
            if index < atom_count {
                Ok(())
            } else {
                Err(DistortionError::AtomIndexOutOfRange { index, atom_count })
            }
        };
        let check_magnitude = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(DistortionError::InvalidParameter(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )))
            }
        };

        match self {
            DistortionOp::Spin { max_angle_deg } | DistortionOp::Tilt { max_angle_deg } => {
                check_magnitude("max-angle-deg", *max_angle_deg)
            }
            DistortionOp::Torsion {
                axis,
                moving,
                max_angle_deg,
            } => {
                check_magnitude("max-angle-deg", *max_angle_deg)?;
                axis.iter().chain(moving).try_for_each(|&i| check_index(i))?;
                if axis[0] == axis[1] {
                    return Err(DistortionError::DegenerateAxis {
                        from: axis[0],
                        to: axis[1],
                    });
                }
                Ok(())
            }
            DistortionOp::Jitter { amplitude } => check_magnitude("amplitude", *amplitude),
        }
    }

    fn apply<R: Rng + ?Sized>(
        &self,
        positions: &mut [Vector3<f64>],
        rng: &mut R,
    ) -> Result<(), DistortionError> {
        match self {
            DistortionOp::Spin { max_angle_deg } => {
                let angle = sample_angle(*max_angle_deg, rng);
                let rotation = rotation_about(&Vector3::z_axis(), angle);
                positions.iter_mut().for_each(|p| *p = rotation * *p);
            }
            DistortionOp::Tilt { max_angle_deg } => {
                let azimuth = rng.gen_range(0.0..TAU);
                let axis = Unit::new_normalize(Vector3::new(azimuth.cos(), azimuth.sin(), 0.0));
                let rotation = rotation_about(&axis, sample_angle(*max_angle_deg, rng));
                positions.iter_mut().for_each(|p| *p = rotation * *p);
            }
            DistortionOp::Torsion {
                axis: [from, to],
                moving,
                max_angle_deg,
            } => {
                let pivot = positions[*from];
                let direction = Unit::try_new(positions[*to] - pivot, 1e-9).ok_or(
                    DistortionError::DegenerateAxis {
                        from: *from,
                        to: *to,
                    },
                )?;
                let rotation = rotation_about(&direction, sample_angle(*max_angle_deg, rng));
                for &i in moving {
                    positions[i] = pivot + rotation * (positions[i] - pivot);
                }
            }
            DistortionOp::Jitter { amplitude } => {
                if *amplitude > 0.0 {
                    for p in positions.iter_mut().skip(1) {
                        *p += Vector3::from_fn(|_, _| rng.gen_range(-amplitude..=*amplitude));
                    }
                }
            }
        }
        Ok(())
    }
}

fn sample_angle<R: Rng + ?Sized>(max_angle_deg: f64, rng: &mut R) -> f64 {
    let max = max_angle_deg.to_radians();
    if max > 0.0 {
        rng.gen_range(-max..=max)
    } else {
        0.0
    }
}

/// An ordered, undoable composition of distortion operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distortor {
    ops: Vec<DistortionOp>,
    snapshot: Option<Vec<Vector3<f64>>>,
    geometry_changed: bool,
}

impl Distortor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_op(mut self, op: DistortionOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn add_op(&mut self, op: DistortionOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[DistortionOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Checks every operation's parameters and atom indices against a template size.
    pub fn validate(&self, atom_count: usize) -> Result<(), DistortionError> {
        self.ops.iter().try_for_each(|op| op.validate(atom_count))
    }

    /// Runs all operations in order on `positions`.
    ///
    /// Returns `Ok(false)` without touching anything when there are no operations. If an
    /// operation fails, `positions` is restored before the error is returned.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        positions: &mut [Vector3<f64>],
        rng: &mut R,
    ) -> Result<bool, DistortionError> {
        if self.ops.is_empty() {
            return Ok(false);
        }
        self.validate(positions.len())?;

        let before = positions.to_vec();
        for op in &self.ops {
            if let Err(e) = op.apply(positions, rng) {
                positions.copy_from_slice(&before);
                return Err(e);
            }
        }
        self.snapshot = Some(before);
        self.geometry_changed = true;
        Ok(true)
    }

    /// Restores the geometry recorded by the last [`Distortor::apply`].
    ///
    /// # Errors
    ///
    /// Returns [`DistortionError::NothingToUndo`] if there is no recorded geometry, either
    /// because nothing was applied or because it was already undone.
    pub fn undo(&mut self, positions: &mut [Vector3<f64>]) -> Result<(), DistortionError> {
        let snapshot = self.snapshot.take().ok_or(DistortionError::NothingToUndo)?;
        positions.copy_from_slice(&snapshot);
        self.geometry_changed = true;
        Ok(())
    }

    /// Reports whether the geometry changed since the last call, then clears the flag.
    pub fn take_geometry_changed(&mut self) -> bool {
        std::mem::take(&mut self.geometry_changed)
    }
}
