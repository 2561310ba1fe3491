use super::atom::Atom;
use super::site::{ActiveSite, SiteFrame, SiteType};
use crate::core::distortion::{DistortionError, Distortor};
use crate::core::utils::geometry::{GeometryError, orient_template};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdsorbateError {
    #[error("Adsorbate '{0}' has no atoms")]
    EmptyTemplate(String),
    #[error("Adsorbate '{name}' has {elements} elements but {positions} positions")]
    LengthMismatch {
        name: String,
        elements: usize,
        positions: usize,
    },
    #[error("Invalid distortion for adsorbate '{name}': {source}")]
    Distortion {
        name: String,
        #[source]
        source: DistortionError,
    },
    #[error("Cannot orient adsorbate template: {0}")]
    Geometry(#[from] GeometryError),
}

/// A molecular fragment that binds to one active site.
///
/// The template is expressed in a local frame whose origin is the binding atom (index 0)
/// and whose `z` axis points away from the surface. Placing the adsorbate on a site maps
/// that frame onto the site's frame; a free adsorbate has no frame and no lab positions.
///
/// Adsorbates are cheap to clone, and every packing session works on its own copies so
/// that distortions never leak between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct Adsorbate {
    name: String,
    site_type: SiteType,
    elements: Vec<String>,
    positions: Vec<Vector3<f64>>,
    frame: Option<SiteFrame>,
    distortor: Option<Distortor>,
}

impl Adsorbate {
    pub fn new(
        name: impl Into<String>,
        site_type: SiteType,
        elements: Vec<String>,
        positions: Vec<Vector3<f64>>,
    ) -> Result<Self, AdsorbateError> {
        let name = name.into();
        if elements.len() != positions.len() {
            return Err(AdsorbateError::LengthMismatch {
                name,
                elements: elements.len(),
                positions: positions.len(),
            });
        }
        if elements.is_empty() {
            return Err(AdsorbateError::EmptyTemplate(name));
        }
        Ok(Self {
            name,
            site_type,
            elements,
            positions,
            frame: None,
            distortor: None,
        })
    }

    /// Builds a template from absolute coordinates, rooting it at `atoms[0]`.
    ///
    /// The local `z` axis points from the binding atom toward the `reference` atoms; see
    /// [`orient_template`].
    pub fn from_atoms(
        name: impl Into<String>,
        site_type: SiteType,
        atoms: &[Atom],
        reference: &[usize],
    ) -> Result<Self, AdsorbateError> {
        let name = name.into();
        if atoms.is_empty() {
            return Err(AdsorbateError::EmptyTemplate(name));
        }
        let points: Vec<Point3<f64>> = atoms.iter().map(|a| a.position).collect();
        let positions = if atoms.len() == 1 {
            vec![Vector3::zeros()]
        } else {
            orient_template(&points, reference)?
        };
        let elements = atoms.iter().map(|a| a.element.clone()).collect();
        Self::new(name, site_type, elements, positions)
    }

    /// Attaches a distortor after checking its operations against this template.
    pub fn with_distortor(mut self, distortor: Distortor) -> Result<Self, AdsorbateError> {
        distortor
            .validate(self.positions.len())
            .map_err(|source| AdsorbateError::Distortion {
                name: self.name.clone(),
                source,
            })?;
        self.distortor = Some(distortor);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The site type this adsorbate binds to.
    pub fn site_type(&self) -> SiteType {
        self.site_type
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Current local coordinates, including any applied distortion.
    pub fn local_positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn distortor(&self) -> Option<&Distortor> {
        self.distortor.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.frame.is_none()
    }

    pub fn frame(&self) -> Option<&SiteFrame> {
        self.frame.as_ref()
    }

    /// Adopts the frame of `site`. Any previous attachment is replaced.
    pub fn place_on(&mut self, site: &ActiveSite) {
        self.frame = Some(*site.frame());
    }

    pub fn detach(&mut self) {
        self.frame = None;
    }

    /// Lab-frame positions of every atom, or `None` while the adsorbate is free.
    pub fn absolute_positions(&self) -> Option<Vec<Point3<f64>>> {
        let frame = self.frame.as_ref()?;
        Some(self.positions.iter().map(|p| frame.to_lab(p)).collect())
    }

    /// Lab-frame atoms, or `None` while the adsorbate is free.
    pub fn absolute_atoms(&self) -> Option<Vec<Atom>> {
        let positions = self.absolute_positions()?;
        Some(
            self.elements
                .iter()
                .zip(positions)
                .map(|(element, position)| Atom::new(element, position))
                .collect(),
        )
    }

    /// Perturbs the template with the attached distortor.
    ///
    /// Returns `Ok(false)` if there is no distortor or it has no operations.
    pub fn distort<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<bool, DistortionError> {
        match self.distortor.as_mut() {
            Some(distortor) => distortor.apply(&mut self.positions, rng),
            None => Ok(false),
        }
    }

    /// Reverts the most recent distortion.
    pub fn undistort(&mut self) -> Result<(), DistortionError> {
        self.distortor
            .as_mut()
            .ok_or(DistortionError::NothingToUndo)?
            .undo(&mut self.positions)
    }

    /// Reports and clears the distortor's "geometry changed" flag.
    pub fn take_geometry_changed(&mut self) -> bool {
        self.distortor
            .as_mut()
            .is_some_and(Distortor::take_geometry_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distortion::DistortionOp;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn carbon_monoxide() -> Adsorbate {
        Adsorbate::new(
            "CO",
            SiteType::Vertex,
            vec!["C".to_string(), "O".to_string()],
            vec![Vector3::zeros(), Vector3::new(0.0, 0.0, 1.15)],
        )
        .unwrap()
    }

    fn top_site() -> ActiveSite {
        ActiveSite::new(
            SiteType::Vertex,
            Point3::new(1.0, 1.0, 2.0),
            Vector3::z(),
            Vector3::y(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn new_adsorbate_is_free() {
        let co = carbon_monoxide();
        assert!(co.is_free());
        assert!(co.frame().is_none());
        assert!(co.absolute_positions().is_none());
        assert!(co.absolute_atoms().is_none());
    }

    #[test]
    fn empty_or_mismatched_templates_are_rejected() {
        assert_eq!(
            Adsorbate::new("X", SiteType::Face, Vec::new(), Vec::new()),
            Err(AdsorbateError::EmptyTemplate("X".to_string()))
        );
        assert!(matches!(
            Adsorbate::new("X", SiteType::Face, vec!["H".to_string()], Vec::new()),
            Err(AdsorbateError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn placing_maps_template_onto_site_frame_and_detach_frees() {
        let mut co = carbon_monoxide();
        co.place_on(&top_site());
        assert!(!co.is_free());

        let atoms = co.absolute_atoms().unwrap();
        assert_eq!(atoms[0].element, "C");
        assert_eq!(atoms[0].position, Point3::new(1.0, 1.0, 2.0));
        assert!((atoms[1].position - Point3::new(1.0, 1.0, 3.15)).norm() < 1e-12);

        co.detach();
        assert!(co.is_free());
        assert!(co.absolute_positions().is_none());
    }

    #[test]
    fn from_atoms_roots_template_at_binding_atom() {
        let atoms = vec![
            Atom::new("C", Point3::new(5.0, 5.0, 5.0)),
            Atom::new("O", Point3::new(6.15, 5.0, 5.0)),
        ];
        let co = Adsorbate::from_atoms("CO", SiteType::Vertex, &atoms, &[1]).unwrap();

        assert_eq!(co.local_positions()[0], Vector3::zeros());
        assert!((co.local_positions()[1] - Vector3::new(0.0, 0.0, 1.15)).norm() < 1e-12);
    }

    #[test]
    fn single_atom_template_needs_no_reference() {
        let atoms = vec![Atom::new("H", Point3::new(3.0, 2.0, 1.0))];
        let h = Adsorbate::from_atoms("H", SiteType::Face, &atoms, &[]).unwrap();
        assert_eq!(h.local_positions(), &[Vector3::zeros()]);
    }

    #[test]
    fn distortor_indices_are_checked_on_attach() {
        let bad = Distortor::new().with_op(DistortionOp::Torsion {
            axis: [0, 1],
            moving: vec![5],
            max_angle_deg: 10.0,
        });
        assert!(matches!(
            carbon_monoxide().with_distortor(bad),
            Err(AdsorbateError::Distortion { .. })
        ));
    }

    #[test]
    fn distort_and_undistort_round_trip() {
        let mut co = carbon_monoxide()
            .with_distortor(Distortor::new().with_op(DistortionOp::Tilt {
                max_angle_deg: 30.0,
            }))
            .unwrap();
        let original = co.local_positions().to_vec();
        let mut rng = StdRng::seed_from_u64(42);

        assert!(co.distort(&mut rng).unwrap());
        assert!(co.take_geometry_changed());
        co.undistort().unwrap();
        assert_eq!(co.local_positions(), original.as_slice());
        assert_eq!(co.undistort(), Err(DistortionError::NothingToUndo));
    }

    #[test]
    fn adsorbate_without_distortor_is_never_distorted() {
        let mut co = carbon_monoxide();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!co.distort(&mut rng).unwrap());
        assert!(!co.take_geometry_changed());
        assert_eq!(co.undistort(), Err(DistortionError::NothingToUndo));
    }
}
