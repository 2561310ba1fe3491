use nalgebra::Point3;

/// A substrate atom.
///
/// Substrate atoms are fixed during packing; only their element symbol and position are
/// needed to derive site geometry and to emit conformations.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol (e.g., "Cu", "Pt").
    pub element: String,
    /// The Cartesian coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(element: &str, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            position,
        }
    }
}
