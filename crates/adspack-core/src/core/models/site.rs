use super::ids::AtomId;
use nalgebra::{Point3, Unit, Vector3};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

const MIN_DIRECTION_NORM: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SiteError {
    #[error("Site direction must have a non-zero length")]
    ZeroDirection,
    #[error("Unknown site type '{0}'")]
    UnknownType(String),
}

/// The geometric class of a monodentate active site.
///
/// The ordering `Vertex < Edge < Face` is used for tie-breaking wherever sites of
/// different types must be ranked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum SiteType {
    /// Above a single surface atom ("top" site).
    Vertex,
    /// Above the midpoint of a surface bond ("bridge" site).
    Edge,
    /// Above the center of a surface ring ("hollow" site).
    Face,
}

static SITE_TYPE_NAMES: phf::Map<&'static str, SiteType> = phf_map! {
    "vertex" => SiteType::Vertex,
    "v" => SiteType::Vertex,
    "top" => SiteType::Vertex,
    "t" => SiteType::Vertex,
    "edge" => SiteType::Edge,
    "e" => SiteType::Edge,
    "bridge" => SiteType::Edge,
    "b" => SiteType::Edge,
    "face" => SiteType::Face,
    "f" => SiteType::Face,
    "hollow" => SiteType::Face,
    "h" => SiteType::Face,
};

impl SiteType {
    pub const ALL: [SiteType; 3] = [SiteType::Vertex, SiteType::Edge, SiteType::Face];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Vertex => "vertex",
            SiteType::Edge => "edge",
            SiteType::Face => "face",
        }
    }

    fn bit(self) -> u8 {
        match self {
            SiteType::Vertex => 0b001,
            SiteType::Edge => 0b010,
            SiteType::Face => 0b100,
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteType {
    type Err = SiteError;

    /// Parses a site type name, case-insensitively. Accepts the surface-science synonyms
    /// `top`, `bridge`, and `hollow` as well as one-letter abbreviations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SITE_TYPE_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| SiteError::UnknownType(s.to_string()))
    }
}

impl TryFrom<String> for SiteType {
    type Error = SiteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SiteType> for String {
    fn from(value: SiteType) -> Self {
        value.as_str().to_string()
    }
}

/// A set of site types used to filter queries. The empty set matches every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SiteTypes(u8);

impl SiteTypes {
    /// The empty set, which acts as "no filter".
    pub const fn any() -> Self {
        Self(0)
    }

    pub fn only(site_type: SiteType) -> Self {
        Self(site_type.bit())
    }

    pub fn with(self, site_type: SiteType) -> Self {
        Self(self.0 | site_type.bit())
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, site_type: SiteType) -> bool {
        self.0 & site_type.bit() != 0
    }

    /// Whether `site_type` passes this filter.
    pub fn matches(&self, site_type: SiteType) -> bool {
        self.is_empty() || self.contains(site_type)
    }
}

impl From<SiteType> for SiteTypes {
    fn from(value: SiteType) -> Self {
        Self::only(value)
    }
}

impl FromIterator<SiteType> for SiteTypes {
    fn from_iter<I: IntoIterator<Item = SiteType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::any(), Self::with)
    }
}

/// An oriented local frame: `origin`, unit `normal` (local `z`), unit `tangent` (local `y`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteFrame {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    pub tangent: Unit<Vector3<f64>>,
}

impl SiteFrame {
    /// Maps local template coordinates into the lab frame.
    ///
    /// `z` is the normal, `y` the tangent and `x = y × z`, so the frame is right-handed.
    pub fn to_lab(&self, local: &Vector3<f64>) -> Point3<f64> {
        let z = self.normal.as_ref();
        let y = self.tangent.as_ref();
        let x = y.cross(z);
        self.origin + x * local.x + y * local.y + z * local.z
    }
}

/// A typed anchor point with an oriented frame where an adsorbate can bind.
///
/// Sites are created by the site-generation stages and never change afterwards. Two sites
/// compare equal, and hash equally, when their type, origin, normal, and tangent coincide;
/// the bound atoms are not part of a site's identity.
#[derive(Debug, Clone)]
pub struct ActiveSite {
    site_type: SiteType,
    frame: SiteFrame,
    bound_atoms: Vec<AtomId>,
}

impl ActiveSite {
    /// Creates a site, normalizing `normal` and `tangent`.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::ZeroDirection`] if either direction has zero length.
    pub fn new(
        site_type: SiteType,
        origin: Point3<f64>,
        normal: Vector3<f64>,
        tangent: Vector3<f64>,
        bound_atoms: Vec<AtomId>,
    ) -> Result<Self, SiteError> {
        Ok(Self {
            site_type,
            frame: SiteFrame {
                origin,
                normal: normalize(normal)?,
                tangent: normalize(tangent)?,
            },
            bound_atoms,
        })
    }

    pub fn site_type(&self) -> SiteType {
        self.site_type
    }

    pub fn origin(&self) -> Point3<f64> {
        self.frame.origin
    }

    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.frame.normal
    }

    pub fn tangent(&self) -> Unit<Vector3<f64>> {
        self.frame.tangent
    }

    pub fn frame(&self) -> &SiteFrame {
        &self.frame
    }

    /// The surface atoms this site is anchored to, in ring or bond order.
    pub fn bound_atoms(&self) -> &[AtomId] {
        &self.bound_atoms
    }

    fn identity_bits(&self) -> [u64; 9] {
        let o = &self.frame.origin;
        let n = self.frame.normal.as_ref();
        let t = self.frame.tangent.as_ref();
        [o.x, o.y, o.z, n.x, n.y, n.z, t.x, t.y, t.z].map(canonical_bits)
    }
}

impl PartialEq for ActiveSite {
    fn eq(&self, other: &Self) -> bool {
        self.site_type == other.site_type && self.identity_bits() == other.identity_bits()
    }
}

impl Eq for ActiveSite {}

impl Hash for ActiveSite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.site_type.hash(state);
        self.identity_bits().hash(state);
    }
}

/// Bit pattern of a float with `-0.0` folded onto `0.0`, so equal values hash equally.
fn canonical_bits(value: f64) -> u64 {
    let folded = if value == 0.0 { 0.0f64 } else { value };
    folded.to_bits()
}

pub(crate) fn normalize(vector: Vector3<f64>) -> Result<Unit<Vector3<f64>>, SiteError> {
    Unit::try_new(vector, MIN_DIRECTION_NORM).ok_or(SiteError::ZeroDirection)
}
