use crate::core::models::site::SiteTypes;
use crate::core::models::substrate::DEFAULT_SURFACE_TOLERANCE;
use crate::core::sites::face::{FaceCenter, FaceOptions};
use thiserror::Error;

pub const DEFAULT_SURFACE_DISTANCE: f64 = 1.0;
pub const DEFAULT_ADJACENCY_THRESHOLD: f64 = 1.0;
pub const DEFAULT_COLLISION_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MAX_PLACEMENT_ATTEMPTS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn require_positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

fn require_nonzero(parameter: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: "must be at least 1".to_string(),
        })
    }
}

/// Parameters of the site-discovery stages.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteGenerationConfig {
    /// Which stages run. The empty set runs all of them.
    pub site_types: SiteTypes,
    /// Half-width of the height band that selects the top surface layer.
    pub layer_tolerance: f64,
    pub vertex_distance: f64,
    pub edge_distance: f64,
    pub face_distance: f64,
    /// Distance between neighboring Vertex site origins, usually the nearest-neighbor
    /// spacing of the surface.
    pub adjacency_threshold: f64,
    pub edge_two_fold_symmetric: bool,
    pub face: FaceOptions,
}

impl Default for SiteGenerationConfig {
    fn default() -> Self {
        Self {
            site_types: SiteTypes::any(),
            layer_tolerance: DEFAULT_SURFACE_TOLERANCE,
            vertex_distance: DEFAULT_SURFACE_DISTANCE,
            edge_distance: DEFAULT_SURFACE_DISTANCE,
            face_distance: DEFAULT_SURFACE_DISTANCE,
            adjacency_threshold: DEFAULT_ADJACENCY_THRESHOLD,
            edge_two_fold_symmetric: false,
            face: FaceOptions::default(),
        }
    }
}

#[derive(Default)]
pub struct SiteGenerationConfigBuilder {
    site_types: Option<SiteTypes>,
    layer_tolerance: Option<f64>,
    vertex_distance: Option<f64>,
    edge_distance: Option<f64>,
    face_distance: Option<f64>,
    adjacency_threshold: Option<f64>,
    edge_two_fold_symmetric: Option<bool>,
    ring_sizes: Option<Vec<usize>>,
    symmetric_ring_sizes: Option<Vec<usize>>,
    face_center: Option<FaceCenter>,
}

impl SiteGenerationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site_types(mut self, types: SiteTypes) -> Self {
        self.site_types = Some(types);
        self
    }
    pub fn layer_tolerance(mut self, tolerance: f64) -> Self {
        self.layer_tolerance = Some(tolerance);
        self
    }
    /// Sets the same surface distance for all three site types.
    pub fn surface_distance(mut self, distance: f64) -> Self {
        self.vertex_distance = Some(distance);
        self.edge_distance = Some(distance);
        self.face_distance = Some(distance);
        self
    }
    pub fn vertex_distance(mut self, distance: f64) -> Self {
        self.vertex_distance = Some(distance);
        self
    }
    pub fn edge_distance(mut self, distance: f64) -> Self {
        self.edge_distance = Some(distance);
        self
    }
    pub fn face_distance(mut self, distance: f64) -> Self {
        self.face_distance = Some(distance);
        self
    }
    pub fn adjacency_threshold(mut self, threshold: f64) -> Self {
        self.adjacency_threshold = Some(threshold);
        self
    }
    pub fn edge_two_fold_symmetric(mut self, symmetric: bool) -> Self {
        self.edge_two_fold_symmetric = Some(symmetric);
        self
    }
    pub fn ring_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.ring_sizes = Some(sizes);
        self
    }
    pub fn symmetric_ring_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.symmetric_ring_sizes = Some(sizes);
        self
    }
    pub fn face_center(mut self, center: FaceCenter) -> Self {
        self.face_center = Some(center);
        self
    }

    pub fn build(self) -> Result<SiteGenerationConfig, ConfigError> {
        let defaults = SiteGenerationConfig::default();
        let ring_sizes = self.ring_sizes.unwrap_or(defaults.face.ring_sizes);
        if let Some(&size) = ring_sizes.iter().find(|&&n| n < 3) {
            return Err(ConfigError::InvalidValue {
                parameter: "ring_sizes",
                reason: format!("a ring needs at least 3 atoms, got {size}"),
            });
        }
        let finite = |parameter: &'static str, value: f64| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ConfigError::InvalidValue {
                    parameter,
                    reason: format!("must be finite, got {value}"),
                })
            }
        };

        Ok(SiteGenerationConfig {
            site_types: self.site_types.unwrap_or(defaults.site_types),
            layer_tolerance: require_positive(
                "layer_tolerance",
                self.layer_tolerance.unwrap_or(defaults.layer_tolerance),
            )?,
            vertex_distance: finite(
                "vertex_distance",
                self.vertex_distance.unwrap_or(defaults.vertex_distance),
            )?,
            edge_distance: finite(
                "edge_distance",
                self.edge_distance.unwrap_or(defaults.edge_distance),
            )?,
            face_distance: finite(
                "face_distance",
                self.face_distance.unwrap_or(defaults.face_distance),
            )?,
            adjacency_threshold: require_positive(
                "adjacency_threshold",
                self.adjacency_threshold
                    .unwrap_or(defaults.adjacency_threshold),
            )?,
            edge_two_fold_symmetric: self
                .edge_two_fold_symmetric
                .unwrap_or(defaults.edge_two_fold_symmetric),
            face: FaceOptions {
                ring_sizes,
                symmetric_ring_sizes: self
                    .symmetric_ring_sizes
                    .unwrap_or(defaults.face.symmetric_ring_sizes),
                center: self.face_center.unwrap_or(defaults.face.center),
            },
        })
    }
}

/// Parameters of one packing session.
#[derive(Debug, Clone, PartialEq)]
pub struct PackingConfig {
    /// Minimum allowed distance between atoms of different adsorbates.
    pub collision_threshold: f64,
    /// Sampled placement attempts per adsorbate before random packing gives up.
    pub max_placement_attempts: usize,
    /// Seed of the session's random source. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            collision_threshold: DEFAULT_COLLISION_THRESHOLD,
            max_placement_attempts: DEFAULT_MAX_PLACEMENT_ATTEMPTS,
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct PackingConfigBuilder {
    collision_threshold: Option<f64>,
    max_placement_attempts: Option<usize>,
    seed: Option<u64>,
}

impl PackingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collision_threshold(mut self, threshold: f64) -> Self {
        self.collision_threshold = Some(threshold);
        self
    }
    pub fn max_placement_attempts(mut self, attempts: usize) -> Self {
        self.max_placement_attempts = Some(attempts);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<PackingConfig, ConfigError> {
        Ok(PackingConfig {
            collision_threshold: require_positive(
                "collision_threshold",
                self.collision_threshold
                    .unwrap_or(DEFAULT_COLLISION_THRESHOLD),
            )?,
            max_placement_attempts: require_nonzero(
                "max_placement_attempts",
                self.max_placement_attempts
                    .unwrap_or(DEFAULT_MAX_PLACEMENT_ATTEMPTS),
            )?,
            seed: self.seed,
        })
    }
}

/// Parameters of the sampling workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub packing: PackingConfig,
    /// Total number of conformations to produce.
    pub num_conformations: usize,
    /// Independent sessions the conformations are split across.
    pub num_sessions: usize,
    /// Whether each packing is followed by a distortion pass.
    pub randomize_conformation: bool,
}

#[derive(Default)]
pub struct SamplingConfigBuilder {
    packing: Option<PackingConfig>,
    num_conformations: Option<usize>,
    num_sessions: Option<usize>,
    randomize_conformation: Option<bool>,
}

impl SamplingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packing(mut self, packing: PackingConfig) -> Self {
        self.packing = Some(packing);
        self
    }
    pub fn num_conformations(mut self, n: usize) -> Self {
        self.num_conformations = Some(n);
        self
    }
    pub fn num_sessions(mut self, n: usize) -> Self {
        self.num_sessions = Some(n);
        self
    }
    pub fn randomize_conformation(mut self, enabled: bool) -> Self {
        self.randomize_conformation = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SamplingConfig, ConfigError> {
        Ok(SamplingConfig {
            packing: self.packing.unwrap_or_default(),
            num_conformations: require_nonzero(
                "num_conformations",
                self.num_conformations
                    .ok_or(ConfigError::MissingParameter("num_conformations"))?,
            )?,
            num_sessions: require_nonzero("num_sessions", self.num_sessions.unwrap_or(1))?,
            randomize_conformation: self.randomize_conformation.unwrap_or(true),
        })
    }
}
