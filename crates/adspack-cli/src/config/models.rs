use adspack::core::models::adsorbate::Adsorbate;
use adspack::engine::config::{SamplingConfig, SiteGenerationConfig};
use nalgebra::Vector3;
use std::path::PathBuf;

/// Everything needed to turn a substrate file into a site catalog.
#[derive(Debug, Clone)]
pub struct SurfaceJob {
    pub substrate_path: PathBuf,
    /// Bond cutoff in Angstroms; derived from the nearest-neighbor spacing when unset.
    pub bond_cutoff: Option<f64>,
    pub positive_direction: Option<Vector3<f64>>,
    /// Adjacency threshold from the job file. When unset, `sites.adjacency_threshold` is
    /// replaced by the nearest-neighbor spacing of the loaded substrate.
    pub adjacency_threshold: Option<f64>,
    pub sites: SiteGenerationConfig,
}

#[derive(Debug, Clone)]
pub struct SampleJob {
    pub surface: SurfaceJob,
    /// One entry per adsorbate instance, in packing order.
    pub adsorbates: Vec<Adsorbate>,
    pub sampling: SamplingConfig,
}
