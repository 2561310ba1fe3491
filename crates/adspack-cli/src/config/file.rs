use crate::error::{CliError, Result};
use adspack::core::distortion::DistortionOp;
use adspack::core::models::site::SiteType;
use adspack::core::sites::face::FaceCenter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSubstrateConfig {
    pub path: Option<PathBuf>,
    pub bond_cutoff: Option<f64>,
    pub positive_direction: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSitesConfig {
    pub types: Option<Vec<SiteType>>,
    pub layer_tolerance: Option<f64>,
    pub surface_distance: Option<f64>,
    pub vertex_distance: Option<f64>,
    pub edge_distance: Option<f64>,
    pub face_distance: Option<f64>,
    pub adjacency_threshold: Option<f64>,
    pub edge_two_fold_symmetric: Option<bool>,
    pub ring_sizes: Option<Vec<usize>>,
    pub symmetric_ring_sizes: Option<Vec<usize>>,
    pub face_center: Option<FaceCenter>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePackingConfig {
    pub collision_threshold: Option<f64>,
    pub max_placement_attempts: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSamplingConfig {
    pub conformations: Option<usize>,
    pub sessions: Option<usize>,
    pub randomize: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileTemplateAtom {
    pub element: String,
    pub position: [f64; 3],
}

/// One `[[adsorbates]]` entry. The template comes either from an XYZ file (`path`) or from
/// inline `atoms` already expressed in the local site frame.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAdsorbateConfig {
    pub name: String,
    pub site: SiteType,
    pub path: Option<PathBuf>,
    pub atoms: Option<Vec<FileTemplateAtom>>,
    pub reference: Option<Vec<usize>>,
    pub count: Option<usize>,
    #[serde(default)]
    pub distortions: Vec<DistortionOp>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub substrate: Option<FileSubstrateConfig>,
    pub sites: Option<FileSitesConfig>,
    pub packing: Option<FilePackingConfig>,
    pub sampling: Option<FileSamplingConfig>,
    #[serde(default)]
    pub adsorbates: Vec<FileAdsorbateConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
