use super::file::{FileAdsorbateConfig, FileConfig};
use super::models::{SampleJob, SurfaceJob};
use crate::cli::{SampleArgs, SitesArgs};
use crate::error::{CliError, Result};
use crate::io::xyz::XyzFile;
use adspack::core::distortion::Distortor;
use adspack::core::models::adsorbate::Adsorbate;
use adspack::engine::config as core_config;
use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_NUM_CONFORMATIONS: usize = 1;
const DEFAULT_NUM_SESSIONS: usize = 1;

pub fn build_sites_job(args: &SitesArgs) -> Result<SurfaceJob> {
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    surface_job(&mut file_config, base_dir(&args.config))
}

pub fn build_sample_job(args: &SampleArgs) -> Result<SampleJob> {
    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let base = base_dir(&args.config);

    let surface = surface_job(&mut file_config, base)?;

    let packing_file = file_config.packing.take().unwrap_or_default();
    let mut packing = core_config::PackingConfigBuilder::new();
    if let Some(threshold) = packing_file.collision_threshold {
        packing = packing.collision_threshold(threshold);
    }
    if let Some(attempts) = packing_file.max_placement_attempts {
        packing = packing.max_placement_attempts(attempts);
    }
    if let Some(seed) = args.seed.or(packing_file.seed) {
        packing = packing.seed(seed);
    }
    let packing = packing
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let sampling_file = file_config.sampling.take().unwrap_or_default();
    let sampling = core_config::SamplingConfigBuilder::new()
        .packing(packing)
        .num_conformations(
            args.conformations
                .or(sampling_file.conformations)
                .unwrap_or(DEFAULT_NUM_CONFORMATIONS),
        )
        .num_sessions(
            args.sessions
                .or(sampling_file.sessions)
                .unwrap_or(DEFAULT_NUM_SESSIONS),
        )
        .randomize_conformation(!args.no_randomize && sampling_file.randomize.unwrap_or(true))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    if file_config.adsorbates.is_empty() {
        return Err(CliError::Config(
            "At least one `[[adsorbates]]` entry is required.".to_string(),
        ));
    }
    let mut adsorbates = Vec::new();
    for entry in &file_config.adsorbates {
        let template = load_adsorbate(entry, base)?;
        let count = entry.count.unwrap_or(1);
        debug!(name = %entry.name, count, atoms = template.len(), "Loaded adsorbate template.");
        adsorbates.extend(std::iter::repeat_n(template, count));
    }

    Ok(SampleJob {
        surface,
        adsorbates,
        sampling,
    })
}

fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new(""))
}

/// Paths in the job file are relative to the file itself.
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn surface_job(file_config: &mut FileConfig, base: &Path) -> Result<SurfaceJob> {
    let substrate = file_config.substrate.take().unwrap_or_default();
    let substrate_path = substrate.path.ok_or_else(|| {
        CliError::Config("`substrate.path` is required.".to_string())
    })?;

    let sites = file_config.sites.take().unwrap_or_default();
    let mut builder = core_config::SiteGenerationConfigBuilder::new();
    if let Some(types) = sites.types {
        builder = builder.site_types(types.into_iter().collect());
    }
    if let Some(tolerance) = sites.layer_tolerance {
        builder = builder.layer_tolerance(tolerance);
    }
    if let Some(distance) = sites.surface_distance {
        builder = builder.surface_distance(distance);
    }
    if let Some(distance) = sites.vertex_distance {
        builder = builder.vertex_distance(distance);
    }
    if let Some(distance) = sites.edge_distance {
        builder = builder.edge_distance(distance);
    }
    if let Some(distance) = sites.face_distance {
        builder = builder.face_distance(distance);
    }
    if let Some(threshold) = sites.adjacency_threshold {
        builder = builder.adjacency_threshold(threshold);
    }
    if let Some(symmetric) = sites.edge_two_fold_symmetric {
        builder = builder.edge_two_fold_symmetric(symmetric);
    }
    if let Some(sizes) = sites.ring_sizes {
        builder = builder.ring_sizes(sizes);
    }
    if let Some(sizes) = sites.symmetric_ring_sizes {
        builder = builder.symmetric_ring_sizes(sizes);
    }
    if let Some(center) = sites.face_center {
        builder = builder.face_center(center);
    }
    let sites_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    if let Some(cutoff) = substrate.bond_cutoff {
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(CliError::Config(format!(
                "`substrate.bond-cutoff` must be positive, got {cutoff}"
            )));
        }
    }

    Ok(SurfaceJob {
        substrate_path: resolve_path(base, &substrate_path),
        bond_cutoff: substrate.bond_cutoff,
        positive_direction: substrate.positive_direction.map(Vector3::from),
        adjacency_threshold: sites.adjacency_threshold,
        sites: sites_config,
    })
}

fn load_adsorbate(entry: &FileAdsorbateConfig, base: &Path) -> Result<Adsorbate> {
    let template = match (&entry.path, &entry.atoms) {
        (Some(path), None) => {
            let path = resolve_path(base, path);
            let frame = XyzFile::read_from_path(&path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            let reference = entry
                .reference
                .clone()
                .unwrap_or_else(|| (1..frame.atoms.len()).collect());
            Adsorbate::from_atoms(&entry.name, entry.site, &frame.atoms, &reference)?
        }
        (None, Some(atoms)) => {
            let (elements, positions) = atoms
                .iter()
                .map(|a| (a.element.clone(), Vector3::from(a.position)))
                .unzip();
            Adsorbate::new(&entry.name, entry.site, elements, positions)?
        }
        _ => {
            return Err(CliError::Config(format!(
                "Adsorbate '{}' needs exactly one of `path` or `atoms`.",
                entry.name
            )));
        }
    };

    if entry.distortions.is_empty() {
        return Ok(template);
    }
    let distortor = entry
        .distortions
        .iter()
        .cloned()
        .fold(Distortor::new(), Distortor::with_op);
    Ok(template.with_distortor(distortor)?)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "substrate.bond-cutoff" => {
                config
                    .substrate
                    .get_or_insert_with(Default::default)
                    .bond_cutoff = Some(parse_value(key, value)?);
            }
            "sites.layer-tolerance" => {
                config.sites.get_or_insert_with(Default::default).layer_tolerance =
                    Some(parse_value(key, value)?);
            }
            "sites.surface-distance" => {
                config.sites.get_or_insert_with(Default::default).surface_distance =
                    Some(parse_value(key, value)?);
            }
            "sites.vertex-distance" => {
                config.sites.get_or_insert_with(Default::default).vertex_distance =
                    Some(parse_value(key, value)?);
            }
            "sites.edge-distance" => {
                config.sites.get_or_insert_with(Default::default).edge_distance =
                    Some(parse_value(key, value)?);
            }
            "sites.face-distance" => {
                config.sites.get_or_insert_with(Default::default).face_distance =
                    Some(parse_value(key, value)?);
            }
            "sites.adjacency-threshold" => {
                config
                    .sites
                    .get_or_insert_with(Default::default)
                    .adjacency_threshold = Some(parse_value(key, value)?);
            }
            "packing.collision-threshold" => {
                config
                    .packing
                    .get_or_insert_with(Default::default)
                    .collision_threshold = Some(parse_value(key, value)?);
            }
            "packing.max-placement-attempts" => {
                config
                    .packing
                    .get_or_insert_with(Default::default)
                    .max_placement_attempts = Some(parse_value(key, value)?);
            }
            "packing.seed" => {
                config.packing.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value)?);
            }
            "sampling.conformations" => {
                config
                    .sampling
                    .get_or_insert_with(Default::default)
                    .conformations = Some(parse_value(key, value)?);
            }
            "sampling.sessions" => {
                config.sampling.get_or_insert_with(Default::default).sessions =
                    Some(parse_value(key, value)?);
            }
            "sampling.randomize" => {
                config.sampling.get_or_insert_with(Default::default).randomize =
                    Some(parse_value(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
