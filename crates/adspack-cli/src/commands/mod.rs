pub mod sample;
pub mod sites;

use crate::config::SurfaceJob;
use crate::error::{CliError, Result};
use crate::io::xyz::XyzFile;
use adspack::core::models::substrate::Substrate;
use adspack::core::sites::catalog::SiteCatalog;
use adspack::engine::progress::ProgressReporter;
use adspack::workflows;
use tracing::{debug, info, warn};

/// Inferred bonds reach this far past the nearest-neighbor spacing.
const BOND_CUTOFF_FACTOR: f64 = 1.2;
/// Atom pairs closer than this are treated as duplicates when measuring the spacing.
const MIN_PAIR_DISTANCE: f64 = 1e-6;

/// Reads the substrate, builds its bond graph, and generates the site catalog.
pub fn prepare_surface(
    job: &SurfaceJob,
    reporter: &ProgressReporter,
) -> Result<(Substrate, SiteCatalog)> {
    let substrate = load_substrate(job)?;

    let mut sites_config = job.sites.clone();
    if job.adjacency_threshold.is_none() {
        if let Some(spacing) = nearest_neighbor_distance(&substrate) {
            debug!(spacing, "Using the nearest-neighbor spacing as adjacency threshold.");
            sites_config.adjacency_threshold = spacing;
        }
    }

    info!("Generating active sites...");
    let catalog = workflows::sites::run(&substrate, &sites_config, reporter)?;
    info!(
        "Generated {} active site(s) with {} adjacency edge(s).",
        catalog.len(),
        catalog.adjacency().edge_count()
    );
    Ok((substrate, catalog))
}

fn load_substrate(job: &SurfaceJob) -> Result<Substrate> {
    info!("Loading substrate from {:?}", &job.substrate_path);
    let frame = XyzFile::read_from_path(&job.substrate_path).map_err(|e| {
        CliError::FileParsing {
            path: job.substrate_path.clone(),
            source: e.into(),
        }
    })?;
    let lattice = frame.lattice().map_err(|kind| CliError::FileParsing {
        path: job.substrate_path.clone(),
        source: anyhow::anyhow!("invalid lattice in comment line: {kind}"),
    })?;

    let mut substrate = match lattice {
        Some(lattice) => Substrate::with_lattice(lattice),
        None => {
            debug!("No lattice in the comment line; using the unit cell.");
            Substrate::new()
        }
    };
    if let Some(direction) = job.positive_direction {
        substrate.set_positive_direction(direction)?;
    }
    for atom in frame.atoms {
        substrate.add_atom(atom);
    }

    let cutoff = match job.bond_cutoff {
        Some(cutoff) => Some(cutoff),
        None => nearest_neighbor_distance(&substrate).map(|d| d * BOND_CUTOFF_FACTOR),
    };
    match cutoff {
        Some(cutoff) => {
            let bonds = substrate.infer_bonds(cutoff)?;
            info!(
                "Loaded {} substrate atom(s) with {} bond(s) (cutoff {:.3} A).",
                substrate.atom_count(),
                bonds,
                cutoff
            );
        }
        None => warn!("Substrate has fewer than two distinct atoms; no bonds inferred."),
    }
    Ok(substrate)
}

/// Shortest distance between two distinct substrate atoms.
fn nearest_neighbor_distance(substrate: &Substrate) -> Option<f64> {
    let positions: Vec<_> = substrate.atoms_iter().map(|(_, a)| a.position).collect();
    let mut best: Option<f64> = None;
    for (i, p) in positions.iter().enumerate() {
        for q in &positions[i + 1..] {
            let d = (p - q).norm();
            if d > MIN_PAIR_DISTANCE && best.is_none_or(|b| d < b) {
                best = Some(d);
            }
        }
    }
    best
}
