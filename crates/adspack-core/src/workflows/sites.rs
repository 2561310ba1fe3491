use crate::core::models::site::{ActiveSite, SiteType};
use crate::core::models::substrate::{Substrate, Surface, SurfaceLayer};
use crate::core::sites::catalog::SiteCatalog;
use crate::core::sites::{SiteGenerationError, edge, face, vertex};
use crate::engine::config::SiteGenerationConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument, warn};

/// Builds the site catalog of a substrate's top layer.
///
/// Runs the Vertex, Edge, and Face stages selected by `config.site_types` in that order,
/// appends their sites to one list, and connects the sites into the adjacency graph.
#[instrument(skip_all, name = "site_generation_workflow")]
pub fn run(
    substrate: &Substrate,
    config: &SiteGenerationConfig,
    reporter: &ProgressReporter,
) -> Result<SiteCatalog, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Surface Extraction",
    });
    let layer = substrate.surface_layer(config.layer_tolerance)?;
    info!(
        atoms = layer.len(),
        bonds = layer.bonds().len(),
        "Extracted top surface layer."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Site Generation",
    });
    let stages: Vec<SiteType> = SiteType::ALL
        .into_iter()
        .filter(|&t| config.site_types.matches(t))
        .collect();
    reporter.report(Progress::TaskStart {
        total_steps: stages.len() as u64,
    });

    let mut sites = Vec::new();
    for stage in stages {
        let generated = generate_stage(stage, &layer, config)?;
        debug!(stage = %stage, count = generated.len(), "Site stage finished.");
        sites.extend(generated);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    if sites.is_empty() {
        warn!("No active sites were generated for this surface.");
    }

    reporter.report(Progress::PhaseStart {
        name: "Site Adjacency",
    });
    let catalog = SiteCatalog::new(sites, config.adjacency_threshold);
    reporter.report(Progress::PhaseFinish);

    info!(
        sites = catalog.len(),
        adjacencies = catalog.adjacency().edge_count(),
        "Site catalog ready."
    );
    Ok(catalog)
}

fn generate_stage(
    stage: SiteType,
    layer: &SurfaceLayer<'_>,
    config: &SiteGenerationConfig,
) -> Result<Vec<ActiveSite>, SiteGenerationError> {
    match stage {
        SiteType::Vertex => vertex::generate(layer, config.vertex_distance),
        SiteType::Edge => edge::generate(layer, config.edge_distance, config.edge_two_fold_symmetric),
        SiteType::Face => face::generate(layer, config.face_distance, &config.face),
    }
}
