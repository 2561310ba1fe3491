use super::prepare_surface;
use crate::cli::SitesArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use adspack::core::models::ids::AtomId;
use adspack::core::models::substrate::Substrate;
use adspack::core::sites::catalog::SiteCatalog;
use adspack::engine::progress::ProgressReporter;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use tracing::info;

/// One row of the site table. Atom indices are 0-based positions in the substrate file.
#[derive(Debug, Serialize)]
struct SiteRecord {
    index: usize,
    #[serde(rename = "type")]
    site_type: &'static str,
    origin_x: f64,
    origin_y: f64,
    origin_z: f64,
    normal_x: f64,
    normal_y: f64,
    normal_z: f64,
    tangent_x: f64,
    tangent_y: f64,
    tangent_z: f64,
    atoms: String,
    neighbors: usize,
}

pub fn run(args: SitesArgs) -> Result<()> {
    let job = config::build_sites_job(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating active sites...");
    let (substrate, catalog) = prepare_surface(&job, &reporter)?;

    let file = std::fs::File::create(&args.output)?;
    let rows = write_sites(&substrate, &catalog, file)?;
    info!("Wrote {} site(s) to {:?}", rows, &args.output);
    println!("✓ {} site(s) written to: {}", rows, args.output.display());
    Ok(())
}

fn write_sites(substrate: &Substrate, catalog: &SiteCatalog, out: impl Write) -> Result<usize> {
    let atom_index: HashMap<AtomId, usize> = substrate
        .atoms_iter()
        .enumerate()
        .map(|(i, (id, _))| (id, i))
        .collect();

    let mut writer = csv::Writer::from_writer(out);
    for (index, (id, site)) in catalog.iter().enumerate() {
        let (origin, normal, tangent) = (site.origin(), site.normal(), site.tangent());
        let atoms = site
            .bound_atoms()
            .iter()
            .filter_map(|a| atom_index.get(a))
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");
        writer.serialize(SiteRecord {
            index,
            site_type: site.site_type().as_str(),
            origin_x: origin.x,
            origin_y: origin.y,
            origin_z: origin.z,
            normal_x: normal.x,
            normal_y: normal.y,
            normal_z: normal.z,
            tangent_x: tangent.x,
            tangent_y: tangent.y,
            tangent_z: tangent.z,
            atoms,
            neighbors: catalog.adjacency().neighbors(id).len(),
        })?;
    }
    writer.flush()?;
    Ok(catalog.len())
}
