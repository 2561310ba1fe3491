use crate::core::models::adsorbate::Adsorbate;
use crate::core::models::site::SiteTypes;
use crate::core::models::substrate::Substrate;
use crate::core::sites::catalog::SiteCatalog;
use crate::engine::config::{PackingConfig, SamplingConfig};
use crate::engine::conformation::Conformation;
use crate::engine::error::EngineError;
use crate::engine::packer::AdsorbatePacker;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

type SessionResult = Result<Vec<Conformation>, EngineError>;

/// Samples `config.num_conformations` independent packings of `adsorbates` on `catalog`.
///
/// The conformations are split across `config.num_sessions` packing sessions. Session `k`
/// owns copies of the adsorbates and a random source seeded with `seed + k`, so a seeded run
/// is reproducible whether or not the sessions run in parallel. Each conformation comes from
/// a fresh random packing, optionally followed by one distortion pass. The result is ordered
/// by session, then by sampling order within the session.
///
/// # Errors
///
/// Fails before sampling if an adsorbate binds to a site type the catalog does not offer,
/// and with [`EngineError::Packing`] if any session cannot pack the adsorbates.
#[instrument(skip_all, name = "sampling_workflow")]
pub fn run(
    substrate: &Substrate,
    catalog: &SiteCatalog,
    adsorbates: &[Adsorbate],
    config: &SamplingConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<Conformation>, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Validation",
    });
    check_site_coverage(catalog, adsorbates)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Sampling" });
    let quotas = session_quotas(config.num_conformations, config.num_sessions);
    info!(
        conformations = config.num_conformations,
        sessions = quotas.len(),
        adsorbates = adsorbates.len(),
        "Starting conformation sampling."
    );
    reporter.report(Progress::TaskStart {
        total_steps: config.num_conformations as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = quotas.iter().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = quotas.par_iter().enumerate();

    let results: Vec<SessionResult> = iterator
        .map(|(session, &quota)| {
            run_session(session, quota, substrate, catalog, adsorbates, config, reporter)
        })
        .collect();

    reporter.report(Progress::TaskFinish);

    let mut conformations = Vec::with_capacity(config.num_conformations);
    for result in results {
        conformations.extend(result?);
    }

    info!(
        conformations = conformations.len(),
        "Conformation sampling finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(conformations)
}

fn run_session(
    session: usize,
    quota: usize,
    substrate: &Substrate,
    catalog: &SiteCatalog,
    adsorbates: &[Adsorbate],
    config: &SamplingConfig,
    reporter: &ProgressReporter,
) -> SessionResult {
    let packing = PackingConfig {
        seed: config
            .packing
            .seed
            .map(|seed| seed.wrapping_add(session as u64)),
        ..config.packing.clone()
    };
    let mut packer = AdsorbatePacker::new(substrate, catalog, adsorbates.to_vec(), packing);

    let mut conformations = Vec::with_capacity(quota);
    for _ in 0..quota {
        packer.random_packing()?;
        if config.randomize_conformation {
            let kept = packer.randomize_conformation()?;
            trace!(session, kept, "Distortion pass finished.");
        }
        conformations.push(packer.conformation());
        reporter.report(Progress::TaskIncrement);
    }

    debug!(
        session,
        conformations = conformations.len(),
        "Packing session finished."
    );
    reporter.report(Progress::SessionFinish {
        session,
        conformations: conformations.len(),
    });
    Ok(conformations)
}

/// Splits `total` as evenly as possible over `sessions`, earlier sessions taking the
/// remainder.
fn session_quotas(total: usize, sessions: usize) -> Vec<usize> {
    let sessions = sessions.max(1);
    let (base, remainder) = (total / sessions, total % sessions);
    (0..sessions)
        .map(|k| base + usize::from(k < remainder))
        .collect()
}

fn check_site_coverage(catalog: &SiteCatalog, adsorbates: &[Adsorbate]) -> Result<(), EngineError> {
    for adsorbate in adsorbates {
        let site_type = adsorbate.site_type();
        if catalog.sites_of_type(SiteTypes::only(site_type)).is_empty() {
            return Err(EngineError::PhaseFailed {
                phase: "Validation",
                reason: format!(
                    "adsorbate '{}' binds to {} sites, but the catalog has none",
                    adsorbate.name(),
                    site_type
                ),
            });
        }
    }
    Ok(())
}
