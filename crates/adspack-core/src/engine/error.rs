use thiserror::Error;

use super::config::ConfigError;
use super::status::StatusError;
use crate::core::distortion::DistortionError;
use crate::core::models::adsorbate::AdsorbateError;
use crate::core::models::ids::{AdsorbateId, SiteId};
use crate::core::models::site::SiteType;
use crate::core::models::substrate::SubstrateError;
use crate::core::sites::SiteGenerationError;

/// Failures of a single packing session.
///
/// [`PackingError::Collision`] is ordinary control flow during random packing: the caller
/// is expected to try another site.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PackingError {
    #[error("Site {0:?} is not in the catalog")]
    UnknownSite(SiteId),

    #[error("Adsorbate {0:?} is not part of this session")]
    UnknownAdsorbate(AdsorbateId),

    #[error("Adsorbate {adsorbate:?} is already placed on site {site:?}")]
    AlreadyPlaced { adsorbate: AdsorbateId, site: SiteId },

    #[error("Site {0:?} is not available")]
    SiteUnavailable(SiteId),

    #[error("Adsorbate {adsorbate:?} binds to {required} sites, but site {site:?} is a {found} site")]
    TypeMismatch {
        adsorbate: AdsorbateId,
        site: SiteId,
        required: SiteType,
        found: SiteType,
    },

    #[error("Placement on site {site:?} collides with adsorbate {other:?} ({distance:.3} Å)")]
    Collision {
        site: SiteId,
        other: AdsorbateId,
        distance: f64,
    },

    #[error("Adsorbate {0:?} is not placed on any site")]
    NotPlaced(AdsorbateId),

    #[error("Adsorbate {0:?} is free and has no lab coordinates")]
    FreeAdsorbate(AdsorbateId),

    #[error("Could not place adsorbate '{name}' after {attempts} attempts")]
    Infeasible { name: String, attempts: usize },

    #[error("Site status transition failed: {0}")]
    Status(#[from] StatusError),

    #[error("Distortion failed: {0}")]
    Distortion(#[from] DistortionError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Substrate error: {source}")]
    Substrate {
        #[from]
        source: SubstrateError,
    },

    #[error("Site generation failed: {source}")]
    SiteGeneration {
        #[from]
        source: SiteGenerationError,
    },

    #[error("Invalid adsorbate: {source}")]
    Adsorbate {
        #[from]
        source: AdsorbateError,
    },

    #[error("Packing failed: {source}")]
    Packing {
        #[from]
        source: PackingError,
    },

    #[error("Phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },
}
