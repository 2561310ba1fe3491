//! # Core Module
//!
//! Fundamental data structures and geometry for describing a catalytic surface, the active
//! sites on it, and the adsorbates that bind to those sites.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Substrate atoms and connectivity, active sites, adsorbates
//! - **Geometry** ([`utils`]) - Normal fitting, ring centers, rotations, template orientation
//! - **Site Discovery** ([`sites`]) - Vertex, edge, and face site stages plus site adjacency
//! - **Distortion** ([`distortion`]) - Reversible perturbation of adsorbate internal geometry
//!
//! Everything in this layer is free of session state: a `SiteCatalog` built here can be
//! shared read-only by any number of packing sessions.

pub mod distortion;
pub mod models;
pub mod sites;
pub mod utils;
