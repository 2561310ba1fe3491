//! # Workflows Module
//!
//! Top-level entry points that run complete adspack procedures with progress reporting.
//!
//! - **Site Generation** ([`sites`]) - Extracts the top layer of a substrate, runs the
//!   selected site stages, and connects the sites into a shareable `SiteCatalog`.
//! - **Sampling** ([`sample`]) - Runs independent packing sessions over a catalog and
//!   collects the resulting conformations, optionally in parallel.
//!
//! A typical driver calls [`sites::run`] once per surface and [`sample::run`] once per
//! adsorbate mixture.

pub mod sample;
pub mod sites;
