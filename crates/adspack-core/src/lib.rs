//! # adspack Core Library
//!
//! Generates candidate arrangements of adsorbate molecules bound to the active sites of a
//! periodic catalytic surface, for downstream electronic-structure or molecular-dynamics runs.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Substrate`, `ActiveSite`,
//!   `Adsorbate`), the vector algebra used to derive local site frames, and the pure
//!   site-generation stages that turn surface connectivity into typed, oriented sites.
//!
//! - **[`engine`]: The Logic Core.** The stateful packing session. It owns the per-site
//!   occupancy/hindrance automaton, the occupation ledger, collision checks, and the
//!   session's random source.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures: building a site catalog from
//!   a substrate and sampling a stream of valid full-surface conformations.

pub mod core;
pub mod engine;
pub mod workflows;
