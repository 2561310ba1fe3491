//! # Engine Module
//!
//! The stateful side of adspack: packing sessions that assign adsorbates to the sites of a
//! shared, read-only [`SiteCatalog`](crate::core::sites::catalog::SiteCatalog).
//!
//! ## Architecture
//!
//! - **Packing** ([`packer`]) - The session itself: placement, removal, random packing,
//!   conformation randomization, and the queries over its state
//! - **Site Status** ([`status`]) - The per-site available/occupied/hindered automaton
//! - **Collision Checks** ([`collision`]) - Minimum interatomic distance tests between
//!   adsorbates
//! - **Output** ([`conformation`]) - Flattened substrate-plus-adsorbate atom lists
//! - **Configuration** ([`config`]) - Site-generation, packing, and sampling parameters
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Session and workflow error types
//!
//! A session never mutates the catalog, so independent sessions may run concurrently over
//! the same surface.

pub mod collision;
pub mod config;
pub mod conformation;
pub mod error;
pub mod packer;
pub mod progress;
pub mod status;
