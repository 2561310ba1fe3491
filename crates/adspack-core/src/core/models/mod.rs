//! # Core Models Module
//!
//! Data structures for the surface, its active sites, and the adsorbates placed on them.
//!
//! ## Key Components
//!
//! - [`ids`] - Arena handles for atoms, sites, and adsorbates
//! - [`atom`] - A substrate atom: element symbol and Cartesian position
//! - [`substrate`] - The surface provider: atoms, bonds, lattice, positive direction
//! - [`site`] - Active-site value objects, site types, and type filters
//! - [`adsorbate`] - Relative-coordinate adsorbate templates and their site attachment
//!
//! ## Usage
//!
//! ```ignore
//! use adspack::core::models::{atom::Atom, substrate::Substrate};
//!
//! let mut substrate = Substrate::new();
//! let a = substrate.add_atom(Atom::new("Cu", Point3::new(0.0, 0.0, 0.0)));
//! let b = substrate.add_atom(Atom::new("Cu", Point3::new(2.55, 0.0, 0.0)));
//! substrate.add_bond(a, b)?;
//! let layer = substrate.surface_layer(0.1)?;
//! ```

pub mod adsorbate;
pub mod atom;
pub mod ids;
pub mod site;
pub mod substrate;
