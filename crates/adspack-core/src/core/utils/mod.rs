//! Vector-algebra helpers shared by the site stages and adsorbate templates.

pub mod geometry;
