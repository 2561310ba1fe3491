mod builder;
mod file;
mod models;

pub use builder::{build_sample_job, build_sites_job};
pub use models::{SampleJob, SurfaceJob};
