//! Processing job domain entities.

pub mod model;
pub mod status;

pub use model::{CreateJob, ProcessingJob};
pub use status::{JobStatus, JobType};
