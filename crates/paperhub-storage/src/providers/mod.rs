//! Object storage gateway implementations.

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
