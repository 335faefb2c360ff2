//! # paperhub-storage
//!
//! Object storage gateway implementations for PaperHub: a local
//! filesystem store issuing HMAC-signed presigned links, an S3-compatible
//! store (behind the `s3` feature), and an in-memory store for tests.

pub mod factory;
pub mod providers;

pub use factory::connect;
pub use providers::local::LocalObjectStorage;
pub use providers::memory::MemoryObjectStorage;
