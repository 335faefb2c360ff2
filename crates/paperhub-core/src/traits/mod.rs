//! Core traits defined in `paperhub-core` and implemented by other crates.

pub mod storage;

pub use storage::{Bucket, ObjectStorage, PresignedRequest};
