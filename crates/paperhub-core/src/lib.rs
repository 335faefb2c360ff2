//! # paperhub-core
//!
//! Core crate for PaperHub. Contains the unified error system,
//! configuration schemas, the storage gateway trait, and
//! pagination/sorting types.
//!
//! This crate has **no** internal dependencies on other PaperHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
