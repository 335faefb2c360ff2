//! # paperhub-entity
//!
//! Domain entity models for PaperHub. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! additionally derive `sqlx::FromRow`.

pub mod file;
pub mod folder;
pub mod job;
pub mod scope;
pub mod summary;
pub mod workspace;

pub use scope::OwnerScope;
