//! # paperhub-database
//!
//! PostgreSQL connection management, the repository traits the services
//! depend on, their PostgreSQL implementations, and an in-memory store
//! implementing the same traits.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use repositories::Repositories;
