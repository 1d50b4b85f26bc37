//! LMDB storage backend for LikeGate.
//!
//! Implements the storage traits from `likegate-store` using the `heed` LMDB
//! bindings. All logical stores share one environment; see
//! [`environment`] for the database layout.
//!
//! LMDB allows a single writer at a time, so every compare-and-set
//! transition (read, check, write) runs inside one write transaction and is
//! atomic with respect to every other writer, in this process or another.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod profile;
pub mod request;

pub use environment::LmdbStore;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
