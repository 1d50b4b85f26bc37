//! Metadata storage trait.

use crate::StoreError;

/// Internal bookkeeping that doesn't belong to requests or profiles.
pub trait MetaStore {
    /// Get the current database schema version (0 for a fresh database).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
