//! Abstract storage traits for LikeGate.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! The two state transitions that carry the pipeline's at-most-once
//! guarantees, [`RequestStore::mark_verified`] and
//! [`RequestStore::mark_processed`], are compare-and-set operations: the
//! check and the write happen as one atomic unit inside the backend.

pub mod error;
pub mod meta;
pub mod profile;
pub mod request;

pub use error::StoreError;
pub use meta::MetaStore;
pub use profile::ProfileStore;
pub use request::RequestStore;

/// Everything the gateway, dispatcher and admin path need from storage.
pub trait GateStore: RequestStore + ProfileStore {}

impl<T: RequestStore + ProfileStore> GateStore for T {}
