//! # Storage Module
//!
//! Local persistence used by the watcher. Currently only the discovery store,
//! consulted in new-systems mode.

/// Persisted set of reported systems plus their originating envelopes.
pub mod discovery_store;

pub use discovery_store::{DiscoveryStore, StoreError, ARCHIVE_FILE, NAMES_FILE};
