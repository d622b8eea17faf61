//! # Data Ingestors Module
//!
//! Clients for external feeds. Each submodule owns the connection to one
//! source and drives received frames into the [`crate::core`] dispatcher.
//!
//! ## Contained Modules:
//! - **`eddn_relay`**: ZeroMQ subscriber for the EDDN relay, with the bounded
//!   receive loop and shutdown handling.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// The ZeroMQ subscriber and receive loop for the EDDN relay.
pub mod eddn_relay;

// --- Public API Re-exports ---
pub use eddn_relay::{
    FeedError, FrameSource, RelayConfig, RelayIngestor, RelaySubscriber, RunSummary,
    DEFAULT_RECV_TIMEOUT, DEFAULT_RELAY,
};
