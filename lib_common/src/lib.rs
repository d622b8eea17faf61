//! Shared library for the EDDN watcher.
//!
//! Relay frames flow `ingestors` -> `eddn` (decode) -> `core` (dispatch) ->
//! `reporters` / `storage`. `configs` and `loggers` cover the ambient setup of
//! the binary.

pub mod configs;
pub mod core;
pub mod eddn;
pub mod ingestors;
pub mod loggers;
pub mod reporters;
pub mod storage;

// Re-export the types the binary wires together
pub use configs::{load_config, Config, WatcherSettings};
pub use crate::core::{Dispatcher, Mode, Outcome};
pub use eddn::{decode_frame, Envelope};
pub use ingestors::{RelayIngestor, RelaySubscriber, RunSummary};
pub use loggers::loggerlocal::{setup_logging, LoggerLocalOptions};
pub use reporters::ConsoleReporter;
pub use storage::DiscoveryStore;
