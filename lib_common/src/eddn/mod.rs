//! # EDDN Message Model
//!
//! Decoding of relay frames into envelopes, and typed views over the journal
//! events the watcher cares about.

/// Frame inflation and JSON envelope parsing.
pub mod envelope;
/// Typed `Scan` and docking event views.
pub mod events;

pub use envelope::{decode_frame, Envelope, EventPayload, FrameError};
pub use events::{DockingEvent, ScanEvent, ScanReport, StarPos};
