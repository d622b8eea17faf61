//! # Core Engine Module
//!
//! The decision-making part of the watcher. An envelope comes in from the
//! relay, the dispatcher decides what (if anything) is reported or persisted
//! for the active [`Mode`].

/// Mode selection and per-mode handling of decoded envelopes.
pub mod dispatcher;

pub use dispatcher::{
    exploration_action, DispatchError, Dispatcher, ExplorationAction, Mode, Outcome,
    EXPLORATION_EVENTS,
};
