//! # Mode Dispatcher
//!
//! Routes each decoded envelope to exactly one reporting behaviour, chosen once
//! at startup:
//!
//! - **Raw**: pretty-print every envelope.
//! - **Exploration**: look the event up in [`EXPLORATION_EVENTS`]; only
//!   `FSSDiscoveryScan` prints, the other listed events are explicitly ignored.
//! - **NewSystems**: announce and persist first-discovered star systems from
//!   `Scan` events, using the [`DiscoveryStore`].
//! - **Docking**: one line per docking event.
//!
//! Dispatch is synchronous and runs inline in the receive loop. Persisting a
//! discovery therefore blocks the next receive until the archive is on disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::eddn::events::{FSS_DISCOVERY_SCAN, SCAN};
use crate::eddn::{DockingEvent, Envelope, ScanEvent, ScanReport};
use crate::reporters::ConsoleReporter;
use crate::storage::{DiscoveryStore, StoreError};

/// The reporting behaviour selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Raw,
    Exploration,
    NewSystems,
    Docking,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Raw => "raw",
            Mode::Exploration => "exploration",
            Mode::NewSystems => "new-systems",
            Mode::Docking => "docking",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "raw" | "default" => Ok(Mode::Raw),
            "exploration" => Ok(Mode::Exploration),
            "new-systems" | "new_systems" | "newsystems" => Ok(Mode::NewSystems),
            "docking" => Ok(Mode::Docking),
            other => Err(format!(
                "unknown mode '{}' (expected raw, exploration, new-systems or docking)",
                other
            )),
        }
    }
}

/// What exploration mode does with a listed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationAction {
    /// Pretty-print the full envelope.
    PrintEnvelope,
    /// Recognised as an exploration event, but not reported.
    Ignore,
}

/// Every exploration event the watcher recognises, with its handler.
pub const EXPLORATION_EVENTS: &[(&str, ExplorationAction)] = &[
    ("CodexEntry", ExplorationAction::Ignore),
    (FSS_DISCOVERY_SCAN, ExplorationAction::PrintEnvelope),
    (SCAN, ExplorationAction::Ignore),
    ("FSSAllBodiesFound", ExplorationAction::Ignore),
    ("FSSBodySignals", ExplorationAction::Ignore),
    ("FSSSignalDiscovered", ExplorationAction::Ignore),
    ("MaterialCollected", ExplorationAction::Ignore),
    ("MaterialDiscarded", ExplorationAction::Ignore),
    ("MaterialDiscovered", ExplorationAction::Ignore),
    ("MultiSellExplorationData", ExplorationAction::Ignore),
    ("NavBeaconScan", ExplorationAction::Ignore),
    ("BuyExplorationData", ExplorationAction::Ignore),
    ("SAAScanComplete", ExplorationAction::Ignore),
    ("SAASignalsFound", ExplorationAction::Ignore),
    ("ScanBaryCentre", ExplorationAction::Ignore),
    ("SellExplorationData", ExplorationAction::Ignore),
];

/// Looks `event` up in [`EXPLORATION_EVENTS`].
pub fn exploration_action(event: &str) -> Option<ExplorationAction> {
    EXPLORATION_EVENTS
        .iter()
        .find(|(name, _)| *name == event)
        .map(|(_, action)| *action)
}

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Something was written to the reporter.
    Printed,
    /// A new system was announced and persisted.
    Discovered(String),
    /// Nothing to report for this envelope in the active mode.
    Ignored,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed {event} event: {reason}")]
    MalformedEvent { event: String, reason: String },

    #[error("Discovery store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to write report: {0}")]
    Output(#[from] io::Error),
}

impl DispatchError {
    /// Malformed events only cost the current frame. Everything else stops the
    /// watcher.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DispatchError::MalformedEvent { .. })
    }
}

pub struct Dispatcher<W: Write> {
    mode: Mode,
    reporter: ConsoleReporter<W>,
    store: Option<DiscoveryStore>,
}

impl<W: Write> Dispatcher<W> {
    /// Builds a dispatcher for `mode`. The discovery store under `data_dir` is
    /// only opened in new-systems mode.
    pub fn open(
        mode: Mode,
        data_dir: impl AsRef<Path>,
        reporter: ConsoleReporter<W>,
    ) -> Result<Self, StoreError> {
        let store = match mode {
            Mode::NewSystems => Some(DiscoveryStore::open(data_dir)?),
            _ => None,
        };
        Ok(Self {
            mode,
            reporter,
            store,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> Option<&DiscoveryStore> {
        self.store.as_ref()
    }

    pub fn reporter(&self) -> &ConsoleReporter<W> {
        &self.reporter
    }

    pub fn into_reporter(self) -> ConsoleReporter<W> {
        self.reporter
    }

    pub fn dispatch(&mut self, envelope: &Envelope) -> Result<Outcome, DispatchError> {
        match self.mode {
            Mode::Raw => {
                self.reporter.envelope(envelope)?;
                Ok(Outcome::Printed)
            }
            Mode::Exploration => self.exploration(envelope),
            Mode::NewSystems => self.new_systems(envelope),
            Mode::Docking => self.docking(envelope),
        }
    }

    fn exploration(&mut self, envelope: &Envelope) -> Result<Outcome, DispatchError> {
        let action = envelope.event().and_then(exploration_action);
        match action {
            Some(ExplorationAction::PrintEnvelope) => {
                self.reporter.envelope(envelope)?;
                Ok(Outcome::Printed)
            }
            Some(ExplorationAction::Ignore) | None => Ok(Outcome::Ignored),
        }
    }

    fn new_systems(&mut self, envelope: &Envelope) -> Result<Outcome, DispatchError> {
        if envelope.event() != Some(SCAN) {
            return Ok(Outcome::Ignored);
        }
        let Some(store) = self.store.as_mut() else {
            return Ok(Outcome::Ignored);
        };

        let scan: ScanEvent =
            envelope
                .payload()
                .parse()
                .map_err(|e| DispatchError::MalformedEvent {
                    event: SCAN.to_string(),
                    reason: e.to_string(),
                })?;

        if !scan.is_first_star_scan() {
            return Ok(Outcome::Ignored);
        }
        // The name list holds one name per line.
        if scan.system_name().contains(['\r', '\n']) {
            return Err(DispatchError::MalformedEvent {
                event: SCAN.to_string(),
                reason: format!("StarSystem {:?} spans more than one line", scan.system_name()),
            });
        }
        if store.contains(scan.system_name()) {
            return Ok(Outcome::Ignored);
        }

        let report = ScanReport::from_scan(&scan).ok_or_else(|| DispatchError::MalformedEvent {
            event: SCAN.to_string(),
            reason: format!(
                "StarPos for {} is missing or not three numbers",
                scan.system_name()
            ),
        })?;

        self.reporter.discovery(&report)?;
        store.record(&report.system_name, envelope)?;
        log::debug!("Recorded new system '{}'", report.system_name);
        Ok(Outcome::Discovered(report.system_name))
    }

    fn docking(&mut self, envelope: &Envelope) -> Result<Outcome, DispatchError> {
        let payload = envelope.payload();
        let docking = payload
            .event()
            .and_then(|event| DockingEvent::from_parts(event, &payload));

        match docking {
            Some(docking) => {
                self.reporter.docking(&docking)?;
                Ok(Outcome::Printed)
            }
            None => Ok(Outcome::Ignored),
        }
    }
}
