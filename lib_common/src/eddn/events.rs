//! Typed views over the event payloads this watcher reports on.
//!
//! Field names follow the Elite Dangerous journal (PascalCase). Absent fields
//! fall back to the placeholders printed on the console.

use serde::Deserialize;
use serde_json::{Number, Value};
use std::fmt;

pub const SCAN: &str = "Scan";
pub const FSS_DISCOVERY_SCAN: &str = "FSSDiscoveryScan";
/// `ScanType` of the cheap scan performed by a nav beacon; never a new discovery.
pub const NAV_BEACON_DETAIL: &str = "NavBeaconDetail";

pub const DOCKING_GRANTED: &str = "DockingGranted";
pub const DOCKING_DENIED: &str = "DockingDenied";
pub const DOCKING_REQUESTED: &str = "DockingRequested";
pub const DOCKING_CANCELLED: &str = "DockingCancelled";
pub const DOCKING_TIMEOUT: &str = "DockingTimeout";

const UNKNOWN_SYSTEM: &str = "Unknown System";
const UNKNOWN_STELLAR_MASS: &str = "Unknown Stellar Mass";
const UNKNOWN_STATION: &str = "Unknown Station";
const NO_LANDING_PAD: &str = "N/A";
const NO_REASON: &str = "No reason specified";

/// A `Scan` journal event.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanEvent {
    #[serde(rename = "WasDiscovered", default, deserialize_with = "null_as_false")]
    pub was_discovered: bool,
    #[serde(rename = "StarSystem", default)]
    pub star_system: Option<String>,
    #[serde(rename = "StarType", default)]
    pub star_type: Option<Value>,
    #[serde(rename = "ScanType", default)]
    pub scan_type: Option<String>,
    #[serde(rename = "StellarMass", default)]
    pub stellar_mass: Option<Value>,
    #[serde(rename = "StarPos", default)]
    pub star_pos: Option<Value>,
}

impl ScanEvent {
    /// `StarSystem` without surrounding whitespace. Blank or missing names
    /// read as the placeholder.
    pub fn system_name(&self) -> &str {
        self.star_system
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_SYSTEM)
    }

    /// A star scan that the commander was the first to make, excluding nav
    /// beacon dumps. Does not consult the discovery store.
    pub fn is_first_star_scan(&self) -> bool {
        !self.was_discovered
            && self.star_type.is_some()
            && self.scan_type.as_deref() != Some(NAV_BEACON_DETAIL)
    }

    /// `StarPos` as three JSON numbers, or `None` when missing or malformed.
    pub fn position(&self) -> Option<StarPos> {
        let coords = self.star_pos.as_ref()?.as_array()?;
        match coords.as_slice() {
            [Value::Number(x), Value::Number(y), Value::Number(z)] => Some(StarPos {
                x: x.clone(),
                y: y.clone(),
                z: z.clone(),
            }),
            _ => None,
        }
    }
}

/// Galactic coordinates in light years, kept as the numbers sent on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct StarPos {
    pub x: Number,
    pub y: Number,
    pub z: Number,
}

impl fmt::Display for StarPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X: {}, Y: {}, Z: {}", self.x, self.y, self.z)
    }
}

/// What gets printed for a newly discovered system.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub system_name: String,
    pub star_type: String,
    pub stellar_mass: String,
    pub position: StarPos,
}

impl ScanReport {
    /// Returns `None` when the scan carries no usable `StarPos`.
    pub fn from_scan(scan: &ScanEvent) -> Option<Self> {
        Some(Self {
            system_name: scan.system_name().to_string(),
            star_type: scan.star_type.as_ref().map(display_value)?,
            stellar_mass: scan
                .stellar_mass
                .as_ref()
                .map(display_value)
                .unwrap_or_else(|| UNKNOWN_STELLAR_MASS.to_string()),
            position: scan.position()?,
        })
    }
}

/// The five docking events, with the fields each one prints.
#[derive(Debug, Clone, PartialEq)]
pub enum DockingEvent {
    Granted { station: String, landing_pad: String },
    Denied { station: String, reason: String },
    Requested { station: String },
    Cancelled { station: String },
    Timeout { station: String },
}

#[derive(Debug, Default, Deserialize)]
struct DockingFields {
    #[serde(rename = "StationName", default)]
    station_name: Option<Value>,
    #[serde(rename = "LandingPad", default)]
    landing_pad: Option<Value>,
    #[serde(rename = "Reason", default)]
    reason: Option<Value>,
}

impl DockingEvent {
    /// Builds the docking view for `event`, or `None` for anything that is not
    /// one of the five docking events.
    pub fn from_parts(event: &str, payload: &crate::eddn::EventPayload<'_>) -> Option<Self> {
        let fields: DockingFields = payload.parse().unwrap_or_default();
        let station = text_or(fields.station_name.as_ref(), UNKNOWN_STATION);

        let docking = match event {
            DOCKING_GRANTED => DockingEvent::Granted {
                station,
                landing_pad: text_or(fields.landing_pad.as_ref(), NO_LANDING_PAD),
            },
            DOCKING_DENIED => DockingEvent::Denied {
                station,
                reason: text_or(fields.reason.as_ref(), NO_REASON),
            },
            DOCKING_REQUESTED => DockingEvent::Requested { station },
            DOCKING_CANCELLED => DockingEvent::Cancelled { station },
            DOCKING_TIMEOUT => DockingEvent::Timeout { station },
            _ => return None,
        };
        Some(docking)
    }
}

impl fmt::Display for DockingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockingEvent::Granted { station, landing_pad } => {
                write!(f, "Docking granted on landing pad {} at {}.", landing_pad, station)
            }
            DockingEvent::Denied { station, reason } => {
                write!(f, "Docking denied at {}. Reason: {}", station, reason)
            }
            DockingEvent::Requested { station } => write!(f, "Docking requested at {}.", station),
            DockingEvent::Cancelled { station } => write!(f, "Docking cancelled at {}.", station),
            DockingEvent::Timeout { station } => {
                write!(f, "Docking request at {} timed out.", station)
            }
        }
    }
}

/// Strings print bare, everything else prints as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(v) => display_value(v),
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Null) | None => false,
        // Any other JSON value follows truthiness.
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    })
}
