//! End-to-end: compressed relay frames through decode, dispatch and the
//! discovery store, across simulated restarts.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lib_common::storage::{ARCHIVE_FILE, NAMES_FILE};
use lib_common::{decode_frame, ConsoleReporter, Dispatcher, Mode, Outcome};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn scan_document(system: &str, was_discovered: bool) -> Value {
    json!({
        "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
        "header": {
            "uploaderID": "b2f7c1",
            "softwareName": "E:D Market Connector",
            "softwareVersion": "5.12.1",
            "gatewayTimestamp": "2026-10-15T12:00:00.000Z"
        },
        "message": {
            "timestamp": "2026-10-15T11:59:58Z",
            "event": "Scan",
            "ScanType": "Detailed",
            "BodyName": format!("{} A", system),
            "StarSystem": system,
            "StarPos": [-1052.9375, -12.5, 4012.75],
            "StarType": "M",
            "StellarMass": 0.367188,
            "WasDiscovered": was_discovered,
            "WasMapped": false
        }
    })
}

fn frame(document: &Value) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.to_string().as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// One "process lifetime": open the store, feed frames, return stdout.
fn run_once(dir: &Path, frames: &[Vec<u8>]) -> (Vec<Outcome>, String) {
    let mut dispatcher =
        Dispatcher::open(Mode::NewSystems, dir, ConsoleReporter::new(Vec::new())).unwrap();
    let outcomes = frames
        .iter()
        .map(|f| dispatcher.dispatch(&decode_frame(f).unwrap()).unwrap())
        .collect();
    let out = String::from_utf8(dispatcher.into_reporter().into_inner()).unwrap();
    (outcomes, out)
}

#[test]
fn replaying_after_persistence_does_not_report_again() {
    let dir = tempdir().unwrap();
    let frames = vec![frame(&scan_document("Bleia Dryiae QS-K d8-11", false))];

    let (first, out) = run_once(dir.path(), &frames);
    assert_eq!(first, vec![Outcome::Discovered("Bleia Dryiae QS-K d8-11".into())]);
    assert!(out.contains("New system discovered: Bleia Dryiae QS-K d8-11"));
    assert!(out.contains("Stellar mass: 0.367188"));
    assert!(out.contains("Position: X: -1052.9375, Y: -12.5, Z: 4012.75"));

    let (second, out) = run_once(dir.path(), &frames);
    assert_eq!(second, vec![Outcome::Ignored]);
    assert!(out.is_empty());
}

#[test]
fn n_distinct_scans_give_n_names_and_n_archive_keys() {
    let dir = tempdir().unwrap();
    let systems = ["Synuefe AA-A a0", "Synuefe BB-B b1", "Synuefe CC-C c2", "Synuefe DD-D d3"];
    let documents: Vec<Value> = systems.iter().map(|s| scan_document(s, false)).collect();
    let frames: Vec<Vec<u8>> = documents.iter().map(frame).collect();

    let (outcomes, _) = run_once(dir.path(), &frames);
    assert!(outcomes.iter().all(|o| matches!(o, Outcome::Discovered(_))));

    let names = fs::read_to_string(dir.path().join(NAMES_FILE)).unwrap();
    assert_eq!(names.lines().collect::<Vec<_>>(), systems);

    let archive: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join(ARCHIVE_FILE)).unwrap()).unwrap();
    let archive = archive.as_object().unwrap();
    assert_eq!(archive.len(), systems.len());
    for (system, document) in systems.iter().zip(&documents) {
        assert_eq!(&archive[*system], document);
    }
}

#[test]
fn already_discovered_scan_leaves_files_alone() {
    let dir = tempdir().unwrap();
    let (first, _) = run_once(dir.path(), &[frame(&scan_document("Known", false))]);
    assert!(matches!(first[0], Outcome::Discovered(_)));

    let names_before = fs::read(dir.path().join(NAMES_FILE)).unwrap();
    let archive_before = fs::read(dir.path().join(ARCHIVE_FILE)).unwrap();

    let (outcomes, out) = run_once(dir.path(), &[frame(&scan_document("Colonia", true))]);
    assert_eq!(outcomes, vec![Outcome::Ignored]);
    assert!(out.is_empty());
    assert_eq!(fs::read(dir.path().join(NAMES_FILE)).unwrap(), names_before);
    assert_eq!(fs::read(dir.path().join(ARCHIVE_FILE)).unwrap(), archive_before);
}
