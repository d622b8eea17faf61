//! # Discovery Store
//!
//! Remembers every star system that has been reported as a new discovery, so a
//! system is announced at most once, even across restarts.
//!
//! Two files live in the data directory:
//!
//! - `discovered_systems.txt`: one system name per line, append-only.
//! - `discovered_systems.json`: a single object mapping system name to the full
//!   envelope that triggered the discovery.
//!
//! Both are loaded once by [`DiscoveryStore::open`] into an in-memory index.
//! [`DiscoveryStore::record`] rewrites the archive through a temp file and a
//! rename, and only then appends to the name list. If the process dies between
//! the two steps the archive is ahead of the list, and the next `open` appends
//! the missing names.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::eddn::Envelope;

/// File name of the newline-delimited list of reported systems.
pub const NAMES_FILE: &str = "discovered_systems.txt";
/// File name of the JSON archive of triggering envelopes.
pub const ARCHIVE_FILE: &str = "discovered_systems.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Discovery archive {path} is not valid JSON: {source}")]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Discovery archive {0} does not contain a JSON object")]
    ArchiveNotObject(PathBuf),

    #[error("System name {0:?} cannot be stored as a single trimmed line")]
    InvalidName(String),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct DiscoveryStore {
    dir: PathBuf,
    /// Known names in first-seen order.
    names: Vec<String>,
    index: HashSet<String>,
    archive: Map<String, Value>,
}

impl DiscoveryStore {
    /// Loads (or prepares to create) the store in `dir`.
    ///
    /// The directory is created if missing. Neither file is written unless a
    /// repair is needed; both appear on the first [`record`](Self::record).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut store = Self {
            names: Vec::new(),
            index: HashSet::new(),
            archive: load_archive(&dir.join(ARCHIVE_FILE))?,
            dir,
        };

        for name in load_names(&store.names_path())? {
            if store.index.insert(name.clone()) {
                store.names.push(name);
            }
        }

        let unlisted: Vec<String> = store
            .archive
            .keys()
            .filter(|name| !store.index.contains(name.as_str()))
            .cloned()
            .collect();
        if !unlisted.is_empty() {
            log::warn!(
                "{} archived system(s) missing from {}. Re-appending.",
                unlisted.len(),
                NAMES_FILE
            );
            for name in unlisted {
                if is_storable(&name) {
                    store.append_name(&name)?;
                } else {
                    log::warn!("Archived name {:?} cannot be listed, keeping it in memory only.", name);
                }
                store.index.insert(name.clone());
                store.names.push(name);
            }
        }

        log::info!(
            "Discovery store loaded from {}: {} known system(s).",
            store.dir.display(),
            store.names.len()
        );
        Ok(store)
    }

    pub fn contains(&self, system_name: &str) -> bool {
        self.index.contains(system_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Known system names in the order they were first recorded.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// The envelope archived for `system_name`, if any.
    pub fn archived(&self, system_name: &str) -> Option<&Value> {
        self.archive.get(system_name)
    }

    pub fn names_path(&self) -> PathBuf {
        self.dir.join(NAMES_FILE)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_FILE)
    }

    /// Records a newly discovered system.
    ///
    /// Returns `Ok(false)` without touching disk when the name is already known.
    /// The name must read back unchanged from the name list: non-empty, no
    /// surrounding whitespace, no line breaks.
    pub fn record(&mut self, system_name: &str, envelope: &Envelope) -> Result<bool, StoreError> {
        if !is_storable(system_name) {
            return Err(StoreError::InvalidName(system_name.to_string()));
        }
        if self.contains(system_name) {
            return Ok(false);
        }

        self.archive
            .insert(system_name.to_string(), envelope.to_value());
        if let Err(e) = self.write_archive() {
            self.archive.remove(system_name);
            return Err(e);
        }

        self.append_name(system_name)?;
        self.index.insert(system_name.to_string());
        self.names.push(system_name.to_string());
        Ok(true)
    }

    fn write_archive(&self) -> Result<(), StoreError> {
        let path = self.archive_path();
        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        #[cfg(unix)]
        tmp.as_file()
            .set_permissions(archive_permissions(&path))
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.archive)
                .map_err(|e| StoreError::io(tmp.path(), e.into()))?;
            writer.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        Ok(())
    }

    fn append_name(&self, system_name: &str) -> Result<(), StoreError> {
        let path = self.names_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        writeln!(file, "{}", system_name).map_err(|e| StoreError::io(&path, e))
    }
}

/// Whether `name` reads back unchanged from the name list.
fn is_storable(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.contains(['\r', '\n'])
}

/// Mode for the rewritten archive: whatever the current one has, or 0644 for a
/// new file. Temp files are created owner-only.
#[cfg(unix)]
fn archive_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}

fn load_names(path: &Path) -> Result<Vec<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn load_archive(path: &Path) -> Result<Map<String, Value>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::ArchiveNotObject(path.to_path_buf())),
        Err(source) => Err(StoreError::CorruptArchive {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn envelope(system: &str) -> Envelope {
        Envelope::from_value(json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
            "message": { "event": "Scan", "StarSystem": system, "StarType": "M" }
        }))
        .unwrap()
    }

    #[test]
    fn fresh_directory_has_no_files_until_first_record() {
        let dir = tempdir().unwrap();
        let store = DiscoveryStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
        assert!(!store.names_path().exists());
        assert!(!store.archive_path().exists());
    }

    #[test]
    fn record_writes_both_files() {
        let dir = tempdir().unwrap();
        let mut store = DiscoveryStore::open(dir.path()).unwrap();

        assert!(store.record("Praea Euq AA-A h0", &envelope("Praea Euq AA-A h0")).unwrap());
        assert!(!store.record("Praea Euq AA-A h0", &envelope("Praea Euq AA-A h0")).unwrap());

        let names = fs::read_to_string(store.names_path()).unwrap();
        assert_eq!(names, "Praea Euq AA-A h0\n");

        let archive: Value =
            serde_json::from_str(&fs::read_to_string(store.archive_path()).unwrap()).unwrap();
        assert_eq!(archive["Praea Euq AA-A h0"], envelope("Praea Euq AA-A h0").to_value());
    }

    #[test]
    fn archive_is_indented_with_two_spaces() {
        let dir = tempdir().unwrap();
        let mut store = DiscoveryStore::open(dir.path()).unwrap();
        store.record("Sol", &envelope("Sol")).unwrap();

        let text = fs::read_to_string(store.archive_path()).unwrap();
        assert!(text.starts_with("{\n  \"Sol\": {\n    \"$schemaRef\""));
    }

    #[test]
    fn reopen_sees_previous_records() {
        let dir = tempdir().unwrap();
        {
            let mut store = DiscoveryStore::open(dir.path()).unwrap();
            store.record("Alpha", &envelope("Alpha")).unwrap();
            store.record("Beta", &envelope("Beta")).unwrap();
        }

        let store = DiscoveryStore::open(dir.path()).unwrap();
        assert!(store.contains("Alpha"));
        assert!(store.contains("Beta"));
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["Alpha", "Beta"]);
        assert_eq!(store.archived("Beta"), Some(&envelope("Beta").to_value()));
    }

    #[test]
    fn name_list_ignores_blank_lines_and_whitespace() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(NAMES_FILE), "  Alpha \n\n\nBeta\nAlpha\n").unwrap();

        let store = DiscoveryStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains("Alpha"));
    }

    #[test]
    fn archive_ahead_of_name_list_is_repaired() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(NAMES_FILE), "Alpha\n").unwrap();
        let archive = json!({
            "Alpha": envelope("Alpha").to_value(),
            "Beta": envelope("Beta").to_value()
        });
        fs::write(dir.path().join(ARCHIVE_FILE), archive.to_string()).unwrap();

        let store = DiscoveryStore::open(dir.path()).unwrap();
        assert!(store.contains("Beta"));
        assert_eq!(
            fs::read_to_string(dir.path().join(NAMES_FILE)).unwrap(),
            "Alpha\nBeta\n"
        );
    }

    #[test]
    fn listed_name_without_archive_entry_is_still_known() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(NAMES_FILE), "Gamma\n").unwrap();

        let mut store = DiscoveryStore::open(dir.path()).unwrap();
        assert!(store.contains("Gamma"));
        assert!(store.archived("Gamma").is_none());
        assert!(!store.record("Gamma", &envelope("Gamma")).unwrap());
    }

    #[test]
    fn corrupt_archive_is_an_error_and_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ARCHIVE_FILE);
        fs::write(&path, "{ truncated").unwrap();

        let err = DiscoveryStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, StoreError::CorruptArchive { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ truncated");
    }

    #[test]
    fn non_object_archive_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(ARCHIVE_FILE), "[]").unwrap();
        let err = DiscoveryStore::open(dir.path()).err().unwrap();
        assert!(matches!(err, StoreError::ArchiveNotObject(_)));
    }

    #[test]
    fn names_that_do_not_fit_one_line_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store = DiscoveryStore::open(dir.path()).unwrap();

        for name in ["Sol ", " Sol", "A\nB", "A\r\nB", ""] {
            let err = store.record(name, &envelope(name)).unwrap_err();
            assert!(matches!(err, StoreError::InvalidName(_)));
        }
        assert!(store.is_empty());
        assert!(!store.names_path().exists());
        assert!(!store.archive_path().exists());
    }

    #[test]
    fn unlistable_archive_keys_do_not_grow_the_name_list() {
        let dir = tempdir().unwrap();
        let archive = json!({
            "Sol ": envelope("Sol ").to_value(),
            "A\nB": envelope("A\nB").to_value(),
            "Gamma": envelope("Gamma").to_value()
        });
        fs::write(dir.path().join(ARCHIVE_FILE), archive.to_string()).unwrap();

        for _ in 0..3 {
            let store = DiscoveryStore::open(dir.path()).unwrap();
            assert!(store.contains("A\nB"));
            assert!(!store.contains("A"));
            assert!(!store.contains("B"));
            assert_eq!(store.len(), 3);
        }
        assert_eq!(
            fs::read_to_string(dir.path().join(NAMES_FILE)).unwrap(),
            "Gamma\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn archive_keeps_readable_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let mut store = DiscoveryStore::open(dir.path()).unwrap();
        store.record("Alpha", &envelope("Alpha")).unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&store.archive_path()), 0o644);

        fs::set_permissions(store.archive_path(), fs::Permissions::from_mode(0o640)).unwrap();
        store.record("Beta", &envelope("Beta")).unwrap();
        assert_eq!(mode(&store.archive_path()), 0o640);
    }

    #[test]
    fn empty_archive_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(ARCHIVE_FILE), "").unwrap();
        let store = DiscoveryStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
    }
}
