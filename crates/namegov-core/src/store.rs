//! Name persistence behind one capability trait.
//!
//! The only contract a backend must honour is uniqueness on the name string:
//! inserting a name that already exists is rejected, never overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{data_dir, Error, NameRecord, Planner, Result};

pub trait NameStore: Send + Sync {
    fn insert_unique(&self, record: NameRecord) -> Result<()>;

    /// Saved names, optionally restricted to one planner, in insertion order.
    fn list_names(&self, planner: Option<Planner>) -> Result<Vec<String>>;
}

/// Existing names equal to `name` ignoring case and surrounding whitespace.
pub fn find_similar_names<'a>(name: &str, existing: &'a [String]) -> Vec<&'a str> {
    let wanted = name.trim().to_uppercase();
    existing
        .iter()
        .filter(|n| n.trim().to_uppercase() == wanted)
        .map(String::as_str)
        .collect()
}

fn names_for(records: &[NameRecord], planner: Option<Planner>) -> Vec<String> {
    records
        .iter()
        .filter(|r| planner.map_or(true, |p| r.planner == p))
        .map(|r| r.name.clone())
        .collect()
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<NameRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameStore for MemoryStore {
    fn insert_unique(&self, record: NameRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.iter().any(|r| r.name == record.name) {
            return Err(Error::DuplicateName(record.name));
        }
        records.push(record);
        Ok(())
    }

    fn list_names(&self, planner: Option<Planner>) -> Result<Vec<String>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(names_for(&records, planner))
    }
}

/// Store backed by a single JSON file of records.
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// never observes a half-written file. The lock serialises writers within
/// one process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/names.json`.
    pub fn default_location() -> Self {
        Self::new(data_dir().join("names.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<Vec<NameRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_records(&self, records: &[NameRecord]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "names.json".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl NameStore for FileStore {
    fn insert_unique(&self, record: NameRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.read_records()?;
        if records.iter().any(|r| r.name == record.name) {
            tracing::debug!(name = %record.name, "rejecting duplicate name");
            return Err(Error::DuplicateName(record.name));
        }
        tracing::info!(name = %record.name, planner = %record.planner, "saving name");
        records.push(record);
        self.write_records(&records)
    }

    fn list_names(&self, planner: Option<Planner>) -> Result<Vec<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(names_for(&self.read_records()?, planner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NameSource, ValidationStatus};

    fn record(planner: Planner, name: &str) -> NameRecord {
        NameRecord {
            planner,
            name: name.to_string(),
            fields: Default::default(),
            free_form: vec![],
            source: NameSource::Manual,
            validation_status: ValidationStatus::Valid,
        }
    }

    fn exercise(store: &dyn NameStore) {
        store.insert_unique(record(Planner::Campaign, "PM_1001_SAREE")).unwrap();
        store.insert_unique(record(Planner::Placement, "PM_1001_YTB")).unwrap();
        store.insert_unique(record(Planner::Campaign, "PM_1002_SILK")).unwrap();

        let err = store
            .insert_unique(record(Planner::Creative, "PM_1001_SAREE"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(ref n) if n == "PM_1001_SAREE"));

        assert_eq!(
            store.list_names(Some(Planner::Campaign)).unwrap(),
            vec!["PM_1001_SAREE", "PM_1002_SILK"]
        );
        assert_eq!(store.list_names(None).unwrap().len(), 3);
        assert!(store.list_names(Some(Planner::Creative)).unwrap().is_empty());
    }

    #[test]
    fn memory_store_enforces_uniqueness() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_enforces_uniqueness_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("names.json");
        exercise(&FileStore::new(&path));

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.list_names(None).unwrap().len(), 3);
        assert!(!dir.path().join("nested").join(".names.json.tmp").exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("names.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let store = FileStore::new(&target);
        assert!(store
            .write_records(&[record(Planner::Campaign, "PM_1001_SAREE")])
            .is_err());
        assert!(!dir.path().join(".names.json.tmp").exists());
    }

    #[test]
    fn file_store_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("names.json"));
        assert!(store.list_names(None).unwrap().is_empty());
    }

    #[test]
    fn similar_names_ignore_case_and_whitespace() {
        let existing = vec![
            "PM_1001_SAREE".to_string(),
            " pm_1001_saree ".to_string(),
            "PM_1001_SILK".to_string(),
        ];
        assert_eq!(
            find_similar_names("Pm_1001_Saree", &existing),
            vec!["PM_1001_SAREE", " pm_1001_saree "]
        );
        assert!(find_similar_names("PM_2000", &existing).is_empty());
        assert!(find_similar_names("PM", &[]).is_empty());
    }
}
