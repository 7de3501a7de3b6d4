//! File-backed lesson metadata store: a flat key→record map persisted as
//! one pretty-printed JSON document. Records are written under their id and
//! every alias, last write wins. The file is created lazily on first write;
//! a missing or unreadable file opens as an empty store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quizstake_sdk::metadata::content::LessonMetadata;
use quizstake_sdk::metadata::store_trait::MetadataCache;

use crate::{Result, StoreError};

pub struct MetadataStore {
    path: PathBuf,
    records: BTreeMap<String, LessonMetadata>,
}

impl MetadataStore {
    /// Open the store at `path`. A missing file is an empty store; a
    /// corrupt file is logged and also treated as empty, so a damaged
    /// document degrades to placeholder metadata instead of an error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("metadata store {} is corrupt, starting empty: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("metadata store {} unreadable, starting empty: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&LessonMetadata> {
        self.records.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Store `metadata` under `id` (generated when `None`) and every alias,
    /// then persist the whole document. Returns the id used.
    pub fn put(
        &mut self,
        id: Option<&str>,
        metadata: &LessonMetadata,
        aliases: &[String],
    ) -> Result<String> {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            Some(_) => return Err(StoreError::InvalidData("empty record id".into())),
            None => format!("lesson-{}", chrono::Utc::now().timestamp_millis()),
        };
        self.records.insert(id.clone(), metadata.clone());
        for alias in aliases {
            if !alias.is_empty() {
                self.records.insert(alias.clone(), metadata.clone());
            }
        }
        self.save()?;
        Ok(id)
    }

    /// Remove a single key. Other aliases of the same record are untouched.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let removed = self.records.remove(key).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl MetadataCache for MetadataStore {
    fn get(&mut self, key: &str) -> Option<LessonMetadata> {
        self.records.get(key).cloned()
    }

    fn put(
        &mut self,
        id: &str,
        metadata: &LessonMetadata,
        aliases: &[String],
    ) -> std::result::Result<String, String> {
        MetadataStore::put(self, Some(id), metadata, aliases).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizstake_sdk::metadata::content::placeholder;

    fn sample(title: &str) -> LessonMetadata {
        LessonMetadata {
            title: title.into(),
            ..placeholder("s", 2)
        }
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("lessons.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn put_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.json");

        let mut store = MetadataStore::open(&path);
        let id = store
            .put(Some("lesson-1"), &sample("Ownership"), &["1".into()])
            .unwrap();
        assert_eq!(id, "lesson-1");

        let reopened = MetadataStore::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("lesson-1").unwrap().title, "Ownership");
        assert_eq!(reopened.get("1").unwrap().title, "Ownership");
    }

    #[test]
    fn generated_ids_when_none_given() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::open(dir.path().join("lessons.json"));
        let id = store.put(None, &sample("Anonymous"), &[]).unwrap();
        assert!(id.starts_with("lesson-"));
        assert_eq!(store.get(&id).unwrap().title, "Anonymous");
    }

    #[test]
    fn last_write_wins_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::open(dir.path().join("lessons.json"));
        store.put(Some("k"), &sample("first"), &[]).unwrap();
        store.put(Some("k"), &sample("second"), &[]).unwrap();
        assert_eq!(store.get("k").unwrap().title, "second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut store = MetadataStore::open(&path);
        assert!(store.is_empty());
        // Still writable afterwards.
        store.put(Some("k"), &sample("fresh"), &[]).unwrap();
        assert_eq!(MetadataStore::open(&path).len(), 1);
    }

    #[test]
    fn remove_drops_only_the_named_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::open(dir.path().join("lessons.json"));
        store
            .put(Some("lesson-1"), &sample("x"), &["1".into()])
            .unwrap();
        assert!(store.remove("1").unwrap());
        assert!(!store.remove("1").unwrap());
        assert!(store.get("lesson-1").is_some());
    }

    #[test]
    fn empty_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::open(dir.path().join("lessons.json"));
        assert!(store.put(Some(""), &sample("x"), &[]).is_err());
    }

    #[test]
    fn works_through_the_cache_trait() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::open(dir.path().join("lessons.json"));
        let cache: &mut dyn MetadataCache = &mut store;
        cache.put("lesson-9", &sample("via trait"), &["9".into()]).unwrap();
        assert_eq!(cache.get("9").unwrap().title, "via trait");
    }
}
