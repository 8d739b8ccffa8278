// src/storage/cache.rs

//! Two-tier schedule cache: in-memory map plus on-disk snapshots.
//!
//! ## Storage Layout
//!
//! ```text
//! {cache_dir}/
//! ├── schedule_cache.json   # combined snapshot, groups
//! ├── teachers_cache.json   # combined snapshot, teachers
//! ├── groups/               # one file per group
//! │   └── К0709-23_1.json
//! └── teachers/             # one file per teacher
//!     └── 17.json
//! ```
//!
//! Disk is read before memory on `get`. Disk writes are best effort: a
//! failed write is logged and the in-memory state stays authoritative.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{CacheRecord, EntityClass, Event, WeekSlot};

/// Per-class schedule cache. One instance owns one disjoint key
/// namespace (groups or teachers), so the two refresh loops never
/// contend on the same store.
pub struct CacheStore {
    class: EntityClass,
    root_dir: PathBuf,
    memory: RwLock<HashMap<String, CacheRecord>>,
}

impl CacheStore {
    /// Create a store for one entity class rooted at the cache directory.
    pub fn new(root_dir: impl Into<PathBuf>, class: EntityClass) -> Self {
        Self {
            class,
            root_dir: root_dir.into(),
            memory: RwLock::new(HashMap::new()),
        }
    }

    /// Populate memory from the combined snapshot, if one exists.
    /// A missing file is a normal cold start, not an error.
    pub async fn load(&self) -> Result<()> {
        match self
            .read_json::<HashMap<String, CacheRecord>>(&self.snapshot_path())
            .await
        {
            Ok(Some(records)) => {
                log::info!(
                    "{}: loaded {} cached records from disk",
                    self.class.label(),
                    records.len()
                );
                *self.memory.write().await = records;
            }
            Ok(None) => {
                log::info!(
                    "{}: no snapshot on disk, waiting for first refresh",
                    self.class.label()
                );
            }
            Err(error) => {
                log::warn!("{}: snapshot unreadable: {error}", self.class.label());
            }
        }
        Ok(())
    }

    /// Look up one week of events: per-entity disk file first, then the
    /// in-memory map. A present record is a hit regardless of how many
    /// events the week holds.
    pub async fn get(&self, entity: &str, week: WeekSlot) -> Option<Vec<Event>> {
        match self.read_json::<CacheRecord>(&self.entity_path(entity)).await {
            Ok(Some(record)) => return Some(record.week(week).clone()),
            Ok(None) => {}
            Err(error) => {
                log::debug!("{}: disk read for {entity} failed: {error}", self.class.label());
            }
        }

        self.memory
            .read()
            .await
            .get(entity)
            .map(|record| record.week(week).clone())
    }

    /// Fill one week slot in memory only. Used by the request-layer
    /// fallback after a live fetch; never touches disk. Concurrent
    /// fallbacks for the same entity are last-writer-wins.
    pub async fn put(&self, entity: &str, week: WeekSlot, events: Vec<Event>) {
        let mut memory = self.memory.write().await;
        let record = memory.entry(entity.to_string()).or_default();
        *record.week_mut(week) = events;
    }

    /// Swap in a full batch of records, then persist them best-effort.
    ///
    /// The in-memory map is replaced atomically under the write lock.
    /// Disk writes follow: one file per entity plus the combined
    /// snapshot; each failure is logged without aborting the others or
    /// invalidating memory.
    pub async fn replace_all(&self, records: HashMap<String, CacheRecord>) {
        *self.memory.write().await = records.clone();

        for (entity, record) in &records {
            if let Err(error) = self.write_json(&self.entity_path(entity), record).await {
                log::error!(
                    "{}: failed to write cache file for {entity}: {error}",
                    self.class.label()
                );
            }
        }

        if let Err(error) = self.write_json(&self.snapshot_path(), &records).await {
            log::error!("{}: failed to write combined snapshot: {error}", self.class.label());
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root_dir.join(self.class.snapshot_file())
    }

    fn entity_path(&self, entity: &str) -> PathBuf {
        self.root_dir
            .join(self.class.label())
            .join(format!("{}.json", sanitize_file_name(entity)))
    }

    /// Read JSON, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &PathBuf) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write JSON atomically (write to temp, then rename).
    async fn write_json<T: Serialize>(&self, path: &PathBuf, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Reduce an entity id to a safe file name: ASCII alphanumerics,
/// Cyrillic letters and `._-` survive, everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric()
                || ('\u{0400}'..='\u{04FF}').contains(&c)
                || matches!(c, '.' | '_' | '-')
            {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn event(discipline: &str) -> Event {
        serde_json::from_value(serde_json::json!({
            "date": "02.09.2026",
            "startTime": "09:00",
            "endTime": "10:30",
            "discipline": discipline,
        }))
        .unwrap()
    }

    fn record(week0: &str, week1: &str) -> CacheRecord {
        CacheRecord::new(vec![event(week0)], vec![event(week1)])
    }

    #[test]
    fn sanitize_keeps_cyrillic_and_safe_chars() {
        assert_eq!(sanitize_file_name("К0709-23/1"), "К0709-23_1");
        assert_eq!(sanitize_file_name("group.name_x"), "group.name_x");
        assert_eq!(sanitize_file_name("a b:c"), "a_b_c");
    }

    #[tokio::test]
    async fn replace_all_then_get() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        let mut records = HashMap::new();
        records.insert("G1".to_string(), record("e1", "e2"));
        store.replace_all(records).await;

        let week0 = store.get("G1", WeekSlot::Current).await.unwrap();
        assert_eq!(week0[0].discipline, "e1");
        let week1 = store.get("G1", WeekSlot::Next).await.unwrap();
        assert_eq!(week1[0].discipline, "e2");
        assert!(store.get("G2", WeekSlot::Current).await.is_none());
    }

    #[tokio::test]
    async fn replace_all_writes_entity_files_and_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        let mut records = HashMap::new();
        records.insert("К0709-23/1".to_string(), record("a", "b"));
        store.replace_all(records).await;

        assert!(tmp.path().join("schedule_cache.json").exists());
        assert!(tmp.path().join("groups").join("К0709-23_1.json").exists());

        // per-entity file carries only the two week slots
        let raw = std::fs::read(tmp.path().join("groups").join("К0709-23_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(value.get("week0").is_some());
        assert!(value.get("writtenAt").is_none());
    }

    #[tokio::test]
    async fn put_is_memory_only() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        store.put("G1", WeekSlot::Next, vec![event("live")]).await;

        let events = store.get("G1", WeekSlot::Next).await.unwrap();
        assert_eq!(events[0].discipline, "live");
        // the other slot reads as an empty week of the same record
        assert!(store.get("G1", WeekSlot::Current).await.unwrap().is_empty());
        // nothing hit the disk
        assert!(!tmp.path().join("schedule_cache.json").exists());
        assert!(!tmp.path().join("groups").exists());
    }

    #[tokio::test]
    async fn disk_record_wins_over_memory() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        store.put("G1", WeekSlot::Current, vec![event("memory")]).await;

        // simulate a snapshot left by a previous process
        let dir = tmp.path().join("groups");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("G1.json"),
            serde_json::to_vec(&record("disk", "disk-next")).unwrap(),
        )
        .unwrap();

        let events = store.get("G1", WeekSlot::Current).await.unwrap();
        assert_eq!(events[0].discipline, "disk");
    }

    #[tokio::test]
    async fn corrupt_disk_file_degrades_to_memory() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        store.put("G1", WeekSlot::Current, vec![event("memory")]).await;

        let dir = tmp.path().join("groups");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("G1.json"), b"{ not json").unwrap();

        let events = store.get("G1", WeekSlot::Current).await.unwrap();
        assert_eq!(events[0].discipline, "memory");
    }

    #[tokio::test]
    async fn load_restores_combined_snapshot() {
        let tmp = TempDir::new().unwrap();

        {
            let store = CacheStore::new(tmp.path(), EntityClass::Teacher);
            let mut records = HashMap::new();
            records.insert("17".to_string(), record("t0", "t1"));
            store.replace_all(records).await;
        }

        let fresh = CacheStore::new(tmp.path(), EntityClass::Teacher);
        fresh.load().await.unwrap();

        // per-entity files are separate; drop them to prove the hit comes
        // from the loaded memory tier
        std::fs::remove_dir_all(tmp.path().join("teachers")).unwrap();

        let events = fresh.get("17", WeekSlot::Current).await.unwrap();
        assert_eq!(events[0].discipline, "t0");
    }

    #[tokio::test]
    async fn load_with_no_snapshot_is_a_cold_start() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);
        store.load().await.unwrap();
        assert!(store.get("G1", WeekSlot::Current).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_disk_read_error_does_not_break_parse() {
        // read_json surfaces JSON errors; get() must treat them as a miss
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), EntityClass::Group);

        let dir = tmp.path().join("groups");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("G9.json"), b"\xff\xfe").unwrap();

        assert!(store.get("G9", WeekSlot::Current).await.is_none());
    }
}
