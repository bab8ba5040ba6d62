use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

use crate::{EntryDraft, KeyValueStore, MoodEntry, MoodError, Result};

/// Default storage key for the serialized entry list.
pub const DEFAULT_STORAGE_KEY: &str = "mindful_moment_entries";

/// Owns the authoritative list of mood entries and keeps it in sync with a
/// key-value store.
///
/// Every write is a full read-modify-write of the whole list under one key.
/// That is fine for a personal journal but grows linearly with the number of
/// entries.
pub struct EntryStore<S> {
    /// Durable backend
    kv: S,

    /// Key the serialized list lives under
    key: String,

    /// In-memory copy of the persisted list, in insertion order
    entries_cache: Mutex<Vec<MoodEntry>>,

    /// Serialises read-modify-write cycles
    write_lock: TokioMutex<()>,

    /// Set while the stored value could not be read or backed up; writes
    /// are refused so they cannot replace it
    writes_blocked: AtomicBool,
}

impl<S: KeyValueStore> EntryStore<S> {
    /// Creates a store over `kv`. Nothing is read until [`EntryStore::load`].
    pub fn new(kv: S, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            entries_cache: Mutex::new(Vec::new()),
            write_lock: TokioMutex::new(()),
            writes_blocked: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the persisted list into memory and returns it.
    ///
    /// A missing, unreadable or corrupt value yields an empty list. Whenever
    /// anything in the stored value is dropped, the raw value is copied to
    /// `<key>_corrupt` before the next write can replace it. If the value
    /// cannot be read at all, or the copy fails, `append` and `remove` fail
    /// until a later `load` succeeds.
    pub async fn load(&self) -> Vec<MoodEntry> {
        let _guard = self.write_lock.lock().await;
        info!("Loading entries from key '{}'", self.key);

        let (loaded, writable) = match self.kv.get(&self.key).await {
            Ok(Some(raw)) => match decode_entries(&raw) {
                Ok((entries, 0)) => (entries, true),
                Ok((entries, skipped)) => {
                    warn!("Dropped {} unreadable stored records", skipped);
                    let preserved = self.preserve_corrupt(raw).await;
                    (entries, preserved)
                }
                Err(e) => {
                    warn!("Stored entries are corrupt, starting empty: {}", e);
                    let preserved = self.preserve_corrupt(raw).await;
                    (Vec::new(), preserved)
                }
            },
            Ok(None) => {
                debug!("No entries stored yet under '{}'", self.key);
                (Vec::new(), true)
            }
            Err(e) => {
                error!("Failed to load entries, writes disabled: {}", e);
                (Vec::new(), false)
            }
        };

        self.writes_blocked.store(!writable, Ordering::SeqCst);

        info!("Loaded {} entries", loaded.len());
        *self.cache() = loaded.clone();
        loaded
    }

    /// Returns the current in-memory snapshot without touching storage.
    pub fn entries(&self) -> Vec<MoodEntry> {
        self.cache().clone()
    }

    /// Looks up an entry by ID in the in-memory snapshot.
    pub fn get(&self, id: &str) -> Option<MoodEntry> {
        self.cache().iter().find(|e| e.id == id).cloned()
    }

    /// Creates an entry from `draft` stamped with the current time.
    pub async fn append(&self, draft: EntryDraft) -> Result<MoodEntry> {
        self.append_at(draft, Utc::now()).await
    }

    /// Creates an entry from `draft` stamped with `now` and persists the
    /// updated list. The in-memory list only changes once the write succeeds.
    pub async fn append_at(&self, draft: EntryDraft, now: DateTime<Utc>) -> Result<MoodEntry> {
        let _guard = self.write_lock.lock().await;
        self.ensure_writable()?;

        let mut updated = self.entries();
        let timestamp = now.timestamp_millis();
        let (mood, tags, notes) = draft.into_parts();
        let entry = MoodEntry {
            id: unique_id(&updated, timestamp),
            mood,
            tags,
            notes,
            timestamp,
        };
        debug!("Appending entry {} (mood {})", entry.id, entry.mood);
        updated.push(entry.clone());

        self.persist(&updated).await.inspect_err(|e| {
            error!("Failed to save entry {}: {}", entry.id, e);
        })?;
        *self.cache() = updated;

        info!("Entry saved: {}", entry.id);
        Ok(entry)
    }

    /// Permanently removes the entry with `id`. Removing an unknown ID is a
    /// no-op and does not touch storage.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ensure_writable()?;

        let mut updated = self.entries();
        let before = updated.len();
        updated.retain(|e| e.id != id);
        if updated.len() == before {
            debug!("Entry {} not present, nothing to remove", id);
            return Ok(());
        }

        self.persist(&updated).await.inspect_err(|e| {
            error!("Failed to delete entry {}: {}", id, e);
        })?;
        *self.cache() = updated;

        info!("Entry deleted: {}", id);
        Ok(())
    }

    async fn persist(&self, entries: &[MoodEntry]) -> Result<()> {
        trace!("Serializing {} entries", entries.len());
        let json = serde_json::to_string(entries)?;
        self.kv.set(&self.key, json).await
    }

    /// Copies `raw` to `<key>_corrupt`, returning whether the copy landed.
    async fn preserve_corrupt(&self, raw: String) -> bool {
        let backup_key = format!("{}_corrupt", self.key);
        match self.kv.set(&backup_key, raw).await {
            Ok(()) => {
                info!("Corrupt entries preserved under '{}'", backup_key);
                true
            }
            Err(e) => {
                error!("Failed to preserve corrupt entries: {}", e);
                false
            }
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writes_blocked.load(Ordering::SeqCst) {
            return Err(MoodError::Persistence {
                key: self.key.clone(),
                message: "stored entries could not be read or backed up; reload before writing"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn cache(&self) -> MutexGuard<'_, Vec<MoodEntry>> {
        self.entries_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses the persisted JSON array, returning the valid entries and how many
/// records were dropped. Bad records are dropped with a warning; the value as
/// a whole is rejected when it is not an array or when no record survives.
fn decode_entries(raw: &str) -> Result<(Vec<MoodEntry>, usize)> {
    let records: Vec<Value> = serde_json::from_str(raw)?;
    let total = records.len();

    let mut seen = HashSet::with_capacity(records.len());
    let mut entries = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<MoodEntry>(record) {
            Ok(entry) if !seen.insert(entry.id.clone()) => {
                warn!("Skipping record {}: duplicate id {}", index, entry.id);
            }
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping record {}: {}", index, e),
        }
    }

    if entries.is_empty() && total > 0 {
        return Err(MoodError::ApplicationError {
            message: format!("none of {} records are valid", total),
        });
    }
    let skipped = total - entries.len();
    Ok((entries, skipped))
}

/// IDs are the creation time in milliseconds; a numeric suffix keeps
/// same-millisecond entries apart.
fn unique_id(existing: &[MoodEntry], timestamp: i64) -> String {
    let base = timestamp.to_string();
    let taken = |candidate: &str| existing.iter().any(|e| e.id == candidate);

    if !taken(base.as_str()) {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(candidate.as_str()) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use tempfile::TempDir;

    use crate::{build_draft, ContextTag, FileKeyValueStore, MemoryKeyValueStore};

    const KEY: &str = "entries";

    fn store() -> EntryStore<MemoryKeyValueStore> {
        EntryStore::new(MemoryKeyValueStore::new(), KEY)
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[tokio::test]
    async fn load_empty_store() {
        let s = store();
        assert!(s.load().await.is_empty());
        assert!(s.entries().is_empty());
    }

    #[tokio::test]
    async fn append_assigns_id_and_timestamp() {
        let s = store();
        let draft = build_draft(4, &["Sleep"], "rested").unwrap();

        let entry = s.append_at(draft, at(1_700_000_000_123)).await.unwrap();
        assert_eq!(entry.id, "1700000000123");
        assert_eq!(entry.timestamp, 1_700_000_000_123);
        assert_eq!(entry.tags, vec![ContextTag::Sleep]);
        assert_eq!(s.entries(), vec![entry]);
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let s = store();
        let draft = build_draft(2, &["Work", "Weather"], "grey day").unwrap();
        let entry = s.append(draft).await.unwrap();

        // Reloading from the backend sees the write.
        let reloaded = s.load().await;
        let found = reloaded.iter().find(|e| e.id == entry.id).unwrap();
        assert_eq!(found, &entry);
    }

    #[tokio::test]
    async fn same_millisecond_entries_get_distinct_ids() {
        let s = store();
        let now = at(1_000);
        let a = s.append_at(build_draft::<&str>(3, &[], "").unwrap(), now).await.unwrap();
        let b = s.append_at(build_draft::<&str>(3, &[], "").unwrap(), now).await.unwrap();
        let c = s.append_at(build_draft::<&str>(3, &[], "").unwrap(), now).await.unwrap();
        assert_eq!(a.id, "1000");
        assert_eq!(b.id, "1000-1");
        assert_eq!(c.id, "1000-2");
    }

    #[tokio::test]
    async fn remove_deletes_entry_durably() {
        let s = store();
        let keep = s.append_at(build_draft::<&str>(5, &[], "").unwrap(), at(1)).await.unwrap();
        let gone = s.append_at(build_draft::<&str>(1, &[], "").unwrap(), at(2)).await.unwrap();

        s.remove(&gone.id).await.unwrap();
        assert!(s.get(&gone.id).is_none());

        let reloaded = s.load().await;
        assert_eq!(reloaded, vec![keep]);
    }

    #[tokio::test]
    async fn remove_unknown_id_is_noop() {
        let s = store();
        s.append_at(build_draft::<&str>(3, &[], "").unwrap(), at(1)).await.unwrap();
        let before = s.load().await;

        s.remove("does-not-exist").await.unwrap();
        assert_eq!(s.load().await, before);
    }

    #[tokio::test]
    async fn corrupt_value_loads_empty_and_is_preserved() {
        let s = store();
        s.backend().insert_raw(KEY, "{not json").unwrap();

        assert!(s.load().await.is_empty());
        assert_eq!(
            s.backend().raw("entries_corrupt").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn invalid_records_are_skipped() {
        let s = store();
        let raw = r#"[
            {"id":"1","mood":4,"tags":["Sleep"],"notes":"","timestamp":1},
            {"id":"2","mood":7,"tags":[],"notes":"","timestamp":2},
            {"id":"3","mood":3,"tags":["Gaming"],"notes":"","timestamp":3},
            {"id":"1","mood":2,"tags":[],"notes":"dup","timestamp":4}
        ]"#;
        s.backend().insert_raw(KEY, raw).unwrap();

        let loaded = s.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "1");
        assert_eq!(loaded[0].mood.value(), 4);
        assert_eq!(s.backend().raw("entries_corrupt").unwrap().as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn skipped_records_survive_the_next_write() {
        let s = store();
        let raw = r#"[{"id":"1","mood":4,"tags":[],"notes":"","timestamp":1},{"id":"2","mood":3,"tags":["Gardening"],"notes":"precious","timestamp":2}]"#;
        s.backend().insert_raw(KEY, raw).unwrap();

        assert_eq!(s.load().await.len(), 1);
        s.append_at(build_draft::<&str>(5, &[], "").unwrap(), at(3)).await.unwrap();

        let backup = s.backend().raw("entries_corrupt").unwrap().unwrap();
        assert_eq!(backup, raw);
        assert!(backup.contains("precious"));
        assert_eq!(s.load().await.len(), 2);
    }

    #[tokio::test]
    async fn writes_refused_when_backup_fails() {
        let s = store();
        s.backend().insert_raw(KEY, "{not json").unwrap();

        s.backend().set_fail_writes(true);
        assert!(s.load().await.is_empty());
        s.backend().set_fail_writes(false);

        let result = s.append_at(build_draft::<&str>(3, &[], "").unwrap(), at(1)).await;
        assert!(matches!(result, Err(MoodError::Persistence { .. })));
        assert_eq!(s.backend().raw(KEY).unwrap().as_deref(), Some("{not json"));

        // A load that manages the backup lifts the block.
        s.load().await;
        s.append_at(build_draft::<&str>(3, &[], "").unwrap(), at(1)).await.unwrap();
        assert_eq!(
            s.backend().raw("entries_corrupt").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("{}.json", KEY));
        let bytes = b"[{\"id\":\"1\",\"notes\":\"\xff\"}]".to_vec();
        std::fs::write(&path, &bytes).unwrap();

        let s = EntryStore::new(FileKeyValueStore::new(dir.path()), KEY);
        assert!(s.load().await.is_empty());

        let result = s.append_at(build_draft::<&str>(5, &[], "").unwrap(), at(1)).await;
        assert!(matches!(result, Err(MoodError::Persistence { .. })));
        assert!(matches!(s.remove("1").await, Err(MoodError::Persistence { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        // Once the file is readable again writes go through.
        std::fs::write(&path, "[]").unwrap();
        s.load().await;
        s.append_at(build_draft::<&str>(5, &[], "").unwrap(), at(1)).await.unwrap();
        assert_eq!(s.load().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let s = store();
        let first = s.append_at(build_draft::<&str>(3, &[], "").unwrap(), at(1)).await.unwrap();

        s.backend().set_fail_writes(true);
        let result = s.append_at(build_draft::<&str>(4, &[], "").unwrap(), at(2)).await;
        assert!(matches!(result, Err(MoodError::Persistence { .. })));
        assert!(matches!(
            s.remove(&first.id).await,
            Err(MoodError::Persistence { .. })
        ));

        assert_eq!(s.entries(), vec![first.clone()]);
        assert_eq!(s.load().await, vec![first]);
    }

    #[test]
    fn unique_id_prefers_plain_timestamp() {
        assert_eq!(unique_id(&[], 42), "42");
    }
}
