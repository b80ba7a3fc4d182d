//! Durable preset storage.
//!
//! The whole collection is one JSON record under [`PRESETS_KEY`], stamped with
//! [`SCHEMA_VERSION`] under [`VERSION_KEY`]. A missing, unreadable or
//! differently-versioned record is discarded and replaced by the built-in
//! collection; there is no partial migration.
//!
//! Every mutation reloads the stored collection inside a write transaction
//! instead of trusting an in-memory copy, so two edit paths working from
//! stale snapshots cannot overwrite each other.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::database::{kv_delete, kv_get, kv_set, Database};
use crate::error::{Result, ValidationError};
use crate::preset::{Preset, PresetCollection, PresetEdit, DEFAULT_CUES};

pub const PRESETS_KEY: &str = "timer_presets";
pub const VERSION_KEY: &str = "timer_presets_version";
/// Bump whenever the stored shape or the built-in defaults change.
pub const SCHEMA_VERSION: &str = "1.1";

pub struct PresetStore {
    db: Mutex<Database>,
    cues: Vec<String>,
}

impl PresetStore {
    /// Open the store in the default data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::new(Database::open_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            cues: DEFAULT_CUES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Cue ids handed out round-robin to new segments.
    pub fn with_cues(mut self, cues: Vec<String>) -> Self {
        if !cues.is_empty() {
            self.cues = cues;
        }
        self
    }

    /// Read the collection, reseeding it if absent, corrupt or outdated.
    pub fn load(&self) -> Result<PresetCollection> {
        self.transact(load_or_seed)
    }

    /// Alias of [`load`](Self::load), for call sites that only list.
    pub fn list(&self) -> Result<PresetCollection> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Option<Preset>> {
        Ok(self.load()?.get(id).cloned())
    }

    /// Replace the stored collection with `collection` in one write.
    pub fn save(&self, collection: &PresetCollection) -> Result<()> {
        self.transact(|conn| write_collection(conn, collection))
    }

    /// Read-modify-write a single preset.
    ///
    /// Reloads the stored collection, applies `mutator` to the preset with
    /// `id`, persists the result and returns the updated preset. If the
    /// mutator rejects the change nothing is written.
    pub fn upsert_preset_field<F>(&self, id: &str, mutator: F) -> Result<Preset>
    where
        F: FnOnce(&mut Preset) -> Result<(), ValidationError>,
    {
        self.transact(|conn| {
            let mut collection = load_or_seed(conn)?;
            let preset = collection
                .get_mut(id)
                .ok_or_else(|| ValidationError::PresetNotFound { id: id.to_string() })?;
            mutator(preset)?;
            let updated = preset.clone();
            write_collection(conn, &collection)?;
            Ok(updated)
        })
    }

    /// Apply a [`PresetEdit`] through [`upsert_preset_field`](Self::upsert_preset_field).
    pub fn apply_edit(&self, id: &str, edit: &PresetEdit) -> Result<Preset> {
        let cues = &self.cues;
        self.upsert_preset_field(id, |preset| edit.apply(preset, cues))
    }

    /// Remove the preset with `id`. Returns false if there was none.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.transact(|conn| {
            let mut collection = load_or_seed(conn)?;
            if !collection.remove(id) {
                return Ok(false);
            }
            write_collection(conn, &collection)?;
            Ok(true)
        })
    }

    /// Create an empty preset (no segments, one repeat) named `name`.
    pub fn create_preset(&self, name: &str) -> Result<Preset> {
        let name = Preset::validate_name(name)?;
        self.transact(|conn| {
            let mut collection = load_or_seed(conn)?;
            let base = format!("preset_{}", Utc::now().timestamp_millis());
            let mut id = base.clone();
            let mut n = 1;
            while collection.contains(&id) {
                n += 1;
                id = format!("{base}_{n}");
            }
            let preset = Preset {
                id,
                name,
                segments: Vec::new(),
                repeat_count: 1,
            };
            collection.upsert(preset.clone());
            write_collection(conn, &collection)?;
            Ok(preset)
        })
    }

    /// Drop every stored preset and go back to the built-in collection.
    pub fn reset_to_defaults(&self) -> Result<PresetCollection> {
        self.transact(|conn| {
            kv_delete(conn, PRESETS_KEY)?;
            kv_delete(conn, VERSION_KEY)?;
            load_or_seed(conn)
        })
    }

    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut db = self.lock();
        db.with_transaction(|tx| f(tx))
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_or_seed(conn: &Connection) -> Result<PresetCollection> {
    let version = kv_get(conn, VERSION_KEY)?;
    if version.as_deref() != Some(SCHEMA_VERSION) {
        if version.is_some() {
            info!(
                stored = version.as_deref().unwrap_or_default(),
                current = SCHEMA_VERSION,
                "preset schema changed, discarding stored presets"
            );
        }
        return seed(conn);
    }

    let Some(raw) = kv_get(conn, PRESETS_KEY)? else {
        return seed(conn);
    };

    match parse_collection(&raw) {
        Ok(collection) => Ok(collection),
        Err(reason) => {
            warn!("stored presets unreadable ({reason}), restoring defaults");
            seed(conn)
        }
    }
}

fn parse_collection(raw: &str) -> std::result::Result<PresetCollection, String> {
    let collection: PresetCollection = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    collection.validate()?;
    Ok(collection)
}

fn seed(conn: &Connection) -> Result<PresetCollection> {
    let collection = PresetCollection::seeded();
    write_collection(conn, &collection)?;
    Ok(collection)
}

fn write_collection(conn: &Connection, collection: &PresetCollection) -> Result<()> {
    let json = serde_json::to_string(collection)?;
    kv_set(conn, PRESETS_KEY, &json)?;
    kv_set(conn, VERSION_KEY, SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::Segment;

    #[test]
    fn first_load_seeds_default() {
        let store = PresetStore::open_memory().unwrap();
        let c = store.load().unwrap();
        assert_eq!(c, PresetCollection::seeded());
        let db = store.lock();
        assert_eq!(db.kv_get(VERSION_KEY).unwrap().as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn version_mismatch_discards_everything() {
        let store = PresetStore::open_memory().unwrap();
        store.create_preset("Mine").unwrap();
        store.lock().kv_set(VERSION_KEY, "1.0").unwrap();

        let c = store.load().unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.presets()[0].repeat_count, 25);
        assert_eq!(c.presets()[0].name, "Bedtime Breathing");
    }

    #[test]
    fn corrupt_blob_recovers_to_default() {
        let store = PresetStore::open_memory().unwrap();
        store.load().unwrap();
        store.lock().kv_set(PRESETS_KEY, "{not json").unwrap();
        assert_eq!(store.load().unwrap(), PresetCollection::seeded());
    }

    #[test]
    fn rejected_mutation_writes_nothing() {
        let store = PresetStore::open_memory().unwrap();
        let before = store.load().unwrap();
        let err = store
            .upsert_preset_field("preset_1", |p| {
                p.repeat_count = 99;
                Err(ValidationError::EmptySegmentName)
            })
            .unwrap_err();
        assert_eq!(err.code(), Some("empty_segment_name"));
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn upsert_missing_preset_is_not_found() {
        let store = PresetStore::open_memory().unwrap();
        let err = store.upsert_preset_field("nope", |_| Ok(())).unwrap_err();
        assert_eq!(err.code(), Some("preset_not_found"));
    }

    #[test]
    fn create_preset_gets_unique_ids() {
        let store = PresetStore::open_memory().unwrap();
        let a = store.create_preset("A").unwrap();
        let b = store.create_preset("B").unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.segments.is_empty());
        assert_eq!(a.repeat_count, 1);
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn create_preset_validates_name() {
        let store = PresetStore::open_memory().unwrap();
        let err = store.create_preset("   ").unwrap_err();
        assert_eq!(err.code(), Some("empty_preset_name"));
    }

    #[test]
    fn delete_is_noop_when_absent() {
        let store = PresetStore::open_memory().unwrap();
        assert!(store.delete("preset_1").unwrap());
        assert!(!store.delete("preset_1").unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn reset_to_defaults_restores_seed() {
        let store = PresetStore::open_memory().unwrap();
        store.delete("preset_1").unwrap();
        store.create_preset("Other").unwrap();
        assert_eq!(store.reset_to_defaults().unwrap(), PresetCollection::seeded());
    }

    #[test]
    fn apply_edit_uses_configured_cues() {
        let store = PresetStore::open_memory()
            .unwrap()
            .with_cues(vec!["bell".into()]);
        let p = store.create_preset("Bells").unwrap();
        let p = store
            .apply_edit(
                &p.id,
                &PresetEdit::AddSegment {
                    name: "One".into(),
                    duration_secs: 1.0,
                },
            )
            .unwrap();
        assert_eq!(p.segments, vec![Segment::new("One", 1.0, "bell").unwrap()]);
    }
}
