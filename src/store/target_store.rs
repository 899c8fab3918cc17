//! JSON file backed target store.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;
use super::settings::SettingsUpdate;

/// Target store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("No available slots")]
    NoCapacity,
    #[error("Invalid server ID")]
    InvalidId(u32),
}

#[derive(Debug)]
struct Inner {
    gmt_offset: i32,
    targets: BTreeMap<u32, Target>,
}

/// Thread-safe owner of every target's configuration.
///
/// Mutations hold the lock while the file is rewritten, so writes never
/// interleave. When a save fails the in-memory change is kept and the error
/// is returned to the caller.
pub struct TargetStore {
    path: PathBuf,
    capacity: u32,
    inner: Mutex<Inner>,
}

impl TargetStore {
    /// Load the store from `path`, falling back to the factory defaults when
    /// the file is missing or unreadable.
    pub fn open<P: AsRef<Path>>(path: P, capacity: u32) -> Self {
        let path = path.as_ref().to_path_buf();

        let (inner, loaded) = match read_file(&path, capacity) {
            Ok(inner) => (inner, true),
            Err(e) => {
                tracing::warn!(
                    "Could not load targets from {}: {}; using defaults",
                    path.display(),
                    e
                );
                (factory_defaults(capacity), false)
            }
        };

        let store = Self {
            path,
            capacity,
            inner: Mutex::new(inner),
        };

        if !loaded {
            let guard = store.lock();
            if let Err(e) = store.save(&guard) {
                tracing::error!("Failed to write initial config: {}", e);
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn gmt_offset(&self) -> i32 {
        self.lock().gmt_offset
    }

    /// Get a target by ID.
    pub fn get(&self, id: u32) -> Option<Target> {
        self.lock().targets.get(&id).cloned()
    }

    /// All known targets in ID order.
    pub fn list(&self) -> Vec<Target> {
        self.lock().targets.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.lock().targets.keys().copied().collect()
    }

    /// Unique group names of enabled targets, in ID order.
    pub fn groups(&self) -> Vec<String> {
        let inner = self.lock();
        let mut groups: Vec<String> = Vec::new();
        for target in inner.targets.values().filter(|t| t.enabled) {
            if !groups.contains(&target.group) {
                groups.push(target.group.clone());
            }
        }
        groups
    }

    /// Place a new, enabled target in the first free slot and return its ID.
    pub fn add(&self, patch: &TargetPatch) -> Result<u32, StoreError> {
        let mut inner = self.lock();

        let id = (0..self.capacity)
            .find(|id| inner.targets.get(id).map_or(true, Target::is_vacant))
            .ok_or(StoreError::NoCapacity)?;

        let mut target = Target::for_add(id);
        patch.apply(&mut target);
        target.enabled = true;

        tracing::info!("Adding target {} ({}) in slot {}", target.name, target.url, id);
        inner.targets.insert(id, target);
        self.save(&inner)?;
        Ok(id)
    }

    /// Apply a partial update to an existing slot.
    pub fn update(&self, id: u32, patch: &TargetPatch) -> Result<Target, StoreError> {
        let mut inner = self.lock();
        self.check_id(id)?;

        let target = inner
            .targets
            .entry(id)
            .or_insert_with(|| Target::vacant(id));
        patch.apply(target);
        let updated = target.clone();

        self.save(&inner)?;
        Ok(updated)
    }

    /// Soft delete: disable the target and clear its URL so the slot can be
    /// reused.
    pub fn delete(&self, id: u32) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check_id(id)?;

        let target = inner
            .targets
            .entry(id)
            .or_insert_with(|| Target::vacant(id));
        target.enabled = false;
        target.url = SENTINEL.to_string();

        tracing::info!("Deleted target in slot {}", id);
        self.save(&inner)
    }

    /// Apply a settings form and return the IDs it touched.
    pub fn apply_settings(&self, update: &SettingsUpdate) -> Result<Vec<u32>, StoreError> {
        let mut inner = self.lock();

        if let Some(offset) = update.gmt_offset {
            inner.gmt_offset = offset;
        }

        let mut touched = Vec::new();
        for (&id, patch) in &update.patches {
            if id >= self.capacity {
                tracing::warn!("Ignoring settings for out-of-range slot {}", id);
                continue;
            }
            let target = inner
                .targets
                .entry(id)
                .or_insert_with(|| Target::vacant(id));
            patch.apply(target);
            touched.push(id);
        }

        self.save(&inner)?;
        Ok(touched)
    }

    /// Rename a group on every target and return how many changed.
    pub fn rename_group(&self, old_name: &str, new_name: &str) -> Result<usize, StoreError> {
        let mut inner = self.lock();

        let mut updated = 0;
        for target in inner.targets.values_mut() {
            if target.group == old_name {
                target.group = new_name.to_string();
                updated += 1;
            }
        }

        self.save(&inner)?;
        Ok(updated)
    }

    fn check_id(&self, id: u32) -> Result<(), StoreError> {
        if id < self.capacity {
            Ok(())
        } else {
            Err(StoreError::InvalidId(id))
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the full target set; caller holds the lock.
    fn save(&self, inner: &Inner) -> Result<(), StoreError> {
        let servers = inner
            .targets
            .values()
            .filter(|t| t.is_persisted())
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let file = StoreFile {
            gmt_offset: inner.gmt_offset,
            config_version: CONFIG_VERSION,
            servers,
        };
        let data = serde_json::to_vec_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Config saved ({} bytes)", data.len());
        Ok(())
    }
}

fn read_file(path: &Path, capacity: u32) -> Result<Inner, StoreError> {
    let data = fs::read(path)?;
    let file: StoreFile = serde_json::from_slice(&data)?;

    let mut targets = BTreeMap::new();
    for (position, mut value) in file.servers.into_iter().enumerate() {
        if let Some(obj) = value.as_object_mut() {
            obj.entry("id").or_insert_with(|| position.into());
        }

        let target: Target = match serde_json::from_value(value) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping unreadable server record #{}: {}", position, e);
                continue;
            }
        };

        if target.id >= capacity {
            tracing::warn!("Skipping server record with out-of-range id {}", target.id);
            continue;
        }
        targets.insert(target.id, target);
    }

    tracing::info!("Loaded {} servers from config", targets.len());

    // Slots missing from the file are still reported, as vacant.
    for id in 0..capacity {
        targets.entry(id).or_insert_with(|| Target::vacant(id));
    }
    Ok(Inner {
        gmt_offset: file.gmt_offset,
        targets,
    })
}

fn factory_defaults(capacity: u32) -> Inner {
    Inner {
        gmt_offset: default_gmt_offset(),
        targets: (0..capacity).map(|id| (id, Target::factory_default(id))).collect(),
    }
}
