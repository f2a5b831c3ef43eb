use super::types::{Chirp, ChirpId, ChirpList};

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors surfaced by [`ChirpStore`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested chirp does not exist.
    #[error("Chirp {0} not found")]
    NotFound(ChirpId),

    /// The highest ID is already `ChirpId::MAX`; no further IDs can be allocated.
    #[error("Chirp ID space exhausted")]
    IdsExhausted,

    /// The seed file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The seed file is not a valid chirp list.
    #[error("Invalid chirp file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Accepted layouts of `chirps.json`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Wrapped(ChirpList<Value>),
    Bare(Vec<Value>),
}

/// In-memory mapping from chirp ID to chirp.
///
/// Every public method takes the lock exactly once, and no guard escapes, so
/// handlers only ever see owned copies.
pub struct ChirpStore {
    chirps: Mutex<BTreeMap<ChirpId, Chirp>>,
}

impl ChirpStore {
    pub fn new() -> Self {
        Self {
            chirps: Mutex::new(BTreeMap::new()),
        }
    }

    /// Poisoning is ignored: every mutation is a single map call.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ChirpId, Chirp>> {
        self.chirps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id_locked(chirps: &BTreeMap<ChirpId, Chirp>) -> Result<ChirpId, StoreError> {
        match chirps.last_key_value() {
            Some((&highest, _)) => highest.checked_add(1).ok_or(StoreError::IdsExhausted),
            None => Ok(0),
        }
    }

    /// Creates a chirp under the next free ID, stamped with the current time.
    pub fn create(&self, username: &str, content: &str) -> Result<Chirp, StoreError> {
        let mut chirps = self.lock();
        let id = Self::next_id_locked(&chirps)?;
        let chirp = Chirp::new(id, username, content);
        chirps.insert(id, chirp.clone());

        tracing::debug!("Created chirp {} for {}", id, chirp.username);
        Ok(chirp)
    }

    /// Inserts a chirp under its own ID, replacing any previous entry.
    pub fn insert(&self, chirp: Chirp) {
        self.lock().insert(chirp.id, chirp);
    }

    pub fn get(&self, id: ChirpId) -> Option<Chirp> {
        self.lock().get(&id).cloned()
    }

    /// Replaces an existing chirp. The stored chirp always carries `id`,
    /// whatever ID the replacement arrived with.
    pub fn update(&self, id: ChirpId, mut chirp: Chirp) -> Result<Chirp, StoreError> {
        let mut chirps = self.lock();
        let slot = chirps.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        chirp.id = id;
        *slot = chirp.clone();
        Ok(chirp)
    }

    pub fn delete(&self, id: ChirpId) -> Option<Chirp> {
        self.lock().remove(&id)
    }

    /// All chirps, ordered by ID.
    pub fn list(&self) -> Vec<Chirp> {
        self.lock().values().cloned().collect()
    }

    /// The ID the next [`create`](Self::create) will use: highest ID plus one, or `0`.
    pub fn next_id(&self) -> Result<ChirpId, StoreError> {
        Self::next_id_locked(&self.lock())
    }

    /// Lowest ID in use. Presentation only; never use this to allocate IDs.
    pub fn lowest_id(&self) -> Option<ChirpId> {
        self.lock().first_key_value().map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Seeds the store from a JSON file holding either `{"chirps": [...]}` or
    /// a bare array. Entries that are not valid chirps are skipped with a
    /// warning. Returns how many chirps were loaded.
    pub fn load_from_file(&self, path: &Path) -> Result<usize, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let entries = match serde_json::from_str::<SeedFile>(&raw)? {
            SeedFile::Wrapped(list) => list.chirps,
            SeedFile::Bare(entries) => entries,
        };

        let chirps: Vec<Chirp> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Chirp>(entry) {
                Ok(chirp) => Some(chirp),
                Err(e) => {
                    tracing::warn!("Skipping entry {} of {}: {}", index, path.display(), e);
                    None
                }
            })
            .collect();

        let count = chirps.len();
        let mut stored = self.lock();
        for chirp in chirps {
            stored.insert(chirp.id, chirp);
        }
        Ok(count)
    }

    /// Startup helper: loads `path` if it exists and logs the outcome.
    /// A missing or malformed file leaves the store empty.
    pub fn seed_from(&self, path: &Path) {
        if !path.exists() {
            tracing::info!(
                "No {} file found. Starting with an empty store.",
                path.display()
            );
            return;
        }

        match self.load_from_file(path) {
            Ok(count) => tracing::info!("Loaded {} chirps from {}", count, path.display()),
            Err(e) => tracing::error!("Error loading chirps from {}: {}", path.display(), e),
        }
    }
}

impl Default for ChirpStore {
    fn default() -> Self {
        Self::new()
    }
}
