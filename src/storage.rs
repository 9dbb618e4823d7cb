use crate::catalog::{AdoptedPet, DefaultStats};
use crate::config::atomic_rename;
use crate::model::Rules;
use crate::theme::Theme;
use crate::vitals::{PetStats, Vital, VitalKind};
use std::collections::{BTreeMap, HashMap};
use std::{fs, path::PathBuf};

pub(crate) const KEY_THEME: &str = "theme";
pub(crate) const KEY_ADOPTED_PET: &str = "adoptedPet";
pub(crate) const KEY_PET_STATS: &str = "petStats";
pub(crate) const KEY_SCORE: &str = "score";
pub(crate) const KEY_HIGH_SCORE: &str = "highScore";

/// String-keyed slot store. Every write is a full overwrite of one slot.
pub(crate) trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    slots: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.slots.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.slots.remove(key);
    }
}

/// All slots in one JSON object on disk, rewritten on every mutation.
/// A failed write is logged and otherwise ignored.
pub(crate) struct FileStore {
    path: PathBuf,
    slots: BTreeMap<String, String>,
}

impl FileStore {
    pub(crate) fn open(path: PathBuf) -> Self {
        let slots = fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { path, slots }
    }

    fn flush(&self) {
        if let Err(err) = self.write_atomic() {
            tracing::warn!(path = %self.path.display(), %err, "store write failed");
        }
    }

    fn write_atomic(&self) -> crate::error::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&self.slots)?;
        fs::write(&tmp, data)?;
        atomic_rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.slots.insert(key.to_string(), value);
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.slots.remove(key).is_some() {
            self.flush();
        }
    }
}

/// Typed view over the five persisted slots.
pub(crate) struct Session<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Session<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store }
    }

    pub(crate) fn theme(&self) -> Theme {
        self.store
            .get(KEY_THEME)
            .map(|s| Theme::from_name(&s))
            .unwrap_or_default()
    }

    pub(crate) fn set_theme(&mut self, theme: Theme) {
        self.store.set(KEY_THEME, theme.name().to_string());
    }

    pub(crate) fn adopted_pet(&self) -> Option<AdoptedPet> {
        let raw = self.store.get(KEY_ADOPTED_PET)?;
        match serde_json::from_str(&raw) {
            Ok(pet) => Some(pet),
            Err(err) => {
                tracing::debug!(%err, "ignoring unreadable adopted pet");
                None
            }
        }
    }

    pub(crate) fn set_adopted_pet(&mut self, pet: &AdoptedPet) {
        match serde_json::to_string(pet) {
            Ok(s) => self.store.set(KEY_ADOPTED_PET, s),
            Err(err) => tracing::warn!(%err, "could not serialize adopted pet"),
        }
    }

    /// Stored stats, or fresh ones from the pet's defaults.
    pub(crate) fn pet_stats(&self, defaults: &DefaultStats, rules: &Rules) -> PetStats {
        let stored = self
            .store
            .get(KEY_PET_STATS)
            .and_then(|s| serde_json::from_str::<BTreeMap<VitalKind, Vital>>(&s).ok());
        match stored {
            Some(map) => PetStats::from_stored(map, defaults, rules),
            None => PetStats::from_defaults(defaults, rules),
        }
    }

    pub(crate) fn has_pet_stats(&self) -> bool {
        self.store.get(KEY_PET_STATS).is_some()
    }

    pub(crate) fn set_pet_stats(&mut self, stats: &PetStats) {
        match serde_json::to_string(stats) {
            Ok(s) => self.store.set(KEY_PET_STATS, s),
            Err(err) => tracing::warn!(%err, "could not serialize pet stats"),
        }
    }

    pub(crate) fn score(&self) -> u64 {
        self.read_u64(KEY_SCORE)
    }

    pub(crate) fn set_score(&mut self, score: u64) {
        self.store.set(KEY_SCORE, score.to_string());
    }

    pub(crate) fn high_score(&self) -> u64 {
        self.read_u64(KEY_HIGH_SCORE)
    }

    pub(crate) fn set_high_score(&mut self, score: u64) {
        self.store.set(KEY_HIGH_SCORE, score.to_string());
    }

    /// Drops everything tied to the current pet. Theme and high score stay.
    pub(crate) fn clear_session(&mut self) {
        self.store.remove(KEY_PET_STATS);
        self.store.remove(KEY_ADOPTED_PET);
        self.store.remove(KEY_SCORE);
    }

    fn read_u64(&self, key: &str) -> u64 {
        self.store
            .get(key)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }
}
