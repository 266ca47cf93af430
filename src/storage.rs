//! Durable client-side blobs: onboarding state, filter snapshots, and the
//! legacy local progress record kept as a migration fallback.
//!
//! Each key is one JSON file under the data directory, written atomically
//! via a temporary file and rename so a crash never leaves a torn blob.
//! Writes are last-write-wins; this is preference data, not correctness-
//! critical state, and no cross-process locking is attempted.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The blobs this client persists. File names mirror the storage keys the
/// web client used so an operator can recognize them on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKey {
    /// Onboarding-derived `{levels, languages}` preferences.
    UserPreferences,
    /// Whether onboarding has been completed at least once.
    OnboardingCompleted,
    /// Question-library filter snapshot (levels/languages/customLanguages).
    LibraryFilters,
    /// Pre-server progress record; read-only migration fallback.
    LegacyProgress,
}

impl StorageKey {
    pub fn file_name(&self) -> &'static str {
        match self {
            StorageKey::UserPreferences => "user_preferences.json",
            StorageKey::OnboardingCompleted => "onboarding_completed.json",
            StorageKey::LibraryFilters => "question_library_filters.json",
            StorageKey::LegacyProgress => "user_progress.json",
        }
    }

    /// Keys wiped when the user signs out. The filter snapshot survives: it
    /// is device preference, not account data.
    pub fn user_data() -> [StorageKey; 3] {
        [
            StorageKey::UserPreferences,
            StorageKey::OnboardingCompleted,
            StorageKey::LegacyProgress,
        ]
    }
}

/// Progress blob written by the pre-server version of the client. Superseded
/// by server-tracked attempts; still read so long-time users don't see their
/// entitlement state blink to zero before the dashboard loads.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyProgress {
    pub questions_completed: Vec<String>,
    pub free_questions_used: u32,
    pub has_unlocked: bool,
    pub streak: u32,
    pub last_active_date: Option<String>,
}

pub struct ClientStorage {
    dir: PathBuf,
}

impl ClientStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: StorageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Read and parse a blob. Missing files and parse failures both resolve
    /// to `None`; a corrupt preference file must never break the client.
    pub fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(_) => return None,
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "prepdeck", path = %path.display(), error = %e, "Ignoring unparseable storage blob");
                None
            }
        }
    }

    /// Persist a blob synchronously with a temp-file + rename so readers
    /// never observe a partial write.
    pub fn save<T: Serialize>(&self, key: StorageKey, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let temp = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&temp, content)?;
        fs::rename(&temp, &path)?;
        debug!(target: "prepdeck", path = %path.display(), "Persisted storage blob");
        Ok(())
    }

    pub fn remove(&self, key: StorageKey) -> bool {
        fs::remove_file(self.path_for(key)).is_ok()
    }

    /// Clear account-scoped blobs on sign-out; returns the names of the keys
    /// that were actually present and removed.
    pub fn clear_user_data(&self) -> Vec<&'static str> {
        let mut cleared = Vec::new();
        for key in StorageKey::user_data() {
            if self.remove(key) {
                cleared.push(key.file_name());
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage() -> (tempfile::TempDir, ClientStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = ClientStorage::new(dir.path().to_path_buf());
        (dir, storage)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, storage) = storage();
        storage.save(StorageKey::OnboardingCompleted, &true).unwrap();
        assert_eq!(storage.load::<bool>(StorageKey::OnboardingCompleted), Some(true));
    }

    #[test]
    fn missing_blob_loads_as_none() {
        let (_dir, storage) = storage();
        assert_eq!(storage.load::<bool>(StorageKey::OnboardingCompleted), None);
    }

    #[test]
    fn corrupt_blob_loads_as_none() {
        let (dir, storage) = storage();
        std::fs::write(dir.path().join("user_progress.json"), "{not json").unwrap();
        assert!(storage.load::<LegacyProgress>(StorageKey::LegacyProgress).is_none());
    }

    #[test]
    fn legacy_progress_parses_camel_case() {
        let (_dir, storage) = storage();
        let blob = json!({
            "questionsCompleted": ["12", "31"],
            "freeQuestionsUsed": 2,
            "hasUnlocked": false,
            "streak": 4,
            "lastActiveDate": "2026-08-01"
        });
        std::fs::create_dir_all(storage.dir.clone()).unwrap();
        std::fs::write(storage.path_for(StorageKey::LegacyProgress), blob.to_string()).unwrap();

        let progress: LegacyProgress = storage.load(StorageKey::LegacyProgress).unwrap();
        assert_eq!(progress.free_questions_used, 2);
        assert_eq!(progress.questions_completed.len(), 2);
        assert!(!progress.has_unlocked);
    }

    #[test]
    fn clear_user_data_reports_removed_keys() {
        let (_dir, storage) = storage();
        storage.save(StorageKey::OnboardingCompleted, &true).unwrap();
        storage.save(StorageKey::LegacyProgress, &LegacyProgress::default()).unwrap();
        // Filter snapshot is device preference and must survive sign-out.
        storage
            .save(StorageKey::LibraryFilters, &json!({ "levels": [] }))
            .unwrap();

        let cleared = storage.clear_user_data();
        assert!(cleared.contains(&"onboarding_completed.json"));
        assert!(cleared.contains(&"user_progress.json"));
        assert!(!cleared.contains(&"question_library_filters.json"));
        assert!(storage.load::<serde_json::Value>(StorageKey::LibraryFilters).is_some());
    }
}
