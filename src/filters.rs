//! Catalog filtering, search, pagination, and the locked teaser cards.
//!
//! The snapshot persists across restarts (and across sign-out: it is a
//! device preference). Search text and the current page are session state
//! and never hit disk. Any change to the *result set* resets pagination to
//! the first page; changing the page alone never touches the filters.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Filterable, Level, Question};
use crate::storage::{ClientStorage, StorageKey};

pub const ITEMS_PER_PAGE: usize = 12;
/// Locked upsell cards appended to the library for free-tier accounts.
pub const TEASER_CARD_COUNT: usize = 6;

/// The persisted filter selection. Empty sets mean "match everything".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Languages the user typed during onboarding that aren't in the fixed
    /// catalog list; they still show up as filter chips.
    #[serde(rename = "customLanguages", default)]
    pub custom_languages: Vec<String>,
}

/// What onboarding collects. Persisted separately from the filter snapshot
/// because sign-out clears preferences but keeps filters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingPreferences {
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub languages: Vec<String>,
}

pub struct FilterStore {
    storage: Arc<ClientStorage>,
    snapshot: FilterSnapshot,
    search: String,
    page: usize,
}

impl FilterStore {
    /// Restore from disk: a persisted snapshot wins, otherwise onboarding
    /// preferences seed the initial selection (typed languages double as
    /// custom chips), otherwise everything starts unfiltered.
    pub fn load(storage: Arc<ClientStorage>) -> Self {
        let snapshot = match storage.load::<FilterSnapshot>(StorageKey::LibraryFilters) {
            Some(s) => s,
            None => match storage.load::<OnboardingPreferences>(StorageKey::UserPreferences) {
                Some(prefs) => {
                    debug!(target: "prepdeck", "Seeding filters from onboarding preferences");
                    FilterSnapshot {
                        levels: prefs.levels,
                        custom_languages: prefs.languages.clone(),
                        languages: prefs.languages,
                    }
                }
                None => FilterSnapshot::default(),
            },
        };
        Self { storage, snapshot, search: String::new(), page: 1 }
    }

    pub fn snapshot(&self) -> &FilterSnapshot {
        &self.snapshot
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Onboarding runs once: either the completion flag or a stored
    /// preference blob counts as having been through it.
    pub fn needs_onboarding(&self) -> bool {
        let completed = self
            .storage
            .load::<bool>(StorageKey::OnboardingCompleted)
            .unwrap_or(false);
        let has_prefs = self
            .storage
            .load::<OnboardingPreferences>(StorageKey::UserPreferences)
            .is_some();
        !completed && !has_prefs
    }

    /// Record the onboarding selection: it becomes the active filters, the
    /// typed languages join the custom chip set, and onboarding is marked
    /// complete.
    pub fn apply_onboarding(&mut self, prefs: &OnboardingPreferences) {
        self.snapshot.levels = prefs.levels.clone();
        self.snapshot.languages = prefs.languages.clone();
        for lang in &prefs.languages {
            if !self.snapshot.custom_languages.contains(lang) {
                self.snapshot.custom_languages.push(lang.clone());
            }
        }
        self.page = 1;
        self.persist();
        if let Err(e) = self.storage.save(StorageKey::UserPreferences, prefs) {
            warn!(target: "prepdeck", error = %e, "Failed to persist onboarding preferences");
        }
        if let Err(e) = self.storage.save(StorageKey::OnboardingCompleted, &true) {
            warn!(target: "prepdeck", error = %e, "Failed to persist onboarding flag");
        }
        info!(target: "prepdeck", levels = prefs.levels.len(), languages = prefs.languages.len(), "Onboarding applied");
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.page = 1;
    }

    pub fn toggle_level(&mut self, level: Level) {
        match self.snapshot.levels.iter().position(|l| *l == level) {
            Some(i) => {
                self.snapshot.levels.remove(i);
            }
            None => self.snapshot.levels.push(level),
        }
        self.page = 1;
        self.persist();
    }

    pub fn toggle_language(&mut self, language: &str) {
        match self.snapshot.languages.iter().position(|l| l == language) {
            Some(i) => {
                self.snapshot.languages.remove(i);
            }
            None => self.snapshot.languages.push(language.to_string()),
        }
        self.page = 1;
        self.persist();
    }

    /// Navigation only. Deliberately leaves filters and search alone.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    fn persist(&self) {
        // Filter changes must never fail visibly; a missed write just means
        // defaults on the next launch.
        if let Err(e) = self.storage.save(StorageKey::LibraryFilters, &self.snapshot) {
            warn!(target: "prepdeck", error = %e, "Failed to persist filter snapshot");
        }
    }

    /// Apply search and the set filters. Order-preserving; empty dimensions
    /// match everything.
    pub fn filter<'a, T: Filterable>(&self, items: &'a [T]) -> Vec<&'a T> {
        let needle = self.search.trim().to_lowercase();
        items
            .iter()
            .filter(|item| {
                let text_ok = needle.is_empty()
                    || item.title().to_lowercase().contains(&needle)
                    || item.description().to_lowercase().contains(&needle)
                    || item.language().to_lowercase().contains(&needle);
                let level_ok =
                    self.snapshot.levels.is_empty() || self.snapshot.levels.contains(&item.level());
                let lang_ok = self.snapshot.languages.is_empty()
                    || self
                        .snapshot
                        .languages
                        .iter()
                        .any(|l| l.eq_ignore_ascii_case(item.language()));
                text_ok && level_ok && lang_ok
            })
            .collect()
    }

    pub fn total_pages(&self, filtered_len: usize) -> usize {
        filtered_len.div_ceil(ITEMS_PER_PAGE).max(1)
    }

    /// The current page's slice of an already-filtered list. A page past the
    /// end yields an empty slice rather than clamping.
    pub fn paginate<'a, T>(&self, filtered: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * ITEMS_PER_PAGE;
        if start >= filtered.len() {
            return &[];
        }
        let end = (start + ITEMS_PER_PAGE).min(filtered.len());
        &filtered[start..end]
    }
}

/// Chip list for the language filter: catalog languages plus the custom ones
/// typed at onboarding, deduplicated and sorted.
pub fn available_languages<T: Filterable>(items: &[T], custom: &[String]) -> Vec<String> {
    let mut set: BTreeSet<String> = items.iter().map(|i| i.language().to_string()).collect();
    for lang in custom {
        set.insert(lang.clone());
    }
    set.into_iter().collect()
}

/// A locked placeholder card advertising premium content. Carries no real
/// catalog data, only enough to render a plausible-looking blurred tile.
#[derive(Clone, Debug)]
pub struct TeaserCard {
    pub key: String,
    pub level: Level,
    pub language: String,
}

#[derive(Clone, Debug)]
pub enum DisplayCard {
    Real(Question),
    Teaser(TeaserCard),
}

/// The cards a library page renders: the real page plus, for accounts
/// without the premium unlock, a fixed block of teasers cycling through the
/// level/language combinations.
pub fn display_cards(
    page_items: &[&Question],
    has_unlocked: bool,
    languages: &[String],
) -> Vec<DisplayCard> {
    let mut cards: Vec<DisplayCard> = page_items
        .iter()
        .map(|q| DisplayCard::Real((*q).clone()))
        .collect();
    if has_unlocked {
        return cards;
    }
    let fallback = ["JavaScript".to_string()];
    let langs: &[String] = if languages.is_empty() { &fallback } else { languages };
    for i in 0..TEASER_CARD_COUNT {
        cards.push(DisplayCard::Teaser(TeaserCard {
            key: Uuid::new_v4().to_string(),
            level: Level::ALL[i % Level::ALL.len()],
            language: langs[i % langs.len()].clone(),
        }));
    }
    cards
}

/// A random non-premium question, used for the "try a free one" entry point.
pub fn random_free_pick(questions: &[Question]) -> Option<&Question> {
    let free: Vec<&Question> = questions.iter().filter(|q| !q.is_premium).collect();
    free.choose(&mut rand::thread_rng()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64, title: &str, language: &str, level: Level, premium: bool) -> Question {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "description": format!("About {}", title),
            "language": language,
            "difficulty": "Easy",
            "level": level.as_str(),
            "duration": 10,
            "is_premium": premium
        }))
        .unwrap()
    }

    fn catalog() -> Vec<Question> {
        vec![
            question(1, "Two Sum", "JavaScript", Level::Junior, false),
            question(2, "Event Loop", "JavaScript", Level::Mid, true),
            question(3, "Ownership", "Rust", Level::Senior, false),
            question(4, "Decorators", "Python", Level::Mid, false),
        ]
    }

    fn store() -> (tempfile::TempDir, FilterStore) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(ClientStorage::new(dir.path().to_path_buf()));
        (dir, FilterStore::load(storage))
    }

    #[test]
    fn empty_filters_match_everything() {
        let (_d, store) = store();
        assert_eq!(store.filter(&catalog()).len(), 4);
    }

    #[test]
    fn search_is_case_insensitive_over_title_description_language() {
        let (_d, mut store) = store();
        let items = catalog();
        store.set_search("RUST");
        assert_eq!(store.filter(&items).len(), 1);
        store.set_search("about decorators");
        assert_eq!(store.filter(&items).len(), 1);
        store.set_search("no such thing");
        assert!(store.filter(&items).is_empty());
    }

    #[test]
    fn level_and_language_filters_intersect() {
        let (_d, mut store) = store();
        let items = catalog();
        store.toggle_level(Level::Mid);
        assert_eq!(store.filter(&items).len(), 2);
        store.toggle_language("Python");
        assert_eq!(store.filter(&items).len(), 1);
        assert_eq!(store.filter(&items)[0].id, 4);
    }

    #[test]
    fn filter_dimensions_commute() {
        let items = catalog();

        let (_d1, mut level_first) = store();
        level_first.toggle_level(Level::Mid);
        level_first.toggle_language("Python");

        let (_d2, mut language_first) = store();
        language_first.toggle_language("Python");
        language_first.toggle_level(Level::Mid);

        let a: Vec<u64> = level_first.filter(&items).iter().map(|q| q.id).collect();
        let b: Vec<u64> = language_first.filter(&items).iter().map(|q| q.id).collect();
        assert_eq!(a, b);
        assert_eq!(a, vec![4]);
    }

    #[test]
    fn filter_changes_reset_the_page_but_navigation_does_not() {
        let (_d, mut store) = store();
        store.set_page(3);
        store.toggle_level(Level::Junior);
        assert_eq!(store.page(), 1);

        store.set_page(2);
        store.set_search("x");
        assert_eq!(store.page(), 1);

        store.set_page(5);
        assert_eq!(store.page(), 5);
        assert_eq!(store.snapshot().levels, vec![Level::Junior]);

        store.set_page(0);
        assert_eq!(store.page(), 1);
    }

    #[test]
    fn pagination_slices_and_overflows_to_empty() {
        let (_d, mut store) = store();
        let many: Vec<u32> = (0..30).collect();
        assert_eq!(store.paginate(&many).len(), ITEMS_PER_PAGE);
        store.set_page(3);
        assert_eq!(store.paginate(&many).len(), 6);
        store.set_page(4);
        assert!(store.paginate(&many).is_empty());
        assert_eq!(store.total_pages(30), 3);
        assert_eq!(store.total_pages(0), 1);
    }

    #[test]
    fn snapshot_persists_across_loads_and_survives_reset() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(ClientStorage::new(dir.path().to_path_buf()));
        {
            let mut store = FilterStore::load(storage.clone());
            store.toggle_level(Level::Senior);
            store.toggle_language("Rust");
        }
        storage.clear_user_data();
        let store = FilterStore::load(storage);
        assert_eq!(store.snapshot().levels, vec![Level::Senior]);
        assert_eq!(store.snapshot().languages, vec!["Rust".to_string()]);
    }

    #[test]
    fn onboarding_seeds_filters_and_custom_chips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(ClientStorage::new(dir.path().to_path_buf()));
        let mut store = FilterStore::load(storage.clone());
        assert!(store.needs_onboarding());

        let prefs = OnboardingPreferences {
            levels: vec![Level::Junior],
            languages: vec!["Kotlin".into()],
        };
        store.apply_onboarding(&prefs);
        assert!(!store.needs_onboarding());
        assert_eq!(store.snapshot().languages, vec!["Kotlin".to_string()]);
        assert!(store.snapshot().custom_languages.contains(&"Kotlin".to_string()));

        // A fresh load with no snapshot on disk still sees the preferences.
        storage.remove(StorageKey::LibraryFilters);
        let reloaded = FilterStore::load(storage);
        assert_eq!(reloaded.snapshot().levels, vec![Level::Junior]);
        assert!(reloaded.snapshot().custom_languages.contains(&"Kotlin".to_string()));
    }

    #[test]
    fn available_languages_merges_catalog_and_custom() {
        let langs = available_languages(&catalog(), &["Kotlin".to_string(), "Rust".to_string()]);
        assert_eq!(langs, vec!["JavaScript", "Kotlin", "Python", "Rust"]);
    }

    #[test]
    fn teasers_appear_only_without_the_unlock() {
        let items = catalog();
        let page: Vec<&Question> = items.iter().collect();
        let langs = vec!["JavaScript".to_string(), "Rust".to_string()];

        let locked = display_cards(&page, false, &langs);
        assert_eq!(locked.len(), page.len() + TEASER_CARD_COUNT);
        let teaser_levels: Vec<Level> = locked
            .iter()
            .filter_map(|c| match c {
                DisplayCard::Teaser(t) => Some(t.level),
                DisplayCard::Real(_) => None,
            })
            .collect();
        assert_eq!(teaser_levels.len(), TEASER_CARD_COUNT);
        assert_eq!(teaser_levels[0], Level::Junior);
        assert_eq!(teaser_levels[1], Level::Mid);
        assert_eq!(teaser_levels[2], Level::Senior);

        let unlocked = display_cards(&page, true, &langs);
        assert_eq!(unlocked.len(), page.len());
    }

    #[test]
    fn random_free_pick_never_returns_premium() {
        let items = catalog();
        for _ in 0..20 {
            let pick = random_free_pick(&items).unwrap();
            assert!(!pick.is_premium);
        }
        let all_premium = vec![question(9, "X", "Go", Level::Mid, true)];
        assert!(random_free_pick(&all_premium).is_none());
    }
}
