//! Application store: cached backend collections, refresh counters, and
//! entitlement state.
//!
//! Each resource family (questions, practices, dashboard, subscription)
//! resolves at most one fetch per distinct (key, refresh) pair: readers that
//! arrive while a fetch is pending observe `Loading` and issue nothing, and
//! a resolution that lands after its family was refreshed is dropped rather
//! than overwriting the newer key's value. Bumping a refresh counter only
//! marks local caches stale; it never touches the server.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::domain::{Practice, Question};
use crate::entitlement::EntitlementState;
use crate::error::{ApiError, ApiResult};
use crate::protocol::{
    DashboardData, ListQuery, PracticesResponse, QuestionsResponse, SubscriptionRecord,
};
use crate::storage::{ClientStorage, StorageKey};

/// Reactive view of a cached resource.
#[derive(Clone, Debug)]
pub enum Resource<T> {
    /// Fetching is gated off: signed out, or the session is still settling.
    /// No request has been or will be issued for this state.
    Disabled,
    /// A fetch for this key is in flight (possibly started by another
    /// reader); poll again after it settles.
    Loading,
    Ready(T),
    Failed(Arc<ApiError>),
}

impl<T> Resource<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Resource::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Resource::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }
}

enum Slot<T> {
    Pending,
    Done(Resource<T>),
}

/// One keyed cache. The family refresh counter is part of every slot key, so
/// a bump implicitly invalidates all previous entries.
struct SlotMap<K, T> {
    slots: RwLock<HashMap<(K, u64), Slot<T>>>,
}

impl<K: Clone + Eq + Hash, T: Clone> SlotMap<K, T> {
    fn new() -> Self {
        Self { slots: RwLock::new(HashMap::new()) }
    }

    async fn resolve<F, Fut>(&self, refresh: &AtomicU64, key: K, fetch: F) -> Resource<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let rk = refresh.load(Ordering::SeqCst);
        let slot_key = (key, rk);
        {
            let mut slots = self.slots.write().await;
            match slots.get(&slot_key) {
                Some(Slot::Pending) => return Resource::Loading,
                Some(Slot::Done(r)) => return r.clone(),
                None => {
                    slots.insert(slot_key.clone(), Slot::Pending);
                }
            }
        }

        let outcome = match fetch().await {
            Ok(v) => Resource::Ready(v),
            Err(e) => Resource::Failed(Arc::new(e)),
        };

        let mut slots = self.slots.write().await;
        if refresh.load(Ordering::SeqCst) != rk {
            // Superseded while in flight; the newer key owns the cache now.
            slots.remove(&slot_key);
            warn!(target: "sync", stale_refresh = rk, "Dropping fetch result for a superseded refresh key");
            return Resource::Loading;
        }
        slots.insert(slot_key, Slot::Done(outcome.clone()));
        outcome
    }

    async fn clear(&self) {
        self.slots.write().await.clear();
    }
}

pub struct AppStore {
    questions_refresh: AtomicU64,
    practices_refresh: AtomicU64,
    dashboard_refresh: AtomicU64,
    subscription_refresh: AtomicU64,

    questions_list: SlotMap<ListQuery, QuestionsResponse>,
    questions_detail: SlotMap<u64, Question>,
    practices_list: SlotMap<ListQuery, PracticesResponse>,
    practices_detail: SlotMap<u64, Practice>,
    dashboard: SlotMap<(), DashboardData>,
    subscription: SlotMap<(), SubscriptionRecord>,

    entitlement: RwLock<EntitlementState>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self {
            questions_refresh: AtomicU64::new(0),
            practices_refresh: AtomicU64::new(0),
            dashboard_refresh: AtomicU64::new(0),
            subscription_refresh: AtomicU64::new(0),
            questions_list: SlotMap::new(),
            questions_detail: SlotMap::new(),
            practices_list: SlotMap::new(),
            practices_detail: SlotMap::new(),
            dashboard: SlotMap::new(),
            subscription: SlotMap::new(),
            entitlement: RwLock::new(EntitlementState::default()),
        }
    }

    /// Store whose entitlement state starts with the configured free
    /// allowance instead of the built-in default.
    pub fn with_config(cfg: &ClientConfig) -> Self {
        let mut store = Self::new();
        *store.entitlement.get_mut() = EntitlementState::with_limit(cfg.free_question_limit);
        store
    }

    /// Seed entitlement display state from the legacy on-disk blob, if one
    /// exists. Server data overwrites this on the next dashboard fetch.
    pub async fn seed_from_legacy(&self, storage: &ClientStorage) {
        if let Some(progress) = storage.load(StorageKey::LegacyProgress) {
            let mut ent = self.entitlement.write().await;
            let seeded = EntitlementState::from_legacy(&progress, ent.free_question_limit);
            debug!(target: "entitlement", free_used = seeded.free_questions_used, "Seeded entitlement from legacy progress blob");
            *ent = seeded;
        }
    }

    pub async fn entitlement(&self) -> EntitlementState {
        *self.entitlement.read().await
    }

    /// Record a successful purchase. The server is the source of truth; this
    /// mirrors its answer so gating flips without a refetch.
    pub async fn unlock(&self) {
        self.entitlement.write().await.has_unlocked = true;
        info!(target: "entitlement", "Premium unlocked");
    }

    // --- Refresh counters ---

    pub fn questions_refresh_key(&self) -> u64 {
        self.questions_refresh.load(Ordering::SeqCst)
    }

    pub fn practices_refresh_key(&self) -> u64 {
        self.practices_refresh.load(Ordering::SeqCst)
    }

    pub fn dashboard_refresh_key(&self) -> u64 {
        self.dashboard_refresh.load(Ordering::SeqCst)
    }

    /// Mark the questions family stale. Purely local: signals the next read
    /// to refetch, mutates nothing server-side. Dashboard totals change with
    /// every attempt, so its cache goes stale with either family.
    pub fn bump_questions_refresh(&self) -> u64 {
        let key = self.questions_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        self.dashboard_refresh.fetch_add(1, Ordering::SeqCst);
        info!(target: "sync", family = "questions", refresh = key, "Refresh key bumped");
        key
    }

    pub fn bump_practices_refresh(&self) -> u64 {
        let key = self.practices_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        self.dashboard_refresh.fetch_add(1, Ordering::SeqCst);
        info!(target: "sync", family = "practices", refresh = key, "Refresh key bumped");
        key
    }

    /// Mark the subscription record stale, e.g. after returning from a
    /// checkout flow.
    pub fn bump_subscription_refresh(&self) -> u64 {
        let key = self.subscription_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        info!(target: "sync", family = "subscription", refresh = key, "Refresh key bumped");
        key
    }

    // --- Cached reads ---

    #[instrument(level = "debug", skip(self, api))]
    pub async fn questions<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
        query: &ListQuery,
    ) -> Resource<QuestionsResponse> {
        if !enabled {
            return Resource::Disabled;
        }
        let q = query.clone();
        self.questions_list
            .resolve(&self.questions_refresh, query.clone(), || async move {
                api.get_questions(&q).await
            })
            .await
    }

    #[instrument(level = "debug", skip(self, api))]
    pub async fn question_detail<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
        id: u64,
    ) -> Resource<Question> {
        if !enabled {
            return Resource::Disabled;
        }
        self.questions_detail
            .resolve(&self.questions_refresh, id, || async move {
                api.get_question(id).await
            })
            .await
    }

    #[instrument(level = "debug", skip(self, api))]
    pub async fn practices<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
        query: &ListQuery,
    ) -> Resource<PracticesResponse> {
        if !enabled {
            return Resource::Disabled;
        }
        let q = query.clone();
        self.practices_list
            .resolve(&self.practices_refresh, query.clone(), || async move {
                api.get_practices(&q).await
            })
            .await
    }

    #[instrument(level = "debug", skip(self, api))]
    pub async fn practice_detail<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
        id: u64,
    ) -> Resource<Practice> {
        if !enabled {
            return Resource::Disabled;
        }
        self.practices_detail
            .resolve(&self.practices_refresh, id, || async move {
                api.get_practice(id).await
            })
            .await
    }

    /// Dashboard doubles as the authoritative entitlement source: a ready
    /// fetch updates the free-question counters.
    #[instrument(level = "debug", skip(self, api))]
    pub async fn dashboard<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
    ) -> Resource<DashboardData> {
        if !enabled {
            return Resource::Disabled;
        }
        let res = self
            .dashboard
            .resolve(&self.dashboard_refresh, (), || async move {
                api.get_dashboard().await
            })
            .await;
        if let Resource::Ready(data) = &res {
            let mut ent = self.entitlement.write().await;
            *ent = EntitlementState::from_dashboard(&data.totals, ent.has_unlocked);
        }
        res
    }

    /// Subscription status drives the premium unlock flag.
    #[instrument(level = "debug", skip(self, api))]
    pub async fn subscription<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
        enabled: bool,
    ) -> Resource<SubscriptionRecord> {
        if !enabled {
            return Resource::Disabled;
        }
        let res = self
            .subscription
            .resolve(&self.subscription_refresh, (), || async move {
                api.get_subscription_status().await
            })
            .await;
        if let Resource::Ready(record) = &res {
            self.entitlement.write().await.apply_subscription(record);
        }
        res
    }

    // --- Mutations that invalidate caches ---

    /// Clear an account's attempt history, then mark the family stale so the
    /// next list read refetches.
    #[instrument(level = "info", skip(self, api))]
    pub async fn reset_question_attempts<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
    ) -> ApiResult<u32> {
        let res = api.reset_question_attempts().await?;
        self.bump_questions_refresh();
        Ok(res.deleted_attempts)
    }

    #[instrument(level = "info", skip(self, api))]
    pub async fn reset_practice_attempts<P: IdentityProvider>(
        &self,
        api: &ApiClient<P>,
    ) -> ApiResult<u32> {
        let res = api.reset_practice_attempts().await?;
        self.bump_practices_refresh();
        Ok(res.deleted_attempts)
    }

    /// Sign-out path: drop every cached family, zero the refresh counters,
    /// reset entitlement, and wipe the account-scoped blobs on disk. Returns
    /// the storage keys that were removed.
    #[instrument(level = "info", skip(self, storage))]
    pub async fn reset_all(&self, storage: &ClientStorage) -> Vec<&'static str> {
        self.questions_list.clear().await;
        self.questions_detail.clear().await;
        self.practices_list.clear().await;
        self.practices_detail.clear().await;
        self.dashboard.clear().await;
        self.subscription.clear().await;
        self.questions_refresh.store(0, Ordering::SeqCst);
        self.practices_refresh.store(0, Ordering::SeqCst);
        self.dashboard_refresh.store(0, Ordering::SeqCst);
        self.subscription_refresh.store(0, Ordering::SeqCst);
        *self.entitlement.write().await = EntitlementState::default();

        let cleared = storage.clear_user_data();
        info!(target: "sync", cleared = cleared.len(), "Store and user data reset");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockProvider;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn question_json(id: u64, attempted: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": "Two Sum",
            "description": "Classic array question",
            "language": "JavaScript",
            "difficulty": "Easy",
            "level": "junior",
            "duration": 15,
            "is_premium": false,
            "attempted": attempted
        })
    }

    fn list_body(attempted: bool) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "count": 1,
            "hasPremium": false,
            "questions": [question_json(1, attempted)]
        })
    }

    async fn client(server: &MockServer) -> ApiClient<MockProvider> {
        ApiClient::new(server.uri(), std::sync::Arc::new(MockProvider::with_tokens(&["t"]))).unwrap()
    }

    #[tokio::test]
    async fn disabled_issues_zero_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(false)))
            .expect(0)
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let res = store.questions(&api, false, &ListQuery::default()).await;
        assert!(matches!(res, Resource::Disabled));
    }

    #[tokio::test]
    async fn repeated_reads_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(false)))
            .expect(1)
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let first = store.questions(&api, true, &ListQuery::default()).await;
        let second = store.questions(&api, true, &ListQuery::default()).await;
        assert!(first.value().is_some());
        assert!(second.value().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_readers_do_not_duplicate_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(list_body(false))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let query = ListQuery::default();
        let (a, b) = tokio::join!(
            store.questions(&api, true, &query),
            store.questions(&api, true, &query)
        );
        // One reader resolved the fetch; the other observed Loading without
        // issuing a duplicate.
        let readies = [&a, &b].iter().filter(|r| r.value().is_some()).count();
        let loadings = [&a, &b].iter().filter(|r| r.is_loading()).count();
        assert_eq!(readies, 1);
        assert_eq!(loadings, 1);
    }

    #[tokio::test]
    async fn refresh_bump_triggers_a_refetch_with_updated_overlay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(false)))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let first = store.questions(&api, true, &ListQuery::default()).await;
        assert!(!first.value().unwrap().questions[0].attempted);

        // Second response reflects the attempt the mutation recorded.
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(true)))
            .expect(1)
            .mount(&server)
            .await;

        let before = store.questions_refresh_key();
        store.bump_questions_refresh();
        assert_eq!(store.questions_refresh_key(), before + 1);

        let second = store.questions(&api, true, &ListQuery::default()).await;
        assert!(second.value().unwrap().questions[0].attempted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_resolution_never_overwrites_a_newer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(list_body(false))
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let query = ListQuery::default();
        let (res, _) = tokio::join!(store.questions(&api, true, &query), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            store.bump_questions_refresh();
        });
        // The fetch resolved under the old refresh key; its result is dropped
        // instead of being cached against the new key.
        assert!(res.is_loading());
        let after = store.questions(&api, true, &ListQuery::default()).await;
        assert!(after.value().is_some());
    }

    #[tokio::test]
    async fn failed_fetch_carries_the_structured_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        let res = store.questions(&api, true, &ListQuery::default()).await;
        assert!(matches!(res.error(), Some(ApiError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn dashboard_updates_entitlement_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body(2)))
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        store.dashboard(&api, true).await;
        let ent = store.entitlement().await;
        assert_eq!(ent.free_questions_used, 2);
        assert_eq!(ent.free_question_limit, 3);
    }

    fn dashboard_body(free_used: u32) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "dashboard": {
                "totals": {
                    "completedQuestions": 5,
                    "freeQuestionsUsed": free_used,
                    "freeQuestionLimit": 3
                },
                "streak": { "currentDays": 4 },
                "timing": { "avgTimeMinutes": 12.5 },
                "progressByLevel": [],
                "topLanguages": [],
                "recentActivity": [],
                "recommendedNext": []
            }
        })
    }

    #[tokio::test]
    async fn practice_submissions_invalidate_the_cached_dashboard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body(1)))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let store = AppStore::new();
        let api = client(&server).await;
        store.dashboard(&api, true).await;
        assert_eq!(store.entitlement().await.free_questions_used, 1);

        // Attempt totals changed server-side; the practice bump must mark the
        // dashboard stale too.
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body(2)))
            .expect(1)
            .mount(&server)
            .await;

        store.bump_practices_refresh();
        store.dashboard(&api, true).await;
        assert_eq!(store.entitlement().await.free_questions_used, 2);
    }

    #[tokio::test]
    async fn configured_free_limit_seeds_entitlement_state() {
        let cfg = crate::config::ClientConfig {
            free_question_limit: 5,
            ..Default::default()
        };
        let store = AppStore::with_config(&cfg);
        assert_eq!(store.entitlement().await.free_question_limit, 5);

        // The configured limit survives a legacy seed.
        let dir = tempfile::tempdir().unwrap();
        let storage = ClientStorage::new(dir.path().to_path_buf());
        storage
            .save(
                StorageKey::LegacyProgress,
                &serde_json::json!({ "freeQuestionsUsed": 2, "hasUnlocked": false }),
            )
            .unwrap();
        store.seed_from_legacy(&storage).await;
        let ent = store.entitlement().await;
        assert_eq!(ent.free_questions_used, 2);
        assert_eq!(ent.free_question_limit, 5);
    }

    #[tokio::test]
    async fn reset_all_clears_caches_counters_and_user_blobs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(false)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let storage = ClientStorage::new(dir.path().to_path_buf());
        storage.save(StorageKey::OnboardingCompleted, &true).unwrap();

        let store = AppStore::new();
        let api = client(&server).await;
        store.questions(&api, true, &ListQuery::default()).await;
        store.bump_questions_refresh();
        store.unlock().await;

        let cleared = store.reset_all(&storage).await;
        assert_eq!(store.questions_refresh_key(), 0);
        assert!(!store.entitlement().await.has_unlocked);
        assert!(cleared.contains(&"onboarding_completed.json"));
    }
}
