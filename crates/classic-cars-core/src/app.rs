//! Session state for the catalog client.
//!
//! `App` decides where the car list comes from (cache, remote API or the
//! demo-mode local store), routes mutations to the right backend and keeps
//! the working set the user sees in sync afterwards.

use std::sync::Arc;

use anyhow::Result;
use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RemoteStore};
use crate::cache::{CacheManager, CacheStats};
use crate::clock::Clock;
use crate::local::LocalStore;
use crate::models::{is_local_id, Car, CarDetails, DEFAULT_IMAGE_URL};
use crate::query::{apply_filters_and_sort, SortOrder};
use crate::resolver::Resolver;
use crate::seed::SeedData;
use crate::stats::CatalogStats;
use crate::storage::KeyValueStore;

/// Where the working set comes from. Once in demo mode a session stays
/// there; the API is not probed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    #[default]
    Remote,
    Demo,
}

pub struct App<R: RemoteStore> {
    remote: R,
    cache: CacheManager,
    local: LocalStore,
    seed: SeedData,
    clock: Arc<dyn Clock>,
    mode: DataMode,
    /// Full list as last loaded, before search and sort
    cars: Vec<Car>,

    // Presentation
    pub search_query: String,
    pub sort: Option<SortOrder>,
    pub status_message: Option<String>,
}

impl<R: RemoteStore> App<R> {
    pub fn new(
        remote: R,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        seed: SeedData,
    ) -> Self {
        Self {
            remote,
            cache: CacheManager::new(store.clone(), clock.clone()),
            local: LocalStore::new(store, clock.clone()),
            seed,
            clock,
            mode: DataMode::Remote,
            cars: Vec::new(),
            search_query: String::new(),
            sort: None,
            status_message: None,
        }
    }

    /// Load the initial working set. Never fails: an unreachable API puts
    /// the session in demo mode instead.
    pub async fn startup(&mut self) {
        if let Some(cars) = self.cache.read() {
            info!(count = cars.len(), "Loaded cars from cache");
            self.cars = cars;
            self.status_message = Some("Loaded from cache".to_string());
            return;
        }

        match self.remote.fetch_cars().await {
            Ok(cars) => {
                info!(count = cars.len(), "Loaded cars from API");
                self.mode = DataMode::Remote;
                self.cache.write(&cars);
                self.status_message = Some(format!("Loaded {} cars", cars.len()));
                self.cars = cars;
            }
            Err(e) => {
                warn!(error = %e, "API unavailable, switching to demo mode");
                self.enter_demo_mode();
            }
        }
    }

    fn enter_demo_mode(&mut self) {
        self.mode = DataMode::Demo;
        if self.local.is_empty() {
            let seeded = self.seed.seeded_cars();
            info!(count = seeded.len(), "Seeding local store with demo data");
            self.local.replace_all(&seeded);
        }
        self.cars = self.local.list();
        self.status_message =
            Some("Demo mode enabled: the API is unreachable, changes are saved locally".to_string());
    }

    /// Reload the working set from its source, bypassing the cache.
    /// On failure the previous working set is kept.
    pub async fn refresh(&mut self) -> Result<()> {
        self.cache.invalidate();

        match self.mode {
            DataMode::Demo => {
                self.cars = self.local.list();
            }
            DataMode::Remote => {
                let cars = self.remote.fetch_cars().await?;
                self.cache.write(&cars);
                self.cars = cars;
            }
        }
        debug!(count = self.cars.len(), mode = ?self.mode, "Refreshed cars");
        Ok(())
    }

    fn current_year(&self) -> i32 {
        self.clock.now().year()
    }

    pub async fn create_car(&mut self, details: CarDetails) -> Result<Car> {
        details.validate_new(self.current_year())?;
        let details = details.normalized_for_create();

        let car = match self.mode {
            DataMode::Demo => self.local.create(details),
            DataMode::Remote => self.remote.create_car(&details).await?,
        };
        info!(id = %car.id, mode = ?self.mode, "Car created");

        self.after_mutation("Car added").await;
        Ok(car)
    }

    /// Apply `details` to an existing car. Fields left as `None` are
    /// kept by the local store; the remote API receives them as sent.
    pub async fn update_car(&mut self, id: &str, mut details: CarDetails) -> Result<Car> {
        details.trim_text();
        details.validate_present(self.current_year())?;
        if details.image_url.as_deref() == Some("") {
            details.image_url = Some(DEFAULT_IMAGE_URL.to_string());
        }

        let car = match self.mode {
            DataMode::Demo => self
                .local
                .update(id, &details)
                .ok_or_else(|| ApiError::NotFound(id.to_string()))?,
            DataMode::Remote => self.remote.update_car(id, &details).await?,
        };
        info!(id, mode = ?self.mode, "Car updated");

        self.after_mutation("Car updated").await;
        Ok(car)
    }

    pub async fn delete_car(&mut self, id: &str) -> Result<()> {
        match self.mode {
            DataMode::Demo => {
                if !self.local.delete(id) {
                    return Err(ApiError::NotFound(id.to_string()).into());
                }
            }
            DataMode::Remote => self.remote.delete_car(id).await?,
        }
        info!(id, mode = ?self.mode, "Car deleted");

        self.after_mutation("Car deleted").await;
        Ok(())
    }

    async fn after_mutation(&mut self, done: &str) {
        self.cache.invalidate();
        match self.refresh().await {
            Ok(()) => self.status_message = Some(done.to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to refresh cars after change");
                self.status_message = Some(format!("{}, but the list could not be refreshed: {}", done, e));
            }
        }
    }

    /// Look up a single car for display or editing.
    ///
    /// Locally created ids never reach the API. Other ids are fetched
    /// remotely first and fall back to the local sources; a car missing
    /// everywhere is `Ok(None)`.
    pub async fn load_car(&self, id: &str) -> Result<Option<Car>> {
        if is_local_id(id) {
            return Ok(self.resolve(id));
        }

        match self.remote.fetch_car(id).await {
            Ok(car) => Ok(Some(car)),
            Err(e) => {
                if let Some(car) = self.resolve(id) {
                    debug!(id, error = %e, "Remote lookup failed, using local copy");
                    return Ok(Some(car));
                }
                if ApiError::is_not_found(&e) {
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// The stored id a user-typed id refers to, e.g. `"3"` for the third
    /// seed entry becomes `mock-3`. Unresolved ids are returned unchanged.
    pub fn canonical_id(&self, id: &str) -> String {
        self.resolve(id)
            .map(|car| car.id)
            .unwrap_or_else(|| id.to_string())
    }

    /// Offline lookup: local store, cache, working set, then seed data.
    pub fn resolve(&self, id: &str) -> Option<Car> {
        Resolver::with_working_set(&self.local, &self.cache, &self.cars, &self.seed).resolve(id)
    }

    pub fn visible_cars(&self) -> Vec<&Car> {
        apply_filters_and_sort(&self.cars, &self.search_query, self.sort)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats::from_cars(&self.cars)
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn is_demo_mode(&self) -> bool {
        self.mode == DataMode::Demo
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::seed::SeedEntry;
    use crate::storage::{MemoryStore, CACHE_KEY};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeState {
        online: bool,
        /// List fetches fail even while other calls succeed
        fail_list: bool,
        cars: Vec<Car>,
        next_id: u32,
        fetch_cars_calls: usize,
        fetch_car_calls: usize,
        /// Whether the cache key existed at each fetch_cars call
        cache_seen_on_fetch: Vec<bool>,
    }

    #[derive(Clone)]
    struct FakeRemote {
        state: Arc<Mutex<FakeState>>,
        store: Arc<MemoryStore>,
    }

    impl FakeRemote {
        fn new(store: Arc<MemoryStore>, online: bool, cars: Vec<Car>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeState {
                    online,
                    cars,
                    ..Default::default()
                })),
                store,
            }
        }

        fn set_online(&self, online: bool) {
            self.state.lock().unwrap().online = online;
        }

        fn check_online(&self) -> Result<()> {
            if self.state.lock().unwrap().online {
                Ok(())
            } else {
                Err(ApiError::Connection.into())
            }
        }
    }

    impl RemoteStore for FakeRemote {
        async fn fetch_cars(&self) -> Result<Vec<Car>> {
            let cached = self.store.get(CACHE_KEY).unwrap().is_some();
            {
                let mut state = self.state.lock().unwrap();
                state.fetch_cars_calls += 1;
                state.cache_seen_on_fetch.push(cached);
            }
            self.check_online()?;
            let state = self.state.lock().unwrap();
            if state.fail_list {
                return Err(ApiError::ServiceUnavailable.into());
            }
            Ok(state.cars.clone())
        }

        async fn fetch_car(&self, id: &str) -> Result<Car> {
            self.state.lock().unwrap().fetch_car_calls += 1;
            self.check_online()?;
            self.state
                .lock()
                .unwrap()
                .cars
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(id.to_string()).into())
        }

        async fn create_car(&self, details: &CarDetails) -> Result<Car> {
            self.check_online()?;
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let car = Car::new(format!("remote-{}", state.next_id), details.clone());
            state.cars.push(car.clone());
            Ok(car)
        }

        async fn update_car(&self, id: &str, details: &CarDetails) -> Result<Car> {
            self.check_online()?;
            let mut state = self.state.lock().unwrap();
            let car = state
                .cars
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
            car.details.merge(details);
            Ok(car.clone())
        }

        async fn delete_car(&self, id: &str) -> Result<()> {
            self.check_online()?;
            let mut state = self.state.lock().unwrap();
            let before = state.cars.len();
            state.cars.retain(|c| c.id != id);
            if state.cars.len() == before {
                return Err(ApiError::NotFound(id.to_string()).into());
            }
            Ok(())
        }
    }

    fn details(brand: &str, year: i32) -> CarDetails {
        CarDetails {
            brand: Some(brand.to_string()),
            model: Some("Coupe".to_string()),
            year: Some(year),
            color: Some("Red".to_string()),
            price: Some(25000.0),
            mileage: Some(80000),
            ..Default::default()
        }
    }

    fn seed() -> SeedData {
        SeedData::from_entries(
            ["Volvo", "Lancia"]
                .iter()
                .map(|b| SeedEntry {
                    id: None,
                    details: details(b, 1965),
                })
                .collect(),
        )
    }

    struct Harness {
        app: App<FakeRemote>,
        remote: FakeRemote,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness_with(store: Arc<MemoryStore>, online: bool, remote_cars: Vec<Car>) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let remote = FakeRemote::new(store.clone(), online, remote_cars);
        let app = App::new(remote.clone(), store.clone(), clock.clone(), seed());
        Harness {
            app,
            remote,
            store,
            clock,
        }
    }

    fn harness(online: bool) -> Harness {
        harness_with(
            Arc::new(MemoryStore::new()),
            online,
            vec![
                Car::new("r1", details("Jaguar", 1961)),
                Car::new("r2", details("Porsche", 1964)),
            ],
        )
    }

    #[tokio::test]
    async fn test_startup_fetches_and_caches() {
        let mut h = harness(true);
        h.app.startup().await;

        assert_eq!(h.app.mode(), DataMode::Remote);
        assert_eq!(h.app.cars().len(), 2);
        assert!(h.app.cache_stats().is_valid);
        assert_eq!(h.remote.state.lock().unwrap().fetch_cars_calls, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let store = Arc::new(MemoryStore::new());
        let mut first = harness_with(store.clone(), true, vec![Car::new("r1", details("Saab", 1967))]);
        first.app.startup().await;

        let mut second = harness_with(store, true, Vec::new());
        second.app.startup().await;

        assert_eq!(second.remote.state.lock().unwrap().fetch_cars_calls, 0);
        assert_eq!(second.app.cars()[0].id, "r1");
        assert_eq!(second.app.status_message.as_deref(), Some("Loaded from cache"));
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let mut h = harness(true);
        h.app.startup().await;
        h.clock.advance(chrono::Duration::minutes(6));

        let mut again = App::new(h.remote.clone(), h.store.clone(), h.clock.clone(), seed());
        again.startup().await;
        assert_eq!(h.remote.state.lock().unwrap().fetch_cars_calls, 2);
    }

    #[tokio::test]
    async fn test_offline_startup_seeds_demo_data() {
        let mut h = harness(false);
        h.app.startup().await;

        assert!(h.app.is_demo_mode());
        let ids: Vec<&str> = h.app.cars().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["mock-1", "mock-2"]);
        assert!(h.app.status_message.as_deref().unwrap().starts_with("Demo mode"));
        assert!(!h.app.cache_stats().exists);
    }

    #[tokio::test]
    async fn test_demo_mode_does_not_reseed_existing_local_data() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        LocalStore::new(store.clone(), clock).replace_all(&[Car::new("local-1", details("Mini", 1970))]);

        let mut h = harness_with(store, false, Vec::new());
        h.app.startup().await;

        assert_eq!(h.app.cars().len(), 1);
        assert_eq!(h.app.cars()[0].id, "local-1");
    }

    #[tokio::test]
    async fn test_demo_create_update_delete() {
        let mut h = harness(false);
        h.app.startup().await;

        let car = h.app.create_car(details("Alpine", 1973)).await.unwrap();
        assert!(car.id.starts_with("local-"));
        assert_eq!(car.details.image_url.as_deref(), Some(crate::models::DEFAULT_IMAGE_URL));
        assert!(h.app.cars().iter().any(|c| c.id == car.id));
        assert_eq!(h.app.status_message.as_deref(), Some("Car added"));

        let patch = CarDetails {
            color: Some("Blue".to_string()),
            ..Default::default()
        };
        let updated = h.app.update_car(&car.id, patch).await.unwrap();
        assert_eq!(updated.details.color.as_deref(), Some("Blue"));
        assert_eq!(updated.details.brand.as_deref(), Some("Alpine"));

        h.app.delete_car(&car.id).await.unwrap();
        assert!(!h.app.cars().iter().any(|c| c.id == car.id));

        let err = h.app.delete_car(&car.id).await.unwrap_err();
        assert!(ApiError::is_not_found(&err));
        let err = h.app.update_car("nope", CarDetails::default()).await.unwrap_err();
        assert!(ApiError::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_demo_mode_is_sticky() {
        let mut h = harness(false);
        h.app.startup().await;
        h.remote.set_online(true);

        h.app.refresh().await.unwrap();
        assert!(h.app.is_demo_mode());
        assert_eq!(h.remote.state.lock().unwrap().fetch_cars_calls, 1);
    }

    #[tokio::test]
    async fn test_remote_mutation_invalidates_before_refetch() {
        let mut h = harness(true);
        h.app.startup().await;
        assert!(h.app.cache_stats().exists);

        let car = h.app.create_car(details("Lotus", 1962)).await.unwrap();
        assert_eq!(car.id, "remote-1");

        let state = h.remote.state.lock().unwrap();
        assert_eq!(state.cache_seen_on_fetch, vec![false, false]);
        drop(state);
        assert_eq!(h.app.cars().len(), 3);
        assert!(h.app.cache_stats().is_valid);
    }

    #[tokio::test]
    async fn test_remote_update_invalidates_before_refetch() {
        let mut h = harness(true);
        h.app.startup().await;

        let patch = CarDetails {
            color: Some("British Racing Green".to_string()),
            ..Default::default()
        };
        h.app.update_car("r1", patch).await.unwrap();

        assert_eq!(h.remote.state.lock().unwrap().cache_seen_on_fetch, vec![false, false]);
        let r1 = h.app.cars().iter().find(|c| c.id == "r1").unwrap();
        assert_eq!(r1.details.color.as_deref(), Some("British Racing Green"));
    }

    #[tokio::test]
    async fn test_remote_delete_invalidates_before_refetch() {
        let mut h = harness(true);
        h.app.startup().await;

        h.app.delete_car("r2").await.unwrap();

        assert_eq!(h.remote.state.lock().unwrap().cache_seen_on_fetch, vec![false, false]);
        assert_eq!(h.app.cars().len(), 1);
        assert!(h.app.cache_stats().is_valid);
    }

    #[tokio::test]
    async fn test_edit_and_delete_seed_entry_by_position() {
        let mut h = harness(false);
        h.app.startup().await;

        let id = h.app.canonical_id("2");
        assert_eq!(id, "mock-2");
        let mut details = h.app.load_car(&id).await.unwrap().unwrap().details;
        details.color = Some("Green".to_string());

        let car = h.app.update_car(&id, details).await.unwrap();
        assert_eq!(car.id, "mock-2");
        assert_eq!(
            h.app.resolve("mock-2").unwrap().details.color.as_deref(),
            Some("Green")
        );

        let id = h.app.canonical_id("2");
        h.app.delete_car(&id).await.unwrap();
        assert!(!h.app.cars().iter().any(|c| c.id == "mock-2"));

        assert_eq!(h.app.canonical_id("nope"), "nope");
    }

    #[tokio::test]
    async fn test_update_with_blank_image_uses_default() {
        let mut h = harness(false);
        h.app.startup().await;
        let car = h.app.create_car(details("Alpine", 1973)).await.unwrap();

        let mut edited = car.details.clone();
        edited.image_url = Some("   ".to_string());
        let updated = h.app.update_car(&car.id, edited).await.unwrap();
        assert_eq!(updated.details.image_url.as_deref(), Some(DEFAULT_IMAGE_URL));
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_intact() {
        let mut h = harness(true);
        h.app.startup().await;
        h.remote.set_online(false);

        assert!(h.app.create_car(details("Lotus", 1962)).await.is_err());
        assert!(h.app.delete_car("r1").await.is_err());
        assert_eq!(h.app.cars().len(), 2);
        assert!(h.app.cache_stats().is_valid);
        assert_eq!(h.app.mode(), DataMode::Remote);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_routing() {
        let mut h = harness(true);
        h.app.startup().await;

        let err = h.app.create_car(details("Futura", 2026)).await.unwrap_err();
        assert!(err.downcast_ref::<crate::models::ValidationError>().is_some());

        let mut missing = details("Fiat", 1960);
        missing.model = None;
        assert!(h.app.create_car(missing).await.is_err());
        assert_eq!(h.remote.state.lock().unwrap().cars.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_after_mutation_is_not_an_error() {
        let mut h = harness(true);
        h.app.startup().await;
        h.remote.state.lock().unwrap().fail_list = true;

        let car = h.app.create_car(details("Lotus", 1962)).await.unwrap();
        assert_eq!(car.id, "remote-1");
        // Previous working set kept, failure reported through the status line
        assert_eq!(h.app.cars().len(), 2);
        assert!(h
            .app
            .status_message
            .as_deref()
            .unwrap()
            .contains("could not be refreshed"));
        assert!(!h.app.cache_stats().exists);
    }

    #[tokio::test]
    async fn test_load_car_local_ids_stay_offline() {
        let mut h = harness(false);
        h.app.startup().await;
        let car = h.app.create_car(details("Alpine", 1973)).await.unwrap();

        let loaded = h.app.load_car(&car.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, car.id);
        assert_eq!(h.remote.state.lock().unwrap().fetch_car_calls, 0);
    }

    #[tokio::test]
    async fn test_load_car_remote_then_fallback() {
        let mut h = harness(true);
        h.app.startup().await;

        let car = h.app.load_car("r2").await.unwrap().unwrap();
        assert_eq!(car.details.brand.as_deref(), Some("Porsche"));
        assert!(h.app.load_car("missing").await.unwrap().is_none());

        // Offline: the working set answers
        h.remote.set_online(false);
        let car = h.app.load_car("r1").await.unwrap().unwrap();
        assert_eq!(car.details.brand.as_deref(), Some("Jaguar"));

        // Offline and nowhere local: the connection error surfaces
        assert!(h.app.load_car("r99").await.is_err());
    }

    #[tokio::test]
    async fn test_visible_cars_and_stats() {
        let mut h = harness(true);
        h.app.startup().await;

        h.app.sort = Some("year-desc".parse().unwrap());
        let ids: Vec<&str> = h.app.visible_cars().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);

        h.app.search_query = "jag".to_string();
        assert_eq!(h.app.visible_cars().len(), 1);
        // Stats cover the whole working set regardless of search
        assert_eq!(h.app.stats().total, 2);
    }
}
