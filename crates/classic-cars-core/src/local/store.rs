use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::models::{Car, CarDetails, LOCAL_ID_PREFIX};
use crate::storage::{KeyValueStore, LOCAL_CARS_KEY};

pub struct LocalStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All local records. Missing or corrupt data reads as empty.
    pub fn list(&self) -> Vec<Car> {
        let raw = match self.store.get(LOCAL_CARS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read local cars");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cars) => cars,
            Err(e) => {
                warn!(error = %e, "Local car data is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    pub fn replace_all(&self, cars: &[Car]) {
        let contents = match serde_json::to_string(cars) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize local cars");
                return;
            }
        };

        if let Err(e) = self.store.set(LOCAL_CARS_KEY, &contents) {
            warn!(error = %e, "Failed to save local cars");
        }
    }

    /// Generate `local-<epoch millis>`, stepping forward past ids in use.
    fn next_id(&self, existing: &[Car]) -> String {
        let mut millis = self.clock.now().timestamp_millis();
        loop {
            let id = format!("{}{}", LOCAL_ID_PREFIX, millis);
            if !existing.iter().any(|c| c.id == id) {
                return id;
            }
            millis += 1;
        }
    }

    pub fn create(&self, details: CarDetails) -> Car {
        let mut cars = self.list();
        let car = Car {
            id: self.next_id(&cars),
            details,
            created_at: Some(self.clock.now()),
            updated_at: None,
        };
        cars.push(car.clone());
        self.replace_all(&cars);
        debug!(id = %car.id, "Created local car");
        car
    }

    /// Merge `patch` into the record. Unknown ids leave storage untouched.
    pub fn update(&self, id: &str, patch: &CarDetails) -> Option<Car> {
        let mut cars = self.list();
        let car = cars.iter_mut().find(|c| c.id == id)?;
        car.details.merge(patch);
        car.updated_at = Some(self.clock.now());
        let updated = car.clone();
        self.replace_all(&cars);
        debug!(id, "Updated local car");
        Some(updated)
    }

    /// Returns whether a record was removed; only then is storage written.
    pub fn delete(&self, id: &str) -> bool {
        let mut cars = self.list();
        let before = cars.len();
        cars.retain(|c| c.id != id);
        if cars.len() == before {
            return false;
        }
        self.replace_all(&cars);
        debug!(id, "Deleted local car");
        true
    }

    pub fn find_by_id(&self, id: &str) -> Option<Car> {
        self.list().into_iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn setup() -> (LocalStore, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let local = LocalStore::new(store.clone(), clock.clone());
        (local, store, clock)
    }

    fn beetle() -> CarDetails {
        CarDetails {
            brand: Some("Volkswagen".to_string()),
            model: Some("Beetle".to_string()),
            year: Some(1963),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_empty_and_corrupt() {
        let (local, store, _) = setup();
        assert!(local.list().is_empty());

        store.set(LOCAL_CARS_KEY, "[{broken").unwrap();
        assert!(local.list().is_empty());
        assert!(local.is_empty());
    }

    #[test]
    fn test_create_assigns_local_id_and_timestamp() {
        let (local, _, clock) = setup();
        let car = local.create(beetle());
        assert_eq!(
            car.id,
            format!("local-{}", clock.now().timestamp_millis())
        );
        assert_eq!(car.created_at, Some(clock.now()));
        assert_eq!(local.list(), vec![car.clone()]);
        assert_eq!(local.find_by_id(&car.id), Some(car));
    }

    #[test]
    fn test_create_never_reuses_an_id() {
        let (local, _, _) = setup();
        // Same clock instant for every create
        let a = local.create(beetle());
        let b = local.create(beetle());
        let c = local.create(beetle());
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
        assert_eq!(local.list().len(), 3);
    }

    #[test]
    fn test_update_merges_and_stamps() {
        let (local, _, clock) = setup();
        let car = local.create(beetle());
        clock.advance(chrono::Duration::seconds(30));

        let patch = CarDetails {
            color: Some("Yellow".to_string()),
            ..Default::default()
        };
        let updated = local.update(&car.id, &patch).unwrap();
        assert_eq!(updated.id, car.id);
        assert_eq!(updated.details.color.as_deref(), Some("Yellow"));
        assert_eq!(updated.details.model.as_deref(), Some("Beetle"));
        assert_eq!(updated.updated_at, Some(clock.now()));
        assert_eq!(local.find_by_id(&car.id), Some(updated));
    }

    #[test]
    fn test_update_unknown_id_leaves_store_unchanged() {
        let (local, store, _) = setup();
        local.create(beetle());
        let before = store.get(LOCAL_CARS_KEY).unwrap();

        assert!(local.update("local-0", &beetle()).is_none());
        assert_eq!(store.get(LOCAL_CARS_KEY).unwrap(), before);
    }

    #[test]
    fn test_delete() {
        let (local, store, _) = setup();
        let car = local.create(beetle());
        let before = store.get(LOCAL_CARS_KEY).unwrap();

        assert!(!local.delete("missing"));
        assert_eq!(store.get(LOCAL_CARS_KEY).unwrap(), before);

        assert!(local.delete(&car.id));
        assert!(local.list().is_empty());
    }

    #[test]
    fn test_delete_on_empty_store_writes_nothing() {
        let (local, store, _) = setup();
        assert!(!local.delete("mock-1"));
        assert!(store.get(LOCAL_CARS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_replace_all() {
        let (local, _, _) = setup();
        local.create(beetle());
        let seeded = vec![
            Car::new("mock-1", beetle()),
            Car::new("mock-2", beetle()),
        ];
        local.replace_all(&seeded);
        assert_eq!(local.list(), seeded);
    }
}
