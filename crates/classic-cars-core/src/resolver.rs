//! Single-record lookup across every place a car can live.
//!
//! Sources are consulted in a fixed order and the first hit wins; results
//! are never merged across sources.

use tracing::debug;

use crate::cache::CacheManager;
use crate::local::LocalStore;
use crate::models::Car;
use crate::seed::SeedData;

/// One place a record can be looked up in.
pub enum RecordSource<'a> {
    /// Demo-mode store.
    Local(&'a LocalStore),
    /// List snapshot, only while it is still valid.
    Cache(&'a CacheManager),
    /// Records currently loaded by the caller.
    WorkingSet(&'a [Car]),
    /// Bundled dataset, the only source that also matches by position.
    Seed(&'a SeedData),
}

impl RecordSource<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            RecordSource::Local(_) => "local",
            RecordSource::Cache(_) => "cache",
            RecordSource::WorkingSet(_) => "working_set",
            RecordSource::Seed(_) => "seed",
        }
    }

    pub fn find(&self, id: &str) -> Option<Car> {
        match self {
            RecordSource::Local(local) => local.find_by_id(id),
            RecordSource::Cache(cache) => cache
                .read()
                .and_then(|cars| cars.into_iter().find(|c| c.id == id)),
            RecordSource::WorkingSet(cars) => cars.iter().find(|c| c.id == id).cloned(),
            RecordSource::Seed(seed) => seed.find(id),
        }
    }
}

pub struct Resolver<'a> {
    sources: Vec<RecordSource<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new(sources: Vec<RecordSource<'a>>) -> Self {
        Self { sources }
    }

    /// Local store, then cache, then seed data.
    pub fn standard(local: &'a LocalStore, cache: &'a CacheManager, seed: &'a SeedData) -> Self {
        Self::new(vec![
            RecordSource::Local(local),
            RecordSource::Cache(cache),
            RecordSource::Seed(seed),
        ])
    }

    /// Like `standard`, with the caller's loaded records checked before seed data.
    pub fn with_working_set(
        local: &'a LocalStore,
        cache: &'a CacheManager,
        working_set: &'a [Car],
        seed: &'a SeedData,
    ) -> Self {
        Self::new(vec![
            RecordSource::Local(local),
            RecordSource::Cache(cache),
            RecordSource::WorkingSet(working_set),
            RecordSource::Seed(seed),
        ])
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(RecordSource::name).collect()
    }

    pub fn resolve(&self, id: &str) -> Option<Car> {
        for source in &self.sources {
            if let Some(car) = source.find(id) {
                debug!(id, source = source.name(), "Resolved car");
                return Some(car);
            }
        }
        debug!(id, "Car not found in any local source");
        None
    }
}
