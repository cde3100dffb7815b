//! Bundled fallback dataset used to populate demo mode.
//!
//! Entries usually carry no identifier. They are addressed either by an
//! explicit id or by their 1-based position in the list, and receive
//! `mock-<position>` when copied into the demo-mode store.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Car, CarDetails, SEED_ID_PREFIX};

const BUNDLED_SEED_JSON: &str = include_str!("../data/seed_cars.json");

/// Parsed once per process
static BUNDLED: OnceLock<Vec<SeedEntry>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedEntry {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub details: CarDetails,
}

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    entries: Vec<SeedEntry>,
}

impl SeedData {
    /// The dataset compiled into the binary.
    pub fn bundled() -> Self {
        let entries = BUNDLED.get_or_init(|| match Self::from_json(BUNDLED_SEED_JSON) {
            Ok(seed) => {
                debug!(count = seed.entries.len(), "Loaded bundled seed cars");
                seed.entries
            }
            Err(e) => {
                warn!(error = %e, "Bundled seed data is invalid, demo mode starts empty");
                Vec::new()
            }
        });
        Self {
            entries: entries.clone(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<SeedEntry> =
            serde_json::from_str(json).context("Failed to parse seed data")?;
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<SeedEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn car_at(&self, index: usize) -> Car {
        let entry = &self.entries[index];
        let id = entry
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{}{}", SEED_ID_PREFIX, index + 1));
        Car::new(id, entry.details.clone())
    }

    /// Every entry as a car, keeping explicit ids and assigning
    /// `mock-<position>` to the rest.
    pub fn seeded_cars(&self) -> Vec<Car> {
        (0..self.entries.len()).map(|i| self.car_at(i)).collect()
    }

    /// Match by id (explicit or assigned), or by 1-based position written as
    /// a string. The positional form is specific to seed data.
    pub fn find(&self, id: &str) -> Option<Car> {
        (0..self.entries.len())
            .find(|&i| (i + 1).to_string() == id || self.car_at(i).id == id)
            .map(|i| self.car_at(i))
    }
}
