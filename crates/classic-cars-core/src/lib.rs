//! Core library for the classic cars catalog client.
//!
//! Talks to the remote catalog API, keeps a short-lived snapshot of the car
//! list in a key-value store, and falls back to a fully local "demo mode"
//! record store when the API cannot be reached.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod export;
pub mod local;
pub mod models;
pub mod query;
pub mod resolver;
pub mod seed;
pub mod stats;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError, RemoteStore};
pub use app::{App, DataMode};
pub use cache::CacheManager;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use local::LocalStore;
pub use models::{Car, CarDetails, ValidationError};
pub use resolver::{RecordSource, Resolver};
pub use seed::SeedData;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
