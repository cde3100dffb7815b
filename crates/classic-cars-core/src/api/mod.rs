//! REST API client module for the classic cars catalog service.
//!
//! This module provides the `ApiClient` for the remote CRUD endpoints and
//! the `RemoteStore` trait the rest of the crate programs against, so the
//! list orchestrator can run against a fake in tests.
//!
//! Reads are anonymous; create, update and delete carry a shared-secret
//! API key in the `x-api-key` header.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

use anyhow::Result;

use crate::models::{Car, CarDetails};

/// CRUD surface of the remote catalog.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn fetch_cars(&self) -> Result<Vec<Car>>;

    /// Fails with `ApiError::NotFound` for unknown ids.
    async fn fetch_car(&self, id: &str) -> Result<Car>;

    async fn create_car(&self, details: &CarDetails) -> Result<Car>;

    async fn update_car(&self, id: &str, details: &CarDetails) -> Result<Car>;

    async fn delete_car(&self, id: &str) -> Result<()>;
}
