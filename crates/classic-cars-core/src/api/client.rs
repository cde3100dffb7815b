//! API client for the classic cars REST API.
//!
//! This module provides the `ApiClient` struct, which implements
//! `RemoteStore` over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, RemoteStore};
use crate::models::{Car, CarDetails};

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the hosted catalog API
pub const DEFAULT_API_BASE_URL: &str = "https://cars-front.onrender.com/api";

/// Collection endpoint, relative to the base URL
const CARS_ENDPOINT: &str = "/cars";

/// Header carrying the shared secret on mutating requests
const API_KEY_HEADER: &str = "x-api-key";

/// Default timeout for single-record and mutating requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the full list fetch. Kept short so startup falls back to
/// demo mode quickly when the API is down.
const LIST_TIMEOUT_SECS: u64 = 5;

/// Retries for the list fetch after a network failure.
const MAX_LIST_RETRIES: u32 = 1;

/// Delay before a list retry, multiplied by the attempt number.
const RETRY_DELAY_MS: u64 = 500;

/// API client for the catalog.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    list_timeout: Duration,
    retry_delay: Duration,
}

impl ApiClient {
    /// Create a client for the hosted API
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    /// Create a client for a specific API base URL, e.g. `http://localhost:3000/api`
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            list_timeout: Duration::from_secs(LIST_TIMEOUT_SECS),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Set the shared secret sent with create, update and delete
    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|k| !k.is_empty());
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.set_api_key(api_key);
        self
    }

    /// Override the list timeout and retry delay.
    pub fn with_list_timing(mut self, timeout: Duration, retry_delay: Duration) -> Self {
        self.list_timeout = timeout;
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn cars_url(&self) -> String {
        format!("{}{}", self.base_url, CARS_ENDPOINT)
    }

    fn car_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, CARS_ENDPOINT, id)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        match self.api_key {
            Some(ref key) => {
                headers.insert(
                    API_KEY_HEADER,
                    header::HeaderValue::from_str(key).context("API key is not a valid header value")?,
                );
            }
            None => debug!("No API key configured, sending unauthenticated request"),
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a typed error if not.
    async fn check_response(response: Response, resource: &str) -> Result<Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            status = status.as_u16(),
            resource,
            body = %ApiError::truncate_body(&body),
            "API request failed"
        );
        Err(ApiError::from_status(status, resource))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn fetch_cars_once(&self, url: &str) -> Result<Vec<Car>, ApiError> {
        let response = self
            .client
            .get(url)
            .timeout(self.list_timeout)
            .send()
            .await?;
        let response = Self::check_response(response, url).await?;
        Self::parse_json(response, url).await
    }
}

impl RemoteStore for ApiClient {
    /// Fetch the whole catalog. Network failures and timeouts are retried
    /// once; HTTP error statuses are not.
    async fn fetch_cars(&self) -> Result<Vec<Car>> {
        let url = self.cars_url();
        let mut retries = 0;

        loop {
            match self.fetch_cars_once(&url).await {
                Ok(cars) => {
                    debug!(count = cars.len(), "Fetched cars from API");
                    return Ok(cars);
                }
                Err(ApiError::NetworkError(e)) if ApiError::is_transient(&e) => {
                    if retries >= MAX_LIST_RETRIES {
                        warn!(url = %url, error = %e, "Giving up on car list fetch");
                        return Err(ApiError::Connection.into());
                    }
                    retries += 1;
                    let delay = self.retry_delay * retries;
                    warn!(
                        url = %url,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Car list fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch_car(&self, id: &str) -> Result<Car> {
        let url = self.car_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch car {}", id))?;
        let response = Self::check_response(response, &url).await?;
        Ok(Self::parse_json(response, &url).await?)
    }

    async fn create_car(&self, details: &CarDetails) -> Result<Car> {
        let url = self.cars_url();
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(details)
            .send()
            .await
            .context("Failed to send create request")?;
        let response = Self::check_response(response, &url).await?;
        let car: Car = Self::parse_json(response, &url).await?;
        debug!(id = %car.id, "Created car via API");
        Ok(car)
    }

    async fn update_car(&self, id: &str, details: &CarDetails) -> Result<Car> {
        let url = self.car_url(id);
        let response = self
            .client
            .put(&url)
            .headers(self.auth_headers()?)
            .json(details)
            .send()
            .await
            .with_context(|| format!("Failed to send update request for car {}", id))?;
        let response = Self::check_response(response, &url).await?;
        let car: Car = Self::parse_json(response, &url).await?;
        debug!(id = %car.id, "Updated car via API");
        Ok(car)
    }

    async fn delete_car(&self, id: &str) -> Result<()> {
        let url = self.car_url(id);
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .with_context(|| format!("Failed to send delete request for car {}", id))?;
        Self::check_response(response, &url).await?;
        debug!(id, "Deleted car via API");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = ApiClient::with_base_url("http://localhost:3000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert_eq!(client.cars_url(), "http://localhost:3000/api/cars");
        assert_eq!(client.car_url("abc"), "http://localhost:3000/api/cars/abc");
    }

    #[test]
    fn test_api_key_header() {
        let client = ApiClient::new().unwrap();
        assert!(!client.has_api_key());
        assert!(client.auth_headers().unwrap().is_empty());

        let client = client.with_api_key(Some("secret".to_string()));
        let headers = client.auth_headers().unwrap();
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "secret");

        let client = client.with_api_key(Some(String::new()));
        assert!(!client.has_api_key());
    }
}
