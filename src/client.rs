// Async access to the booking backend's availability endpoint

use std::env;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogProcessor, ProcessingError, SearchContext};
use crate::model::SearchCatalog;
use crate::store::CatalogStore;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Hotel {0} missing from availability response")]
    HotelNotFound(String),

    #[error("Decode error: {0}")]
    Decode(#[from] ProcessingError),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::RateLimitExceeded(_) | ApiError::Timeout(_) => {
                true
            }
            ApiError::ApiResponseError { is_retryable, .. } => *is_retryable,
            ApiError::HotelNotFound(_) | ApiError::Decode(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_key: String::new(),
            timeout_ms: 5000,
            retry_config: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reads `CATALOG_API_BASE_URL`, `CATALOG_API_KEY` and
    /// `CATALOG_API_TIMEOUT_MS`, keeping defaults for anything unset.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();

        match env::var("CATALOG_API_BASE_URL") {
            Ok(base_url) => config.base_url = base_url,
            Err(_) => info!(
                "CATALOG_API_BASE_URL not set, using default: {}",
                config.base_url
            ),
        }

        match env::var("CATALOG_API_KEY") {
            Ok(api_key) => config.api_key = api_key,
            Err(_) => warn!("CATALOG_API_KEY not set, requests will be unauthenticated"),
        }

        if let Ok(timeout) = env::var("CATALOG_API_TIMEOUT_MS") {
            config.timeout_ms = timeout.parse().map_err(|e| {
                ClientError::ConfigError(format!("Invalid CATALOG_API_TIMEOUT_MS '{timeout}': {e}"))
            })?;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Exponential backoff with jitter for the given (zero-based) retry attempt.
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRequest {
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: u32,
    pub currency: String,
}

#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    async fn fetch_catalog(&self, request: &CatalogRequest) -> Result<SearchCatalog, ApiError>;
}

pub struct HttpCatalogClient {
    http: reqwest::Client,
    config: ClientConfig,
    processor: CatalogProcessor,
}

impl HttpCatalogClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.base_url.is_empty() {
            return Err(ClientError::ConfigError("base_url is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            http,
            config,
            processor: CatalogProcessor::new(),
        })
    }

    fn availability_url(&self, hotel_id: &str) -> String {
        format!(
            "{}/hotels/{}/availability",
            self.config.base_url.trim_end_matches('/'),
            hotel_id
        )
    }

    async fn fetch_once(&self, request: &CatalogRequest) -> Result<SearchCatalog, ApiError> {
        let response = self
            .http
            .get(self.availability_url(&request.hotel_id))
            .header("x-api-key", &self.config.api_key)
            .query(&[
                ("checkIn", request.check_in.to_string()),
                ("checkOut", request.check_out.to_string()),
                ("rooms", request.rooms.to_string()),
                ("currency", request.currency.clone()),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimitExceeded(format!(
                "availability for {}",
                request.hotel_id
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message,
                is_retryable: status.is_server_error(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        decode_catalog(&self.processor, content_type.as_deref(), body, request)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_catalog(&self, request: &CatalogRequest) -> Result<SearchCatalog, ApiError> {
        let catalog = with_retry(&self.config.retry_config, &request.hotel_id, || {
            self.fetch_once(request)
        })
        .await?;

        debug!(
            hotel_id = %request.hotel_id,
            search_id = %catalog.search_id,
            "Fetched catalog"
        );
        Ok(catalog)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_retries` retries have been spent. Retries back off exponentially.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let backoff = calculate_backoff(attempt, config);
                warn!(
                    request = %label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Turns a response body into the catalog for the requested hotel.
///
/// XML feeds may carry several hotels; only the requested one is kept.
pub fn decode_catalog(
    processor: &CatalogProcessor,
    content_type: Option<&str>,
    body: Bytes,
    request: &CatalogRequest,
) -> Result<SearchCatalog, ApiError> {
    let text = std::str::from_utf8(&body)
        .map_err(|e| ProcessingError::InvalidFormat(format!("response is not UTF-8: {e}")))?;

    let is_xml = content_type.map_or(false, |ct| ct.contains("xml"));
    if !is_xml {
        return Ok(processor.process_json(text)?);
    }

    let context = SearchContext::new(request.check_in, request.check_out, request.currency.clone());
    processor
        .process_xml(text, &context)?
        .into_iter()
        .find(|catalog| catalog.hotel_id == request.hotel_id)
        .ok_or_else(|| ApiError::HotelNotFound(request.hotel_id.clone()))
}

/// Returns the stored catalog for this search, fetching it on a miss.
pub async fn load_catalog<C>(
    client: &C,
    store: &CatalogStore,
    request: &CatalogRequest,
) -> Result<Arc<SearchCatalog>, ApiError>
where
    C: CatalogClient + ?Sized,
{
    if let Some(catalog) = store.get(&request.hotel_id, request.check_in, request.check_out) {
        return Ok(catalog);
    }

    let catalog = client.fetch_catalog(request).await?;
    Ok(store.insert(catalog, None))
}

/// Fetches several hotels concurrently; results come back in request order.
pub async fn fetch_catalogs<C>(
    client: &C,
    requests: &[CatalogRequest],
) -> Vec<Result<SearchCatalog, ApiError>>
where
    C: CatalogClient + ?Sized,
{
    join_all(requests.iter().map(|request| client.fetch_catalog(request))).await
}

#[cfg(test)]
pub mod mock_client {
    use super::*;
    use crate::model::{Rate, Recommendation, Room};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Serves a fixed two-room catalog for any hotel, failing the first N calls
    pub struct MockCatalogClient {
        pub calls: AtomicUsize,
        pub fail_first: usize,
    }

    impl MockCatalogClient {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
            }
        }
    }

    #[async_trait]
    impl CatalogClient for MockCatalogClient {
        async fn fetch_catalog(
            &self,
            request: &CatalogRequest,
        ) -> Result<SearchCatalog, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ApiError::ApiResponseError {
                    status_code: 503,
                    message: "Service temporarily unavailable".to_string(),
                    is_retryable: true,
                });
            }

            Ok(SearchCatalog {
                search_id: format!("search-{}", call),
                hotel_id: request.hotel_id.clone(),
                check_in: request.check_in,
                check_out: request.check_out,
                currency: request.currency.clone(),
                rooms: vec![
                    Room::new("DBL", vec![Rate::new("r1"), Rate::new("r2")]),
                    Room::new("TWN", vec![Rate::new("r3")]),
                ],
                recommendations: vec![
                    Recommendation::new("A", ["r1", "r3"]),
                    Recommendation::new("B", ["r2", "r3"]),
                ],
                fetched_at: Utc::now(),
            })
        }
    }
}
