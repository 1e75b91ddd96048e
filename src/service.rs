//! Read-only client for the backtest REST backend.
//!
//! Successful responses wrap their payload as `{"data": ...}`; failures
//! carry `{"message": ...}`.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::error::ServiceError;
use crate::trader::{BacktestResult, Settings};

/// Request timeout
const TIMEOUT_SECS: u64 = 30;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Listing options for `get_backtests`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: u32,
    pub per_page: u32,
    pub include_archived: bool,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            include_archived: false,
            sort_by: "timestamp".to_string(),
            sort_order: "desc".to_string(),
        }
    }
}

/// Page position reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

/// One page of stored backtest results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginatedResponse {
    #[serde(default)]
    pub results: Vec<BacktestResult>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Backtest backend client
pub struct BacktestService {
    client: Client,
    base_url: Url,
}

impl BacktestService {
    /// Create a client for the given backend address
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Create a client for the address configured under `api.base_url`
    pub fn from_settings(settings: &Settings) -> Result<Self, ServiceError> {
        let base_url = settings
            .get_string("api.base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one stored backtest result
    pub async fn get_backtest(&self, timestamp: &str) -> Result<BacktestResult, ServiceError> {
        let url = self.backtest_url(timestamp)?;
        self.get_json(url).await
    }

    /// Fetch a page of stored backtest results
    pub async fn get_backtests(
        &self,
        params: &PaginationParams,
    ) -> Result<PaginatedResponse, ServiceError> {
        let url = self.backtests_url(params)?;
        self.get_json(url).await
    }

    fn backtest_url(&self, timestamp: &str) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["api", "backtests", timestamp]);
        Ok(url)
    }

    fn backtests_url(&self, params: &PaginationParams) -> Result<Url, ServiceError> {
        let mut url = self.base_url.join("api/backtests")?;
        url.query_pairs_mut()
            .append_pair("page", &params.page.to_string())
            .append_pair("per_page", &params.per_page.to_string())
            .append_pair("include_archived", &params.include_archived.to_string())
            .append_pair("sort_by", &params.sort_by)
            .append_pair("sort_order", &params.sort_order);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        debug!("Backtest API request: GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            error!("Backtest API error {}: {}", status, message);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        decode_envelope(&text)
    }
}

/// Unwrap the `{"data": ...}` envelope of a successful response
fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<T, ServiceError> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    Ok(envelope.data)
}

/// Best-effort message of an error response
fn error_message(text: &str) -> String {
    serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| text.trim().to_string())
}

/// Load a backtest result saved as JSON, with or without the data envelope
pub fn load_backtest_file(path: &Path) -> Result<BacktestResult, ServiceError> {
    let text = std::fs::read_to_string(path)?;
    match decode_envelope(&text) {
        Ok(result) => Ok(result),
        Err(_) => Ok(serde_json::from_str(&text)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtest_url() {
        let service = BacktestService::new("http://localhost:5000").unwrap();
        let url = service.backtest_url("20240102_120000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/backtests/20240102_120000");

        let service = BacktestService::new("http://backend:8000/").unwrap();
        let url = service.backtest_url("42").unwrap();
        assert_eq!(url.as_str(), "http://backend:8000/api/backtests/42");
    }

    #[test]
    fn test_backtests_url_query() {
        let service = BacktestService::new("http://localhost:5000").unwrap();
        let url = service.backtests_url(&PaginationParams::default()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/backtests?page=1&per_page=10&include_archived=false&sort_by=timestamp&sort_order=desc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            BacktestService::new("not a url"),
            Err(ServiceError::Url(_))
        ));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::with_defaults();
        let service = BacktestService::from_settings(&settings).unwrap();
        assert_eq!(service.base_url().as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_decode_paginated_envelope() {
        let text = r#"{"status": "success", "data": {
            "results": [{"timestamp": "20240102", "final_value": 100.0}],
            "pagination": {"page": 2, "per_page": 1, "total_count": 5, "total_pages": 5}
        }}"#;
        let page: PaginatedResponse = decode_envelope(text).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].timestamp, "20240102");
        assert_eq!(page.pagination.total_pages, 5);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"status": "error", "message": "Result 1 not found"}"#),
            "Result 1 not found"
        );
        assert_eq!(error_message(r#"{"error": "boom"}"#), "boom");
        assert_eq!(error_message("Internal Server Error\n"), "Internal Server Error");
    }

    #[test]
    fn test_load_backtest_file() {
        let dir = tempfile::tempdir().unwrap();

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(&wrapped, r#"{"data": {"timestamp": 1, "name": "a"}}"#).unwrap();
        assert_eq!(load_backtest_file(&wrapped).unwrap().name, "a");

        let bare = dir.path().join("bare.json");
        std::fs::write(
            &bare,
            r#"{"timestamp": "2", "candles": [{"time": 1700000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5}]}"#,
        )
        .unwrap();
        let result = load_backtest_file(&bare).unwrap();
        assert_eq!(result.timestamp, "2");
        assert_eq!(result.candles.len(), 1);

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_backtest_file(&missing), Err(ServiceError::Io(_))));
    }
}
