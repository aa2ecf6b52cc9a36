//! Stateless data-gathering operations exposed to the reasoning steps.
//!
//! Each upstream API gets a small client returning typed results; the
//! `handlers` module wraps them as named [`ToolHandler`]s with JSON schemas.

pub mod handlers;
pub mod imagery;
pub mod maps;
pub mod scale;
pub mod search;
pub mod segmentation;

use anyhow::Result;
use scout_core::config::ServicesConfig;
use scout_core::{ToolError, ToolHandler};
use std::time::Duration;

pub use scale::Mask;

/// Build every tool handler from service configuration.
///
/// Missing API keys do not fail startup: the affected tools report an
/// external-service error when called, so the model can carry on without them.
pub fn standard_handlers(cfg: &ServicesConfig) -> Result<Vec<Box<dyn ToolHandler>>> {
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let maps = maps::MapsClient::new(
        &cfg.maps_base_url,
        cfg.google_api_key.clone().unwrap_or_default(),
        timeout,
    )?;
    let imagery = imagery::ImageryClient::new(
        &cfg.mapbox_base_url,
        cfg.mapbox_token.clone().unwrap_or_default(),
        timeout,
    )?;
    let search = search::SearchClient::new(
        &cfg.serpapi_base_url,
        cfg.serp_api_key.clone().unwrap_or_default(),
        timeout,
    )?
    .with_language(&cfg.search_language)
    .with_results(cfg.search_results);
    let segmentation = segmentation::SegmentationClient::new(cfg.segmentation_url.clone(), timeout)?;

    Ok(handlers::all(
        maps,
        imagery,
        search,
        segmentation,
        cfg.image_dir.clone(),
    ))
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Map a transport-level failure onto the tool error taxonomy.
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> ToolError {
    if err.is_timeout() {
        ToolError::Timeout {
            service: service.to_string(),
        }
    } else {
        ToolError::external(service, err.to_string())
    }
}

/// Fail with a descriptive error on a non-success HTTP status.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(service, status, &body))
}

/// 408, 429 and 5xx may clear up; any other status is a refusal.
pub(crate) fn status_error(service: &str, status: reqwest::StatusCode, body: &str) -> ToolError {
    let message = format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    );
    let transient = status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
    if transient {
        ToolError::external(service, message)
    } else {
        ToolError::rejected(service, message)
    }
}

pub(crate) fn require_key(service: &str, key: &str) -> Result<(), ToolError> {
    if key.is_empty() {
        Err(ToolError::rejected(service, "no API key configured"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use scout_core::ToolErrorKind;

    #[test]
    fn test_status_error_kinds() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::NOT_FOUND] {
            assert_eq!(
                status_error("maps", status, "denied").kind(),
                ToolErrorKind::Permanent,
                "{status}"
            );
        }
        for status in [
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(
                status_error("maps", status, "").kind(),
                ToolErrorKind::Transient,
                "{status}"
            );
        }
        let err = status_error("maps", StatusCode::FORBIDDEN, "bad key");
        assert!(err.to_string().contains("HTTP 403 Forbidden: bad key"));
    }

    #[test]
    fn test_missing_key_is_permanent() {
        let err = require_key("google_maps", "").unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::Permanent);
        assert!(require_key("google_maps", "k").is_ok());
    }
}
