//! Building-footprint segmentation through an HTTP inference endpoint.
//!
//! The endpoint receives the raw image bytes and answers with
//! `{"mask": [[0, 1, ...], ...]}`.

use anyhow::Result;
use scout_core::ToolError;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::scale::Mask;
use crate::{ensure_success, http_client, transport_error};

const SERVICE: &str = "segmentation";

#[derive(Debug, Deserialize)]
struct SegmentationResponse {
    mask: Value,
}

#[derive(Debug, Clone)]
pub struct SegmentationClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl SegmentationClient {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        if let Some(url) = &endpoint {
            Url::parse(url)?;
        }
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
        })
    }

    pub async fn segment(&self, image: Vec<u8>, content_type: &str) -> Result<Mask, ToolError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ToolError::rejected(SERVICE, "no segmentation endpoint configured"))?;
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: SegmentationResponse = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        Mask::from_value(&body.mask)
            .map_err(|e| ToolError::external(SERVICE, format!("malformed mask: {e}")))
    }
}
