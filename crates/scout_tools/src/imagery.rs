//! Satellite raster download from the Mapbox Static Images API.

use anyhow::Result;
use bytes::Bytes;
use scout_core::{Coordinates, ToolError};
use std::time::Duration;
use url::Url;

use crate::{ensure_success, http_client, require_key, transport_error};

const SERVICE: &str = "mapbox";
const STYLE: &str = "mapbox/satellite-v9";
pub const MAX_ZOOM: u8 = 22;
pub const MAX_SIZE: u32 = 1280;

#[derive(Debug, Clone)]
pub struct ImageryClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ImageryClient {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Square satellite image of `size`×`size` pixels centred on `center`.
    pub async fn satellite_image(
        &self,
        center: Coordinates,
        zoom: u8,
        size: u32,
    ) -> Result<Bytes, ToolError> {
        if zoom > MAX_ZOOM {
            return Err(ToolError::invalid(format!("zoom must be between 0 and {MAX_ZOOM}")));
        }
        if size == 0 || size > MAX_SIZE {
            return Err(ToolError::invalid(format!("size must be between 1 and {MAX_SIZE}")));
        }
        require_key(SERVICE, &self.token)?;

        let url = format!(
            "{}/styles/v1/{}/static/{},{},{}/{}x{}",
            self.base_url, STYLE, center.longitude, center.latitude, zoom, size, size
        );
        tracing::debug!("Fetching satellite tile {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("access_token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        ensure_success(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_image_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/styles/v1/mapbox/satellite-v9/static/7.36,43.72,18/512x512"))
            .and(query_param("access_token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let client = ImageryClient::new(&server.uri(), "tok".into(), Duration::from_secs(5)).unwrap();
        let bytes = client
            .satellite_image(Coordinates::new(43.72, 7.36), 18, 512)
            .await
            .unwrap();
        assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_non_success_fails_loudly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Not Authorized - Invalid Token"))
            .mount(&server)
            .await;

        let client = ImageryClient::new(&server.uri(), "bad".into(), Duration::from_secs(5)).unwrap();
        let err = client
            .satellite_image(Coordinates::new(43.72, 7.36), 18, 512)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_rejects_bad_parameters() {
        let client =
            ImageryClient::new("http://localhost:1", "tok".into(), Duration::from_secs(1)).unwrap();
        let c = Coordinates::new(0.0, 0.0);
        assert!(matches!(
            client.satellite_image(c, 23, 512).await,
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.satellite_image(c, 10, 0).await,
            Err(ToolError::InvalidArgument(_))
        ));
    }
}
