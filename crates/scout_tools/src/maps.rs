//! Geocoding and travel distances over the Google Maps web services.

use anyhow::Result;
use scout_core::{Coordinates, ToolError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{ensure_success, http_client, require_key, transport_error};

const SERVICE: &str = "google_maps";
/// Destinations per Distance Matrix request accepted by the API.
const MAX_DESTINATIONS: usize = 25;

#[derive(Debug, Clone)]
pub struct MapsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Travel distance and duration between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteDistance {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

impl MatrixElement {
    fn route(&self) -> Option<RouteDistance> {
        if self.status != "OK" {
            return None;
        }
        Some(RouteDistance {
            distance_meters: self.distance.as_ref()?.value,
            duration_seconds: self.duration.as_ref()?.value,
        })
    }
}

impl MapsClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Best match for a free-text place name; `None` when nothing was found.
    pub async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, ToolError> {
        require_key(SERVICE, &self.api_key)?;
        let url = format!("{}/geocode/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: GeocodeResponse = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        match body.status.as_str() {
            "OK" => Ok(body
                .results
                .first()
                .map(|r| Coordinates::new(r.geometry.location.lat, r.geometry.location.lng))),
            "ZERO_RESULTS" => Ok(None),
            other => Err(upstream_status(other, body.error_message)),
        }
    }

    /// Distance and duration between two points for a transport mode.
    pub async fn distance_between(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: &str,
    ) -> Result<RouteDistance, ToolError> {
        let elements = self.matrix(origin, &[destination], mode).await?;
        elements
            .first()
            .and_then(MatrixElement::route)
            .ok_or_else(|| {
                ToolError::external(
                    SERVICE,
                    "failed to retrieve distance information: no valid route element",
                )
            })
    }

    /// Driving distance in km from `origin` to each destination.
    ///
    /// Destinations the API marks unroutable are skipped, so the result may be
    /// shorter than the input; relative order is preserved.
    pub async fn distances_km(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
    ) -> Result<Vec<f64>, ToolError> {
        let mut distances = Vec::with_capacity(destinations.len());
        for chunk in destinations.chunks(MAX_DESTINATIONS) {
            let elements = self.matrix(origin, chunk, "driving").await?;
            for (i, element) in elements.iter().enumerate() {
                match element.route() {
                    Some(route) => distances.push(route.distance_meters / 1000.0),
                    None => tracing::debug!(
                        "Skipping destination {} (status {})",
                        i,
                        element.status
                    ),
                }
            }
        }
        Ok(distances)
    }

    async fn matrix(
        &self,
        origin: Coordinates,
        destinations: &[Coordinates],
        mode: &str,
    ) -> Result<Vec<MatrixElement>, ToolError> {
        require_key(SERVICE, &self.api_key)?;
        let url = format!("{}/distancematrix/json", self.base_url);
        let destinations = destinations
            .iter()
            .map(Coordinates::as_query)
            .collect::<Vec<_>>()
            .join("|");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("origins", origin.as_query().as_str()),
                ("destinations", destinations.as_str()),
                ("mode", mode),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: MatrixResponse = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if body.status != "OK" {
            return Err(upstream_status(&body.status, body.error_message));
        }
        Ok(body
            .rows
            .into_iter()
            .next()
            .map(|row| row.elements)
            .unwrap_or_default())
    }
}

/// Non-OK API status. Quota and server hiccups may clear up; denied or
/// malformed requests will not.
fn upstream_status(status: &str, message: Option<String>) -> ToolError {
    let text = match message {
        Some(m) => format!("{status}: {m}"),
        None => status.to_string(),
    };
    match status {
        "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR" => ToolError::external(SERVICE, text),
        _ => ToolError::rejected(SERVICE, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::ToolErrorKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> MapsClient {
        MapsClient::new(&server.uri(), "test-key".into(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_geocode_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .and(query_param("address", "Les Terrasses d'Eze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 43.72, "lng": 7.36}}},
                    {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                ]
            })))
            .mount(&server)
            .await;

        let coords = client(&server).await.geocode("Les Terrasses d'Eze").await.unwrap();
        assert_eq!(coords, Some(Coordinates::new(43.72, 7.36)));
    }

    #[tokio::test]
    async fn test_geocode_not_found_is_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "results": []})),
            )
            .mount(&server)
            .await;

        assert_eq!(client(&server).await.geocode("nowhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_geocode_denied_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.geocode("x").await.unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
        assert_eq!(err.kind(), ToolErrorKind::Permanent);
    }

    #[test]
    fn test_upstream_status_kinds() {
        for status in ["OVER_QUERY_LIMIT", "UNKNOWN_ERROR"] {
            assert_eq!(upstream_status(status, None).kind(), ToolErrorKind::Transient);
        }
        for status in ["REQUEST_DENIED", "INVALID_REQUEST"] {
            assert_eq!(upstream_status(status, None).kind(), ToolErrorKind::Permanent);
        }
        assert_eq!(
            upstream_status("REQUEST_DENIED", Some("bad key".into())).to_string(),
            "google_maps error: REQUEST_DENIED: bad key"
        );
    }

    #[tokio::test]
    async fn test_distances_skip_invalid_routes_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/distancematrix/json"))
            .and(query_param("origins", "43.72,7.36"))
            .and(query_param("destinations", "43.7,7.27|44,8|43.55,7.01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "rows": [{"elements": [
                    {"status": "OK", "distance": {"value": 12400}, "duration": {"value": 1500}},
                    {"status": "ZERO_RESULTS"},
                    {"status": "OK", "distance": {"value": 45100}, "duration": {"value": 3100}}
                ]}]
            })))
            .mount(&server)
            .await;

        let km = client(&server)
            .await
            .distances_km(
                Coordinates::new(43.72, 7.36),
                &[
                    Coordinates::new(43.7, 7.27),
                    Coordinates::new(44.0, 8.0),
                    Coordinates::new(43.55, 7.01),
                ],
            )
            .await
            .unwrap();
        assert_eq!(km, vec![12.4, 45.1]);
    }

    #[tokio::test]
    async fn test_distances_empty_list_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let km = client(&server)
            .await
            .distances_km(Coordinates::new(1.0, 1.0), &[])
            .await
            .unwrap();
        assert!(km.is_empty());
    }

    #[tokio::test]
    async fn test_distance_between_requires_valid_element() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/distancematrix/json"))
            .and(query_param("mode", "walking"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "rows": [{"elements": [{"status": "NOT_FOUND"}]}]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .distance_between(Coordinates::new(1.0, 1.0), Coordinates::new(2.0, 2.0), "walking")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no valid route element"));
    }

    #[tokio::test]
    async fn test_distance_between_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/distancematrix/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "rows": [{"elements": [
                    {"status": "OK", "distance": {"value": 8000}, "duration": {"value": 600}}
                ]}]
            })))
            .mount(&server)
            .await;

        let route = client(&server)
            .await
            .distance_between(Coordinates::new(1.0, 1.0), Coordinates::new(2.0, 2.0), "driving")
            .await
            .unwrap();
        assert_eq!(route, RouteDistance { distance_meters: 8000.0, duration_seconds: 600.0 });
    }

    #[tokio::test]
    async fn test_http_failure_is_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).await.geocode("x").await.unwrap_err();
        assert!(matches!(err, ToolError::ExternalService { retryable: true, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let c = MapsClient::new("http://localhost:1", String::new(), Duration::from_secs(1)).unwrap();
        let err = c.geocode("x").await.unwrap_err();
        assert!(err.to_string().contains("no API key"));
        assert_eq!(err.kind(), ToolErrorKind::Permanent);
    }
}
