//! Named tool handlers wrapping the service clients and the scale maths.

use scout_core::geo::PixelPoint;
use scout_core::tools::{require_f64, require_str};
use scout_core::{Coordinates, Tool, ToolError, ToolHandler, ToolInputSchema, ToolOutcome};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::imagery::ImageryClient;
use crate::maps::MapsClient;
use crate::scale::{self, Mask};
use crate::search::SearchClient;
use crate::segmentation::SegmentationClient;

pub const GET_COORDINATES: &str = "get_coordinates";
pub const DISTANCE_BETWEEN: &str = "get_distance_between_coordinates";
pub const DISTANCE_TO_CITIES: &str = "calculate_distance_to_city_centers";
pub const SATELLITE_IMAGE: &str = "download_satellite_image";
pub const ESTIMATE_SCALE: &str = "estimate_scale";
pub const SCALE_FROM_POINTS: &str = "estimate_scale_from_points";
pub const SEGMENT_FOOTPRINT: &str = "segment_footprint";
pub const CALCULATE_AREA: &str = "calculate_area";
pub const WEB_SEARCH: &str = "web_search";

/// Every handler, ready to be registered.
pub fn all(
    maps: MapsClient,
    imagery: ImageryClient,
    search: SearchClient,
    segmentation: SegmentationClient,
    image_dir: PathBuf,
) -> Vec<Box<dyn ToolHandler>> {
    vec![
        Box::new(GetCoordinatesTool { maps: maps.clone() }),
        Box::new(DistanceBetweenTool { maps: maps.clone() }),
        Box::new(DistanceToCitiesTool { maps }),
        Box::new(SatelliteImageTool { imagery, image_dir: image_dir.clone() }),
        Box::new(EstimateScaleTool),
        Box::new(ScaleFromPointsTool),
        Box::new(SegmentFootprintTool { segmentation, image_dir: image_dir.clone() }),
        Box::new(CalculateAreaTool { image_dir }),
        Box::new(WebSearchTool { search }),
    ]
}

fn coordinate_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "latitude": {"type": "number"},
            "longitude": {"type": "number"}
        },
        "required": ["latitude", "longitude"]
    })
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: ToolInputSchema::object(properties, required),
    }
}

fn require<'a>(input: &'a Value, key: &str) -> Result<&'a Value, ToolError> {
    input
        .get(key)
        .ok_or_else(|| ToolError::invalid(format!("missing required parameter: \"{key}\"")))
}

// ============================================================================
// Geographic location
// ============================================================================

pub struct GetCoordinatesTool {
    maps: MapsClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetCoordinatesTool {
    fn name(&self) -> &str {
        GET_COORDINATES
    }

    fn description(&self) -> &str {
        "Get latitude and longitude of a place name using Google Maps. The place can be an asset, a city or a point of interest. Returns null when nothing matches."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "poi_name": {
                    "type": "string",
                    "description": "Name of the place, e.g. \"Les Terrasses d'Eze, Eze\""
                }
            }),
            &["poi_name"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let name = require_str(input, "poi_name")?;
            let found = self.maps.geocode(name).await?;
            Ok::<Value, ToolError>(json!(found))
        }
        .await;
        result.into()
    }
}

pub struct DistanceBetweenTool {
    maps: MapsClient,
}

#[async_trait::async_trait]
impl ToolHandler for DistanceBetweenTool {
    fn name(&self) -> &str {
        DISTANCE_BETWEEN
    }

    fn description(&self) -> &str {
        "Travel distance in meters and duration in seconds between two coordinates, using the Google Maps Distance Matrix."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "point1": coordinate_schema("Origin"),
                "point2": coordinate_schema("Destination"),
                "mode": {
                    "type": "string",
                    "enum": ["driving", "walking", "bicycling", "transit"],
                    "description": "Transport mode, driving when omitted"
                }
            }),
            &["point1", "point2"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let origin = Coordinates::from_value(require(input, "point1")?)?;
            let destination = Coordinates::from_value(require(input, "point2")?)?;
            let mode = input.get("mode").and_then(Value::as_str).unwrap_or("driving");
            let route = self.maps.distance_between(origin, destination, mode).await?;
            Ok::<Value, ToolError>(json!(route))
        }
        .await;
        result.into()
    }
}

pub struct DistanceToCitiesTool {
    maps: MapsClient,
}

#[async_trait::async_trait]
impl ToolHandler for DistanceToCitiesTool {
    fn name(&self) -> &str {
        DISTANCE_TO_CITIES
    }

    fn description(&self) -> &str {
        "Driving distances in km from the asset to a list of city centres. Unreachable cities are left out, so the list can be shorter than the input; order is preserved."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "asset_coords": coordinate_schema("Coordinates of the hotel"),
                "city_coords_list": {
                    "type": "array",
                    "items": coordinate_schema("City centre"),
                }
            }),
            &["asset_coords", "city_coords_list"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let origin = Coordinates::from_value(require(input, "asset_coords")?)?;
            let cities = Coordinates::list_from_value(require(input, "city_coords_list")?)?;
            let km = self.maps.distances_km(origin, &cities).await?;
            Ok::<Value, ToolError>(json!(km))
        }
        .await;
        result.into()
    }
}

// ============================================================================
// Asset dimensions
// ============================================================================

pub struct SatelliteImageTool {
    imagery: ImageryClient,
    image_dir: PathBuf,
}

#[async_trait::async_trait]
impl ToolHandler for SatelliteImageTool {
    fn name(&self) -> &str {
        SATELLITE_IMAGE
    }

    fn description(&self) -> &str {
        "Download a square satellite image centred on the given coordinates and save it locally. Returns the saved path for segment_footprint."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "latitude": {"type": "number"},
                "longitude": {"type": "number"},
                "zoom": {"type": "integer", "minimum": 0, "maximum": crate::imagery::MAX_ZOOM},
                "size": {"type": "integer", "minimum": 1, "maximum": crate::imagery::MAX_SIZE, "description": "Width and height in pixels"}
            }),
            &["latitude", "longitude", "zoom", "size"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let center = Coordinates::from_value(input)?;
            let zoom = integer(input, "zoom")?;
            let size = integer(input, "size")?;
            let zoom = u8::try_from(zoom).map_err(|_| ToolError::invalid("zoom out of range"))?;
            let size = u32::try_from(size).map_err(|_| ToolError::invalid("size out of range"))?;

            let bytes = self.imagery.satellite_image(center, zoom, size).await?;
            let file = format!(
                "satellite_{:.5}_{:.5}_z{}_{}px.{}",
                center.latitude,
                center.longitude,
                zoom,
                size,
                image_extension(&bytes)
            );
            let path = self.image_dir.join(file);
            tokio::fs::create_dir_all(&self.image_dir)
                .await
                .map_err(|e| ToolError::external("filesystem", e.to_string()))?;
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| ToolError::external("filesystem", e.to_string()))?;
            tracing::info!("Saved satellite image ({} bytes) to {}", bytes.len(), path.display());

            Ok::<Value, ToolError>(json!({
                "path": path.display().to_string(),
                "bytes": bytes.len(),
                "width": size,
                "height": size,
                "zoom": zoom,
            }))
        }
        .await;
        result.into()
    }
}

fn integer(input: &Value, key: &str) -> Result<i64, ToolError> {
    let n = require_f64(input, key)?;
    if n.fract() != 0.0 {
        return Err(ToolError::invalid(format!("\"{key}\" must be an integer")));
    }
    Ok(n as i64)
}

fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        "jpg"
    } else {
        "png"
    }
}

pub struct EstimateScaleTool;

#[async_trait::async_trait]
impl ToolHandler for EstimateScaleTool {
    fn name(&self) -> &str {
        ESTIMATE_SCALE
    }

    fn description(&self) -> &str {
        "Meters per pixel of a Web-Mercator satellite image at the given latitude and zoom level."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "latitude": {"type": "number"},
                "zoom": {"type": "number"}
            }),
            &["latitude", "zoom"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = (|| {
            let latitude = require_f64(input, "latitude")?;
            let zoom = require_f64(input, "zoom")?;
            let mpp = scale::meters_per_pixel(latitude, zoom)?;
            Ok::<Value, ToolError>(json!({"meters_per_pixel": mpp}))
        })();
        result.into()
    }
}

pub struct ScaleFromPointsTool;

#[async_trait::async_trait]
impl ToolHandler for ScaleFromPointsTool {
    fn name(&self) -> &str {
        SCALE_FROM_POINTS
    }

    fn description(&self) -> &str {
        "Meters per pixel from two pixel positions in an image whose real-world distance is known."
    }

    fn schema(&self) -> Tool {
        let pixel = json!({
            "type": "object",
            "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
            "required": ["x", "y"]
        });
        tool(
            self.name(),
            self.description(),
            json!({
                "pixel1": pixel.clone(),
                "pixel2": pixel,
                "distance_meters": {"type": "number"}
            }),
            &["pixel1", "pixel2", "distance_meters"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = (|| {
            let a = PixelPoint::from_value(require(input, "pixel1")?)?;
            let b = PixelPoint::from_value(require(input, "pixel2")?)?;
            let distance = require_f64(input, "distance_meters")?;
            let mpp = scale::meters_per_pixel_from_points(a, b, distance)?;
            Ok::<Value, ToolError>(json!({"meters_per_pixel": mpp}))
        })();
        result.into()
    }
}

pub struct SegmentFootprintTool {
    segmentation: SegmentationClient,
    image_dir: PathBuf,
}

/// Only files previously written by the imagery tools may be read back.
fn confine(image_dir: &Path, requested: &str) -> Result<PathBuf, ToolError> {
    let not_found = || ToolError::invalid(format!("no saved file at {requested}"));
    let root = image_dir.canonicalize().map_err(|_| not_found())?;
    let path = Path::new(requested).canonicalize().map_err(|_| not_found())?;
    if !path.starts_with(&root) {
        return Err(ToolError::invalid(format!(
            "{requested} is outside the image directory"
        )));
    }
    Ok(path)
}

fn filesystem_error(e: std::io::Error) -> ToolError {
    ToolError::external("filesystem", e.to_string())
}

#[async_trait::async_trait]
impl ToolHandler for SegmentFootprintTool {
    fn name(&self) -> &str {
        SEGMENT_FOOTPRINT
    }

    fn description(&self) -> &str {
        "Segment the building footprint of a downloaded satellite image. Saves the binary mask (1 = building) and returns its mask_path with the occupied pixel count; pass mask_path to calculate_area."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "image_path": {"type": "string", "description": "Path returned by download_satellite_image"}
            }),
            &["image_path"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let path = confine(&self.image_dir, require_str(input, "image_path")?)?;
            let image = tokio::fs::read(&path).await.map_err(filesystem_error)?;
            let content_type = if image_extension(&image) == "jpg" { "image/jpeg" } else { "image/png" };
            let mask = self.segmentation.segment(image, content_type).await?;

            // The mask stays on disk; only its summary enters the conversation.
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
            let mask_path = path.with_file_name(format!("{stem}_mask.json"));
            let encoded = serde_json::to_vec(mask.rows())
                .map_err(|e| ToolError::external("filesystem", e.to_string()))?;
            tokio::fs::write(&mask_path, encoded).await.map_err(filesystem_error)?;
            tracing::debug!(path = %mask_path.display(), occupied = mask.occupied(), "saved footprint mask");

            Ok::<Value, ToolError>(json!({
                "mask_path": mask_path.display().to_string(),
                "occupied_pixels": mask.occupied(),
                "width": mask.width(),
                "height": mask.height(),
            }))
        }
        .await;
        result.into()
    }
}

pub struct CalculateAreaTool {
    image_dir: PathBuf,
}

impl CalculateAreaTool {
    /// Inline `mask` wins; otherwise `mask_path` is read from the image directory.
    async fn load_mask(&self, input: &Value) -> Result<Mask, ToolError> {
        if let Some(inline) = input.get("mask") {
            return Mask::from_value(inline);
        }
        let requested = input
            .get("mask_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid("either 'mask' or 'mask_path' is required"))?;
        let path = confine(&self.image_dir, requested)?;
        let raw = tokio::fs::read(&path).await.map_err(filesystem_error)?;
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| ToolError::invalid(format!("{requested} is not a mask file: {e}")))?;
        Mask::from_value(&value)
    }
}

#[async_trait::async_trait]
impl ToolHandler for CalculateAreaTool {
    fn name(&self) -> &str {
        CALCULATE_AREA
    }

    fn description(&self) -> &str {
        "Area in square meters of the occupied cells of a binary mask, given the meters-per-pixel scale. Pass mask_path from segment_footprint, or a small inline mask."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "mask": {
                    "type": "array",
                    "items": {"type": "array", "items": {"type": "integer", "enum": [0, 1]}}
                },
                "mask_path": {"type": "string", "description": "Path returned by segment_footprint"},
                "meters_per_pixel": {"type": "number"}
            }),
            &["meters_per_pixel"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let mpp = require_f64(input, "meters_per_pixel")?;
            let mask = self.load_mask(input).await?;
            let area = scale::area_sqm(&mask, mpp)?;
            Ok::<Value, ToolError>(json!({"area_sqm": area}))
        }
        .await;
        result.into()
    }
}

// ============================================================================
// Web search
// ============================================================================

pub struct WebSearchTool {
    search: SearchClient,
}

#[async_trait::async_trait]
impl ToolHandler for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Google web search. Returns the snippets and links of the top results, most relevant first; cite the link of any fact you use."
    }

    fn schema(&self) -> Tool {
        tool(
            self.name(),
            self.description(),
            json!({
                "query": {"type": "string", "description": "e.g. \"Les Terrasses d'Eze number of rooms surface spa\""}
            }),
            &["query"],
        )
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let result = async {
            let query = require_str(input, "query")?;
            let hits = self.search.search(query).await?;
            Ok::<Value, ToolError>(json!(hits))
        }
        .await;
        result.into()
    }
}
