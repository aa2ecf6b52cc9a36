//! Ground scale and footprint area. Pure computation, no I/O.

use scout_core::geo::PixelPoint;
use scout_core::ToolError;
use serde::Serialize;
use serde_json::Value;
use std::f64::consts::PI;

/// WGS84 equatorial radius used by Web-Mercator tiles.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
pub const TILE_SIZE: f64 = 256.0;
pub const MAX_ZOOM: f64 = 24.0;

/// Meters per pixel of a Web-Mercator tile at `latitude` (degrees) and `zoom`.
pub fn meters_per_pixel(latitude: f64, zoom: f64) -> Result<f64, ToolError> {
    if !latitude.is_finite() || latitude.abs() > 90.0 {
        return Err(ToolError::invalid(format!("latitude {latitude} out of range")));
    }
    if !zoom.is_finite() || !(0.0..=MAX_ZOOM).contains(&zoom) {
        return Err(ToolError::invalid(format!("zoom {zoom} out of range 0..={MAX_ZOOM}")));
    }
    let mpp = latitude.to_radians().cos() * 2.0 * PI * EARTH_RADIUS_M / (TILE_SIZE * 2f64.powf(zoom));
    // cos(±90°) is a hair above zero in floating point.
    Ok(mpp.max(0.0))
}

/// Meters per pixel from two pixel positions whose ground distance is known.
pub fn meters_per_pixel_from_points(
    a: PixelPoint,
    b: PixelPoint,
    distance_meters: f64,
) -> Result<f64, ToolError> {
    if !distance_meters.is_finite() || distance_meters < 0.0 {
        return Err(ToolError::invalid("distance_meters must be a non-negative number"));
    }
    let pixels = a.distance_to(&b);
    if pixels == 0.0 {
        return Err(ToolError::invalid("pixel points must be distinct"));
    }
    Ok(distance_meters / pixels)
}

/// Rectangular binary occupancy mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mask {
    rows: Vec<Vec<u8>>,
}

impl Mask {
    pub fn new(rows: Vec<Vec<u8>>) -> Result<Self, ToolError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ToolError::invalid(format!(
                    "mask row {y} has {} cells, expected {width}",
                    row.len()
                )));
            }
            if let Some(x) = row.iter().position(|&c| c > 1) {
                return Err(ToolError::invalid(format!("mask cell ({x}, {y}) is not 0 or 1")));
            }
        }
        Ok(Self { rows })
    }

    /// Parse a JSON array of arrays holding 0/1 or booleans.
    pub fn from_value(value: &Value) -> Result<Self, ToolError> {
        let rows = value
            .as_array()
            .ok_or_else(|| ToolError::invalid("mask must be a 2D array"))?;
        let rows = rows
            .iter()
            .map(|row| {
                row.as_array()
                    .ok_or_else(|| ToolError::invalid("mask rows must be arrays"))?
                    .iter()
                    .map(cell)
                    .collect::<Result<Vec<u8>, ToolError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rows)
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn occupied(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.iter().filter(|&&c| c == 1).count())
            .sum()
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }
}

fn cell(value: &Value) -> Result<u8, ToolError> {
    match value {
        Value::Bool(b) => Ok(u8::from(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            _ => Err(ToolError::invalid(format!("mask value {n} is not binary"))),
        },
        other => Err(ToolError::invalid(format!("mask value {other} is not binary"))),
    }
}

/// Area in square meters covered by the occupied cells.
pub fn area_sqm(mask: &Mask, meters_per_pixel: f64) -> Result<f64, ToolError> {
    if !meters_per_pixel.is_finite() || meters_per_pixel < 0.0 {
        return Err(ToolError::invalid("meters_per_pixel must be a non-negative number"));
    }
    Ok(mask.occupied() as f64 * meters_per_pixel * meters_per_pixel)
}
