use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::as_f64;

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Parse a coordinate-like tool argument. Both `latitude` and `longitude`
    /// must be present; `lat`/`lng` are accepted as the short forms upstream
    /// map APIs use.
    pub fn from_value(value: &Value) -> Result<Self, ToolError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ToolError::invalid("coordinates must be an object"))?;
        let pick = |long: &str, short: &str| obj.get(long).or_else(|| obj.get(short)).and_then(as_f64);
        let latitude = pick("latitude", "lat")
            .ok_or_else(|| ToolError::invalid("coordinates are missing \"latitude\""))?;
        let longitude = pick("longitude", "lng")
            .ok_or_else(|| ToolError::invalid("coordinates are missing \"longitude\""))?;
        let coords = Self { latitude, longitude };
        coords.check().map_err(ToolError::InvalidArgument)?;
        Ok(coords)
    }

    /// Parse a list of coordinate-like arguments, failing on the first bad entry.
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, ToolError> {
        let items = value
            .as_array()
            .ok_or_else(|| ToolError::invalid("expected a list of coordinates"))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Self::from_value(item).map_err(|e| ToolError::invalid(format!("entry {i}: {e}")))
            })
            .collect()
    }

    /// Range and finiteness check.
    pub fn check(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} out of range", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} out of range", self.longitude));
        }
        Ok(())
    }

    /// `lat,lng` as used in query strings.
    pub fn as_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A pixel position inside a raster image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn from_value(value: &Value) -> Result<Self, ToolError> {
        let x = value.get("x").and_then(as_f64);
        let y = value.get("y").and_then(as_f64);
        match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Self { x, y }),
            _ => Err(ToolError::invalid("pixel point must carry numeric \"x\" and \"y\"")),
        }
    }

    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_both_axes() {
        let ok = Coordinates::from_value(&json!({"latitude": 43.72, "longitude": 7.36})).unwrap();
        assert_eq!(ok, Coordinates::new(43.72, 7.36));

        let err = Coordinates::from_value(&json!({"latitude": 43.72})).unwrap_err();
        assert!(err.to_string().contains("longitude"));
        assert!(Coordinates::from_value(&json!([43.72, 7.36])).is_err());
    }

    #[test]
    fn test_from_value_accepts_short_keys() {
        let c = Coordinates::from_value(&json!({"lat": "43.7", "lng": 7.3})).unwrap();
        assert_eq!(c, Coordinates::new(43.7, 7.3));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Coordinates::from_value(&json!({"latitude": 91.0, "longitude": 0.0})).is_err());
        assert!(Coordinates::from_value(&json!({"latitude": 0.0, "longitude": -181.0})).is_err());
    }

    #[test]
    fn test_list_reports_bad_entry_index() {
        let err = Coordinates::list_from_value(&json!([
            {"latitude": 1.0, "longitude": 1.0},
            {"latitude": 1.0}
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_pixel_distance() {
        let a = PixelPoint::from_value(&json!({"x": 0, "y": 0})).unwrap();
        let b = PixelPoint::from_value(&json!({"x": 3, "y": 4})).unwrap();
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
