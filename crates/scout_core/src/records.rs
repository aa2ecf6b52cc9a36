//! Structured output records produced at step completion.
//!
//! Field names are an external contract and must not change. Records reject
//! unknown fields; `validate` adds the value constraints serde cannot express.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::state::StepKind;

/// Value constraints checked after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

// ============================================================================
// Position analysis
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionAnalysis {
    pub hotel_coordinates: Coordinates,
    pub nearby_cities: Vec<NearbyCity>,
    pub context: String,
    pub accessibility: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NearbyCity {
    pub name: String,
    pub coordinates: Coordinates,
    pub distance_km: f64,
}

impl Validate for PositionAnalysis {
    fn validate(&self) -> Result<(), String> {
        self.hotel_coordinates
            .check()
            .map_err(|e| format!("hotel_coordinates: {e}"))?;
        for (i, city) in self.nearby_cities.iter().enumerate() {
            if city.name.trim().is_empty() {
                return Err(format!("nearby_cities[{i}].name is empty"));
            }
            city.coordinates
                .check()
                .map_err(|e| format!("nearby_cities[{i}].coordinates: {e}"))?;
            check_distance(city.distance_km)
                .map_err(|e| format!("nearby_cities[{i}].distance_km: {e}"))?;
        }
        Ok(())
    }
}

// ============================================================================
// Asset dimensions
// ============================================================================

/// A number or a textual quantity ("120", "about 90").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

/// A value tagged with the source it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcedValue {
    pub value: Measure,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Amenity {
    pub amenity: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetDimensions {
    pub number_of_rooms: Option<SourcedValue>,
    pub total_surface_area_sqm: Option<SourcedValue>,
    pub main_amenities: Vec<Amenity>,
    pub additional_information: Option<String>,
}

impl Validate for SourcedValue {
    fn validate(&self) -> Result<(), String> {
        match &self.value {
            Measure::Number(n) if !n.is_finite() || *n < 0.0 => {
                Err(format!("value {n} must be a non-negative number"))
            }
            Measure::Text(t) if t.trim().is_empty() => Err("value is empty".to_string()),
            _ => Ok(()),
        }
    }
}

impl Validate for AssetDimensions {
    fn validate(&self) -> Result<(), String> {
        if let Some(rooms) = &self.number_of_rooms {
            rooms.validate().map_err(|e| format!("number_of_rooms: {e}"))?;
        }
        if let Some(area) = &self.total_surface_area_sqm {
            area.validate()
                .map_err(|e| format!("total_surface_area_sqm: {e}"))?;
        }
        for (i, a) in self.main_amenities.iter().enumerate() {
            if a.amenity.trim().is_empty() {
                return Err(format!("main_amenities[{i}].amenity is empty"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Competitive set
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Competitor {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompetitiveSet {
    pub competitors: Vec<Competitor>,
    pub summary: String,
}

impl Validate for CompetitiveSet {
    fn validate(&self) -> Result<(), String> {
        for (i, c) in self.competitors.iter().enumerate() {
            if c.name.trim().is_empty() {
                return Err(format!("competitors[{i}].name is empty"));
            }
            if let Some(coords) = &c.coordinates {
                coords
                    .check()
                    .map_err(|e| format!("competitors[{i}].coordinates: {e}"))?;
            }
            if let Some(d) = c.distance_km {
                check_distance(d).map_err(|e| format!("competitors[{i}].distance_km: {e}"))?;
            }
        }
        Ok(())
    }
}

fn check_distance(km: f64) -> Result<(), String> {
    if km.is_finite() && km >= 0.0 {
        Ok(())
    } else {
        Err(format!("{km} is not a valid distance"))
    }
}

// ============================================================================
// Any record
// ============================================================================

/// The record produced by whichever step completed last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredRecord {
    Position(PositionAnalysis),
    Dimensions(AssetDimensions),
    CompetitiveSet(CompetitiveSet),
}

impl StructuredRecord {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::Position(_) => StepKind::PositionAnalysis,
            Self::Dimensions(_) => StepKind::AssetDimensions,
            Self::CompetitiveSet(_) => StepKind::CompetitiveSet,
        }
    }
}
