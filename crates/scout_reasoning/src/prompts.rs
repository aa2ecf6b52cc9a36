//! Default instruction preambles, output contracts and tool bindings per step.

use scout_core::state::StepKind;

const POSITION_INSTRUCTIONS: &str = "You are a hospitality real-estate analyst assessing the location of a hotel asset.
Geocode the hotel, identify the nearest relevant cities and compute distances to their centres.
Describe the surrounding context (tourist, business, residential) and accessibility by road, rail and air.
Use web search to support qualitative statements. Call tools as needed, then give your final answer.";

const DIMENSIONS_INSTRUCTIONS: &str = "You are a hospitality real-estate analyst sizing a hotel asset.
Find the number of rooms, the total surface area in square metres and the main amenities, citing a source URL for each.
If no published surface area exists, estimate it: download a satellite image of the hotel, estimate the ground scale,
segment the building footprint and compute its area. Cite the image path as the source of an estimated area.";

const COMPSET_INSTRUCTIONS: &str = "You are a hospitality real-estate analyst building the competitive set of a hotel asset.
Using the earlier findings in the conversation, identify comparable hotels in the same market (category, size, positioning).
Geocode each competitor and compute its distance from the asset where possible. Cite a source URL for each competitor.";

const POSITION_CONTRACT: &str = r#"Reply with a single JSON object and nothing else:
{"hotel_coordinates": {"latitude": <number>, "longitude": <number>},
 "nearby_cities": [{"name": <text>, "coordinates": {"latitude": <number>, "longitude": <number>}, "distance_km": <number>}],
 "context": <text>, "accessibility": <text>, "summary": <text>}"#;

const DIMENSIONS_CONTRACT: &str = r#"Reply with a single JSON object and nothing else:
{"number_of_rooms": {"value": <number or text>, "source_url": <text>} or null,
 "total_surface_area_sqm": {"value": <number or text>, "source_url": <text>} or null,
 "main_amenities": [{"amenity": <text>, "source_url": <text>}],
 "additional_information": <text or null>}"#;

const COMPSET_CONTRACT: &str = r#"Reply with a single JSON object and nothing else:
{"competitors": [{"name": <text>, "coordinates": {"latitude": <number>, "longitude": <number>} or null,
   "distance_km": <number or null>, "source_url": <text or null>}],
 "summary": <text>}"#;

pub fn default_instructions(kind: StepKind) -> &'static str {
    match kind {
        StepKind::PositionAnalysis => POSITION_INSTRUCTIONS,
        StepKind::AssetDimensions => DIMENSIONS_INSTRUCTIONS,
        StepKind::CompetitiveSet => COMPSET_INSTRUCTIONS,
    }
}

/// JSON shape the final turn of a step must follow.
pub fn output_contract(kind: StepKind) -> &'static str {
    match kind {
        StepKind::PositionAnalysis => POSITION_CONTRACT,
        StepKind::AssetDimensions => DIMENSIONS_CONTRACT,
        StepKind::CompetitiveSet => COMPSET_CONTRACT,
    }
}

pub fn default_tools(kind: StepKind) -> &'static [&'static str] {
    match kind {
        StepKind::PositionAnalysis => &[
            "get_coordinates",
            "calculate_distance_to_city_centers",
            "get_distance_between_coordinates",
            "web_search",
        ],
        StepKind::AssetDimensions => &[
            "web_search",
            "get_coordinates",
            "download_satellite_image",
            "estimate_scale",
            "estimate_scale_from_points",
            "segment_footprint",
            "calculate_area",
        ],
        StepKind::CompetitiveSet => &[
            "get_coordinates",
            "web_search",
            "calculate_distance_to_city_centers",
        ],
    }
}

/// Preamble sent ahead of the log: instructions followed by the output contract.
pub fn system_preamble(kind: StepKind, instructions: &str) -> String {
    format!("{}\n\n{}", instructions.trim_end(), output_contract(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_carries_contract_fields() {
        let p = system_preamble(StepKind::PositionAnalysis, default_instructions(StepKind::PositionAnalysis));
        for field in ["hotel_coordinates", "nearby_cities", "context", "accessibility", "summary"] {
            assert!(p.contains(field), "missing {field}");
        }
        let d = system_preamble(StepKind::AssetDimensions, "custom");
        assert!(d.starts_with("custom\n\n"));
        assert!(d.contains("main_amenities"));
    }

    #[test]
    fn test_every_step_binds_tools() {
        for kind in StepKind::ALL {
            assert!(!default_tools(kind).is_empty());
        }
    }
}
