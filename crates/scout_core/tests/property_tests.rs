//! Property-based tests for coordinate parsing and run-state slots.

use proptest::prelude::*;
use scout_core::records::{CompetitiveSet, PositionAnalysis, StructuredRecord};
use scout_core::{AssetDimensions, Coordinates, RunState, StepKind, Turn};
use serde_json::json;

fn record(kind: StepKind) -> StructuredRecord {
    match kind {
        StepKind::PositionAnalysis => StructuredRecord::Position(PositionAnalysis {
            hotel_coordinates: Coordinates::new(43.7, 7.2),
            nearby_cities: vec![],
            context: String::new(),
            accessibility: String::new(),
            summary: String::new(),
        }),
        StepKind::AssetDimensions => StructuredRecord::Dimensions(AssetDimensions {
            number_of_rooms: None,
            total_surface_area_sqm: None,
            main_amenities: vec![],
            additional_information: None,
        }),
        StepKind::CompetitiveSet => StructuredRecord::CompetitiveSet(CompetitiveSet {
            competitors: vec![],
            summary: String::new(),
        }),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Parsing accepts exactly the valid WGS84 range.
    #[test]
    fn coordinates_accept_only_valid_range(lat in -200.0f64..200.0, lng in -400.0f64..400.0) {
        let parsed = Coordinates::from_value(&json!({"latitude": lat, "longitude": lng}));
        let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
        prop_assert_eq!(parsed.is_ok(), valid);
        if let Ok(c) = parsed {
            prop_assert_eq!(c, Coordinates::new(lat, lng));
        }
    }

    /// Completing steps fills exactly the matching slots, and the final record
    /// belongs to the last completed step.
    #[test]
    fn completed_steps_fill_only_their_slots(kinds in prop::collection::vec(0usize..3, 1..6)) {
        let kinds: Vec<StepKind> = kinds.into_iter().map(|i| StepKind::ALL[i]).collect();
        let mut state = RunState::seeded(Turn::user("hotel"));
        for kind in &kinds {
            state.complete_step(record(*kind));
        }

        prop_assert_eq!(&state.completed_steps, &kinds);
        for kind in StepKind::ALL {
            prop_assert_eq!(state.results.get(kind).is_some(), kinds.contains(&kind));
        }
        prop_assert_eq!(state.final_record().map(|r| r.kind()), kinds.last().copied());
        prop_assert_eq!(state.turns().len(), 1);
    }
}
