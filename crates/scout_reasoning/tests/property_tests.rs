//! Property-based tests for structured extraction.

use proptest::prelude::*;
use scout_core::error::ExtractionError;
use scout_core::geo::Coordinates;
use scout_core::records::{CompetitiveSet, Competitor};
use scout_reasoning::extraction::{extract_object, extract_record};

fn text() -> impl Strategy<Value = String> {
    // Braces, quotes and backslashes stress the string-aware scan.
    "[A-Za-z0-9 ,.'{}\"\\\\:-]{0,30}"
}

// Fixed-point values keep the JSON text round trip exact.
fn fixed(min: i32, max: i32, scale: f64) -> impl Strategy<Value = f64> {
    (min..=max).prop_map(move |n| f64::from(n) / scale)
}

fn coordinates() -> impl Strategy<Value = Coordinates> {
    (fixed(-9_000_000, 9_000_000, 1e5), fixed(-18_000_000, 18_000_000, 1e5))
        .prop_map(|(lat, lng)| Coordinates::new(lat, lng))
}

fn competitor() -> impl Strategy<Value = Competitor> {
    (
        "[A-Za-z][A-Za-z0-9 {}\"]{0,20}",
        proptest::option::of(coordinates()),
        proptest::option::of(fixed(0, 50_000, 100.0)),
        proptest::option::of("https://[a-z]{1,10}\\.com/[a-z0-9]{0,8}"),
    )
        .prop_map(|(name, coordinates, distance_km, source_url)| Competitor {
            name,
            coordinates,
            distance_km,
            source_url,
        })
}

fn competitive_set() -> impl Strategy<Value = CompetitiveSet> {
    (prop::collection::vec(competitor(), 0..5), text())
        .prop_map(|(competitors, summary)| CompetitiveSet { competitors, summary })
}

#[derive(Debug, Clone, Copy)]
enum Wrapper {
    Raw,
    Pretty,
    TaggedFence,
    UntaggedFence,
}

fn wrap(json: &str, wrapper: Wrapper) -> String {
    match wrapper {
        Wrapper::Raw | Wrapper::Pretty => json.to_string(),
        Wrapper::TaggedFence => format!("Here is the analysis.\n```json\n{}\n```\nLet me know.", json),
        Wrapper::UntaggedFence => format!("Result:\n```\n{}\n```", json),
    }
}

fn wrapper() -> impl Strategy<Value = Wrapper> {
    prop_oneof![
        Just(Wrapper::Raw),
        Just(Wrapper::Pretty),
        Just(Wrapper::TaggedFence),
        Just(Wrapper::UntaggedFence),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// A record rendered in any supported wrapper is recovered exactly.
    #[test]
    fn record_survives_wrapping(record in competitive_set(), w in wrapper()) {
        let json = match w {
            Wrapper::Pretty => serde_json::to_string_pretty(&record).unwrap(),
            _ => serde_json::to_string(&record).unwrap(),
        };
        let text = wrap(&json, w);

        let object = extract_object(&text).unwrap();
        prop_assert_eq!(object, serde_json::to_value(&record).unwrap());

        let recovered: CompetitiveSet = extract_record(&text).unwrap();
        prop_assert_eq!(recovered, record);
    }

    /// Text without an opening brace never yields an object.
    #[test]
    fn no_brace_means_no_object(text in "[^{]{0,200}") {
        prop_assert!(matches!(extract_object(&text), Err(ExtractionError::NoObject)));
    }

    /// Prose around a raw object does not prevent recovery.
    #[test]
    fn object_found_inside_prose(
        before in "[A-Za-z .,]{0,40}",
        after in "[A-Za-z .,]{0,40}",
        n in 0u32..10_000,
    ) {
        let text = format!("{}{{\"n\": {}}}{}", before, n, after);
        let object = extract_object(&text).unwrap();
        prop_assert_eq!(&object["n"], &serde_json::json!(n));
    }
}
