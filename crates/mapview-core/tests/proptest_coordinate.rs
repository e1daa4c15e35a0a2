//! Property-based tests for coordinate normalization.

use mapview_core::coordinate::{NormalizedCoordinate, is_valid_pair, normalize};
use proptest::prelude::*;
use serde_json::{Value, json};

fn raw_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<f64>().prop_map(|v| serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)),
        any::<i64>().prop_map(|v| json!(v)),
        ".*".prop_map(Value::String),
        any::<f64>().prop_map(|v| Value::String(v.to_string())),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
    ]
}

proptest! {
    #[test]
    fn normalize_is_none_or_finite(value in raw_value()) {
        if let Some(v) = normalize(&value) {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn finite_numbers_round_trip(v in -1.0e9f64..1.0e9) {
        prop_assert_eq!(normalize(&json!(v)), Some(v));
        prop_assert_eq!(normalize(&Value::String(v.to_string())), Some(v));
    }

    #[test]
    fn valid_pairs_are_never_origin(lat in raw_value(), lng in raw_value()) {
        if let Some(c) = NormalizedCoordinate::from_raw(&lat, &lng) {
            prop_assert!(!(c.lat() == 0.0 && c.lng() == 0.0));
            prop_assert!(c.lat().is_finite() && c.lng().is_finite());
            prop_assert!(is_valid_pair(&lat, &lng));
        } else {
            prop_assert!(!is_valid_pair(&lat, &lng));
        }
    }
}

#[test]
fn origin_is_always_invalid() {
    assert!(!is_valid_pair(&json!(0), &json!(0)));
    assert!(!is_valid_pair(&json!(0.0), &json!("0")));
}

#[test]
fn seoul_is_valid() {
    assert!(is_valid_pair(&json!(37.5), &json!(127.0)));
}
