#![no_main]

use libfuzzer_sys::fuzz_target;
use mapview_core::coordinate::{NormalizedCoordinate, is_valid_pair, normalize};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    // Split the input into two host values; undecodable halves become strings.
    let mid = data.len() / 2;
    let parse = |bytes: &[u8]| {
        serde_json::from_slice::<Value>(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    };
    let lat = parse(&data[..mid]);
    let lng = parse(&data[mid..]);

    for value in [&lat, &lng] {
        if let Some(n) = normalize(value) {
            assert!(n.is_finite(), "normalize returned non-finite {n}");
        }
    }

    let valid = is_valid_pair(&lat, &lng);
    match NormalizedCoordinate::from_raw(&lat, &lng) {
        Some(coord) => {
            assert!(valid, "from_raw accepted a pair is_valid_pair rejects");
            assert!(coord.lat().is_finite() && coord.lng().is_finite());
            assert!(!(coord.lat() == 0.0 && coord.lng() == 0.0), "origin accepted");
        }
        None => assert!(!valid, "is_valid_pair accepted a pair from_raw rejects"),
    }
});
