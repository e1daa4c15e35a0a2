#![forbid(unsafe_code)]

//! Coordinate normalization and validation.
//!
//! Host data carries latitude/longitude as JSON numbers, numeric strings,
//! `null`, or not at all. [`normalize`] collapses every representation into
//! `Option<f64>`, and [`is_valid_pair`] decides whether a pair may be drawn.
//!
//! # Invariants
//!
//! 1. `normalize(v)` is either `None` or a finite `f64`.
//! 2. `(0, 0)` is never a valid pair: the application writes zeros for members
//!    whose position has not been reported yet.
//! 3. No range clamping happens here. Latitude/longitude ranges are the
//!    caller's concern.

use serde::Serialize;
use serde_json::Value;

/// Parse one raw coordinate component.
///
/// Accepts numbers and numeric strings (surrounding whitespace allowed).
/// `null`, empty strings, booleans, arrays, objects, and anything that parses
/// to NaN or infinity yield `None`.
#[must_use]
pub fn normalize(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => parse_numeric(text),
        _ => None,
    }
}

/// Like [`normalize`], but treats an absent value (`undefined` on the host)
/// the same as `null`.
#[must_use]
pub fn normalize_opt(value: Option<&Value>) -> Option<f64> {
    value.and_then(normalize)
}

/// True iff both components normalize and the pair is not exactly `(0, 0)`.
#[must_use]
pub fn is_valid_pair(lat: &Value, lng: &Value) -> bool {
    NormalizedCoordinate::from_raw(lat, lng).is_some()
}

fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A validated `{ lat, lng }` pair: finite and not `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedCoordinate {
    lat: f64,
    lng: f64,
}

impl NormalizedCoordinate {
    /// Validate an already-numeric pair.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if lat == 0.0 && lng == 0.0 {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Normalize and validate a raw pair as received from the host.
    #[must_use]
    pub fn from_raw(lat: &Value, lng: &Value) -> Option<Self> {
        Self::new(normalize(lat)?, normalize(lng)?)
    }

    /// Latitude in degrees.
    #[inline]
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[inline]
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

/// Axis-aligned lat/lng bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    /// Smallest box containing every coordinate. `None` for an empty slice.
    #[must_use]
    pub fn from_coordinates(coords: &[NormalizedCoordinate]) -> Option<Self> {
        let (first, rest) = coords.split_first()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        for c in rest {
            bounds.south = bounds.south.min(c.lat);
            bounds.north = bounds.north.max(c.lat);
            bounds.west = bounds.west.min(c.lng);
            bounds.east = bounds.east.max(c.lng);
        }
        Some(bounds)
    }

    /// True when the box has zero extent on both axes.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.south == self.north && self.west == self.east
    }

    /// South-west corner.
    #[must_use]
    pub const fn south_west(&self) -> (f64, f64) {
        (self.south, self.west)
    }

    /// North-east corner.
    #[must_use]
    pub const fn north_east(&self) -> (f64, f64) {
        (self.north, self.east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(normalize(&json!(37.5)), Some(37.5));
        assert_eq!(normalize(&json!(-122)), Some(-122.0));
    }

    #[test]
    fn numeric_strings_parse() {
        assert_eq!(normalize(&json!("127.0")), Some(127.0));
        assert_eq!(normalize(&json!("  37.56 ")), Some(37.56));
        assert_eq!(normalize(&json!("1e2")), Some(100.0));
    }

    #[test]
    fn missing_and_garbage_are_none() {
        assert_eq!(normalize(&Value::Null), None);
        assert_eq!(normalize(&json!("")), None);
        assert_eq!(normalize(&json!("   ")), None);
        assert_eq!(normalize(&json!("abc")), None);
        assert_eq!(normalize(&json!("12abc")), None);
        assert_eq!(normalize(&json!(true)), None);
        assert_eq!(normalize(&json!([1.0])), None);
        assert_eq!(normalize(&json!({"lat": 1.0})), None);
        assert_eq!(normalize_opt(None), None);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        assert_eq!(normalize(&json!("NaN")), None);
        assert_eq!(normalize(&json!("inf")), None);
        assert_eq!(normalize(&json!("-Infinity")), None);
    }

    #[test]
    fn no_range_clamping() {
        assert_eq!(normalize(&json!(512.0)), Some(512.0));
    }

    #[test]
    fn zero_zero_is_unset() {
        assert!(!is_valid_pair(&json!(0), &json!(0)));
        assert!(!is_valid_pair(&json!("0"), &json!("0.0")));
        assert!(NormalizedCoordinate::new(0.0, 0.0).is_none());
        assert!(NormalizedCoordinate::new(-0.0, 0.0).is_none());
    }

    #[test]
    fn single_zero_axis_is_valid() {
        assert!(is_valid_pair(&json!(0.0), &json!(127.0)));
        assert!(is_valid_pair(&json!(51.47), &json!(0.0)));
    }

    #[test]
    fn known_good_pair() {
        assert!(is_valid_pair(&json!(37.5), &json!(127.0)));
        assert!(is_valid_pair(&json!("37.5"), &json!(127)));
    }

    #[test]
    fn half_missing_pair_is_invalid() {
        assert!(!is_valid_pair(&json!(37.5), &Value::Null));
        assert!(!is_valid_pair(&json!(""), &json!(127.0)));
    }

    #[test]
    fn bounds_cover_all_points() {
        let coords = [
            NormalizedCoordinate::new(37.5, 127.0).unwrap(),
            NormalizedCoordinate::new(35.1, 129.0).unwrap(),
            NormalizedCoordinate::new(33.4, 126.5).unwrap(),
        ];
        let bounds = LatLngBounds::from_coordinates(&coords).unwrap();
        assert_eq!(bounds.south_west(), (33.4, 126.5));
        assert_eq!(bounds.north_east(), (37.5, 129.0));
        assert!(!bounds.is_point());
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(LatLngBounds::from_coordinates(&[]).is_none());
    }

    #[test]
    fn bounds_of_duplicates_is_point() {
        let c = NormalizedCoordinate::new(37.5, 127.0).unwrap();
        let bounds = LatLngBounds::from_coordinates(&[c, c]).unwrap();
        assert!(bounds.is_point());
    }
}
