// SPDX-License-Identifier: MIT
//! Policy-as-data configuration for the map view engine.
//!
//! Captures every tunable of the engine as a single [`EngineConfig`] that can
//! be loaded from JSON (always) or TOML (with the `policy-config` feature),
//! so the host can change thresholds without a rebuild.
//!
//! # Loading
//!
//! ```toml
//! # mapview.toml
//! provider = "naver"
//!
//! [sheet]
//! drag_threshold_px = 30.0
//!
//! [camera]
//! focus_zoom = 16
//! follow_retry = { max_retries = 5, backoff = { kind = "fixed", delay_ms = 300 } }
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("mapview.toml")?;
//! let config = EngineConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Every field defaults to the engine's built-in constants, so
//! `EngineConfig::default()` is the stock behavior.

#![forbid(unsafe_code)]

use std::path::Path;

use mapview_core::coordinate::NormalizedCoordinate;
use mapview_core::sheet::{
    DEFAULT_DRAG_THRESHOLD_PX, DEFAULT_TAP_MAX_DURATION, DEFAULT_TAP_MAX_MOVEMENT_PX, SheetConfig,
};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::retry::{BackoffStrategy, RetryPolicy};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to load or validate an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum PolicyConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "policy-config")]
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config failed validation: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// ---------------------------------------------------------------------------
// Top-level EngineConfig
// ---------------------------------------------------------------------------

/// Which map SDK backs the engine. Chosen once; never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Google,
    Naver,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Naver => "naver",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Active map provider.
    pub provider: ProviderKind,
    /// Initial camera for a freshly created map.
    pub map: MapPolicyConfig,
    /// Bottom-sheet gesture thresholds.
    pub sheet: SheetPolicyConfig,
    /// Camera-follow behavior.
    pub camera: CameraPolicyConfig,
    /// Map creation while the SDK script is still loading.
    pub sdk_load: SdkLoadPolicyConfig,
    /// Marker sizing and stacking.
    pub markers: MarkerPolicyConfig,
}

impl EngineConfig {
    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, PolicyConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if NormalizedCoordinate::new(self.map.default_lat, self.map.default_lng).is_none() {
            errors.push(format!(
                "map default center must be finite and not (0, 0), got ({}, {})",
                self.map.default_lat, self.map.default_lng
            ));
        }
        if self.map.default_zoom > MAX_ZOOM {
            errors.push(format!(
                "map.default_zoom must be <= {MAX_ZOOM}, got {}",
                self.map.default_zoom
            ));
        }

        if !(self.sheet.drag_threshold_px.is_finite() && self.sheet.drag_threshold_px > 0.0) {
            errors.push(format!(
                "sheet.drag_threshold_px must be > 0, got {}",
                self.sheet.drag_threshold_px
            ));
        }
        if !(self.sheet.tap_max_movement_px.is_finite() && self.sheet.tap_max_movement_px >= 0.0) {
            errors.push(format!(
                "sheet.tap_max_movement_px must be >= 0, got {}",
                self.sheet.tap_max_movement_px
            ));
        }
        if self.sheet.tap_max_movement_px >= self.sheet.drag_threshold_px {
            errors.push("sheet.tap_max_movement_px must be below sheet.drag_threshold_px".into());
        }

        if self.camera.focus_zoom > MAX_ZOOM {
            errors.push(format!(
                "camera.focus_zoom must be <= {MAX_ZOOM}, got {}",
                self.camera.focus_zoom
            ));
        }

        if self.markers.member_size_px == 0 || self.markers.location_size_px == 0 {
            errors.push("marker sizes must be > 0".into());
        }
        if self.markers.location_z_base >= self.markers.member_z_base {
            errors.push("markers.location_z_base must be below markers.member_z_base".into());
        }

        errors
    }

    /// Consume the config, failing if [`validate`](Self::validate) reports
    /// anything.
    pub fn validated(self) -> Result<Self, PolicyConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyConfigError::Invalid(errors))
        }
    }

    /// Build a [`SheetConfig`] from this policy.
    #[must_use]
    pub fn to_sheet_config(&self) -> SheetConfig {
        SheetConfig {
            drag_threshold_px: self.sheet.drag_threshold_px,
            tap_max_movement_px: self.sheet.tap_max_movement_px,
            tap_max_duration: Duration::from_millis(self.sheet.tap_max_duration_ms),
        }
    }

    /// Format as a JSONL line for structured logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"mapview-config-v1","provider":"{}","drag_threshold_px":{},"focus_zoom":{},"fit_padding_px":{},"follow_retries":{},"sdk_load_retries":{}}}"#,
            self.provider.as_str(),
            self.sheet.drag_threshold_px,
            self.camera.focus_zoom,
            self.camera.fit_padding_px,
            self.camera.follow_retry.max_retries,
            self.sdk_load.retry.max_retries,
        )
    }
}

/// Highest zoom level either provider accepts.
pub const MAX_ZOOM: u8 = 21;

// ---------------------------------------------------------------------------
// Sub-configs (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// Initial map camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPolicyConfig {
    /// Latitude of the initial center. Default: 37.5665 (Seoul City Hall).
    pub default_lat: f64,
    /// Longitude of the initial center. Default: 126.978.
    pub default_lng: f64,
    /// Initial zoom. Default: 12.
    pub default_zoom: u8,
}

impl Default for MapPolicyConfig {
    fn default() -> Self {
        Self {
            default_lat: 37.5665,
            default_lng: 126.978,
            default_zoom: 12,
        }
    }
}

/// Bottom-sheet thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetPolicyConfig {
    /// Minimum vertical drag (px) for a transition. Default: 30.
    pub drag_threshold_px: f64,
    /// Maximum movement (px) for a tap. Default: 10.
    pub tap_max_movement_px: f64,
    /// Maximum press duration (ms) for a tap. Default: 200.
    pub tap_max_duration_ms: u64,
}

impl Default for SheetPolicyConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            tap_max_movement_px: DEFAULT_TAP_MAX_MOVEMENT_PX,
            tap_max_duration_ms: DEFAULT_TAP_MAX_DURATION.as_millis() as u64,
        }
    }
}

/// Camera-follow policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPolicyConfig {
    /// Zoom applied when focusing a single selected item. Default: 16.
    pub focus_zoom: u8,
    /// Padding (px) around fitted bounds. Default: 60.
    pub fit_padding_px: u32,
    /// Deferral while the map has not reported idle. Default: 5 × 300ms.
    pub follow_retry: RetryPolicy,
}

impl Default for CameraPolicyConfig {
    fn default() -> Self {
        Self {
            focus_zoom: 16,
            fit_padding_px: 60,
            follow_retry: RetryPolicy::new(5, BackoffStrategy::Fixed { delay_ms: 300 }),
        }
    }
}

/// Map creation retry while the SDK namespace is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkLoadPolicyConfig {
    /// Default: 10 retries, linear from 200ms capped at 2s.
    pub retry: RetryPolicy,
}

impl Default for SdkLoadPolicyConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(
                10,
                BackoffStrategy::Linear {
                    base_ms: 200,
                    max_ms: 2000,
                },
            ),
        }
    }
}

/// Marker sizing and stacking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerPolicyConfig {
    /// Member marker edge length (px). Default: 48.
    pub member_size_px: u32,
    /// Location marker edge length (px). Default: 36.
    pub location_size_px: u32,
    /// Base z-index for member markers. Default: 100.
    pub member_z_base: i32,
    /// Base z-index for location markers. Default: 50.
    pub location_z_base: i32,
    /// Added to the base z-index of the highlighted marker. Default: 1000.
    pub highlight_z_boost: i32,
}

impl Default for MarkerPolicyConfig {
    fn default() -> Self {
        Self {
            member_size_px: 48,
            location_size_px: 36,
            member_z_base: 100,
            location_z_base: 50,
            highlight_z_boost: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn default_sheet_config_matches_core_constants() {
        assert_eq!(EngineConfig::default().to_sheet_config(), SheetConfig::default());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"provider":"naver","camera":{"focus_zoom":15}}"#,
        )
        .unwrap();
        assert_eq!(config.provider, ProviderKind::Naver);
        assert_eq!(config.camera.focus_zoom, 15);
        assert_eq!(config.camera.fit_padding_px, 60);
        assert_eq!(config.sheet, SheetPolicyConfig::default());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = EngineConfig::from_json_str("{provider:").unwrap_err();
        assert!(matches!(err, PolicyConfigError::Json(_)));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"provider":"bing"}"#).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = EngineConfig::default();
        config.sheet.drag_threshold_px = 0.0;
        config.map.default_lat = 0.0;
        config.map.default_lng = 0.0;
        config.camera.focus_zoom = 30;
        let errors = config.validate();
        assert_eq!(errors.len(), 4, "{errors:?}");

        let err = config.validated().unwrap_err();
        assert!(err.to_string().contains("camera.focus_zoom"));
    }

    #[test]
    fn tap_window_must_sit_inside_drag_threshold() {
        let mut config = EngineConfig::default();
        config.sheet.tap_max_movement_px = 40.0;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn json_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapview.json");
        std::fs::write(&path, r#"{"markers":{"member_size_px":56}}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.markers.member_size_px, 56);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::from_json_file("/nonexistent/mapview.json").unwrap_err();
        assert!(matches!(err, PolicyConfigError::Io(_)));
    }

    #[test]
    fn jsonl_mentions_provider() {
        let line = EngineConfig::default().to_jsonl();
        assert!(line.starts_with(r#"{"schema":"mapview-config-v1","provider":"google""#));
        assert!(serde_json::from_str::<serde_json::Value>(&line).is_ok());
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn toml_round_trip() {
        let config = EngineConfig::from_toml_str(
            r#"
            provider = "naver"

            [sheet]
            drag_threshold_px = 24.0

            [camera]
            follow_retry = { max_retries = 2, backoff = { kind = "linear", base_ms = 100, max_ms = 400 } }
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, ProviderKind::Naver);
        assert_eq!(config.sheet.drag_threshold_px, 24.0);
        assert_eq!(config.camera.follow_retry.max_retries, 2);
        assert_eq!(config.camera.focus_zoom, 16);
    }
}
