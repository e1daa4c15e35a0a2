#![forbid(unsafe_code)]

//! Google Maps JavaScript API dialect (`google.maps`).
//!
//! Coordinates are `{lat, lng}` literals, bounds are
//! `{south, west, north, east}`, and padding is a single number. HTML
//! markers use `marker.AdvancedMarkerElement`, whose properties are set
//! directly; icon markers use the classic `Marker` with setter methods.

use mapview_core::coordinate::{LatLngBounds, NormalizedCoordinate};
use mapview_runtime::config::ProviderKind;
use serde_json::{Value, json};

use crate::bridge::{SdkCall, SdkObjectId};
use crate::provider::{
    InfoWindowOptions, MapOptions, MarkerPrimitive, MarkerRenderSpec, MarkerVisual, PanOptions,
};
use crate::sdk_provider::{Dialect, SdkMapProvider, point_arg, size_arg};

const MARKER_CLASS: &str = "google.maps.Marker";
const ADVANCED_MARKER_CLASS: &str = "google.maps.marker.AdvancedMarkerElement";

/// Google Maps dialect marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GoogleDialect;

/// Google Maps provider over a bridge.
pub type GoogleProvider<B> = SdkMapProvider<GoogleDialect, B>;

impl GoogleDialect {
    fn icon(spec: &MarkerRenderSpec, url: &str) -> Value {
        json!({
            "url": url,
            "scaledSize": size_arg(spec.size.width, spec.size.height),
            "anchor": point_arg(spec.anchor.x, spec.anchor.y),
        })
    }
}

impl Dialect for GoogleDialect {
    const KIND: ProviderKind = ProviderKind::Google;
    const NAMESPACE: &'static str = "google.maps";
    const MAP_CLASS: &'static str = "google.maps.Map";
    const INFO_WINDOW_CLASS: &'static str = "google.maps.InfoWindow";
    const IDLE_EVENT: &'static str = "idle";

    fn lat_lng(position: NormalizedCoordinate) -> Value {
        json!({ "lat": position.lat(), "lng": position.lng() })
    }

    fn map_args(container: &str, options: &MapOptions) -> Vec<Value> {
        vec![
            json!({ "$element": container }),
            json!({
                "center": Self::lat_lng(options.center),
                "zoom": options.zoom,
                "disableDefaultUI": true,
                "clickableIcons": false,
                "gestureHandling": "greedy",
            }),
        ]
    }

    fn marker_class(primitive: MarkerPrimitive) -> &'static str {
        match primitive {
            MarkerPrimitive::Icon => MARKER_CLASS,
            MarkerPrimitive::Html => ADVANCED_MARKER_CLASS,
        }
    }

    fn marker_options(
        map: SdkObjectId,
        position: NormalizedCoordinate,
        spec: &MarkerRenderSpec,
    ) -> Value {
        match &spec.visual {
            MarkerVisual::Icon { url } => json!({
                "map": map.to_arg(),
                "position": Self::lat_lng(position),
                "icon": Self::icon(spec, url),
                "zIndex": spec.z_index,
                "title": spec.title,
            }),
            MarkerVisual::Html { content } => json!({
                "map": map.to_arg(),
                "position": Self::lat_lng(position),
                "content": { "$html": content },
                "zIndex": spec.z_index,
                "title": spec.title,
            }),
        }
    }

    fn marker_click_event(primitive: MarkerPrimitive) -> &'static str {
        match primitive {
            MarkerPrimitive::Icon => "click",
            MarkerPrimitive::Html => "gmp-click",
        }
    }

    fn restyle_calls(marker: SdkObjectId, spec: &MarkerRenderSpec) -> Vec<SdkCall> {
        match &spec.visual {
            MarkerVisual::Icon { url } => vec![
                SdkCall::invoke(marker, "setIcon", vec![Self::icon(spec, url)]),
                SdkCall::invoke(marker, "setZIndex", vec![json!(spec.z_index)]),
                SdkCall::invoke(marker, "setTitle", vec![json!(spec.title)]),
            ],
            MarkerVisual::Html { content } => vec![
                SdkCall::set(marker, "content", json!({ "$html": content })),
                SdkCall::set(marker, "zIndex", json!(spec.z_index)),
                SdkCall::set(marker, "title", json!(spec.title)),
            ],
        }
    }

    fn detach_call(marker: SdkObjectId, primitive: MarkerPrimitive) -> SdkCall {
        match primitive {
            MarkerPrimitive::Icon => SdkCall::invoke(marker, "setMap", vec![Value::Null]),
            MarkerPrimitive::Html => SdkCall::set(marker, "map", Value::Null),
        }
    }

    fn pan_calls(map: SdkObjectId, position: NormalizedCoordinate, options: &PanOptions) -> Vec<SdkCall> {
        let mut calls = vec![SdkCall::invoke(map, "panTo", vec![Self::lat_lng(position)])];
        if let Some(zoom) = options.zoom {
            calls.push(SdkCall::invoke(map, "setZoom", vec![json!(zoom)]));
        }
        calls
    }

    fn fit_bounds_args(bounds: &LatLngBounds, padding_px: u32) -> Vec<Value> {
        vec![
            json!({
                "south": bounds.south,
                "west": bounds.west,
                "north": bounds.north,
                "east": bounds.east,
            }),
            json!(padding_px),
        ]
    }

    fn info_window_options(content: &str, options: &InfoWindowOptions) -> Value {
        let mut value = json!({
            "content": { "$html": content },
            "pixelOffset": { "width": 0, "height": -i64::from(options.offset_y) },
            "headerDisabled": true,
        });
        if let Some(max_width) = options.max_width {
            value["maxWidth"] = json!(max_width);
        }
        value
    }

    fn open_info_window_args(map: SdkObjectId, anchor: SdkObjectId) -> Vec<Value> {
        vec![json!({ "map": map.to_arg(), "anchor": anchor.to_arg() })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingBridge;
    use crate::provider::{FitOptions, MapProvider, PixelPoint, PixelSize};
    use mapview_runtime::config::MapPolicyConfig;
    use pretty_assertions::assert_eq;

    fn coord(lat: f64, lng: f64) -> NormalizedCoordinate {
        NormalizedCoordinate::new(lat, lng).unwrap()
    }

    fn html_spec() -> MarkerRenderSpec {
        MarkerRenderSpec {
            visual: MarkerVisual::Html {
                content: "<div>Kim</div>".into(),
            },
            size: PixelSize::square(48),
            anchor: PixelPoint { x: 24, y: 48 },
            z_index: 100,
            title: "Kim".into(),
            click_token: None,
        }
    }

    #[test]
    fn pan_uses_lat_lng_literal_then_zoom() {
        let calls = GoogleDialect::pan_calls(
            SdkObjectId::from_raw(1),
            coord(37.56, 127.0),
            &PanOptions { zoom: Some(16) },
        );
        assert_eq!(
            calls,
            vec![
                SdkCall::invoke(
                    SdkObjectId::from_raw(1),
                    "panTo",
                    vec![json!({"lat": 37.56, "lng": 127.0})]
                ),
                SdkCall::invoke(SdkObjectId::from_raw(1), "setZoom", vec![json!(16)]),
            ]
        );
    }

    #[test]
    fn bounds_are_edge_literal_with_numeric_padding() {
        let bounds = LatLngBounds::from_coordinates(&[coord(37.5, 126.9), coord(37.6, 127.1)])
            .unwrap();
        assert_eq!(
            GoogleDialect::fit_bounds_args(&bounds, 60),
            vec![
                json!({"south": 37.5, "west": 126.9, "north": 37.6, "east": 127.1}),
                json!(60)
            ]
        );
    }

    #[test]
    fn html_markers_use_advanced_element() {
        let mut provider = GoogleProvider::new(RecordingBridge::with_namespace("google.maps"));
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let map = provider.create_map("map", &options).unwrap();
        let marker = provider
            .create_marker(map, coord(37.5, 127.0), &html_spec())
            .unwrap();
        assert_eq!(provider.bridge().live_count(ADVANCED_MARKER_CLASS), 1);

        provider.remove_marker(marker).unwrap();
        assert!(provider.bridge().calls().iter().any(|call| matches!(
            call,
            SdkCall::SetProperty { property, value, .. } if property == "map" && value.is_null()
        )));
    }

    #[test]
    fn fit_bounds_reaches_the_map() {
        let mut provider = GoogleProvider::new(RecordingBridge::with_namespace("google.maps"));
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let map = provider.create_map("map", &options).unwrap();
        provider
            .fit_bounds(
                map,
                &[coord(37.5, 126.9), coord(37.6, 127.1), coord(37.55, 127.0)],
                &FitOptions {
                    padding_px: 60,
                    single_point_zoom: Some(16),
                },
            )
            .unwrap();
        let fits = provider.bridge().invocations("fitBounds");
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0][1], json!(60));
    }

    #[test]
    fn info_window_opens_on_anchor() {
        assert_eq!(
            GoogleDialect::open_info_window_args(SdkObjectId::from_raw(1), SdkObjectId::from_raw(2)),
            vec![json!({"map": {"$ref": 1}, "anchor": {"$ref": 2}})]
        );
        let options = GoogleDialect::info_window_options(
            "<p>x</p>",
            &InfoWindowOptions {
                max_width: Some(240),
                offset_y: 8,
            },
        );
        assert_eq!(options["maxWidth"], json!(240));
        assert_eq!(options["pixelOffset"], json!({"width": 0, "height": -8}));
    }
}
