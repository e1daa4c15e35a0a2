#![forbid(unsafe_code)]

//! Naver Maps JavaScript API v3 dialect (`naver.maps`).
//!
//! Coordinates are `{x: lng, y: lat}` points, bounds are a `[sw, ne]` pair,
//! and padding is per side. Both icon and HTML markers are plain
//! `naver.maps.Marker`s; the icon object decides which.

use mapview_core::coordinate::{LatLngBounds, NormalizedCoordinate};
use mapview_runtime::config::ProviderKind;
use serde_json::{Value, json};

use crate::bridge::{SdkCall, SdkObjectId};
use crate::provider::{
    InfoWindowOptions, MapOptions, MarkerPrimitive, MarkerRenderSpec, MarkerVisual, PanOptions,
};
use crate::sdk_provider::{Dialect, SdkMapProvider, point_arg, size_arg};

/// Naver Maps dialect marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NaverDialect;

/// Naver Maps provider over a bridge.
pub type NaverProvider<B> = SdkMapProvider<NaverDialect, B>;

impl NaverDialect {
    fn point(lat: f64, lng: f64) -> Value {
        json!({ "x": lng, "y": lat })
    }

    fn icon(spec: &MarkerRenderSpec) -> Value {
        let size = size_arg(spec.size.width, spec.size.height);
        let anchor = point_arg(spec.anchor.x, spec.anchor.y);
        match &spec.visual {
            MarkerVisual::Icon { url } => json!({
                "url": url,
                "size": size,
                "scaledSize": size,
                "anchor": anchor,
            }),
            MarkerVisual::Html { content } => json!({
                "content": content,
                "size": size,
                "anchor": anchor,
            }),
        }
    }
}

impl Dialect for NaverDialect {
    const KIND: ProviderKind = ProviderKind::Naver;
    const NAMESPACE: &'static str = "naver.maps";
    const MAP_CLASS: &'static str = "naver.maps.Map";
    const INFO_WINDOW_CLASS: &'static str = "naver.maps.InfoWindow";
    const IDLE_EVENT: &'static str = "init";

    fn lat_lng(position: NormalizedCoordinate) -> Value {
        Self::point(position.lat(), position.lng())
    }

    fn map_args(container: &str, options: &MapOptions) -> Vec<Value> {
        vec![
            json!({ "$element": container }),
            json!({
                "center": Self::lat_lng(options.center),
                "zoom": options.zoom,
                "zoomControl": false,
                "mapDataControl": false,
                "scaleControl": false,
            }),
        ]
    }

    fn marker_class(_primitive: MarkerPrimitive) -> &'static str {
        "naver.maps.Marker"
    }

    fn marker_options(
        map: SdkObjectId,
        position: NormalizedCoordinate,
        spec: &MarkerRenderSpec,
    ) -> Value {
        json!({
            "map": map.to_arg(),
            "position": Self::lat_lng(position),
            "icon": Self::icon(spec),
            "zIndex": spec.z_index,
            "title": spec.title,
        })
    }

    fn marker_click_event(_primitive: MarkerPrimitive) -> &'static str {
        "click"
    }

    fn restyle_calls(marker: SdkObjectId, spec: &MarkerRenderSpec) -> Vec<SdkCall> {
        vec![
            SdkCall::invoke(marker, "setIcon", vec![Self::icon(spec)]),
            SdkCall::invoke(marker, "setZIndex", vec![json!(spec.z_index)]),
            SdkCall::invoke(marker, "setTitle", vec![json!(spec.title)]),
        ]
    }

    fn detach_call(marker: SdkObjectId, _primitive: MarkerPrimitive) -> SdkCall {
        SdkCall::invoke(marker, "setMap", vec![Value::Null])
    }

    fn pan_calls(map: SdkObjectId, position: NormalizedCoordinate, options: &PanOptions) -> Vec<SdkCall> {
        match options.zoom {
            // morph pans and zooms in one animation.
            Some(zoom) => vec![SdkCall::invoke(
                map,
                "morph",
                vec![Self::lat_lng(position), json!(zoom)],
            )],
            None => vec![SdkCall::invoke(map, "panTo", vec![Self::lat_lng(position)])],
        }
    }

    fn fit_bounds_args(bounds: &LatLngBounds, padding_px: u32) -> Vec<Value> {
        let (south, west) = bounds.south_west();
        let (north, east) = bounds.north_east();
        vec![
            json!([Self::point(south, west), Self::point(north, east)]),
            json!({
                "top": padding_px,
                "right": padding_px,
                "bottom": padding_px,
                "left": padding_px,
            }),
        ]
    }

    fn info_window_options(content: &str, options: &InfoWindowOptions) -> Value {
        let mut value = json!({
            "content": content,
            "borderWidth": 0,
            "backgroundColor": "transparent",
            "disableAnchor": true,
            "pixelOffset": { "x": 0, "y": -i64::from(options.offset_y) },
        });
        if let Some(max_width) = options.max_width {
            value["maxWidth"] = json!(max_width);
        }
        value
    }

    fn open_info_window_args(map: SdkObjectId, anchor: SdkObjectId) -> Vec<Value> {
        vec![map.to_arg(), anchor.to_arg()]
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

    #[test]
    fn coordinates_are_x_lng_y_lat() {
        assert_eq!(
            NaverDialect::lat_lng(coord(37.56, 127.0)),
            json!({"x": 127.0, "y": 37.56})
        );
    }

    #[test]
    fn bounds_are_corner_pair_with_side_padding() {
        let bounds = LatLngBounds::from_coordinates(&[coord(37.5, 126.9), coord(37.6, 127.1)])
            .unwrap();
        let args = NaverDialect::fit_bounds_args(&bounds, 60);
        assert_eq!(
            args[0],
            json!([{"x": 126.9, "y": 37.5}, {"x": 127.1, "y": 37.6}])
        );
        assert_eq!(
            args[1],
            json!({"top": 60, "right": 60, "bottom": 60, "left": 60})
        );
    }

    #[test]
    fn html_marker_uses_icon_content() {
        let spec = MarkerRenderSpec {
            visual: MarkerVisual::Html {
                content: "<div>Lee</div>".into(),
            },
            size: PixelSize::square(48),
            anchor: PixelPoint { x: 24, y: 48 },
            z_index: 1100,
            title: "Lee".into(),
            click_token: Some("mv-cb-3".into()),
        };
        let options = NaverDialect::marker_options(SdkObjectId::from_raw(4), coord(37.5, 127.0), &spec);
        assert_eq!(options["icon"]["content"], json!("<div>Lee</div>"));
        assert_eq!(options["icon"]["anchor"], json!({"x": 24, "y": 48}));
        assert_eq!(options["zIndex"], json!(1100));
    }

    #[test]
    fn focus_pan_morphs() {
        let calls = NaverDialect::pan_calls(
            SdkObjectId::from_raw(1),
            coord(37.56, 127.0),
            &PanOptions { zoom: Some(16) },
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].label(), "morph");
    }

    #[test]
    fn single_point_fit_morphs_instead() {
        let mut provider = NaverProvider::new(RecordingBridge::with_namespace("naver.maps"));
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let map = provider.create_map("map", &options).unwrap();
        provider
            .fit_bounds(
                map,
                &[coord(37.5, 127.0), coord(37.5, 127.0)],
                &FitOptions {
                    padding_px: 60,
                    single_point_zoom: Some(16),
                },
            )
            .unwrap();
        assert!(provider.bridge().invocations("fitBounds").is_empty());
        assert_eq!(
            provider.bridge().invocations("morph"),
            vec![&[json!({"x": 127.0, "y": 37.5}), json!(16)][..]]
        );
    }

    #[test]
    fn info_window_opens_with_positional_args() {
        assert_eq!(
            NaverDialect::open_info_window_args(SdkObjectId::from_raw(1), SdkObjectId::from_raw(2)),
            vec![json!({"$ref": 1}), json!({"$ref": 2})]
        );
    }
}
