#![forbid(unsafe_code)]

//! [`MapProvider`] over an [`SdkBridge`], parameterised by SDK dialect.
//!
//! Both supported SDKs share the same object model (a map, markers attached
//! to it, info windows opened on a marker) and differ only in class names,
//! option shapes, and a few method names. [`Dialect`] captures those
//! differences as pure translation functions; [`SdkMapProvider`] owns the
//! bookkeeping (idempotent map creation, live marker set, handle checks).

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use mapview_core::coordinate::{LatLngBounds, NormalizedCoordinate};
use mapview_runtime::config::ProviderKind;
use serde_json::Value;

use crate::bridge::{SdkBridge, SdkCall, SdkError, SdkObjectId};
use crate::provider::{
    FitOptions, InfoWindowHandle, InfoWindowOptions, MapHandle, MapOptions, MapProvider,
    MarkerPrimitive, MarkerRenderSpec, PanOptions, ProviderError, ProviderMarkerId,
};

/// Token the host reports when a map finishes its first render.
pub const MAP_IDLE_TOKEN: &str = "mv-map-idle";

/// Per-SDK translation of provider-agnostic requests into SDK calls.
pub trait Dialect {
    const KIND: ProviderKind;
    /// Global namespace that must exist before any call.
    const NAMESPACE: &'static str;
    const MAP_CLASS: &'static str;
    const INFO_WINDOW_CLASS: &'static str;
    /// Map event meaning "rendered and ready for camera moves".
    const IDLE_EVENT: &'static str;

    /// SDK literal for a coordinate.
    fn lat_lng(position: NormalizedCoordinate) -> Value;

    /// Constructor arguments for a map.
    fn map_args(container: &str, options: &MapOptions) -> Vec<Value>;

    /// Constructor class for a marker primitive.
    fn marker_class(primitive: MarkerPrimitive) -> &'static str;

    /// Constructor options for a marker.
    fn marker_options(map: SdkObjectId, position: NormalizedCoordinate, spec: &MarkerRenderSpec)
    -> Value;

    /// Event fired when a marker is clicked.
    fn marker_click_event(primitive: MarkerPrimitive) -> &'static str;

    /// Calls that update a live marker's look in place.
    fn restyle_calls(marker: SdkObjectId, spec: &MarkerRenderSpec) -> Vec<SdkCall>;

    /// Call that detaches a marker from its map.
    fn detach_call(marker: SdkObjectId, primitive: MarkerPrimitive) -> SdkCall;

    /// Calls that move the camera to `position`.
    fn pan_calls(map: SdkObjectId, position: NormalizedCoordinate, options: &PanOptions)
    -> Vec<SdkCall>;

    /// Arguments for `fitBounds`.
    fn fit_bounds_args(bounds: &LatLngBounds, padding_px: u32) -> Vec<Value>;

    fn info_window_options(content: &str, options: &InfoWindowOptions) -> Value;

    /// Arguments for `InfoWindow.open`.
    fn open_info_window_args(map: SdkObjectId, anchor: SdkObjectId) -> Vec<Value>;
}

/// Generic SDK-backed provider.
pub struct SdkMapProvider<D, B> {
    bridge: B,
    maps: HashMap<String, MapHandle>,
    markers: HashMap<SdkObjectId, MarkerPrimitive>,
    windows: HashSet<SdkObjectId>,
    dialect: PhantomData<D>,
}

impl<D, B: std::fmt::Debug> std::fmt::Debug for SdkMapProvider<D, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMapProvider")
            .field("bridge", &self.bridge)
            .field("maps", &self.maps.len())
            .field("markers", &self.markers.len())
            .field("windows", &self.windows.len())
            .finish()
    }
}

impl<D: Dialect, B: SdkBridge> SdkMapProvider<D, B> {
    #[must_use]
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            maps: HashMap::new(),
            markers: HashMap::new(),
            windows: HashSet::new(),
            dialect: PhantomData,
        }
    }

    #[must_use]
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// Markers currently alive on any map.
    #[must_use]
    pub fn live_marker_count(&self) -> usize {
        self.markers.len()
    }

    fn ensure_loaded(&self) -> Result<(), ProviderError> {
        if self.bridge.namespace_loaded(D::NAMESPACE) {
            Ok(())
        } else {
            Err(ProviderError::NotReady)
        }
    }

    fn check_kind(found: ProviderKind) -> Result<(), ProviderError> {
        if found == D::KIND {
            Ok(())
        } else {
            Err(ProviderError::ForeignHandle {
                expected: D::KIND,
                found,
            })
        }
    }

    fn check_map(&self, map: MapHandle) -> Result<(), ProviderError> {
        Self::check_kind(map.provider())?;
        if self.maps.values().any(|known| *known == map) {
            Ok(())
        } else {
            Err(ProviderError::UnknownMap)
        }
    }

    fn construct(&mut self, class: &str, args: Vec<Value>) -> Result<SdkObjectId, ProviderError> {
        self.bridge
            .invoke(SdkCall::construct(class, args))?
            .ok_or_else(|| ProviderError::Sdk(SdkError::MissingObject(class.to_owned())))
    }

    fn run(&mut self, calls: Vec<SdkCall>) -> Result<(), ProviderError> {
        for call in calls {
            self.bridge.invoke(call)?;
        }
        Ok(())
    }
}

impl<D: Dialect, B: SdkBridge> MapProvider for SdkMapProvider<D, B> {
    fn kind(&self) -> ProviderKind {
        D::KIND
    }

    fn is_loaded(&self) -> bool {
        self.bridge.namespace_loaded(D::NAMESPACE)
    }

    fn create_map(
        &mut self,
        container: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, ProviderError> {
        if let Some(existing) = self.maps.get(container) {
            return Ok(*existing);
        }
        self.ensure_loaded()?;
        let object = self.construct(D::MAP_CLASS, D::map_args(container, options))?;
        self.bridge.invoke(SdkCall::Listen {
            target: object,
            event: D::IDLE_EVENT.to_owned(),
            token: MAP_IDLE_TOKEN.to_owned(),
        })?;
        let handle = MapHandle::new(D::KIND, object);
        self.maps.insert(container.to_owned(), handle);
        tracing::debug!(provider = D::KIND.as_str(), container, "map created");
        Ok(handle)
    }

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        spec: &MarkerRenderSpec,
    ) -> Result<ProviderMarkerId, ProviderError> {
        self.ensure_loaded()?;
        self.check_map(map)?;
        let primitive = spec.visual.primitive();
        let class = D::marker_class(primitive);
        let object = self.construct(class, vec![D::marker_options(map.object(), position, spec)])?;
        if let Some(token) = &spec.click_token {
            let listen = SdkCall::Listen {
                target: object,
                event: D::marker_click_event(primitive).to_owned(),
                token: token.clone(),
            };
            if let Err(err) = self.bridge.invoke(listen) {
                // Half-built marker: take it back off the map.
                let _ = self.bridge.invoke(D::detach_call(object, primitive));
                let _ = self.bridge.invoke(SdkCall::Release { target: object });
                return Err(err.into());
            }
        }
        self.markers.insert(object, primitive);
        Ok(ProviderMarkerId::new(D::KIND, object))
    }

    fn remove_marker(&mut self, marker: ProviderMarkerId) -> Result<(), ProviderError> {
        Self::check_kind(marker.provider())?;
        let Some(primitive) = self.markers.remove(&marker.object()) else {
            return Ok(());
        };
        self.bridge.invoke(D::detach_call(marker.object(), primitive))?;
        self.bridge.invoke(SdkCall::Release {
            target: marker.object(),
        })?;
        Ok(())
    }

    fn restyle_marker(
        &mut self,
        marker: ProviderMarkerId,
        spec: &MarkerRenderSpec,
    ) -> Result<(), ProviderError> {
        self.ensure_loaded()?;
        Self::check_kind(marker.provider())?;
        match self.markers.get(&marker.object()) {
            None => return Err(ProviderError::UnknownMarker),
            Some(primitive) if *primitive != spec.visual.primitive() => {
                return Err(ProviderError::PrimitiveMismatch);
            }
            Some(_) => {}
        }
        self.run(D::restyle_calls(marker.object(), spec))
    }

    fn pan_to(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        options: &PanOptions,
    ) -> Result<(), ProviderError> {
        self.ensure_loaded()?;
        self.check_map(map)?;
        self.run(D::pan_calls(map.object(), position, options))
    }

    fn fit_bounds(
        &mut self,
        map: MapHandle,
        positions: &[NormalizedCoordinate],
        options: &FitOptions,
    ) -> Result<(), ProviderError> {
        self.ensure_loaded()?;
        self.check_map(map)?;
        let Some(bounds) = LatLngBounds::from_coordinates(positions) else {
            return Ok(());
        };
        if bounds.is_point() {
            let (lat, lng) = bounds.south_west();
            let center = NormalizedCoordinate::new(lat, lng).ok_or(ProviderError::InvalidCoordinate)?;
            let pan = PanOptions {
                zoom: options.single_point_zoom,
            };
            return self.run(D::pan_calls(map.object(), center, &pan));
        }
        self.bridge.invoke(SdkCall::invoke(
            map.object(),
            "fitBounds",
            D::fit_bounds_args(&bounds, options.padding_px),
        ))?;
        Ok(())
    }

    fn create_info_window(
        &mut self,
        content: &str,
        options: &InfoWindowOptions,
    ) -> Result<InfoWindowHandle, ProviderError> {
        self.ensure_loaded()?;
        let object = self.construct(
            D::INFO_WINDOW_CLASS,
            vec![D::info_window_options(content, options)],
        )?;
        self.windows.insert(object);
        Ok(InfoWindowHandle::new(D::KIND, object))
    }

    fn open_info_window(
        &mut self,
        window: InfoWindowHandle,
        map: MapHandle,
        anchor: ProviderMarkerId,
    ) -> Result<(), ProviderError> {
        self.ensure_loaded()?;
        Self::check_kind(window.provider())?;
        Self::check_kind(anchor.provider())?;
        self.check_map(map)?;
        self.bridge.invoke(SdkCall::invoke(
            window.object(),
            "open",
            D::open_info_window_args(map.object(), anchor.object()),
        ))?;
        Ok(())
    }

    fn close_info_window(&mut self, window: InfoWindowHandle) -> Result<(), ProviderError> {
        Self::check_kind(window.provider())?;
        if !self.windows.remove(&window.object()) {
            return Ok(());
        }
        self.bridge
            .invoke(SdkCall::invoke(window.object(), "close", Vec::new()))?;
        self.bridge.invoke(SdkCall::Release {
            target: window.object(),
        })?;
        Ok(())
    }
}

/// JSON for a pixel size as both SDKs spell it.
pub(crate) fn size_arg(width: u32, height: u32) -> Value {
    serde_json::json!({ "width": width, "height": height })
}

/// JSON for a pixel point as both SDKs spell it.
pub(crate) fn point_arg(x: u32, y: u32) -> Value {
    serde_json::json!({ "x": x, "y": y })
}
