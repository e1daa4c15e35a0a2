#![forbid(unsafe_code)]

//! Provider-agnostic map capability surface.
//!
//! [`MapProvider`] is the only way the engine touches a map. It is
//! implemented once per SDK dialect (see [`crate::google`] and
//! [`crate::naver`]) and selected once through [`AnyProvider`]. Handles carry
//! the [`ProviderKind`] that minted them; passing a handle to the other
//! provider is rejected with [`ProviderError::ForeignHandle`].

use mapview_core::coordinate::NormalizedCoordinate;
use mapview_runtime::config::{MapPolicyConfig, ProviderKind};

use crate::bridge::{SdkBridge, SdkError, SdkObjectId};
use crate::google::GoogleProvider;
use crate::naver::NaverProvider;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

macro_rules! provider_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            provider: ProviderKind,
            object: SdkObjectId,
        }

        impl $name {
            pub(crate) const fn new(provider: ProviderKind, object: SdkObjectId) -> Self {
                Self { provider, object }
            }

            /// Provider that created this handle.
            #[must_use]
            pub const fn provider(&self) -> ProviderKind {
                self.provider
            }

            /// Underlying SDK object.
            #[must_use]
            pub const fn object(&self) -> SdkObjectId {
                self.object
            }
        }
    };
}

provider_handle!(
    /// A created map instance.
    MapHandle
);
provider_handle!(
    /// A marker living on some map.
    ProviderMarkerId
);
provider_handle!(
    /// An info window, open or closed.
    InfoWindowHandle
);

// ---------------------------------------------------------------------------
// Options and render spec
// ---------------------------------------------------------------------------

/// Initial camera of a new map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOptions {
    pub center: NormalizedCoordinate,
    pub zoom: u8,
}

impl MapOptions {
    /// Build from configuration, rejecting an unusable default center.
    pub fn from_policy(policy: &MapPolicyConfig) -> Result<Self, ProviderError> {
        let center = NormalizedCoordinate::new(policy.default_lat, policy.default_lng)
            .ok_or(ProviderError::InvalidCoordinate)?;
        Ok(Self {
            center,
            zoom: policy.default_zoom,
        })
    }
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[must_use]
    pub const fn square(edge: u32) -> Self {
        Self {
            width: edge,
            height: edge,
        }
    }
}

/// Offset from the marker's top-left corner to the point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// What a marker looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerVisual {
    /// A bitmap icon.
    Icon { url: String },
    /// Custom DOM content. The markup is already escaped.
    Html { content: String },
}

impl MarkerVisual {
    #[must_use]
    pub const fn primitive(&self) -> MarkerPrimitive {
        match self {
            Self::Icon { .. } => MarkerPrimitive::Icon,
            Self::Html { .. } => MarkerPrimitive::Html,
        }
    }
}

/// SDK primitive backing a marker. Fixed for the marker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerPrimitive {
    Icon,
    Html,
}

/// Provider-agnostic marker description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRenderSpec {
    pub visual: MarkerVisual,
    pub size: PixelSize,
    pub anchor: PixelPoint,
    pub z_index: i32,
    pub title: String,
    /// Reported back by the host when the marker is clicked.
    pub click_token: Option<String>,
}

/// Camera options for [`MapProvider::pan_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanOptions {
    /// Zoom to apply after panning; `None` keeps the current zoom.
    pub zoom: Option<u8>,
}

/// Camera options for [`MapProvider::fit_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitOptions {
    /// Uniform padding on every side.
    pub padding_px: u32,
    /// Zoom used when the fit degrades to a pan.
    pub single_point_zoom: Option<u8>,
}

/// Info window presentation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoWindowOptions {
    pub max_width: Option<u32>,
    /// Vertical offset above the anchor, in pixels.
    pub offset_y: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a provider operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The SDK namespace is not loaded yet. Retryable.
    #[error("map SDK is not loaded")]
    NotReady,
    #[error("handle belongs to the {found} provider, this adapter is {expected}")]
    ForeignHandle {
        expected: ProviderKind,
        found: ProviderKind,
    },
    #[error("map handle is unknown to this adapter")]
    UnknownMap,
    #[error("marker is not alive on this adapter")]
    UnknownMarker,
    /// Restyle asked an icon marker to become HTML or the reverse.
    #[error("marker cannot switch between icon and HTML content in place")]
    PrimitiveMismatch,
    #[error("coordinate is not finite or is (0, 0)")]
    InvalidCoordinate,
    #[error(transparent)]
    Sdk(#[from] SdkError),
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Uniform map capability surface.
pub trait MapProvider {
    fn kind(&self) -> ProviderKind;

    /// Whether the SDK namespace is loaded.
    fn is_loaded(&self) -> bool;

    /// Create a map in the DOM element `container`. Idempotent per container.
    fn create_map(&mut self, container: &str, options: &MapOptions)
    -> Result<MapHandle, ProviderError>;

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        spec: &MarkerRenderSpec,
    ) -> Result<ProviderMarkerId, ProviderError>;

    /// Detach and release a marker. Removing an already-removed marker is a
    /// no-op.
    fn remove_marker(&mut self, marker: ProviderMarkerId) -> Result<(), ProviderError>;

    /// Update icon/content, z-index and title in place.
    fn restyle_marker(
        &mut self,
        marker: ProviderMarkerId,
        spec: &MarkerRenderSpec,
    ) -> Result<(), ProviderError>;

    fn pan_to(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        options: &PanOptions,
    ) -> Result<(), ProviderError>;

    /// Fit the camera to `positions`. One distinct position pans instead;
    /// none is a no-op.
    fn fit_bounds(
        &mut self,
        map: MapHandle,
        positions: &[NormalizedCoordinate],
        options: &FitOptions,
    ) -> Result<(), ProviderError>;

    fn create_info_window(
        &mut self,
        content: &str,
        options: &InfoWindowOptions,
    ) -> Result<InfoWindowHandle, ProviderError>;

    fn open_info_window(
        &mut self,
        window: InfoWindowHandle,
        map: MapHandle,
        anchor: ProviderMarkerId,
    ) -> Result<(), ProviderError>;

    /// Close and release an info window. Closing twice is a no-op.
    fn close_info_window(&mut self, window: InfoWindowHandle) -> Result<(), ProviderError>;
}

// ---------------------------------------------------------------------------
// Runtime selection
// ---------------------------------------------------------------------------

/// The configured provider, chosen once at construction.
#[derive(Debug)]
pub enum AnyProvider<B> {
    Google(GoogleProvider<B>),
    Naver(NaverProvider<B>),
}

impl<B: SdkBridge> AnyProvider<B> {
    #[must_use]
    pub fn new(kind: ProviderKind, bridge: B) -> Self {
        match kind {
            ProviderKind::Google => Self::Google(GoogleProvider::new(bridge)),
            ProviderKind::Naver => Self::Naver(NaverProvider::new(bridge)),
        }
    }

    #[must_use]
    pub fn bridge(&self) -> &B {
        match self {
            Self::Google(p) => p.bridge(),
            Self::Naver(p) => p.bridge(),
        }
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        match self {
            Self::Google(p) => p.bridge_mut(),
            Self::Naver(p) => p.bridge_mut(),
        }
    }
}

macro_rules! delegate {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            AnyProvider::Google($p) => $call,
            AnyProvider::Naver($p) => $call,
        }
    };
}

impl<B: SdkBridge> MapProvider for AnyProvider<B> {
    fn kind(&self) -> ProviderKind {
        delegate!(self, p => p.kind())
    }

    fn is_loaded(&self) -> bool {
        delegate!(self, p => p.is_loaded())
    }

    fn create_map(
        &mut self,
        container: &str,
        options: &MapOptions,
    ) -> Result<MapHandle, ProviderError> {
        delegate!(self, p => p.create_map(container, options))
    }

    fn create_marker(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        spec: &MarkerRenderSpec,
    ) -> Result<ProviderMarkerId, ProviderError> {
        delegate!(self, p => p.create_marker(map, position, spec))
    }

    fn remove_marker(&mut self, marker: ProviderMarkerId) -> Result<(), ProviderError> {
        delegate!(self, p => p.remove_marker(marker))
    }

    fn restyle_marker(
        &mut self,
        marker: ProviderMarkerId,
        spec: &MarkerRenderSpec,
    ) -> Result<(), ProviderError> {
        delegate!(self, p => p.restyle_marker(marker, spec))
    }

    fn pan_to(
        &mut self,
        map: MapHandle,
        position: NormalizedCoordinate,
        options: &PanOptions,
    ) -> Result<(), ProviderError> {
        delegate!(self, p => p.pan_to(map, position, options))
    }

    fn fit_bounds(
        &mut self,
        map: MapHandle,
        positions: &[NormalizedCoordinate],
        options: &FitOptions,
    ) -> Result<(), ProviderError> {
        delegate!(self, p => p.fit_bounds(map, positions, options))
    }

    fn create_info_window(
        &mut self,
        content: &str,
        options: &InfoWindowOptions,
    ) -> Result<InfoWindowHandle, ProviderError> {
        delegate!(self, p => p.create_info_window(content, options))
    }

    fn open_info_window(
        &mut self,
        window: InfoWindowHandle,
        map: MapHandle,
        anchor: ProviderMarkerId,
    ) -> Result<(), ProviderError> {
        delegate!(self, p => p.open_info_window(window, map, anchor))
    }

    fn close_info_window(&mut self, window: InfoWindowHandle) -> Result<(), ProviderError> {
        delegate!(self, p => p.close_info_window(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingBridge;

    #[test]
    fn map_options_reject_origin_center() {
        let policy = MapPolicyConfig {
            default_lat: 0.0,
            default_lng: 0.0,
            default_zoom: 12,
        };
        assert_eq!(
            MapOptions::from_policy(&policy),
            Err(ProviderError::InvalidCoordinate)
        );
        assert!(MapOptions::from_policy(&MapPolicyConfig::default()).is_ok());
    }

    #[test]
    fn any_provider_follows_configured_kind() {
        let google = AnyProvider::new(ProviderKind::Google, RecordingBridge::new());
        let naver = AnyProvider::new(ProviderKind::Naver, RecordingBridge::new());
        assert_eq!(google.kind(), ProviderKind::Google);
        assert_eq!(naver.kind(), ProviderKind::Naver);
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut google = AnyProvider::new(
            ProviderKind::Google,
            RecordingBridge::with_namespace("google.maps"),
        );
        let mut naver = AnyProvider::new(
            ProviderKind::Naver,
            RecordingBridge::with_namespace("naver.maps"),
        );
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        let naver_map = naver.create_map("map", &options).unwrap();
        let err = google
            .pan_to(naver_map, options.center, &PanOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::ForeignHandle {
                expected: ProviderKind::Google,
                found: ProviderKind::Naver,
            }
        );
    }

    #[test]
    fn unloaded_namespace_is_not_ready() {
        let mut naver = AnyProvider::new(ProviderKind::Naver, RecordingBridge::new());
        let options = MapOptions::from_policy(&MapPolicyConfig::default()).unwrap();
        assert!(!naver.is_loaded());
        assert_eq!(naver.create_map("map", &options), Err(ProviderError::NotReady));
        naver.bridge_mut().load_namespace("naver.maps");
        assert!(naver.create_map("map", &options).is_ok());
    }
}
