#![forbid(unsafe_code)]

//! Host-driven map view engine.
//!
//! # Role in the map view engine
//! `mapview-web` turns host data and input into map SDK calls and engine
//! events. It never touches JavaScript directly: every SDK interaction goes
//! through an [`SdkBridge`] implemented by the host (a `wasm-bindgen` shim in
//! a browser, [`RecordingBridge`] in tests).
//!
//! # Primary responsibilities
//! - **Providers**: [`MapProvider`] with Google ([`GoogleProvider`]) and Naver
//!   ([`NaverProvider`]) dialects, chosen once through [`AnyProvider`].
//! - **Markers**: [`MarkerLifecycleManager`] diffs snapshots against live
//!   markers and keeps a single info window open.
//! - **Sheet input**: [`SheetPointerAdapter`] maps DOM pointer lifecycle to
//!   the bottom-sheet controller with explicit capture commands.
//! - **Composition**: [`ViewCompositionCoordinator`] gates readiness, follows
//!   the selection with the camera, and queues [`EngineEvent`]s.
//!
//! # Host contract
//! The host calls in with snapshots, readiness signals, pointer input, timer
//! firings and callback tokens, then drains events with
//! [`ViewCompositionCoordinator::drain_events`]. Nothing here blocks or
//! spawns.

pub mod bridge;
pub mod callbacks;
pub mod coordinator;
pub mod google;
pub mod markers;
pub mod naver;
pub mod provider;
pub mod sdk_provider;
pub mod sheet_pointer;

pub use bridge::{RecordingBridge, SdkBridge, SdkCall, SdkError, SdkObjectId};
pub use callbacks::{CallbackAction, CallbackRegistry};
pub use coordinator::{
    EngineEvent, GeoFix, GeolocationError, OverlayVisibility, ViewCompositionCoordinator,
    Visibility, overlay_visibility,
};
pub use google::{GoogleDialect, GoogleProvider};
pub use markers::{
    CameraPlan, MarkerHandle, MarkerKey, MarkerLifecycleManager, MarkerSource, ReconcileReport,
    camera_plan,
};
pub use naver::{NaverDialect, NaverProvider};
pub use provider::{
    AnyProvider, FitOptions, InfoWindowHandle, InfoWindowOptions, MapHandle, MapOptions,
    MapProvider, MarkerPrimitive, MarkerRenderSpec, MarkerVisual, PanOptions, PixelPoint,
    PixelSize, ProviderError, ProviderMarkerId,
};
pub use sdk_provider::{Dialect, MAP_IDLE_TOKEN, SdkMapProvider};
pub use sheet_pointer::{
    SheetCaptureCommand, SheetPointerAdapter, SheetPointerDispatch, SheetPointerIgnoredReason,
    SheetPointerInput, SheetPointerLogEntry, SheetPointerLogOutcome, SheetPointerPhase,
};
