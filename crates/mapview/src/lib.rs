#![forbid(unsafe_code)]

//! Map view engine public facade.
//!
//! This crate provides the stable surface area for hosts. It re-exports the
//! common types from the internal crates, offers [`MapViewBuilder`] to wire a
//! configured provider into a coordinator, and a lightweight prelude.

// --- Core re-exports -------------------------------------------------------

pub use mapview_core::clock::{Clock, DeterministicClock, SystemClock};
pub use mapview_core::coordinate::{LatLngBounds, NormalizedCoordinate, is_valid_pair, normalize};
pub use mapview_core::event::{EventTarget, PointerButton, PointerSource};
pub use mapview_core::model::{
    GenderHint, MapItem, MarkerKind, MemberPosition, SavedLocation, select_location,
    select_member,
};
pub use mapview_core::sheet::{
    BottomSheetGestureController, BottomSheetState, GestureEvent, SheetConfig, SheetOutcome,
    SheetTransition,
};

// --- Runtime re-exports ----------------------------------------------------

pub use mapview_runtime::{
    BackoffStrategy, CancellationToken, EngineConfig, ManualScheduler, PolicyConfigError,
    ProviderKind, RetryPolicy, Scheduler, TimerId,
};

// --- Web re-exports --------------------------------------------------------

pub use mapview_web::{
    AnyProvider, EngineEvent, GeoFix, GeolocationError, MapProvider, MarkerLifecycleManager,
    OverlayVisibility, ProviderError, RecordingBridge, SdkBridge, SdkCall, SdkError,
    SheetCaptureCommand, SheetPointerDispatch, SheetPointerInput, ViewCompositionCoordinator,
    Visibility,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for map view hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine configuration could not be loaded or failed validation.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] PolicyConfigError),
}

/// Standard result type for facade APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Builder --------------------------------------------------------------

/// A coordinator over the configured provider.
pub type MapView<B, S, C> = ViewCompositionCoordinator<AnyProvider<B>, S, C>;

/// Default DOM element id the map mounts into.
pub const DEFAULT_CONTAINER: &str = "map";

/// Builder that validates configuration and selects the provider once.
#[derive(Debug, Clone)]
pub struct MapViewBuilder {
    config: EngineConfig,
    container: String,
}

impl MapViewBuilder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            container: DEFAULT_CONTAINER.to_string(),
        }
    }

    /// Parse configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_json_str(json)?))
    }

    /// Set the DOM element id of the map container.
    #[must_use]
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the configuration and build an unmounted view.
    pub fn build<B, S, C>(self, bridge: B, scheduler: S, clock: C) -> Result<MapView<B, S, C>>
    where
        B: SdkBridge,
        S: Scheduler,
        C: Clock,
    {
        let config = self.config.validated()?;
        let provider = AnyProvider::new(config.provider, bridge);
        tracing::info!(
            provider = config.provider.as_str(),
            container = %self.container,
            "map view built"
        );
        Ok(ViewCompositionCoordinator::new(
            config,
            provider,
            scheduler,
            clock,
            self.container,
        ))
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BottomSheetState, EngineConfig, EngineEvent, Error, MapView, MapViewBuilder,
        MemberPosition, ProviderKind, Result, SavedLocation, SheetPointerInput,
    };

    pub use crate::{core, runtime, web};
}

pub use mapview_core as core;
pub use mapview_runtime as runtime;
pub use mapview_web as web;
