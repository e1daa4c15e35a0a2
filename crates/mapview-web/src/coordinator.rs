#![forbid(unsafe_code)]

//! Top-level orchestration of the map view.
//!
//! [`ViewCompositionCoordinator`] owns the provider, the marker manager and
//! the sheet adapter. The host feeds it snapshots, readiness signals,
//! pointer input, timer firings and geolocation results; it answers with
//! SDK calls (through the provider's bridge) and [`EngineEvent`]s queued in
//! an outbox that the host drains.
//!
//! # Readiness
//!
//! The view is ready only when the map exists, a member snapshot has been
//! received, and the schedule for the selected day is loaded. Until then no
//! markers exist and the sheet is inert. Every change of readiness emits
//! exactly one [`EngineEvent::ViewReady`]. Entering the failed state always
//! emits a final `ViewReady(false)`, even for a view that was never ready.
//!
//! # Camera follow
//!
//! After a snapshot is reconciled the camera follows the selection, but only
//! when the selected identity changed. A follow that arrives before the map's
//! first idle event waits on the follow retry policy. A new selection
//! replaces a pending follow; a snapshot that keeps the selection retargets
//! the pending follow of its own marker family and leaves the other family's
//! alone. Once the retries run out the follow waits for the idle event.

use mapview_core::clock::Clock;
use mapview_core::coordinate::NormalizedCoordinate;
use mapview_core::model::{MarkerKind, MemberPosition, SavedLocation, selected_id};
use mapview_core::sheet::{BottomSheetGestureController, BottomSheetState};
use mapview_runtime::cancellation::{CancellationSource, CancellationToken};
use mapview_runtime::config::EngineConfig;
use mapview_runtime::retry::RetryState;
use mapview_runtime::scheduler::{Scheduler, TimerId};
use serde::{Deserialize, Serialize};

use crate::callbacks::CallbackAction;
use crate::markers::{CameraPlan, MarkerLifecycleManager, camera_plan};
use crate::provider::{FitOptions, MapHandle, MapOptions, MapProvider, PanOptions, ProviderError};
use crate::sdk_provider::MAP_IDLE_TOKEN;
use crate::sheet_pointer::{SheetCaptureCommand, SheetPointerAdapter, SheetPointerDispatch, SheetPointerInput};

// ---------------------------------------------------------------------------
// Events and inputs
// ---------------------------------------------------------------------------

/// Event reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    MemberMarkerSelected { id: String },
    LocationMarkerSelected { id: String },
    BottomSheetStateChanged { state: BottomSheetState },
    ViewReady { ready: bool },
    /// Acknowledges a close request, or reports a close-button click.
    InfoWindowClosed,
    GeolocationFailed { error: GeolocationError },
    LocationEditRequested { id: String },
    LocationDeleteRequested { id: String },
    /// The sheet was disabled mid-gesture; the host must release capture.
    ReleasePointerCapture { pointer_id: u32 },
}

/// A geolocation fix from the host.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeoFix {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

/// Why the host could not produce a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationError {
    #[error("geolocation permission denied")]
    Denied,
    #[error("geolocation timed out")]
    Timeout,
    #[error("position unavailable")]
    Unavailable,
}

/// Visibility of one overlay element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Visibility of the overlays that sit above the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayVisibility {
    pub header_badge: Visibility,
    pub floating_controls: Visibility,
}

/// Overlays are hidden only while the sheet is fully expanded.
#[must_use]
pub const fn overlay_visibility(state: BottomSheetState) -> OverlayVisibility {
    let visibility = match state {
        BottomSheetState::Collapsed | BottomSheetState::Middle => Visibility::Visible,
        BottomSheetState::Expanded => Visibility::Hidden,
    };
    OverlayVisibility {
        header_badge: visibility,
        floating_controls: visibility,
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Orchestrator of one map view instance.
pub struct ViewCompositionCoordinator<P, S, C> {
    config: EngineConfig,
    provider: P,
    scheduler: S,
    sheet: SheetPointerAdapter<C>,
    markers: MarkerLifecycleManager,
    container: String,
    map: Option<MapHandle>,
    map_idle: bool,
    members: Option<Vec<MemberPosition>>,
    locations: Vec<SavedLocation>,
    schedule_loaded: bool,
    ready: bool,
    failed: bool,
    torn_down: bool,
    liveness: CancellationSource,
    sdk_retry: RetryState,
    sdk_timer: Option<TimerId>,
    follow_retry: RetryState,
    follow_timer: Option<TimerId>,
    pending_follow: Option<PendingFollow>,
    /// `None` until the first reconcile after becoming ready.
    last_member_selection: Option<Option<String>>,
    last_location_selection: Option<Option<String>>,
    outbox: Vec<EngineEvent>,
}

/// A camera move waiting for the map. `family` is `None` for a geolocation
/// recentre, which no snapshot retargets.
#[derive(Debug, Clone)]
struct PendingFollow {
    family: Option<MarkerKind>,
    plan: CameraPlan,
}

impl<P: MapProvider, S: Scheduler, C: Clock> ViewCompositionCoordinator<P, S, C> {
    /// Create an unmounted coordinator. The sheet starts inert.
    pub fn new(
        config: EngineConfig,
        provider: P,
        scheduler: S,
        clock: C,
        container: impl Into<String>,
    ) -> Self {
        let controller = BottomSheetGestureController::new(config.to_sheet_config(), clock);
        let mut sheet = SheetPointerAdapter::new(controller);
        sheet.set_enabled(false);
        Self {
            markers: MarkerLifecycleManager::new(config.markers.clone()),
            sdk_retry: RetryState::new(config.sdk_load.retry.clone()),
            follow_retry: RetryState::new(config.camera.follow_retry.clone()),
            config,
            provider,
            scheduler,
            sheet,
            container: container.into(),
            map: None,
            map_idle: false,
            members: None,
            locations: Vec::new(),
            schedule_loaded: false,
            ready: false,
            failed: false,
            torn_down: false,
            liveness: CancellationSource::new(),
            sdk_timer: None,
            follow_timer: None,
            pending_follow: None,
            last_member_selection: None,
            last_location_selection: None,
            outbox: Vec::new(),
        }
    }

    // --- Lifecycle ---

    /// Create the map, retrying on the SDK-load policy while the SDK is
    /// missing.
    pub fn mount(&mut self) {
        if !self.is_live() || self.map.is_some() {
            return;
        }
        self.try_create_map();
    }

    /// Host signal that the SDK script finished loading.
    pub fn on_sdk_loaded(&mut self) {
        if !self.is_live() || self.map.is_some() {
            return;
        }
        if let Some(timer) = self.sdk_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.try_create_map();
    }

    /// Token that asynchronous host work (script loading, geolocation) can
    /// check before calling back in.
    #[must_use]
    pub fn liveness_token(&self) -> CancellationToken {
        self.liveness.token()
    }

    /// A timer requested from the scheduler fired. Returns whether it was
    /// one of ours and still pending.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.torn_down || !self.scheduler.acknowledge(id) {
            return false;
        }
        if self.sdk_timer == Some(id) {
            self.sdk_timer = None;
            if self.is_live() && self.map.is_none() {
                self.try_create_map();
            }
            true
        } else if self.follow_timer == Some(id) {
            self.follow_timer = None;
            self.try_follow();
            true
        } else {
            false
        }
    }

    /// The map reported its first idle; camera operations may run.
    pub fn on_map_idle(&mut self) {
        if self.torn_down || self.map_idle {
            return;
        }
        self.map_idle = true;
        tracing::debug!("map idle");
        if self.pending_follow.is_some() {
            if let Some(timer) = self.follow_timer.take() {
                self.scheduler.cancel(timer);
            }
            self.try_follow();
        }
    }

    /// Cancel everything and release every SDK object. Later signals are
    /// ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.liveness.cancel();
        if let Some(timer) = self.sdk_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.cancel_follow();
        self.release_sheet();
        self.markers.clear(&mut self.provider);
        if self.ready {
            self.ready = false;
            self.outbox.push(EngineEvent::ViewReady { ready: false });
        }
        tracing::debug!("view torn down");
    }

    // --- Data ---

    /// Replace the member snapshot.
    pub fn set_members(&mut self, members: Vec<MemberPosition>) {
        if self.torn_down {
            return;
        }
        self.members = Some(members);
        if self.ready {
            self.refresh(true, false);
        } else {
            self.update_ready();
        }
    }

    /// Replace the saved locations of the selected member.
    pub fn set_locations(&mut self, locations: Vec<SavedLocation>) {
        if self.torn_down {
            return;
        }
        self.locations = locations;
        if self.ready {
            self.refresh(false, true);
        }
    }

    /// Whether the schedule for the selected day has loaded.
    pub fn set_schedule_loaded(&mut self, loaded: bool) {
        if self.torn_down || self.schedule_loaded == loaded {
            return;
        }
        self.schedule_loaded = loaded;
        self.update_ready();
    }

    // --- Input ---

    /// Route one pointer signal from the sheet's drag region.
    pub fn handle_pointer(&mut self, input: &SheetPointerInput) -> SheetPointerDispatch {
        let dispatch = self.sheet.dispatch(input);
        tracing::trace!(phase = ?dispatch.log.phase, outcome = ?dispatch.log.outcome, "sheet pointer");
        if let Some(transition) = dispatch.transition {
            self.outbox.push(EngineEvent::BottomSheetStateChanged {
                state: transition.to,
            });
        }
        dispatch
    }

    /// Resolve a token reported by the host (marker click, close button, map
    /// idle). Unknown tokens are ignored.
    pub fn dispatch_callback(&mut self, token: &str) -> bool {
        if self.torn_down {
            return false;
        }
        if token == MAP_IDLE_TOKEN {
            self.on_map_idle();
            return true;
        }
        let Some(action) = self.markers.resolve(token).cloned() else {
            tracing::debug!(token, "unknown callback token");
            return false;
        };
        match action {
            CallbackAction::MarkerClick {
                kind: MarkerKind::Member,
                owner_id,
            } => self
                .outbox
                .push(EngineEvent::MemberMarkerSelected { id: owner_id }),
            CallbackAction::MarkerClick {
                kind: MarkerKind::Location,
                owner_id,
            } => self
                .outbox
                .push(EngineEvent::LocationMarkerSelected { id: owner_id }),
            CallbackAction::CloseInfoWindow => {
                if self.markers.dismiss_info_window(&mut self.provider) {
                    self.outbox.push(EngineEvent::InfoWindowClosed);
                }
            }
        }
        true
    }

    /// Host request to close the info window. Always acknowledged.
    pub fn close_info_window(&mut self) {
        if self.torn_down {
            return;
        }
        self.markers.dismiss_info_window(&mut self.provider);
        self.outbox.push(EngineEvent::InfoWindowClosed);
    }

    /// Recentre on the user's position, or report why there is none.
    pub fn on_geolocation(&mut self, result: Result<GeoFix, GeolocationError>) {
        if self.torn_down {
            return;
        }
        let fix = result.and_then(|fix| {
            NormalizedCoordinate::new(fix.lat, fix.lng).ok_or(GeolocationError::Unavailable)
        });
        match fix {
            Ok(position) => {
                if self.ready {
                    self.cancel_follow();
                    self.start_follow(None, CameraPlan::Focus(position));
                }
            }
            Err(error) => {
                tracing::warn!(%error, "geolocation failed");
                self.outbox.push(EngineEvent::GeolocationFailed { error });
            }
        }
    }

    /// Ask the host to edit a saved location.
    pub fn request_location_update(&mut self, id: impl Into<String>) {
        if !self.torn_down {
            self.outbox
                .push(EngineEvent::LocationEditRequested { id: id.into() });
        }
    }

    /// Ask the host to delete a saved location.
    pub fn request_location_delete(&mut self, id: impl Into<String>) {
        if !self.torn_down {
            self.outbox
                .push(EngineEvent::LocationDeleteRequested { id: id.into() });
        }
    }

    // --- Output ---

    /// Take queued events in emission order.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    // --- Accessors ---

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// True once a retry budget ran out. Permanent for this instance.
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub const fn is_map_idle(&self) -> bool {
        self.map_idle
    }

    #[must_use]
    pub const fn map(&self) -> Option<MapHandle> {
        self.map
    }

    #[must_use]
    pub const fn sheet_state(&self) -> BottomSheetState {
        self.sheet.state()
    }

    #[must_use]
    pub const fn overlay_visibility(&self) -> OverlayVisibility {
        overlay_visibility(self.sheet.state())
    }

    #[must_use]
    pub fn sheet(&self) -> &SheetPointerAdapter<C> {
        &self.sheet
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerLifecycleManager {
        &self.markers
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Whether a camera follow is waiting for the map.
    #[must_use]
    pub fn has_pending_follow(&self) -> bool {
        self.pending_follow.is_some()
    }

    // --- Internals ---

    fn is_live(&self) -> bool {
        !self.torn_down && !self.failed && !self.liveness.is_cancelled()
    }

    fn try_create_map(&mut self) {
        let options = match MapOptions::from_policy(&self.config.map) {
            Ok(options) => options,
            Err(err) => {
                self.fail(&err.to_string());
                return;
            }
        };
        match self.provider.create_map(&self.container, &options) {
            Ok(map) => {
                self.map = Some(map);
                self.sdk_retry.reset();
                tracing::debug!(
                    provider = self.provider.kind().as_str(),
                    container = %self.container,
                    "map mounted"
                );
                self.update_ready();
            }
            Err(ProviderError::NotReady) => match self.sdk_retry.next_delay() {
                Some(delay) => {
                    if self.sdk_timer.is_none() {
                        self.sdk_timer = Some(self.scheduler.schedule(delay));
                    }
                    tracing::debug!(
                        attempt = self.sdk_retry.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "map SDK not loaded, retry scheduled"
                    );
                }
                None => self.fail("map SDK did not load"),
            },
            Err(err) => self.fail(&err.to_string()),
        }
    }

    /// Enter the permanent failed state.
    fn fail(&mut self, reason: &str) {
        if self.failed {
            return;
        }
        self.failed = true;
        tracing::warn!(reason, "map view failed");
        if let Some(timer) = self.sdk_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.cancel_follow();
        self.release_sheet();
        self.markers.clear(&mut self.provider);
        self.ready = false;
        self.outbox.push(EngineEvent::ViewReady { ready: false });
    }

    fn update_ready(&mut self) {
        let ready = self.is_live()
            && self.map.is_some()
            && self.members.is_some()
            && self.schedule_loaded;
        if ready == self.ready {
            return;
        }
        self.ready = ready;
        tracing::debug!(ready, "view readiness changed");
        self.outbox.push(EngineEvent::ViewReady { ready });
        if ready {
            self.sheet.set_enabled(true);
            self.last_member_selection = None;
            self.last_location_selection = None;
            self.refresh(true, true);
        } else {
            self.cancel_follow();
            self.release_sheet();
            self.markers.clear(&mut self.provider);
        }
    }

    fn release_sheet(&mut self) {
        if let Some(SheetCaptureCommand::Release { pointer_id }) = self.sheet.set_enabled(false) {
            self.outbox
                .push(EngineEvent::ReleasePointerCapture { pointer_id });
        }
    }

    /// Reconcile the changed families, then follow the selection.
    fn refresh(&mut self, members: bool, locations: bool) {
        let Some(map) = self.map else {
            return;
        };
        if members {
            let snapshot = self.members.as_deref().unwrap_or_default();
            self.markers.reconcile(&mut self.provider, map, snapshot);
        }
        if locations {
            self.markers
                .reconcile(&mut self.provider, map, &self.locations);
        }
        self.follow_selection(members, locations);
    }

    fn follow_selection(&mut self, members_refreshed: bool, locations_refreshed: bool) {
        let members = self.members.as_deref().unwrap_or_default();
        let member_selection = selected_id(members).map(str::to_owned);
        let location_selection = selected_id(&self.locations).map(str::to_owned);
        let member_changed = self.last_member_selection.as_ref() != Some(&member_selection);
        let location_changed = self.last_location_selection.as_ref() != Some(&location_selection);
        if !member_changed && !location_changed {
            self.retarget_follow(members_refreshed, locations_refreshed);
            return;
        }

        let (family, plan) = if location_changed && location_selection.is_some() {
            (MarkerKind::Location, camera_plan(&self.locations))
        } else {
            (MarkerKind::Member, camera_plan(members))
        };
        self.cancel_follow();
        let selected = (member_changed && member_selection.is_some())
            || (location_changed && location_selection.is_some());
        self.last_member_selection = Some(member_selection);
        self.last_location_selection = Some(location_selection);

        if selected {
            let (transition, release) = self.sheet.reset();
            if let Some(SheetCaptureCommand::Release { pointer_id }) = release {
                self.outbox
                    .push(EngineEvent::ReleasePointerCapture { pointer_id });
            }
            if let Some(transition) = transition {
                self.outbox.push(EngineEvent::BottomSheetStateChanged {
                    state: transition.to,
                });
            }
        }
        if let Some(plan) = plan {
            self.start_follow(Some(family), plan);
        }
    }

    fn start_follow(&mut self, family: Option<MarkerKind>, plan: CameraPlan) {
        self.follow_retry.reset();
        self.pending_follow = Some(PendingFollow { family, plan });
        self.try_follow();
    }

    /// Point a waiting follow at its family's latest snapshot. The retry
    /// budget and any scheduled timer carry over.
    fn retarget_follow(&mut self, members_refreshed: bool, locations_refreshed: bool) {
        let Some(family) = self.pending_follow.as_ref().and_then(|pending| pending.family) else {
            return;
        };
        let plan = match family {
            MarkerKind::Member if members_refreshed => {
                camera_plan(self.members.as_deref().unwrap_or_default())
            }
            MarkerKind::Location if locations_refreshed => camera_plan(&self.locations),
            _ => return,
        };
        let Some(plan) = plan else {
            self.cancel_follow();
            return;
        };
        if let Some(pending) = self.pending_follow.as_mut() {
            tracing::debug!(?plan, "pending camera follow retargeted");
            pending.plan = plan;
        }
    }

    fn cancel_follow(&mut self) {
        self.pending_follow = None;
        if let Some(timer) = self.follow_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    fn try_follow(&mut self) {
        let Some(map) = self.map else {
            self.pending_follow = None;
            return;
        };
        if !self.map_idle {
            self.schedule_follow_retry();
            return;
        }
        let Some(pending) = self.pending_follow.take() else {
            return;
        };
        let camera = &self.config.camera;
        let result = match &pending.plan {
            CameraPlan::Focus(position) => self.provider.pan_to(
                map,
                *position,
                &PanOptions {
                    zoom: Some(camera.focus_zoom),
                },
            ),
            CameraPlan::Fit(positions) => self.provider.fit_bounds(
                map,
                positions,
                &FitOptions {
                    padding_px: camera.fit_padding_px,
                    single_point_zoom: Some(camera.focus_zoom),
                },
            ),
        };
        match result {
            Ok(()) => tracing::debug!(plan = ?pending.plan, "camera followed selection"),
            Err(ProviderError::NotReady) => {
                self.pending_follow = Some(pending);
                self.schedule_follow_retry();
            }
            Err(err) => tracing::warn!(error = %err, "camera follow failed"),
        }
    }

    fn schedule_follow_retry(&mut self) {
        if self.follow_timer.is_some() {
            return;
        }
        match self.follow_retry.next_delay() {
            Some(delay) => self.follow_timer = Some(self.scheduler.schedule(delay)),
            None if self.map_idle => {
                tracing::warn!("camera follow retries exhausted, follow dropped");
                self.pending_follow = None;
            }
            None => tracing::warn!("camera follow retries exhausted, waiting for map idle"),
        }
    }
}
