#![forbid(unsafe_code)]

//! Bottom-sheet gesture state machine.
//!
//! [`BottomSheetGestureController`] turns one pointer session (down, moves,
//! up) into at most one [`SheetTransition`] between the three snap states
//! `collapsed`, `middle` and `expanded`.
//!
//! # State Machine
//!
//! ```text
//!              drag up / tap          drag up / tap
//!  Collapsed ─────────────────▶ Middle ─────────────▶ Expanded
//!            ◀─────────────────        ◀─────────────
//!                drag down               drag down
//! ```
//!
//! - A move whose vertical delta from the press point reaches the drag
//!   threshold (30px) steps one state in the drag direction and closes the
//!   session.
//! - A release within the tap window (< 10px, < 200ms) with no prior drag
//!   transition steps forward. Tapping while expanded does nothing.
//! - [`GestureEvent::Reset`] returns to `Collapsed` from anywhere.
//!
//! # Invariants
//!
//! 1. At most one transition per physical pointer session.
//! 2. Sessions never start on interactive targets, and a release on an
//!    interactive target is never a tap.
//! 3. [`transition`] is pure: the same `(state, event)` always yields the
//!    same state.
//!
//! # Failure Modes
//!
//! - A release or move with no session (lost pointer-down) is ignored.
//! - A second pointer-down from the same pointer while a session is open
//!   means the previous release was lost; the stale session is replaced.
//!   A pointer-down from a different pointer is ignored.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::clock::Clock;
use crate::event::EventTarget;

/// Default vertical distance (px) before a drag commits to a transition.
pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 30.0;
/// Default maximum movement (px) for a release to count as a tap.
pub const DEFAULT_TAP_MAX_MOVEMENT_PX: f64 = 10.0;
/// Default maximum press duration for a tap.
pub const DEFAULT_TAP_MAX_DURATION: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// States and transitions
// ---------------------------------------------------------------------------

/// Snap state of the bottom sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottomSheetState {
    #[default]
    Collapsed,
    Middle,
    Expanded,
}

impl BottomSheetState {
    /// Every state, in forward order.
    pub const ALL: [Self; 3] = [Self::Collapsed, Self::Middle, Self::Expanded];

    /// One step toward `Expanded` (saturating).
    #[must_use]
    pub const fn step_up(self) -> Self {
        match self {
            Self::Collapsed => Self::Middle,
            Self::Middle | Self::Expanded => Self::Expanded,
        }
    }

    /// One step toward `Collapsed` (saturating).
    #[must_use]
    pub const fn step_down(self) -> Self {
        match self {
            Self::Expanded => Self::Middle,
            Self::Middle | Self::Collapsed => Self::Collapsed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collapsed => "collapsed",
            Self::Middle => "middle",
            Self::Expanded => "expanded",
        }
    }
}

/// Gesture-level input to the pure transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    /// Upward drag past the threshold.
    DragUp,
    /// Downward drag past the threshold.
    DragDown,
    /// Short, nearly stationary press.
    Tap,
    /// External reset (e.g. selection changed).
    Reset,
}

/// Pure transition function.
#[must_use]
pub const fn transition(state: BottomSheetState, event: GestureEvent) -> BottomSheetState {
    match event {
        GestureEvent::DragUp => state.step_up(),
        GestureEvent::DragDown => state.step_down(),
        GestureEvent::Tap => match state {
            BottomSheetState::Expanded => BottomSheetState::Expanded,
            other => other.step_up(),
        },
        GestureEvent::Reset => BottomSheetState::Collapsed,
    }
}

/// A confirmed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetTransition {
    pub from: BottomSheetState,
    pub to: BottomSheetState,
    pub cause: GestureEvent,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for drag and tap recognition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetConfig {
    /// Minimum |delta| in screen px for a drag transition (default: 30).
    pub drag_threshold_px: f64,
    /// Maximum |delta| in screen px for a tap (default: 10).
    pub tap_max_movement_px: f64,
    /// Maximum press duration for a tap (default: 200ms).
    pub tap_max_duration: Duration,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            tap_max_movement_px: DEFAULT_TAP_MAX_MOVEMENT_PX,
            tap_max_duration: DEFAULT_TAP_MAX_DURATION,
        }
    }
}

impl SheetConfig {
    /// Gesture implied by a move `delta` px from the press point, if any.
    #[must_use]
    pub fn classify_move(&self, delta: f64) -> Option<GestureEvent> {
        if !delta.is_finite() || delta.abs() < self.drag_threshold_px {
            return None;
        }
        Some(if delta < 0.0 {
            GestureEvent::DragUp
        } else {
            GestureEvent::DragDown
        })
    }

    /// Whether a release after `delta` px and `elapsed` time is a tap.
    #[must_use]
    pub fn is_tap(&self, delta: f64, elapsed: Duration) -> bool {
        delta.is_finite() && delta.abs() < self.tap_max_movement_px && elapsed < self.tap_max_duration
    }
}

/// Resolve a complete press → move → release gesture in one call.
///
/// Models a session that moves straight to `delta` and releases after
/// `duration`. Returns the resulting state and whether it changed.
#[must_use]
pub fn resolve_gesture(
    config: &SheetConfig,
    state: BottomSheetState,
    delta: f64,
    duration: Duration,
    target_interactive: bool,
) -> (BottomSheetState, bool) {
    if target_interactive {
        return (state, false);
    }
    if let Some(event) = config.classify_move(delta) {
        let next = transition(state, event);
        if next != state {
            return (next, true);
        }
    }
    if config.is_tap(delta, duration) {
        let next = transition(state, GestureEvent::Tap);
        return (next, next != state);
    }
    (state, false)
}

// ---------------------------------------------------------------------------
// Sessions and outcomes
// ---------------------------------------------------------------------------

/// Transient record of one press; dropped on release or on transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession {
    pub pointer_id: u32,
    pub start_y: f64,
    pub start_timestamp: Duration,
}

/// Why an input was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetIgnoredReason {
    /// The controller is inert (view not ready).
    Inert,
    /// The event landed on a button, link, or other control.
    InteractiveTarget,
    /// A different pointer already owns the session.
    SessionAlreadyActive,
    /// Move/up without a matching down.
    NoActiveSession,
    /// Event from a pointer other than the session owner.
    PointerMismatch,
    /// Coordinate was NaN or infinite.
    InvalidPosition,
}

/// Result of feeding one input to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetOutcome {
    SessionStarted,
    /// A stale session from the same pointer was replaced.
    SessionRestarted,
    /// Sub-threshold motion, or a drag beyond the end state.
    Tracking { delta: f64 },
    Transitioned(SheetTransition),
    /// Session ended without a transition.
    Released,
    Cancelled,
    Ignored(SheetIgnoredReason),
}

impl SheetOutcome {
    /// The transition carried by this outcome, if any.
    #[must_use]
    pub const fn transition(&self) -> Option<SheetTransition> {
        match self {
            Self::Transitioned(t) => Some(*t),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Stateful bottom-sheet controller driven by pointer input.
pub struct BottomSheetGestureController<C> {
    config: SheetConfig,
    clock: C,
    state: BottomSheetState,
    session: Option<GestureSession>,
    enabled: bool,
    is_interactive: fn(&EventTarget) -> bool,
}

impl<C> std::fmt::Debug for BottomSheetGestureController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BottomSheetGestureController")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<C: Clock> BottomSheetGestureController<C> {
    /// Create a controller in `Collapsed`, enabled, using the default
    /// interactive-element predicate.
    #[must_use]
    pub fn new(config: SheetConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: BottomSheetState::Collapsed,
            session: None,
            enabled: true,
            is_interactive: EventTarget::is_interactive,
        }
    }

    /// Replace the interactive-element predicate.
    #[must_use]
    pub fn with_interactive_predicate(mut self, predicate: fn(&EventTarget) -> bool) -> Self {
        self.is_interactive = predicate;
        self
    }

    #[must_use]
    pub const fn state(&self) -> BottomSheetState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Open session, if a press is in progress.
    #[must_use]
    pub const fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable input handling. Disabling drops any open session.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.session = None;
        }
    }

    /// Return to `Collapsed` and drop any session.
    pub fn reset(&mut self) -> Option<SheetTransition> {
        self.session = None;
        self.apply(GestureEvent::Reset)
    }

    /// Handle a press inside the drag region.
    pub fn pointer_down(&mut self, pointer_id: u32, y: f64, target: &EventTarget) -> SheetOutcome {
        if !self.enabled {
            return SheetOutcome::Ignored(SheetIgnoredReason::Inert);
        }
        if !y.is_finite() {
            return SheetOutcome::Ignored(SheetIgnoredReason::InvalidPosition);
        }
        if (self.is_interactive)(target) {
            return SheetOutcome::Ignored(SheetIgnoredReason::InteractiveTarget);
        }
        let restarted = match self.session {
            Some(existing) if existing.pointer_id != pointer_id => {
                return SheetOutcome::Ignored(SheetIgnoredReason::SessionAlreadyActive);
            }
            Some(_) => true,
            None => false,
        };
        self.session = Some(GestureSession {
            pointer_id,
            start_y: y,
            start_timestamp: self.clock.now(),
        });
        if restarted {
            SheetOutcome::SessionRestarted
        } else {
            SheetOutcome::SessionStarted
        }
    }

    /// Handle pointer motion. May commit a drag transition.
    pub fn pointer_move(&mut self, pointer_id: u32, y: f64) -> SheetOutcome {
        let session = match self.active_session(pointer_id) {
            Ok(session) => session,
            Err(reason) => return SheetOutcome::Ignored(reason),
        };
        if !y.is_finite() {
            return SheetOutcome::Ignored(SheetIgnoredReason::InvalidPosition);
        }
        let delta = y - session.start_y;
        if let Some(event) = self.config.classify_move(delta)
            && let Some(t) = self.apply(event)
        {
            self.session = None;
            return SheetOutcome::Transitioned(t);
        }
        SheetOutcome::Tracking { delta }
    }

    /// Handle release. Ends the session and may commit a tap transition.
    pub fn pointer_up(&mut self, pointer_id: u32, y: f64, target: &EventTarget) -> SheetOutcome {
        let session = match self.active_session(pointer_id) {
            Ok(session) => session,
            Err(reason) => return SheetOutcome::Ignored(reason),
        };
        self.session = None;
        if (self.is_interactive)(target) {
            return SheetOutcome::Ignored(SheetIgnoredReason::InteractiveTarget);
        }
        if !y.is_finite() {
            return SheetOutcome::Released;
        }
        let delta = y - session.start_y;
        let elapsed = self.clock.now().saturating_sub(session.start_timestamp);
        if self.config.is_tap(delta, elapsed)
            && let Some(t) = self.apply(GestureEvent::Tap)
        {
            return SheetOutcome::Transitioned(t);
        }
        SheetOutcome::Released
    }

    /// Drop the session without any transition.
    pub fn cancel(&mut self) -> SheetOutcome {
        match self.session.take() {
            Some(_) => SheetOutcome::Cancelled,
            None => SheetOutcome::Ignored(SheetIgnoredReason::NoActiveSession),
        }
    }

    fn active_session(&self, pointer_id: u32) -> Result<GestureSession, SheetIgnoredReason> {
        if !self.enabled {
            return Err(SheetIgnoredReason::Inert);
        }
        match self.session {
            None => Err(SheetIgnoredReason::NoActiveSession),
            Some(s) if s.pointer_id != pointer_id => Err(SheetIgnoredReason::PointerMismatch),
            Some(s) => Ok(s),
        }
    }

    fn apply(&mut self, event: GestureEvent) -> Option<SheetTransition> {
        let from = self.state;
        let to = transition(from, event);
        if to == from {
            return None;
        }
        self.state = to;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            from = from.as_str(),
            to = to.as_str(),
            cause = ?event,
            "bottom sheet transition"
        );

        Some(SheetTransition {
            from,
            to,
            cause: event,
        })
    }
}
