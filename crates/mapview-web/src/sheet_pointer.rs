#![forbid(unsafe_code)]

//! Deterministic pointer-capture adapter for the bottom-sheet drag region.
//!
//! Bridges browser pointer and touch lifecycle signals into the
//! [`BottomSheetGestureController`] while enforcing:
//! - one active pointer at a time,
//! - explicit capture acquire/release commands for JS hosts, and
//! - cancellation on interruption paths (blur/visibility/lost-capture).
//!
//! Touch contacts never request capture; the browser already routes a
//! touch's events to the element it started on.

use mapview_core::clock::Clock;
use mapview_core::event::{EventTarget, PointerButton, PointerSource};
use mapview_core::sheet::{
    BottomSheetGestureController, BottomSheetState, SheetIgnoredReason, SheetOutcome,
    SheetTransition,
};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    /// Touch contact; no capture involved.
    NotNeeded,
    Requested,
    Acquired,
}

impl CaptureState {
    const fn is_acquired(self) -> bool {
        matches!(self, Self::Acquired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActivePointer {
    pointer_id: u32,
    source: PointerSource,
    capture_state: CaptureState,
}

/// Host command for browser pointer-capture control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetCaptureCommand {
    Acquire { pointer_id: u32 },
    Release { pointer_id: u32 },
}

/// Lifecycle phase recorded for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPointerPhase {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    PointerLeave,
    Blur,
    VisibilityHidden,
    LostPointerCapture,
    CaptureAcquired,
}

/// Why an incoming lifecycle signal was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPointerIgnoredReason {
    ButtonNotAllowed,
    NoActivePointer,
    PointerMismatch,
    LeaveWhileCaptured,
    /// The gesture controller refused the input.
    Controller(SheetIgnoredReason),
}

/// Outcome category for one lifecycle dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetPointerLogOutcome {
    Forwarded,
    Transitioned,
    CaptureStateUpdated,
    Ignored(SheetPointerIgnoredReason),
}

/// Structured lifecycle log record for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetPointerLogEntry {
    pub phase: SheetPointerPhase,
    pub pointer_id: Option<u32>,
    pub y: Option<f64>,
    pub capture_command: Option<SheetCaptureCommand>,
    pub outcome: SheetPointerLogOutcome,
}

/// Result of one pointer lifecycle dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetPointerDispatch {
    pub outcome: Option<SheetOutcome>,
    pub transition: Option<SheetTransition>,
    pub capture_command: Option<SheetCaptureCommand>,
    pub log: SheetPointerLogEntry,
}

impl SheetPointerDispatch {
    fn ignored(
        phase: SheetPointerPhase,
        reason: SheetPointerIgnoredReason,
        pointer_id: Option<u32>,
        y: Option<f64>,
    ) -> Self {
        Self {
            outcome: None,
            transition: None,
            capture_command: None,
            log: SheetPointerLogEntry {
                phase,
                pointer_id,
                y,
                capture_command: None,
                outcome: SheetPointerLogOutcome::Ignored(reason),
            },
        }
    }

    fn capture_state_updated(phase: SheetPointerPhase, pointer_id: u32) -> Self {
        Self {
            outcome: None,
            transition: None,
            capture_command: None,
            log: SheetPointerLogEntry {
                phase,
                pointer_id: Some(pointer_id),
                y: None,
                capture_command: None,
                outcome: SheetPointerLogOutcome::CaptureStateUpdated,
            },
        }
    }

    fn forwarded(
        phase: SheetPointerPhase,
        pointer_id: Option<u32>,
        y: Option<f64>,
        outcome: SheetOutcome,
        capture_command: Option<SheetCaptureCommand>,
    ) -> Self {
        let transition = outcome.transition();
        let log_outcome = match outcome {
            SheetOutcome::Ignored(reason) => {
                SheetPointerLogOutcome::Ignored(SheetPointerIgnoredReason::Controller(reason))
            }
            SheetOutcome::Transitioned(_) => SheetPointerLogOutcome::Transitioned,
            _ => SheetPointerLogOutcome::Forwarded,
        };
        Self {
            outcome: Some(outcome),
            transition,
            capture_command,
            log: SheetPointerLogEntry {
                phase,
                pointer_id,
                y,
                capture_command,
                outcome: log_outcome,
            },
        }
    }
}

/// One host pointer signal, as posted by the JS glue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SheetPointerInput {
    Down {
        pointer_id: u32,
        #[serde(default)]
        source: PointerSource,
        #[serde(default)]
        button: PointerButton,
        y: f64,
        #[serde(default)]
        target: EventTarget,
    },
    Move {
        pointer_id: u32,
        y: f64,
    },
    Up {
        pointer_id: u32,
        y: f64,
        #[serde(default)]
        target: EventTarget,
    },
    Cancel {
        #[serde(default)]
        pointer_id: Option<u32>,
    },
    Leave {
        pointer_id: u32,
    },
    Blur,
    VisibilityHidden,
    LostPointerCapture {
        pointer_id: u32,
    },
    CaptureAcquired {
        pointer_id: u32,
    },
}

/// Pointer-capture adapter around the sheet controller.
#[derive(Debug)]
pub struct SheetPointerAdapter<C> {
    controller: BottomSheetGestureController<C>,
    active: Option<ActivePointer>,
}

impl<C: Clock> SheetPointerAdapter<C> {
    #[must_use]
    pub fn new(controller: BottomSheetGestureController<C>) -> Self {
        Self {
            controller,
            active: None,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &BottomSheetGestureController<C> {
        &self.controller
    }

    #[must_use]
    pub const fn state(&self) -> BottomSheetState {
        self.controller.state()
    }

    /// Active pointer ID, if any.
    #[must_use]
    pub fn active_pointer_id(&self) -> Option<u32> {
        self.active.map(|active| active.pointer_id)
    }

    /// Enable or disable the sheet. Disabling abandons the active pointer and
    /// returns the capture release the host must perform.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<SheetCaptureCommand> {
        self.controller.set_enabled(enabled);
        if enabled {
            return None;
        }
        self.active.take().and_then(Self::release_for)
    }

    /// Return the sheet to `Collapsed`, abandoning any gesture.
    pub fn reset(&mut self) -> (Option<SheetTransition>, Option<SheetCaptureCommand>) {
        let release = self.active.take().and_then(Self::release_for);
        (self.controller.reset(), release)
    }

    /// Route one host signal to the matching lifecycle handler.
    pub fn dispatch(&mut self, input: &SheetPointerInput) -> SheetPointerDispatch {
        match input {
            SheetPointerInput::Down {
                pointer_id,
                source,
                button,
                y,
                target,
            } => self.pointer_down(*pointer_id, *source, *button, *y, target),
            SheetPointerInput::Move { pointer_id, y } => self.pointer_move(*pointer_id, *y),
            SheetPointerInput::Up {
                pointer_id,
                y,
                target,
            } => self.pointer_up(*pointer_id, *y, target),
            SheetPointerInput::Cancel { pointer_id } => self.pointer_cancel(*pointer_id),
            SheetPointerInput::Leave { pointer_id } => self.pointer_leave(*pointer_id),
            SheetPointerInput::Blur => self.blur(),
            SheetPointerInput::VisibilityHidden => self.visibility_hidden(),
            SheetPointerInput::LostPointerCapture { pointer_id } => {
                self.lost_pointer_capture(*pointer_id)
            }
            SheetPointerInput::CaptureAcquired { pointer_id } => self.capture_acquired(*pointer_id),
        }
    }

    /// Handle pointer-down (or touchstart) inside the drag region.
    pub fn pointer_down(
        &mut self,
        pointer_id: u32,
        source: PointerSource,
        button: PointerButton,
        y: f64,
        target: &EventTarget,
    ) -> SheetPointerDispatch {
        if button != PointerButton::Primary {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerDown,
                SheetPointerIgnoredReason::ButtonNotAllowed,
                Some(pointer_id),
                Some(y),
            );
        }
        let outcome = self.controller.pointer_down(pointer_id, y, target);
        let opened = matches!(
            outcome,
            SheetOutcome::SessionStarted | SheetOutcome::SessionRestarted
        );
        if !opened {
            return SheetPointerDispatch::forwarded(
                SheetPointerPhase::PointerDown,
                Some(pointer_id),
                Some(y),
                outcome,
                None,
            );
        }

        let already_acquired = self
            .active
            .is_some_and(|active| active.pointer_id == pointer_id && active.capture_state.is_acquired());
        let (capture_state, command) = if source == PointerSource::Touch {
            (CaptureState::NotNeeded, None)
        } else if already_acquired {
            (CaptureState::Acquired, None)
        } else {
            (
                CaptureState::Requested,
                Some(SheetCaptureCommand::Acquire { pointer_id }),
            )
        };
        self.active = Some(ActivePointer {
            pointer_id,
            source,
            capture_state,
        });
        SheetPointerDispatch::forwarded(
            SheetPointerPhase::PointerDown,
            Some(pointer_id),
            Some(y),
            outcome,
            command,
        )
    }

    /// Mark browser pointer capture as successfully acquired.
    pub fn capture_acquired(&mut self, pointer_id: u32) -> SheetPointerDispatch {
        let Some(mut active) = self.active else {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::CaptureAcquired,
                SheetPointerIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
            );
        };
        if active.pointer_id != pointer_id {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::CaptureAcquired,
                SheetPointerIgnoredReason::PointerMismatch,
                Some(pointer_id),
                None,
            );
        }
        active.capture_state = CaptureState::Acquired;
        self.active = Some(active);
        SheetPointerDispatch::capture_state_updated(SheetPointerPhase::CaptureAcquired, pointer_id)
    }

    /// Handle pointer-move (or touchmove). A committed drag ends the session
    /// and releases capture.
    pub fn pointer_move(&mut self, pointer_id: u32, y: f64) -> SheetPointerDispatch {
        let Some(active) = self.active else {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerMove,
                SheetPointerIgnoredReason::NoActivePointer,
                Some(pointer_id),
                Some(y),
            );
        };
        if active.pointer_id != pointer_id {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerMove,
                SheetPointerIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(y),
            );
        }
        let outcome = self.controller.pointer_move(pointer_id, y);
        let command = if outcome.transition().is_some() {
            self.active = None;
            Self::release_for(active)
        } else {
            None
        };
        SheetPointerDispatch::forwarded(
            SheetPointerPhase::PointerMove,
            Some(pointer_id),
            Some(y),
            outcome,
            command,
        )
    }

    /// Handle pointer-up (or touchend) and release capture.
    pub fn pointer_up(&mut self, pointer_id: u32, y: f64, target: &EventTarget) -> SheetPointerDispatch {
        let Some(active) = self.active else {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerUp,
                SheetPointerIgnoredReason::NoActivePointer,
                Some(pointer_id),
                Some(y),
            );
        };
        if active.pointer_id != pointer_id {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerUp,
                SheetPointerIgnoredReason::PointerMismatch,
                Some(pointer_id),
                Some(y),
            );
        }
        let outcome = self.controller.pointer_up(pointer_id, y, target);
        self.active = None;
        SheetPointerDispatch::forwarded(
            SheetPointerPhase::PointerUp,
            Some(pointer_id),
            Some(y),
            outcome,
            Self::release_for(active),
        )
    }

    /// Handle browser pointer-cancel (or touchcancel).
    pub fn pointer_cancel(&mut self, pointer_id: Option<u32>) -> SheetPointerDispatch {
        self.cancel_active(SheetPointerPhase::PointerCancel, pointer_id, true)
    }

    /// Handle pointer-leave. Leaving while captured is expected and ignored.
    pub fn pointer_leave(&mut self, pointer_id: u32) -> SheetPointerDispatch {
        let Some(active) = self.active else {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerLeave,
                SheetPointerIgnoredReason::NoActivePointer,
                Some(pointer_id),
                None,
            );
        };
        if active.pointer_id != pointer_id {
            return SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerLeave,
                SheetPointerIgnoredReason::PointerMismatch,
                Some(pointer_id),
                None,
            );
        }
        if matches!(active.capture_state, CaptureState::Requested) {
            self.cancel_active(SheetPointerPhase::PointerLeave, Some(pointer_id), true)
        } else {
            SheetPointerDispatch::ignored(
                SheetPointerPhase::PointerLeave,
                SheetPointerIgnoredReason::LeaveWhileCaptured,
                Some(pointer_id),
                None,
            )
        }
    }

    /// Handle window blur.
    pub fn blur(&mut self) -> SheetPointerDispatch {
        self.cancel_active(SheetPointerPhase::Blur, None, true)
    }

    /// Handle visibility-hidden interruptions.
    pub fn visibility_hidden(&mut self) -> SheetPointerDispatch {
        self.cancel_active(SheetPointerPhase::VisibilityHidden, None, true)
    }

    /// Handle `lostpointercapture`; the browser already released capture.
    pub fn lost_pointer_capture(&mut self, pointer_id: u32) -> SheetPointerDispatch {
        self.cancel_active(SheetPointerPhase::LostPointerCapture, Some(pointer_id), false)
    }

    fn cancel_active(
        &mut self,
        phase: SheetPointerPhase,
        pointer_id: Option<u32>,
        release_capture: bool,
    ) -> SheetPointerDispatch {
        let Some(active) = self.active else {
            return SheetPointerDispatch::ignored(
                phase,
                SheetPointerIgnoredReason::NoActivePointer,
                pointer_id,
                None,
            );
        };
        if let Some(id) = pointer_id
            && id != active.pointer_id
        {
            return SheetPointerDispatch::ignored(
                phase,
                SheetPointerIgnoredReason::PointerMismatch,
                Some(id),
                None,
            );
        }
        let outcome = self.controller.cancel();
        self.active = None;
        let command = if release_capture {
            Self::release_for(active)
        } else {
            None
        };
        SheetPointerDispatch::forwarded(phase, Some(active.pointer_id), None, outcome, command)
    }

    fn release_for(active: ActivePointer) -> Option<SheetCaptureCommand> {
        active
            .capture_state
            .is_acquired()
            .then_some(SheetCaptureCommand::Release {
                pointer_id: active.pointer_id,
            })
    }
}
