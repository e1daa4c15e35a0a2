#![forbid(unsafe_code)]

//! Core: coordinates, data contracts, pointer input, and the bottom sheet.
//!
//! # Role in the map view engine
//! `mapview-core` is the host-independent layer. It owns coordinate
//! normalization, the member/location data contracts received from the host,
//! the pointer event vocabulary, the clock abstraction, and the pure
//! bottom-sheet gesture state machine.
//!
//! # Primary responsibilities
//! - **Coordinates**: [`coordinate::normalize`] and [`coordinate::is_valid_pair`]
//!   turn heterogeneous host values into [`coordinate::NormalizedCoordinate`].
//! - **Data model**: [`model::MemberPosition`] and [`model::SavedLocation`].
//! - **Bottom sheet**: [`sheet::BottomSheetGestureController`] converts pointer
//!   deltas and tap timing into [`sheet::BottomSheetState`] transitions.
//!
//! # How it fits in the system
//! `mapview-web` consumes these types to drive map providers and markers;
//! `mapview-runtime` supplies retry/scheduling plumbing. Nothing in this crate
//! touches a map SDK.

pub mod clock;
pub mod coordinate;
pub mod event;
pub mod model;
pub mod sheet;

pub use clock::{Clock, DeterministicClock, SystemClock};
pub use coordinate::{LatLngBounds, NormalizedCoordinate, is_valid_pair, normalize};
pub use event::{EventTarget, PointerButton, PointerSource};
pub use model::{GenderHint, MapItem, MarkerKind, MemberPosition, SavedLocation};
pub use sheet::{
    BottomSheetGestureController, BottomSheetState, GestureEvent, GestureSession, SheetConfig,
    SheetIgnoredReason, SheetOutcome, SheetTransition,
};
