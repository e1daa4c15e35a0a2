#![no_main]

use libfuzzer_sys::fuzz_target;
use mapview_core::clock::DeterministicClock;
use mapview_core::sheet::{BottomSheetGestureController, SheetConfig};
use mapview_web::sheet_pointer::{SheetCaptureCommand, SheetPointerAdapter, SheetPointerInput};

fuzz_target!(|data: &[u8]| {
    let controller = BottomSheetGestureController::new(SheetConfig::default(), DeterministicClock::new());
    let mut adapter = SheetPointerAdapter::new(controller);

    // One host message per line.
    for line in data.split(|b| *b == b'\n').take(256) {
        let Ok(input) = serde_json::from_slice::<SheetPointerInput>(line) else {
            continue;
        };
        let active_before = adapter.active_pointer_id();
        let dispatch = adapter.dispatch(&input);
        if let Some(SheetCaptureCommand::Release { pointer_id }) = dispatch.capture_command {
            assert_eq!(Some(pointer_id), active_before, "released a pointer that was not active");
        }
        if dispatch.transition.is_some() {
            assert!(adapter.controller().session().is_none());
        }
    }
});
