#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mapview_core::clock::DeterministicClock;
use mapview_core::event::EventTarget;
use mapview_core::sheet::{BottomSheetGestureController, BottomSheetState, SheetConfig, SheetOutcome};
use std::time::Duration;

#[derive(Debug, Arbitrary)]
enum Op {
    Down { pointer: u8, y: i16, interactive: bool },
    Move { pointer: u8, y: i16 },
    Up { pointer: u8, y: i16 },
    Cancel,
    Advance { ms: u16 },
    SetEnabled(bool),
    Reset,
}

fn rank(state: BottomSheetState) -> i8 {
    match state {
        BottomSheetState::Collapsed => 0,
        BottomSheetState::Middle => 1,
        BottomSheetState::Expanded => 2,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let clock = DeterministicClock::new();
    let mut sheet = BottomSheetGestureController::new(SheetConfig::default(), clock.clone());
    let mut transitions_in_session = 0u32;

    for op in ops.into_iter().take(512) {
        let before = sheet.state();
        let outcome = match op {
            Op::Down { pointer, y, interactive } => {
                let target = if interactive {
                    EventTarget::tag("button")
                } else {
                    EventTarget::surface()
                };
                let outcome = sheet.pointer_down(u32::from(pointer), f64::from(y), &target);
                if matches!(outcome, SheetOutcome::SessionStarted | SheetOutcome::SessionRestarted) {
                    transitions_in_session = 0;
                }
                outcome
            }
            Op::Move { pointer, y } => sheet.pointer_move(u32::from(pointer), f64::from(y)),
            Op::Up { pointer, y } => {
                sheet.pointer_up(u32::from(pointer), f64::from(y), &EventTarget::surface())
            }
            Op::Cancel => sheet.cancel(),
            Op::Advance { ms } => {
                clock.advance(Duration::from_millis(u64::from(ms)));
                continue;
            }
            Op::SetEnabled(enabled) => {
                sheet.set_enabled(enabled);
                assert!(enabled || sheet.session().is_none());
                continue;
            }
            Op::Reset => {
                sheet.reset();
                assert_eq!(sheet.state(), BottomSheetState::Collapsed);
                continue;
            }
        };

        if let Some(t) = outcome.transition() {
            transitions_in_session += 1;
            assert!(transitions_in_session <= 1, "two transitions in one session");
            assert_eq!(t.from, before);
            assert_eq!(t.to, sheet.state());
            assert_eq!((rank(t.to) - rank(t.from)).abs(), 1, "non-adjacent transition");
            assert!(sheet.session().is_none(), "session survived a transition");
        } else {
            assert_eq!(sheet.state(), before, "state changed without a transition");
        }
    }
});
