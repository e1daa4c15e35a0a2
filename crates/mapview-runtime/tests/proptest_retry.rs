#![forbid(unsafe_code)]

//! Property tests for retry budgets.

use mapview_runtime::retry::{BackoffStrategy, RetryPolicy, RetryState};
use proptest::prelude::*;
use web_time::Duration;

fn backoff_strategy() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        (0u64..5_000).prop_map(|delay_ms| BackoffStrategy::Fixed { delay_ms }),
        (0u64..5_000, 0u64..60_000)
            .prop_map(|(base_ms, max_ms)| BackoffStrategy::Exponential { base_ms, max_ms }),
        (0u64..5_000, 0u64..60_000)
            .prop_map(|(base_ms, max_ms)| BackoffStrategy::Linear { base_ms, max_ms }),
    ]
}

fn cap(backoff: &BackoffStrategy) -> Duration {
    match backoff {
        BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
        BackoffStrategy::Exponential { max_ms, .. } | BackoffStrategy::Linear { max_ms, .. } => {
            Duration::from_millis(*max_ms)
        }
    }
}

proptest! {
    #[test]
    fn state_hands_out_exactly_max_retries(max_retries in 0u32..40, backoff in backoff_strategy()) {
        let policy = RetryPolicy::new(max_retries, backoff);
        let limit = cap(&policy.backoff);
        let mut state = RetryState::new(policy.clone());

        let mut total = Duration::ZERO;
        let mut handed_out = 0u32;
        while let Some(delay) = state.next_delay() {
            prop_assert!(delay <= limit);
            total += delay;
            handed_out += 1;
            prop_assert!(handed_out <= max_retries);
        }
        prop_assert_eq!(handed_out, max_retries);
        prop_assert!(state.is_exhausted());
        prop_assert_eq!(state.attempts(), max_retries);
        prop_assert_eq!(total, policy.total_max_delay());
        prop_assert_eq!(state.next_delay(), None);
    }

    #[test]
    fn reset_restores_full_budget(max_retries in 1u32..20, spent in 0u32..40, backoff in backoff_strategy()) {
        let mut state = RetryState::new(RetryPolicy::new(max_retries, backoff));
        for _ in 0..spent {
            state.next_delay();
        }
        state.reset();
        prop_assert_eq!(state.attempts(), 0);
        prop_assert!(!state.is_exhausted());
        let remaining = std::iter::from_fn(|| state.next_delay()).count();
        prop_assert_eq!(remaining, max_retries as usize);
    }

    #[test]
    fn growing_backoff_never_shrinks(base_ms in 0u64..5_000, max_ms in 0u64..60_000, linear in any::<bool>()) {
        let backoff = if linear {
            BackoffStrategy::Linear { base_ms, max_ms }
        } else {
            BackoffStrategy::Exponential { base_ms, max_ms }
        };
        let policy = RetryPolicy::new(70, backoff);
        for attempt in 1..70 {
            prop_assert!(policy.delay(attempt) >= policy.delay(attempt - 1));
        }
    }
}
