//! Pure retry decisions for one worker.
//!
//! A worker's life is a small state machine. Each attempt reads, then writes;
//! its result is one of three verdicts, and [`next_attempt_state`] folds the
//! verdict and the budget into the next state:
//!
//! ```text
//!            Committed
//!   attempt ───────────▶ Succeeded
//!      │ Retryable, budget left
//!      ├──────────────▶ Retrying ──▶ attempt
//!      │ Retryable, budget spent
//!      ├──────────────▶ Exhausted
//!      │ Fatal
//!      └──────────────▶ Aborted
//! ```

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// The write was acknowledged.
    Committed,
    /// Lost a race or hit a transient store failure.
    Retryable,
    /// The record cannot be updated by retrying.
    Fatal,
}

/// Where a worker goes after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Done; the append was acknowledged.
    Succeeded { attempts_used: u32 },
    /// Start attempt number `next_attempt` (1-based).
    Retrying { next_attempt: u32 },
    /// Every attempt in the budget was used.
    Exhausted { attempts_used: u32 },
    /// Stopped early on a non-retryable failure.
    Aborted { attempts_used: u32 },
}

impl AttemptState {
    /// True for states that end the worker.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptState::Retrying { .. })
    }
}

/// Next state after attempt number `attempts_used` (1-based) ended with `verdict`.
///
/// `max_attempts` is the total number of attempts allowed, so a worker never
/// issues more than `max_attempts` writes.
#[inline]
pub fn next_attempt_state(attempts_used: u32, max_attempts: u32, verdict: AttemptVerdict) -> AttemptState {
    match verdict {
        AttemptVerdict::Committed => AttemptState::Succeeded { attempts_used },
        AttemptVerdict::Fatal => AttemptState::Aborted { attempts_used },
        AttemptVerdict::Retryable if attempts_used >= max_attempts => AttemptState::Exhausted { attempts_used },
        AttemptVerdict::Retryable => AttemptState::Retrying {
            next_attempt: attempts_used.saturating_add(1),
        },
    }
}

/// Exponential backoff before retry number `retry` (1-based).
///
/// Doubles from `initial_ms` and is capped at `max_ms`. Retry 0 gets no delay.
#[inline]
pub fn compute_backoff_ms(retry: u32, initial_ms: u64, max_ms: u64) -> u64 {
    if retry == 0 {
        return 0;
    }
    let shift = retry.saturating_sub(1).min(63);
    let factor = 1u64 << shift;
    initial_ms.saturating_mul(factor).min(max_ms)
}

/// Apply jitter to `delay_ms` using a caller-supplied sample in `[0, delay_ms / 2]`.
///
/// The result lies in `[delay_ms / 2, delay_ms]`.
#[inline]
pub fn jittered_delay_ms(delay_ms: u64, sample: u64) -> u64 {
    let floor = delay_ms / 2;
    floor.saturating_add(sample.min(delay_ms - floor))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_committed_succeeds() {
        assert_eq!(next_attempt_state(3, 5, AttemptVerdict::Committed), AttemptState::Succeeded {
            attempts_used: 3
        });
    }

    #[test]
    fn test_retryable_with_budget_left() {
        assert_eq!(next_attempt_state(1, 5, AttemptVerdict::Retryable), AttemptState::Retrying {
            next_attempt: 2
        });
    }

    #[test]
    fn test_retryable_on_last_attempt_exhausts() {
        assert_eq!(next_attempt_state(5, 5, AttemptVerdict::Retryable), AttemptState::Exhausted {
            attempts_used: 5
        });
    }

    #[test]
    fn test_fatal_aborts_immediately() {
        assert_eq!(next_attempt_state(1, 50, AttemptVerdict::Fatal), AttemptState::Aborted { attempts_used: 1 });
    }

    #[test]
    fn test_single_attempt_budget() {
        assert_eq!(next_attempt_state(1, 1, AttemptVerdict::Retryable), AttemptState::Exhausted {
            attempts_used: 1
        });
    }

    #[test]
    fn test_terminal_states() {
        assert!(AttemptState::Succeeded { attempts_used: 1 }.is_terminal());
        assert!(AttemptState::Exhausted { attempts_used: 1 }.is_terminal());
        assert!(AttemptState::Aborted { attempts_used: 1 }.is_terminal());
        assert!(!AttemptState::Retrying { next_attempt: 2 }.is_terminal());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(compute_backoff_ms(0, 10, 1000), 0);
        assert_eq!(compute_backoff_ms(1, 10, 1000), 10);
        assert_eq!(compute_backoff_ms(2, 10, 1000), 20);
        assert_eq!(compute_backoff_ms(4, 10, 1000), 80);
        assert_eq!(compute_backoff_ms(20, 10, 1000), 1000);
        assert_eq!(compute_backoff_ms(u32::MAX, 10, 1000), 1000);
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jittered_delay_ms(100, 0), 50);
        assert_eq!(jittered_delay_ms(100, 50), 100);
        assert_eq!(jittered_delay_ms(100, 1000), 100);
        assert_eq!(jittered_delay_ms(0, 5), 0);
        assert_eq!(jittered_delay_ms(1, 1), 1);
    }

    proptest! {
        /// Walking the state machine never uses more than the budget.
        #[test]
        fn prop_attempts_never_exceed_budget(
            max_attempts in 1u32..200,
            verdicts in prop::collection::vec(
                prop_oneof![
                    8 => Just(AttemptVerdict::Retryable),
                    1 => Just(AttemptVerdict::Committed),
                    1 => Just(AttemptVerdict::Fatal),
                ],
                1..400,
            )
        ) {
            let mut attempt = 1u32;
            let mut writes = 0u32;
            let mut terminal = None;
            for verdict in verdicts {
                writes += 1;
                match next_attempt_state(attempt, max_attempts, verdict) {
                    AttemptState::Retrying { next_attempt } => attempt = next_attempt,
                    state => {
                        terminal = Some(state);
                        break;
                    }
                }
            }
            prop_assert!(writes <= max_attempts);
            if let Some(AttemptState::Exhausted { attempts_used }) = terminal {
                prop_assert_eq!(attempts_used, max_attempts);
            }
        }

        #[test]
        fn prop_backoff_bounded(retry in 0u32..100, initial in 1u64..1000, max in 1u64..10_000) {
            prop_assert!(compute_backoff_ms(retry, initial, max) <= max);
        }

        #[test]
        fn prop_backoff_monotonic(retry in 1u32..100, initial in 1u64..1000, max in 1u64..10_000) {
            prop_assert!(compute_backoff_ms(retry, initial, max) <= compute_backoff_ms(retry + 1, initial, max));
        }

        #[test]
        fn prop_jitter_within_range(delay in 0u64..100_000, sample in any::<u64>()) {
            let jittered = jittered_delay_ms(delay, sample);
            prop_assert!(jittered <= delay);
            prop_assert!(jittered >= delay / 2);
        }
    }
}
