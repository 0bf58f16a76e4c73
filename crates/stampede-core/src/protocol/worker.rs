//! Retry driver: runs attempts of one protocol until a terminal state.

use std::time::Duration;
use std::time::Instant;

use rand::Rng;
use stampede_store::DocumentStore;
use tracing::debug;
use tracing::warn;

use super::UpdateProtocol;
use crate::error::WorkerFailure;
use crate::types::Backoff;
use crate::types::RetryPolicy;
use crate::types::TrialTarget;
use crate::types::WorkerOutcome;
use crate::verified;
use crate::verified::AttemptState;
use crate::verified::AttemptVerdict;

/// Append `index` with `protocol`, making at most `policy.max_attempts` attempts.
///
/// Never returns an error: every failure is folded into the outcome. Retryable
/// errors consume budget; anything else ends the worker after the attempt that
/// raised it.
pub async fn run_worker(
    protocol: &dyn UpdateProtocol,
    store: &dyn DocumentStore,
    target: &TrialTarget,
    index: u32,
    policy: &RetryPolicy,
) -> WorkerOutcome {
    let started = Instant::now();
    let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if policy.max_attempts == 0 {
        let failure = WorkerFailure::RetryBudgetExhausted {
            index,
            attempts: 0,
            last_error: None,
        };
        return WorkerOutcome::failure(index, 0, failure.to_string(), elapsed_ms());
    }

    let mut attempt = 1u32;
    loop {
        let (verdict, error) = match protocol.attempt_update(store, target, index).await {
            Ok(()) => (AttemptVerdict::Committed, None),
            Err(error) if error.is_retryable() => (AttemptVerdict::Retryable, Some(error)),
            Err(error) => (AttemptVerdict::Fatal, Some(error)),
        };

        match (verified::next_attempt_state(attempt, policy.max_attempts, verdict), error) {
            (AttemptState::Succeeded { attempts_used }, _) => {
                debug!(index, attempts_used, protocol = %protocol.kind(), "append committed");
                return WorkerOutcome::success(index, attempts_used, elapsed_ms());
            }
            (AttemptState::Retrying { next_attempt }, error) => {
                if let Some(error) = error {
                    debug!(index, attempt, error = %error, "attempt failed, retrying");
                }
                sleep_before_retry(&policy.backoff, attempt).await;
                attempt = next_attempt;
            }
            (AttemptState::Aborted { attempts_used }, Some(source)) => {
                let failure = WorkerFailure::Aborted {
                    index,
                    attempts: attempts_used,
                    source,
                };
                warn!(index, attempts_used, error = %failure, "worker aborted");
                return WorkerOutcome::failure(index, attempts_used, failure.to_string(), elapsed_ms());
            }
            (AttemptState::Exhausted { attempts_used } | AttemptState::Aborted { attempts_used }, last_error) => {
                let failure = WorkerFailure::RetryBudgetExhausted {
                    index,
                    attempts: attempts_used,
                    last_error,
                };
                warn!(index, attempts_used, error = %failure, "retry budget exhausted");
                return WorkerOutcome::failure(index, attempts_used, failure.to_string(), elapsed_ms());
            }
        }
    }
}

async fn sleep_before_retry(backoff: &Backoff, retry: u32) {
    let Backoff::Exponential {
        initial_ms,
        max_ms,
        jitter,
    } = *backoff
    else {
        return;
    };

    let mut delay_ms = verified::compute_backoff_ms(retry, initial_ms, max_ms);
    if jitter && delay_ms > 0 {
        let sample = rand::rng().random_range(0..=delay_ms / 2);
        delay_ms = verified::jittered_delay_ms(delay_ms, sample);
    }
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
