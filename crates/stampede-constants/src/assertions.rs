//! Compile-time checks on relationships between constants.

use super::harness::*;
use super::retry::*;

const _: () = assert!(DEFAULT_WORKER_COUNT > 0);
const _: () = assert!(DEFAULT_WORKER_COUNT <= MAX_WORKER_COUNT);

const _: () = assert!(DEFAULT_MAX_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_MAX_ATTEMPTS <= MAX_ATTEMPTS_LIMIT);

const _: () = assert!(DEFAULT_BACKOFF_INITIAL_MS > 0);
const _: () = assert!(DEFAULT_BACKOFF_INITIAL_MS <= DEFAULT_BACKOFF_MAX_MS);
const _: () = assert!(DEFAULT_BACKOFF_MAX_MS <= MAX_BACKOFF_MS);

const _: () = assert!(!DEFAULT_TABLE_NAME.is_empty());
