//! Thread-per-task fan-out with prioritized fan-in resolution.
//!
//! This crate runs a set of independent computations concurrently and
//! resolves them to results. It:
//! - Starts one OS thread per task plus one merger thread per call, and
//!   merges the task outcomes into a single stream tagged with task indices.
//! - Waits on all sources at once through a `crossbeam_channel::Select`
//!   rather than polling them.
//! - Resolves the most preferred successful value as early as possible: ranks
//!   are derived from a priority list, and after every delivery a scan from
//!   the best rank downwards decides whether the answer is already known.
//! - Shares one cooperative [`CancelToken`] across the whole fan-out tree.
//!   Cancellation stops delivery; it never interrupts a running computation.
//!
//! Key modules:
//! - `runner`: the launcher, the merger and the [`ParallelRunner`] entry
//!   point with its ordered, filtered and most-priority collectors.
//! - `priority`: rank derivation and the resolved-prefix scan.
//! - `cancel`: the cancellation token with optional deadlines.
//! - `config`: thread naming and stack size for spawned threads.
//!
//! Quick start:
//!
//! ```
//! use cpf::{CancelToken, run_most_priority, task::boxed};
//! use std::{thread, time::Duration};
//!
//! let token = CancelToken::new().with_timeout(Duration::from_secs(5));
//! let tasks = vec![
//!     boxed(|| None),
//!     boxed(|| {
//!         thread::sleep(Duration::from_millis(10));
//!         Some("mirror")
//!     }),
//!     boxed(|| Some("fallback")),
//! ];
//! // Task 0 fails, so the slower task 1 beats the faster but less preferred
//! // task 2.
//! let best = run_most_priority(&token, Option::is_some, &[0, 1, 2], tasks).unwrap();
//! assert_eq!(best, Some("mirror"));
//! ```
//!
//! A panic inside a task is captured and treated as that task's failure
//! instead of tearing down its thread silently.

/// Cooperative cancellation shared by a fan-out tree.
///
/// Provides `CancelToken` (with child tokens, timeouts and deadlines) and the
/// `DropGuard` that cancels a token when dropped.
pub mod cancel;
/// Thread settings used by the runner.
pub mod config;
/// Error types returned by the crate.
pub mod error;
/// Rank derivation from priority lists and the resolution algorithm.
///
/// Exposes `Ranks`; the rank table and the draining loop behind
/// `run_most_priority` are internal.
pub mod priority;
/// Fan-out and fan-in.
///
/// Contains `launch` (one task on one thread), `merge` (many channels into
/// one tagged stream), `run_cancellable`, and the `ParallelRunner` with its
/// collectors.
pub mod runner;
mod sync;
/// The `Task` abstraction and boxing helpers.
pub mod task;
/// Common types: task indices, ranks, merged events and task outcomes.
pub mod types;
mod utils;

pub use crate::{
    cancel::CancelToken,
    error::Error,
    runner::{ParallelRunner, run_filtered, run_most_priority, run_ordered},
};
