use crate::error::TaskPanic;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap as _HashMap;

/// Position of a task in the list submitted to the runner.
pub type TaskIndex = usize;

/// What a launcher delivers for a task that ran to completion: its value, or
/// the captured panic.
pub type TaskOutcome<T> = Result<T, TaskPanic>;

/// Dense, order-preserving compression of a priority value. Rank `0` is the
/// most preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Rank(pub(crate) usize);

impl Rank {
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// A value flowing out of the merger, tagged with the index of the source
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEvent<T> {
    pub value: T,
    pub index: TaskIndex,
}

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
