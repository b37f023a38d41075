#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU8, Ordering},
    };
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU8, Ordering},
    };
}

pub(crate) use imp::*;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// The data protected by the crate's mutexes stays consistent across a panic
/// (it is only ever replaced wholesale), so poisoning carries no information.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
