use crate::{
    error::Cancelled,
    sync::{Arc, AtomicU8, Mutex, Ordering, lock},
};
use crossbeam_channel::{Receiver, Select, SelectedOperation, Sender};
use derive_more::Debug;
use std::{
    convert::Infallible,
    ops::Range,
    time::{Duration, Instant},
};

const ACTIVE: u8 = 0;
const CANCELLED: u8 = 1;
const DEADLINE_EXCEEDED: u8 = 2;

/// Cooperative cancellation signal shared by a whole fan-out tree.
///
/// A token is cheap to clone; clones observe the same state. Derived tokens
/// ([`child`](Self::child), [`with_timeout`](Self::with_timeout),
/// [`with_deadline`](Self::with_deadline)) are cancelled whenever their parent
/// is, and can be cancelled on their own without affecting the parent.
///
/// Cancellation is observable two ways: polling [`is_cancelled`](Self::is_cancelled),
/// or blocking on the token's signal channels, whose only sender is dropped
/// when the token is cancelled.
#[must_use]
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: AtomicU8,
    /// Taken (and thereby dropped) on cancellation, disconnecting `done`.
    #[debug(skip)]
    trigger: Mutex<Option<Sender<Infallible>>>,
    #[debug(skip)]
    done: Receiver<Infallible>,
    deadline: Option<Instant>,
    parent: Option<CancelToken>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// A root token with no deadline. It is only cancelled by [`cancel`](Self::cancel).
    pub fn new() -> Self {
        Self::with_parts(None, None)
    }

    fn with_parts(parent: Option<CancelToken>, deadline: Option<Instant>) -> Self {
        let (trigger, done) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(ACTIVE),
                trigger: Mutex::new(Some(trigger)),
                done,
                deadline,
                parent,
            }),
        }
    }

    /// A derived token cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self::with_parts(Some(self.clone()), None)
    }

    /// A derived token that additionally expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        self.with_deadline(deadline)
    }

    /// A derived token that additionally expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::with_parts(Some(self.clone()), Some(deadline))
    }

    /// Cancels this token and every token derived from it. Idempotent.
    pub fn cancel(&self) {
        let reason = if self.own_deadline_passed() {
            DEADLINE_EXCEEDED
        } else {
            CANCELLED
        };
        if self
            .inner
            .state
            .compare_exchange(ACTIVE, reason, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        drop(lock(&self.inner.trigger).take());
        tracing::trace!(?reason, "cancel token fired");
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Why the token is cancelled, or `None` while it is still active.
    ///
    /// A cancelled ancestor takes precedence over this token's own state.
    #[must_use]
    pub fn err(&self) -> Option<Cancelled> {
        if let Some(reason) = self.inner.parent.as_ref().and_then(CancelToken::err) {
            return Some(reason);
        }
        match self.inner.state.load(Ordering::Acquire) {
            CANCELLED => Some(Cancelled::Cancelled),
            DEADLINE_EXCEEDED => Some(Cancelled::DeadlineExceeded),
            _ if self.own_deadline_passed() => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    /// The earliest deadline of this token and its ancestors.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(CancelToken::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Blocks the current thread until the token is cancelled.
    pub fn wait(&self) {
        let signals = self.signals();
        let mut select = Select::new();
        let range = signals.register(&mut select);
        if let Some(operation) = select_until(&mut select, signals.deadline) {
            signals.complete(operation, &range);
        }
    }

    /// Blocks until the token is cancelled or `timeout` elapses. Returns
    /// whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signals = self.signals();
        let mut select = Select::new();
        let range = signals.register(&mut select);
        let limit = Instant::now().checked_add(timeout).unwrap_or_else(far_future);
        let until = signals.deadline.map_or(limit, |deadline| deadline.min(limit));
        if let Some(operation) = select_until(&mut select, Some(until)) {
            signals.complete(operation, &range);
        }
        self.is_cancelled()
    }

    /// Wraps the token so that it is cancelled when the guard is dropped.
    pub fn drop_guard(self) -> DropGuard {
        DropGuard { token: Some(self) }
    }

    /// Signal channels of this token and its ancestors, plus the earliest
    /// deadline, for use in a [`Select`].
    pub(crate) fn signals(&self) -> Signals {
        let mut receivers = Vec::new();
        let mut token = Some(self);
        while let Some(current) = token {
            receivers.push(current.inner.done.clone());
            token = current.inner.parent.as_ref();
        }
        Signals {
            receivers,
            deadline: self.deadline(),
        }
    }

    fn own_deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Cancels the wrapped token on drop unless [`disarm`](Self::disarm)ed.
#[must_use]
#[derive(Debug)]
pub struct DropGuard {
    token: Option<CancelToken>,
}

impl DropGuard {
    /// Returns the token without cancelling it.
    pub fn disarm(mut self) -> CancelToken {
        self.token
            .take()
            .unwrap_or_else(|| unreachable!("DropGuard::disarm"))
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

/// Cancellation inputs of a token, ready to be registered in a [`Select`].
#[derive(Debug)]
pub(crate) struct Signals {
    receivers: Vec<Receiver<Infallible>>,
    pub(crate) deadline: Option<Instant>,
}

impl Signals {
    /// Adds every signal receiver to `select`, returning the operation
    /// indices they occupy.
    pub(crate) fn register<'a>(&'a self, select: &mut Select<'a>) -> Range<usize> {
        let mut range = usize::MAX..0;
        for receiver in &self.receivers {
            let index = select.recv(receiver);
            range.start = range.start.min(index);
            range.end = range.end.max(index + 1);
        }
        range
    }

    /// Completes a selected signal operation. `operation` must belong to
    /// `range`.
    pub(crate) fn complete(&self, operation: SelectedOperation<'_>, range: &Range<usize>) {
        let index = operation.index();
        debug_assert!(range.contains(&index), "Signals::complete");
        // A signal channel never carries a value; `recv` only observes the
        // disconnection.
        let _ = operation.recv(&self.receivers[index - range.start]);
    }
}

/// Blocks on `select`, giving up at `deadline`.
pub(crate) fn select_until<'a>(
    select: &mut Select<'a>,
    deadline: Option<Instant>,
) -> Option<SelectedOperation<'a>> {
    match deadline {
        Some(deadline) => select.select_deadline(deadline).ok(),
        None => Some(select.select()),
    }
}

fn far_future() -> Instant {
    // Roughly 30 years; `Instant` has no `MAX`.
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365 * 30)
}
