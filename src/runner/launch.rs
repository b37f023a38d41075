use crate::{
    cancel::{CancelToken, select_until},
    config::Config,
    error::{Cancelled, Error, TaskPanic},
    task::Task,
    types::{TaskIndex, TaskOutcome},
};
use crossbeam_channel::{Receiver, Select};
use std::panic::{self, AssertUnwindSafe};

/// Starts `task` on its own thread and returns the channel its outcome will
/// be delivered on.
///
/// The channel yields at most one value and is closed when the thread exits.
/// If `token` is cancelled by the time the computation returns, the outcome
/// is dropped and the channel closes empty. A panic inside the task is
/// captured and delivered as `Err(TaskPanic)`.
///
/// # Errors
/// [`Error::Spawn`] if the thread could not be started.
pub fn launch<T: Task>(
    config: &Config,
    token: &CancelToken,
    index: TaskIndex,
    task: T,
) -> Result<Receiver<TaskOutcome<T::Output>>, Error> {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let token = token.clone();
    let name = config.task_thread_name(index);
    config
        .builder(name.clone())
        .spawn(move || {
            let outcome = run_captured(task);
            if let Err(panic) = &outcome {
                tracing::warn!(index, message = panic.message(), "task panicked");
            }
            if token.is_cancelled() {
                tracing::trace!(index, "cancelled, discarding task outcome");
                return;
            }
            // The receiver may be gone already; the outcome is simply dropped.
            let _ = sender.send(outcome);
        })
        .map_err(|source| Error::Spawn { name, source })?;
    Ok(receiver)
}

/// Runs a fallible `task` on its own thread and waits for whichever happens
/// first: the task returns, or `token` is cancelled.
///
/// On cancellation the task is abandoned (it keeps running detached) and the
/// cancellation reason is returned through `E`.
///
/// # Errors
/// - The task's own error.
/// - [`Error::Cancelled`] if the token fires first.
/// - [`Error::Panicked`] if the task panics.
/// - [`Error::Spawn`] if the thread could not be started.
pub fn run_cancellable<V, E, T>(token: &CancelToken, task: T) -> Result<V, E>
where
    T: Task<Output = Result<V, E>>,
    V: Send + 'static,
    E: From<Error> + Send + 'static,
{
    if let Some(reason) = token.err() {
        return Err(Error::Cancelled(reason).into());
    }
    let receiver = launch(&Config::default(), token, 0, task)?;
    let signals = token.signals();
    let mut select = Select::new();
    let result_index = select.recv(&receiver);
    let range = signals.register(&mut select);

    let cancelled = || Error::Cancelled(token.err().unwrap_or(Cancelled::Cancelled));
    let Some(operation) = select_until(&mut select, signals.deadline) else {
        return Err(cancelled().into());
    };
    if operation.index() != result_index {
        signals.complete(operation, &range);
        return Err(cancelled().into());
    }
    match operation.recv(&receiver) {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(Error::Panicked(panic).into()),
        // Closed empty: the token fired while the task was finishing.
        Err(_) => Err(cancelled().into()),
    }
}

fn run_captured<T: Task>(task: T) -> TaskOutcome<T::Output> {
    panic::catch_unwind(AssertUnwindSafe(|| task.run()))
        .map_err(|payload| TaskPanic::from_payload(payload.as_ref()))
}
