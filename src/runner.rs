mod launch;
mod merge;

pub use crate::runner::{
    launch::{launch, run_cancellable},
    merge::merge,
};
use crate::{
    cancel::CancelToken,
    config::Config,
    error::Error,
    priority::{Ranks, resolve},
    task::Task,
    types::{MergedEvent, TaskOutcome},
};
use crossbeam_channel::Receiver;

/// Merged stream produced by [`ParallelRunner::spawn`].
pub type MergedStream<T> = Receiver<MergedEvent<TaskOutcome<T>>>;

/// Fan-out entry point: runs every task on its own thread and merges their
/// outcomes into one stream.
///
/// Each call starts exactly `N + 1` threads for `N` tasks (one launcher per
/// task and one merger), without pooling. Threads whose results are no longer
/// wanted are never interrupted; cancellation only prevents delivery.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct ParallelRunner {
    config: Config,
}

impl ParallelRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Launches `tasks` and returns the merged stream of their outcomes,
    /// tagged with task indices.
    ///
    /// The tasks and the merger run under a child of `token`. If a thread
    /// cannot be started, that child is cancelled so the already running
    /// tasks discard their results.
    ///
    /// # Errors
    /// [`Error::Spawn`] if any thread could not be started.
    pub fn spawn<I>(
        &self,
        token: &CancelToken,
        tasks: I,
    ) -> Result<MergedStream<<I::Item as Task>::Output>, Error>
    where
        I: IntoIterator,
        I::Item: Task,
    {
        let scope = token.child();
        let guard = scope.clone().drop_guard();
        let sources = tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| launch(&self.config, &scope, index, task))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(tasks = sources.len(), "fan-out started");
        let merged = merge(&self.config, &scope, sources)?;
        let _ = guard.disarm();
        Ok(merged)
    }

    /// Runs `tasks` until all of them finish or `token` is cancelled, and
    /// returns one slot per task in submission order.
    ///
    /// A slot is `None` iff its task did not deliver before the stream closed.
    ///
    /// # Errors
    /// [`Error::Spawn`] if any thread could not be started.
    pub fn run_ordered<I>(
        &self,
        token: &CancelToken,
        tasks: I,
    ) -> Result<Vec<Option<TaskOutcome<<I::Item as Task>::Output>>>, Error>
    where
        I: IntoIterator,
        I::Item: Task,
    {
        let tasks: Vec<_> = tasks.into_iter().collect();
        let mut slots: Vec<_> = (0..tasks.len()).map(|_| None).collect();
        for MergedEvent { value, index } in self.spawn(token, tasks)? {
            slots[index] = Some(value);
        }
        Ok(slots)
    }

    /// Runs `tasks` until all of them finish or `token` is cancelled, and
    /// returns the outcomes that were delivered, in arrival order.
    ///
    /// # Errors
    /// [`Error::Spawn`] if any thread could not be started.
    pub fn run_filtered<I>(
        &self,
        token: &CancelToken,
        tasks: I,
    ) -> Result<Vec<MergedEvent<TaskOutcome<<I::Item as Task>::Output>>>, Error>
    where
        I: IntoIterator,
        I::Item: Task,
    {
        Ok(self.spawn(token, tasks)?.into_iter().collect())
    }

    /// Runs `tasks` and returns the successful value of the most preferred
    /// task, as soon as it can be determined.
    ///
    /// `priorities[i]` is the priority of task `i`; lower is preferred and
    /// equal priorities tie. Tasks without an entry share the lowest
    /// priority. A value counts as successful if `is_success` accepts it; a
    /// panicked task counts as failed. Within a tie the first success to
    /// arrive wins.
    ///
    /// Returns without waiting for less preferred tasks; they are left to
    /// finish on their own and their results are discarded.
    ///
    /// # Errors
    /// - [`Error::NoSuccess`] if no task succeeded before the stream closed,
    ///   including when `token` is cancelled first.
    /// - [`Error::Spawn`] if any thread could not be started.
    pub fn run_most_priority<I, P>(
        &self,
        token: &CancelToken,
        is_success: P,
        priorities: &[i64],
        tasks: I,
    ) -> Result<<I::Item as Task>::Output, Error>
    where
        I: IntoIterator,
        I::Item: Task,
        P: Fn(&<I::Item as Task>::Output) -> bool,
    {
        let tasks: Vec<_> = tasks.into_iter().collect();
        let ranks = Ranks::derive(priorities, tasks.len());
        let scope = token.child();
        let _guard = scope.clone().drop_guard();
        let events = self.spawn(&scope, tasks)?;
        resolve(&ranks, &events, is_success)
    }
}

/// [`ParallelRunner::run_ordered`] with the default [`Config`].
///
/// # Errors
/// See [`ParallelRunner::run_ordered`].
pub fn run_ordered<I>(
    token: &CancelToken,
    tasks: I,
) -> Result<Vec<Option<TaskOutcome<<I::Item as Task>::Output>>>, Error>
where
    I: IntoIterator,
    I::Item: Task,
{
    ParallelRunner::default().run_ordered(token, tasks)
}

/// [`ParallelRunner::run_filtered`] with the default [`Config`].
///
/// # Errors
/// See [`ParallelRunner::run_filtered`].
pub fn run_filtered<I>(
    token: &CancelToken,
    tasks: I,
) -> Result<Vec<MergedEvent<TaskOutcome<<I::Item as Task>::Output>>>, Error>
where
    I: IntoIterator,
    I::Item: Task,
{
    ParallelRunner::default().run_filtered(token, tasks)
}

/// [`ParallelRunner::run_most_priority`] with the default [`Config`].
///
/// ```
/// use cpf::{CancelToken, run_most_priority, task::boxed};
///
/// let token = CancelToken::new();
/// let tasks = vec![boxed(|| 1), boxed(|| 2), boxed(|| 3)];
/// let best = run_most_priority(&token, |_: &i32| true, &[1, 2, 3], tasks).unwrap();
/// assert_eq!(best, 1);
/// ```
///
/// # Errors
/// See [`ParallelRunner::run_most_priority`].
pub fn run_most_priority<I, P>(
    token: &CancelToken,
    is_success: P,
    priorities: &[i64],
    tasks: I,
) -> Result<<I::Item as Task>::Output, Error>
where
    I: IntoIterator,
    I::Item: Task,
    P: Fn(&<I::Item as Task>::Output) -> bool,
{
    ParallelRunner::default().run_most_priority(token, is_success, priorities, tasks)
}
