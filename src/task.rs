/// A single zero-argument computation submitted for concurrent execution.
///
/// Implemented for every `FnOnce() -> T + Send + 'static`, so closures and
/// [`BoxedTask`]s can be passed directly. A task is identified only by its
/// position in the list handed to the runner.
pub trait Task: Send + 'static {
    /// Task output type.
    type Output: Send + 'static;
    /// Run the computation to completion on the current thread.
    fn run(self) -> Self::Output;
}

impl<F, T> Task for F
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    #[inline]
    fn run(self) -> T {
        self()
    }
}

/// Type-erased task, for task lists mixing different closures.
pub type BoxedTask<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// Boxes `task` into a [`BoxedTask`].
///
/// ```
/// use cpf::task::{BoxedTask, boxed};
///
/// let offset = 10;
/// let tasks: Vec<BoxedTask<i32>> = vec![boxed(|| 1), boxed(move || 1 + offset)];
/// assert_eq!(tasks.len(), 2);
/// ```
pub fn boxed<T, F>(task: F) -> BoxedTask<T>
where
    F: FnOnce() -> T + Send + 'static,
{
    Box::new(task)
}
