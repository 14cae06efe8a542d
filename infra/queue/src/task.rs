use std::borrow::Cow;
use std::error::Error;

/// A unit of work executed by a [`SerializedTaskQueue`](crate::SerializedTaskQueue).
///
/// Tasks own everything they need; they are moved to the worker thread and
/// consumed by [`run`](Task::run).
pub trait Task: Send + 'static {
    type Error: Error + Send + Sync + 'static;

    /// Executes the task on the worker thread.
    ///
    /// # Errors
    /// Any error is logged by the worker (with its `source()` as cause) and
    /// otherwise swallowed.
    fn run(self) -> Result<(), Self::Error>;

    /// Short label for log lines.
    fn describe(&self) -> Cow<'static, str>;
}
