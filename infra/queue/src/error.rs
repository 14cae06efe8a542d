use std::borrow::Cow;

/// Errors that can occur during queue operations.
#[cadmin_derive::cadmin_error]
pub enum QueueError {
    /// The queue was shut down; no further tasks are accepted.
    #[error("Queue closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The worker thread could not be started.
    #[error("Worker spawn failed{}: {source}", format_context(.context))]
    Spawn { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// The call would wait on the worker from the worker itself.
    #[error("Re-entrant call{}: {message}", format_context(.context))]
    Reentrant { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal queue error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
