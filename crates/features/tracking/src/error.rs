use cadmin_queue::QueueError;
use std::borrow::Cow;

/// Errors returned by trackers and the consumer registry.
#[cadmin_derive::cadmin_error]
pub enum TrackingError {
    /// Another consumer already holds the identifier; the earlier registration stays.
    #[error("Consumer already registered{}: {message}", format_context(.context))]
    AlreadyRegistered { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Delivery queue error{}: {source}", format_context(.context))]
    Queue { source: QueueError, context: Option<Cow<'static, str>> },

    #[error("Internal tracking error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
