use cadmin_store::StoreError;
use cadmin_tracking::TrackingError;
use std::borrow::Cow;

/// Errors surfaced by [`ConfigurationAdmin`](crate::ConfigurationAdmin).
#[cadmin_derive::cadmin_error]
pub enum AdminError {
    #[error("Store error{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },

    #[error("Tracking error{}: {source}", format_context(.context))]
    Tracking { source: TrackingError, context: Option<Cow<'static, str>> },

    /// A seed record that names neither a pid nor a factory pid.
    #[error("Invalid seed record{}: {message}", format_context(.context))]
    InvalidSeed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal admin error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
