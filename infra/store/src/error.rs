use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[cadmin_derive::cadmin_error]
pub enum StoreError {
    #[error("Configuration not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Configuration deleted{}: {message}", format_context(.context))]
    Deleted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Configuration already exists{}: {message}", format_context(.context))]
    AlreadyExists { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
