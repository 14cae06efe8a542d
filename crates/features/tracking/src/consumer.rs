//! Callback contracts implemented by configuration consumers.
//!
//! Callbacks run on the tracker's delivery thread, one at a time. A callback
//! that returns an error or panics is logged; later notifications still arrive.

use cadmin_domain::{Pid, Properties};
use std::borrow::Cow;
use std::error::Error;

/// Error a consumer returns from a callback.
#[cadmin_derive::cadmin_error]
pub enum ConsumerError {
    /// The consumer refused the configuration, usually because of one property.
    #[error("Configuration rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The consumer failed while applying the configuration.
    #[error("Consumer failed{}: {source}", format_context(.context))]
    Failed { source: Box<dyn Error + Send + Sync>, context: Option<Cow<'static, str>> },

    #[error("Internal consumer error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ConsumerError {
    /// Rejection naming the offending property.
    pub fn rejected(property: &str, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Rejected { message: reason.into(), context: Some(format!("property '{property}'").into()) }
    }

    /// Wraps an underlying failure; the worker logs it as the cause.
    pub fn failed(
        source: impl Into<Box<dyn Error + Send + Sync>>,
        context: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Failed { source: source.into(), context: Some(context.into()) }
    }
}

/// A consumer configured by exactly one record, identified by its pid.
pub trait ManagedService: Send + Sync + 'static {
    /// Called with the record's properties, or `None` once the record is deleted.
    ///
    /// # Errors
    /// Any error is logged by the delivery worker and otherwise ignored.
    fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError>;
}

/// A consumer that receives every record of one factory.
pub trait ManagedServiceFactory: Send + Sync + 'static {
    /// Human-readable name for log lines.
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Called when the factory record `pid` is bound or its properties change.
    ///
    /// # Errors
    /// Any error is logged by the delivery worker and otherwise ignored.
    fn updated(&self, pid: &Pid, properties: &Properties) -> Result<(), ConsumerError>;

    /// Called when the factory record `pid` is deleted.
    ///
    /// # Errors
    /// Any error is logged by the delivery worker and otherwise ignored.
    fn deleted(&self, pid: &Pid) -> Result<(), ConsumerError>;
}
