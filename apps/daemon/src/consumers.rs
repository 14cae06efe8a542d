use cadmin::domain::{Pid, Properties};
use cadmin::tracking::{ConsumerError, ManagedService, ManagedServiceFactory};
use std::borrow::Cow;
use tracing::info;

/// Logs every configuration it receives for one pid.
#[derive(Debug)]
pub struct LoggingService {
    pid: Pid,
}

impl LoggingService {
    #[must_use]
    pub const fn new(pid: Pid) -> Self {
        Self { pid }
    }
}

impl ManagedService for LoggingService {
    fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError> {
        match properties {
            Some(properties) => {
                info!(pid = %self.pid, properties = ?properties, "Configuration updated");
            },
            None => info!(pid = %self.pid, "Configuration deleted"),
        }
        Ok(())
    }
}

/// Logs every member record of one factory.
#[derive(Debug)]
pub struct LoggingFactory {
    factory_pid: Pid,
}

impl LoggingFactory {
    #[must_use]
    pub const fn new(factory_pid: Pid) -> Self {
        Self { factory_pid }
    }
}

impl ManagedServiceFactory for LoggingFactory {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.factory_pid.as_str())
    }

    fn updated(&self, pid: &Pid, properties: &Properties) -> Result<(), ConsumerError> {
        info!(factory_pid = %self.factory_pid, pid = %pid, properties = ?properties, "Factory configuration updated");
        Ok(())
    }

    fn deleted(&self, pid: &Pid) -> Result<(), ConsumerError> {
        info!(factory_pid = %self.factory_pid, pid = %pid, "Factory configuration deleted");
        Ok(())
    }
}
