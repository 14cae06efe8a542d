//! Notification construction per consumer shape.

use crate::consumer::{ConsumerError, ManagedService, ManagedServiceFactory};
use cadmin_domain::constants::{FACTORY_QUEUE, SERVICE_QUEUE};
use cadmin_domain::{Pid, Properties};
use cadmin_queue::Task;
use cadmin_store::{Configuration, ConfigurationGuard, ConfigurationStore};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// One delivery to one consumer. Built under the record lock, consumed once by the queue.
pub enum Notification {
    Updated { service: Arc<dyn ManagedService>, pid: Pid, properties: Properties },
    /// Delivered as `updated(None)`.
    Deleted { service: Arc<dyn ManagedService>, pid: Pid },
    FactoryUpdated { factory: Arc<dyn ManagedServiceFactory>, pid: Pid, properties: Properties },
    FactoryDeleted { factory: Arc<dyn ManagedServiceFactory>, pid: Pid },
}

impl Notification {
    #[must_use]
    pub const fn pid(&self) -> &Pid {
        match self {
            Self::Updated { pid, .. }
            | Self::Deleted { pid, .. }
            | Self::FactoryUpdated { pid, .. }
            | Self::FactoryDeleted { pid, .. } => pid,
        }
    }

    #[must_use]
    pub const fn is_deletion(&self) -> bool {
        matches!(self, Self::Deleted { .. } | Self::FactoryDeleted { .. })
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Task for Notification {
    type Error = ConsumerError;

    fn run(self) -> Result<(), ConsumerError> {
        match self {
            Self::Updated { service, properties, .. } => service.updated(Some(&properties)),
            Self::Deleted { service, .. } => service.updated(None),
            Self::FactoryUpdated { factory, pid, properties } => factory.updated(&pid, &properties),
            Self::FactoryDeleted { factory, pid } => factory.deleted(&pid),
        }
    }

    fn describe(&self) -> Cow<'static, str> {
        match self {
            Self::Updated { pid, .. } => format!("updated({pid})").into(),
            Self::Deleted { pid, .. } => format!("updated({pid}, deleted)").into(),
            Self::FactoryUpdated { factory, pid, .. } => {
                format!("{}.updated({pid})", factory.name()).into()
            },
            Self::FactoryDeleted { factory, pid } => format!("{}.deleted({pid})", factory.name()).into(),
        }
    }
}

/// The two consumer shapes. Everything shape-specific in a tracker goes through here.
pub trait Shape: Send + Sync + 'static {
    type Consumer: ?Sized + Send + Sync + 'static;

    /// Consumer kind, for log lines.
    const KIND: &'static str;
    /// Name of the tracker's delivery queue and worker thread.
    const QUEUE: &'static str;
    /// Consumer kind a mismatched record is meant for.
    const OTHER: &'static str;

    /// Records a consumer registered under `key` may bind, in lock order.
    fn candidates(store: &dyn ConfigurationStore, key: &Pid) -> Vec<Arc<Configuration>>;

    /// Registry key responsible for `record`, or `None` if the record belongs to the other shape.
    fn key_of(record: &ConfigurationGuard<'_>) -> Option<Pid>;

    fn updated(consumer: Arc<Self::Consumer>, pid: Pid, properties: Properties) -> Notification;

    fn deleted(consumer: Arc<Self::Consumer>, pid: Pid) -> Notification;
}

/// Consumers bound 1:1 to a record by pid.
#[derive(Debug, Clone, Copy)]
pub struct Singleton;

/// Consumers bound 1:N to every record sharing a factory pid.
#[derive(Debug, Clone, Copy)]
pub struct Factory;

impl Shape for Singleton {
    type Consumer = dyn ManagedService;

    const KIND: &'static str = "ManagedService";
    const QUEUE: &'static str = SERVICE_QUEUE;
    const OTHER: &'static str = "ManagedServiceFactory";

    fn candidates(store: &dyn ConfigurationStore, key: &Pid) -> Vec<Arc<Configuration>> {
        store.find(key).into_iter().collect()
    }

    fn key_of(record: &ConfigurationGuard<'_>) -> Option<Pid> {
        record.factory_pid().is_none().then(|| record.pid().clone())
    }

    fn updated(service: Arc<dyn ManagedService>, pid: Pid, properties: Properties) -> Notification {
        Notification::Updated { service, pid, properties }
    }

    fn deleted(service: Arc<dyn ManagedService>, pid: Pid) -> Notification {
        Notification::Deleted { service, pid }
    }
}

impl Shape for Factory {
    type Consumer = dyn ManagedServiceFactory;

    const KIND: &'static str = "ManagedServiceFactory";
    const QUEUE: &'static str = FACTORY_QUEUE;
    const OTHER: &'static str = "ManagedService";

    /// Every member of `key`, plus a record named `key` that is not one, so the
    /// arrival can report it as mismatched.
    fn candidates(store: &dyn ConfigurationStore, key: &Pid) -> Vec<Arc<Configuration>> {
        let mut records = store.factory_members(key);
        if let Some(record) = store.find(key)
            && record.factory_pid() != Some(key)
        {
            records.push(record);
            records.sort_by(|a, b| a.pid().cmp(b.pid()));
        }
        records
    }

    fn key_of(record: &ConfigurationGuard<'_>) -> Option<Pid> {
        record.factory_pid().cloned()
    }

    fn updated(
        factory: Arc<dyn ManagedServiceFactory>,
        pid: Pid,
        properties: Properties,
    ) -> Notification {
        Notification::FactoryUpdated { factory, pid, properties }
    }

    fn deleted(factory: Arc<dyn ManagedServiceFactory>, pid: Pid) -> Notification {
        Notification::FactoryDeleted { factory, pid }
    }
}
