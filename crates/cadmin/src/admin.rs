use crate::error::{AdminError, AdminErrorExt};
use cadmin_domain::config::{EngineConfig, RecordSeed};
use cadmin_domain::{Owner, Pid, Properties};
use cadmin_kernel::factory_member_pid;
use cadmin_store::{
    AllowAll, BindingPolicy, ChangeListener, Configuration, ConfigurationGuard, ConfigurationStore,
    MemoryStore,
};
use cadmin_tracking::{
    ManagedService, ManagedServiceFactory, ManagedServiceFactoryTracker, ManagedServiceTracker,
    PresenceHub,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A fluent builder for [`ConfigurationAdmin`].
#[must_use = "builders do nothing unless you call .build()"]
pub struct ConfigurationAdminBuilder {
    config: EngineConfig,
    policy: Arc<dyn BindingPolicy>,
}

impl Default for ConfigurationAdminBuilder {
    fn default() -> Self {
        Self { config: EngineConfig::default(), policy: Arc::new(AllowAll) }
    }
}

impl fmt::Debug for ConfigurationAdminBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationAdminBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ConfigurationAdminBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Decides which owners may claim unbound records. Defaults to [`AllowAll`].
    pub fn policy(mut self, policy: Arc<dyn BindingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Starts both delivery queues and subscribes the trackers to their presence hubs.
    ///
    /// # Errors
    /// Returns [`AdminError::Tracking`] if a delivery worker cannot be started.
    pub fn build(self) -> Result<ConfigurationAdmin, AdminError> {
        let store = Arc::new(MemoryStore::new());
        let services = Arc::new(
            ManagedServiceTracker::new(store.clone(), self.policy.clone())
                .context("Failed to start the ManagedService tracker")?,
        );
        let factories = Arc::new(
            ManagedServiceFactoryTracker::new(store.clone(), self.policy)
                .context("Failed to start the ManagedServiceFactory tracker")?,
        );

        let service_presence = PresenceHub::new();
        service_presence.add_listener(services.clone());
        let factory_presence = PresenceHub::new();
        factory_presence.add_listener(factories.clone());

        debug!(shutdown = ?self.config.queue.shutdown, "Configuration admin started");
        Ok(ConfigurationAdmin {
            config: self.config,
            store,
            services,
            factories,
            service_presence,
            factory_presence,
        })
    }
}

/// Record store, both trackers and their presence hubs behind one handle.
///
/// Store changes made through the admin are routed to the tracker matching the
/// record's shape: factory members to the factory tracker, the rest to the
/// singleton tracker.
pub struct ConfigurationAdmin {
    config: EngineConfig,
    store: Arc<MemoryStore>,
    services: Arc<ManagedServiceTracker>,
    factories: Arc<ManagedServiceFactoryTracker>,
    service_presence: PresenceHub<dyn ManagedService>,
    factory_presence: PresenceHub<dyn ManagedServiceFactory>,
}

impl fmt::Debug for ConfigurationAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationAdmin")
            .field("records", &self.store.list().len())
            .field("services", &self.services)
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}

impl ConfigurationAdmin {
    pub fn builder() -> ConfigurationAdminBuilder {
        ConfigurationAdminBuilder::default()
    }

    /// The singleton record for `pid`, created empty when missing.
    pub fn get_configuration(&self, pid: &Pid) -> Arc<Configuration> {
        self.store.get_or_create(pid)
    }

    /// Creates an empty member record of `factory_pid` under a freshly generated pid.
    ///
    /// # Errors
    /// Returns [`AdminError::Store`] if the generated pid collides with an existing record.
    pub fn create_factory_configuration(
        &self,
        factory_pid: &Pid,
    ) -> Result<Arc<Configuration>, AdminError> {
        self.store
            .create(factory_member_pid(factory_pid), Some(factory_pid.clone()))
            .context("Failed to create factory configuration")
    }

    /// Replaces the properties of `pid` and notifies the responsible consumer.
    ///
    /// # Errors
    /// Returns [`AdminError::Store`] if the record is missing or deleted.
    pub fn update(&self, pid: &Pid, properties: Properties) -> Result<(), AdminError> {
        self.store.update(pid, properties, self).map_err(AdminError::from)
    }

    /// Deletes `pid` and notifies the responsible consumer.
    ///
    /// # Errors
    /// Returns [`AdminError::Store`] if the record is missing or already deleted.
    pub fn delete(&self, pid: &Pid) -> Result<(), AdminError> {
        self.store.delete(pid, self).map_err(AdminError::from)
    }

    /// Every live record, in ascending pid order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Configuration>> {
        self.store.list()
    }

    /// Creates and updates each seed record; returns their pids in seed order.
    ///
    /// Singleton seeds must name a `pid`. Factory seeds get a generated pid unless they name one.
    ///
    /// # Errors
    /// * [`AdminError::InvalidSeed`] for a seed with neither `pid` nor `factory_pid`.
    /// * [`AdminError::InvalidSeed`] if a seed names a pid already used by the other shape.
    /// * [`AdminError::Store`] if a seeded record cannot be created or updated.
    pub fn seed(&self, seeds: &[RecordSeed]) -> Result<Vec<Pid>, AdminError> {
        let mut pids = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let record = match (&seed.pid, &seed.factory_pid) {
                (Some(pid), None) => self.store.get_or_create(pid),
                (None, Some(factory_pid)) => self.create_factory_configuration(factory_pid)?,
                (Some(pid), Some(factory_pid)) => match self.store.find(pid) {
                    Some(record) => record,
                    None => self.store.create(pid.clone(), Some(factory_pid.clone()))?,
                },
                (None, None) => {
                    return Err(AdminError::InvalidSeed {
                        message: "a seed record needs a pid or a factory_pid".into(),
                        context: None,
                    });
                },
            };

            if record.factory_pid() != seed.factory_pid.as_ref() {
                return Err(AdminError::InvalidSeed {
                    message: format!("{} already exists with a different factory", record.pid()).into(),
                    context: None,
                });
            }

            self.update(record.pid(), seed.properties.clone())
                .context(format!("Failed to seed {}", record.pid()))?;
            pids.push(record.pid().clone());
        }

        info!(count = pids.len(), "Configuration records seeded");
        Ok(pids)
    }

    /// The owner's deployment unit went away for good: its bindings are released.
    pub fn owner_uninstalled(&self, owner: &Owner) -> usize {
        let released = self.store.release_owner(owner);
        info!(owner = %owner, released, "Owner uninstalled");
        released
    }

    /// Blocks until both trackers have delivered everything queued so far.
    ///
    /// # Errors
    /// Returns [`AdminError::Tracking`] after shutdown or when called from a consumer callback.
    pub fn flush(&self) -> Result<(), AdminError> {
        self.services.flush()?;
        self.factories.flush()?;
        Ok(())
    }

    /// Stops both delivery queues with the configured [`ShutdownMode`](cadmin_queue::ShutdownMode).
    ///
    /// # Errors
    /// Returns the first [`AdminError::Tracking`] failure; the other tracker is still stopped.
    pub fn shutdown(&self) -> Result<(), AdminError> {
        let mode = self.config.queue.shutdown;
        info!(?mode, "Configuration admin shutting down");

        let services = self.services.shutdown(mode);
        let factories = self.factories.shutdown(mode);
        if let Err(err) = &factories {
            warn!(error = %err, "ManagedServiceFactory tracker did not stop cleanly");
        }
        services.context("ManagedService tracker")?;
        factories.context("ManagedServiceFactory tracker")?;
        Ok(())
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Presence hub for singleton consumers; registering here delivers their configuration.
    #[must_use]
    pub const fn services(&self) -> &PresenceHub<dyn ManagedService> {
        &self.service_presence
    }

    /// Presence hub for factory consumers.
    #[must_use]
    pub const fn factories(&self) -> &PresenceHub<dyn ManagedServiceFactory> {
        &self.factory_presence
    }

    #[must_use]
    pub fn service_tracker(&self) -> &ManagedServiceTracker {
        &self.services
    }

    #[must_use]
    pub fn factory_tracker(&self) -> &ManagedServiceFactoryTracker {
        &self.factories
    }
}

impl ChangeListener for ConfigurationAdmin {
    fn updated(&self, record: &mut ConfigurationGuard<'_>) {
        if record.factory_pid().is_some() {
            self.factories.notify_updated(record);
        } else {
            self.services.notify_updated(record);
        }
    }

    fn deleted(&self, record: &mut ConfigurationGuard<'_>) {
        if record.factory_pid().is_some() {
            self.factories.notify_deleted(record);
        } else {
            self.services.notify_deleted(record);
        }
    }
}
