use crate::policy::BindingPolicy;
use cadmin_domain::constants::{FACTORY_PID, SERVICE_PID};
use cadmin_domain::{Owner, Pid, Properties, PropertyValue};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct RecordState {
    properties: Option<Properties>,
    deleted: bool,
    bound: Option<Owner>,
}

/// One configuration record: a pid, an optional factory pid and lock-protected state.
#[derive(Debug)]
pub struct Configuration {
    pid: Pid,
    factory_pid: Option<Pid>,
    state: Mutex<RecordState>,
}

impl Configuration {
    #[must_use]
    pub fn new(pid: Pid, factory_pid: Option<Pid>) -> Self {
        Self { pid, factory_pid, state: Mutex::default() }
    }

    #[must_use]
    pub const fn pid(&self) -> &Pid {
        &self.pid
    }

    #[must_use]
    pub const fn factory_pid(&self) -> Option<&Pid> {
        self.factory_pid.as_ref()
    }

    /// Acquires the record lock. Not reentrant: locking twice from one thread deadlocks.
    pub fn lock(&self) -> ConfigurationGuard<'_> {
        ConfigurationGuard { record: self, state: self.state.lock() }
    }
}

/// Exclusive access to a [`Configuration`]. The lock is released on drop.
pub struct ConfigurationGuard<'a> {
    record: &'a Configuration,
    state: MutexGuard<'a, RecordState>,
}

impl fmt::Debug for ConfigurationGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationGuard")
            .field("pid", &self.record.pid)
            .field("factory_pid", &self.record.factory_pid)
            .field("deleted", &self.state.deleted)
            .field("bound", &self.state.bound)
            .finish_non_exhaustive()
    }
}

impl ConfigurationGuard<'_> {
    #[must_use]
    pub const fn pid(&self) -> &Pid {
        &self.record.pid
    }

    #[must_use]
    pub const fn factory_pid(&self) -> Option<&Pid> {
        self.record.factory_pid.as_ref()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state.deleted
    }

    /// `true` once the record has been given properties and is not deleted.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.state.deleted && self.state.properties.is_some()
    }

    /// Snapshot of the current properties with `service.pid` (and
    /// `service.factoryPid` for factory records) filled in.
    ///
    /// `None` while the record has never been updated or after deletion.
    #[must_use]
    pub fn properties(&self) -> Option<Properties> {
        if self.state.deleted {
            return None;
        }
        let mut properties = self.state.properties.clone()?;
        properties.insert(SERVICE_PID, PropertyValue::from(self.record.pid.as_str()));
        if let Some(factory_pid) = &self.record.factory_pid {
            properties.insert(FACTORY_PID, PropertyValue::from(factory_pid.as_str()));
        }
        Some(properties)
    }

    #[must_use]
    pub fn bound_owner(&self) -> Option<&Owner> {
        self.state.bound.as_ref()
    }

    /// Binds the record to `owner` if allowed.
    ///
    /// Returns `true` when the record is (now) bound to `owner`. The policy is only
    /// consulted for unbound records; a record bound elsewhere is never re-bound.
    pub fn try_bind(&mut self, owner: &Owner, policy: &dyn BindingPolicy) -> bool {
        match &self.state.bound {
            Some(current) => current == owner,
            None if policy.permits(&self.record.pid, owner) => {
                debug!(pid = %self.record.pid, owner = %owner, "Configuration bound");
                self.state.bound = Some(owner.clone());
                true
            },
            None => false,
        }
    }

    pub(crate) fn set_properties(&mut self, properties: Properties) {
        let mut properties = properties;
        // Identity keys are derived, never stored.
        properties.remove(SERVICE_PID);
        properties.remove(FACTORY_PID);
        self.state.properties = Some(properties);
        trace!(pid = %self.record.pid, "Configuration properties replaced");
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state.deleted = true;
        self.state.properties = None;
    }

    /// Clears the binding, making the record claimable again. Returns the previous owner.
    pub fn unbind(&mut self) -> Option<Owner> {
        let previous = self.state.bound.take();
        if let Some(owner) = &previous {
            debug!(pid = %self.record.pid, owner = %owner, "Configuration unbound");
        }
        previous
    }
}
