use crate::error::StoreError;
use crate::record::{Configuration, ConfigurationGuard};
use cadmin_domain::{Owner, Pid, Properties};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Read access to records, as needed by the trackers.
pub trait ConfigurationStore: Send + Sync {
    /// The record with this pid, if it exists.
    fn find(&self, pid: &Pid) -> Option<Arc<Configuration>>;

    /// Every record of the factory, in ascending pid order.
    fn factory_members(&self, factory_pid: &Pid) -> Vec<Arc<Configuration>>;
}

/// Observer of store mutations.
///
/// Both callbacks run with the record locked; implementations must not lock it again.
pub trait ChangeListener {
    fn updated(&self, record: &mut ConfigurationGuard<'_>);
    fn deleted(&self, record: &mut ConfigurationGuard<'_>);
}

impl ChangeListener for () {
    fn updated(&self, _record: &mut ConfigurationGuard<'_>) {}
    fn deleted(&self, _record: &mut ConfigurationGuard<'_>) {}
}

/// In-memory [`ConfigurationStore`] indexed by pid.
///
/// The index lock is never held while a record lock is taken.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Pid, Arc<Configuration>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record (no properties yet).
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if the pid is taken.
    pub fn create(
        &self,
        pid: Pid,
        factory_pid: Option<Pid>,
    ) -> Result<Arc<Configuration>, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&pid) {
            return Err(StoreError::AlreadyExists {
                message: pid.to_string().into(),
                context: factory_pid.map(|f| format!("factory {f}").into()),
            });
        }

        let record = Arc::new(Configuration::new(pid.clone(), factory_pid));
        records.insert(pid, record.clone());
        debug!(pid = %record.pid(), factory_pid = ?record.factory_pid(), "Configuration created");
        Ok(record)
    }

    /// Returns the singleton record for `pid`, creating it when missing.
    pub fn get_or_create(&self, pid: &Pid) -> Arc<Configuration> {
        if let Some(record) = self.find(pid) {
            return record;
        }
        let mut records = self.records.write();
        records
            .entry(pid.clone())
            .or_insert_with(|| {
                debug!(pid = %pid, "Configuration created");
                Arc::new(Configuration::new(pid.clone(), None))
            })
            .clone()
    }

    /// # Errors
    /// Returns [`StoreError::NotFound`] if no record has this pid.
    pub fn get(&self, pid: &Pid) -> Result<Arc<Configuration>, StoreError> {
        self.find(pid)
            .ok_or_else(|| StoreError::NotFound { message: pid.to_string().into(), context: None })
    }

    /// Replaces the properties of `pid` and reports the change while the record is locked.
    ///
    /// # Errors
    /// * [`StoreError::NotFound`] if the record does not exist.
    /// * [`StoreError::Deleted`] if the record was deleted concurrently.
    pub fn update(
        &self,
        pid: &Pid,
        properties: Properties,
        listener: &dyn ChangeListener,
    ) -> Result<(), StoreError> {
        let record = self.get(pid)?;
        let mut guard = record.lock();
        if guard.is_deleted() {
            return Err(deleted(pid));
        }

        guard.set_properties(properties);
        debug!(pid = %pid, "Configuration updated");
        listener.updated(&mut guard);
        Ok(())
    }

    /// Marks `pid` deleted, reports it while the record is locked, then drops it from the index.
    ///
    /// # Errors
    /// * [`StoreError::NotFound`] if the record does not exist.
    /// * [`StoreError::Deleted`] if it was already deleted.
    pub fn delete(&self, pid: &Pid, listener: &dyn ChangeListener) -> Result<(), StoreError> {
        let record = self.get(pid)?;
        {
            let mut guard = record.lock();
            if guard.is_deleted() {
                return Err(deleted(pid));
            }
            guard.mark_deleted();
            debug!(pid = %pid, "Configuration deleted");
            listener.deleted(&mut guard);
        }

        let mut records = self.records.write();
        if records.get(pid).is_some_and(|current| Arc::ptr_eq(current, &record)) {
            records.remove(pid);
        }
        Ok(())
    }

    /// Every live record, in ascending pid order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Configuration>> {
        self.records.read().values().cloned().collect()
    }

    /// Drops every binding held by `owner`, making those records claimable again.
    ///
    /// Returns the number of records released.
    pub fn release_owner(&self, owner: &Owner) -> usize {
        let mut released = 0;
        for record in self.list() {
            let mut guard = record.lock();
            if guard.bound_owner() == Some(owner) {
                guard.unbind();
                released += 1;
            }
        }
        debug!(owner = %owner, released, "Owner bindings released");
        released
    }
}

impl ConfigurationStore for MemoryStore {
    fn find(&self, pid: &Pid) -> Option<Arc<Configuration>> {
        self.records.read().get(pid).cloned()
    }

    fn factory_members(&self, factory_pid: &Pid) -> Vec<Arc<Configuration>> {
        self.records
            .read()
            .values()
            .filter(|record| record.factory_pid() == Some(factory_pid))
            .cloned()
            .collect()
    }
}

fn deleted(pid: &Pid) -> StoreError {
    StoreError::Deleted { message: pid.to_string().into(), context: None }
}
