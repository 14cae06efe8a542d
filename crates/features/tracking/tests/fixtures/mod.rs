use cadmin_domain::{Owner, Pid, Properties, PropertyValue};
use cadmin_store::{AllowAll, BindingPolicy, Configuration, ConfigurationStore, MemoryStore};
use cadmin_tracking::*;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One delivered callback, as observed by a test consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Updated { consumer: &'static str, properties: Option<Properties> },
    FactoryUpdated { consumer: &'static str, pid: Pid, properties: Properties },
    FactoryDeleted { consumer: &'static str, pid: Pid },
}

impl Delivery {
    /// Value of `key` in the delivered properties, if any.
    pub fn value(&self, key: &str) -> Option<&PropertyValue> {
        match self {
            Self::Updated { properties, .. } => properties.as_ref()?.get(key),
            Self::FactoryUpdated { properties, .. } => properties.get(key),
            Self::FactoryDeleted { .. } => None,
        }
    }
}

/// Shared, ordered log of deliveries across consumers.
pub type Journal = Arc<Mutex<Vec<Delivery>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub struct RecordingService {
    pub name: &'static str,
    pub journal: Journal,
}

impl ManagedService for RecordingService {
    fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError> {
        self.journal
            .lock()
            .push(Delivery::Updated { consumer: self.name, properties: properties.cloned() });
        Ok(())
    }
}

/// Counts calls, then fails or panics on every one of them.
pub struct FailingService {
    pub calls: AtomicUsize,
    pub panic: bool,
}

impl ManagedService for FailingService {
    fn updated(&self, _properties: Option<&Properties>) -> Result<(), ConsumerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("consumer exploded");
        }
        Err(ConsumerError::failed(std::io::Error::other("disk full"), "applying configuration"))
    }
}

pub struct RecordingFactory {
    pub name: &'static str,
    pub journal: Journal,
}

impl ManagedServiceFactory for RecordingFactory {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name)
    }

    fn updated(&self, pid: &Pid, properties: &Properties) -> Result<(), ConsumerError> {
        self.journal.lock().push(Delivery::FactoryUpdated {
            consumer: self.name,
            pid: pid.clone(),
            properties: properties.clone(),
        });
        Ok(())
    }

    fn deleted(&self, pid: &Pid) -> Result<(), ConsumerError> {
        self.journal.lock().push(Delivery::FactoryDeleted { consumer: self.name, pid: pid.clone() });
        Ok(())
    }
}

pub fn pid(value: &str) -> Pid {
    Pid::new(value)
}

pub fn owner(value: &str) -> Owner {
    Owner::new(value)
}

pub fn service(name: &'static str, journal: &Journal) -> Arc<dyn ManagedService> {
    Arc::new(RecordingService { name, journal: journal.clone() })
}

pub fn factory(name: &'static str, journal: &Journal) -> Arc<dyn ManagedServiceFactory> {
    Arc::new(RecordingFactory { name, journal: journal.clone() })
}

/// A store plus both trackers, sharing one binding policy.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub services: ManagedServiceTracker,
    pub factories: ManagedServiceFactoryTracker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(Arc::new(AllowAll))
    }

    pub fn with_policy(policy: Arc<dyn BindingPolicy>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = ManagedServiceTracker::new(store.clone(), policy.clone()).expect("tracker");
        let factories = ManagedServiceFactoryTracker::new(store.clone(), policy).expect("tracker");
        Self { store, services, factories }
    }

    /// Creates or replaces a singleton record, routing the change to the singleton tracker.
    pub fn put(&self, id: &str, properties: Properties) {
        let id = pid(id);
        self.store.get_or_create(&id);
        self.store.update(&id, properties, &self.services).expect("update");
    }

    /// Creates a factory record with the given properties.
    pub fn put_member(&self, factory_pid: &str, id: &str, properties: Properties) {
        let id = pid(id);
        if self.store.get(&id).is_err() {
            self.store.create(id.clone(), Some(pid(factory_pid))).expect("create");
        }
        self.store.update(&id, properties, &self.factories).expect("update");
    }

    pub fn delete(&self, id: &str) {
        let id = pid(id);
        let is_member = self.store.get(&id).expect("record").factory_pid().is_some();
        if is_member {
            self.store.delete(&id, &self.factories).expect("delete");
        } else {
            self.store.delete(&id, &self.services).expect("delete");
        }
    }

    pub fn flush(&self) {
        self.services.flush().expect("flush services");
        self.factories.flush().expect("flush factories");
    }

    pub fn bound_owner(&self, id: &str) -> Option<Owner> {
        self.store.get(&pid(id)).ok()?.lock().bound_owner().cloned()
    }
}

/// Presence listener that records the pid of every arrival it sees.
#[derive(Default)]
pub struct ArrivalLog {
    pub pids: Mutex<Vec<Pid>>,
}

impl PresenceListener<dyn ManagedService> for ArrivalLog {
    fn arrived(&self, reference: &ConsumerRef<dyn ManagedService>) {
        if let Some(pid) = &reference.pid {
            self.pids.lock().push(pid.clone());
        }
    }

    fn modified(&self, _reference: &ConsumerRef<dyn ManagedService>) {}

    fn departed(&self, _reference: &ConsumerRef<dyn ManagedService>) {}
}

type Hook = Box<dyn FnOnce() + Send>;

/// A [`MemoryStore`] that runs a one-shot hook right after its next lookup,
/// so a test can change the store between a tracker's lookup and its locking.
pub struct HookedStore {
    pub inner: Arc<MemoryStore>,
    hook: Mutex<Option<Hook>>,
}

impl HookedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self { inner, hook: Mutex::new(None) })
    }

    pub fn after_next_lookup(&self, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    fn run_hook(&self) {
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl ConfigurationStore for HookedStore {
    fn find(&self, pid: &Pid) -> Option<Arc<Configuration>> {
        let found = self.inner.find(pid);
        self.run_hook();
        found
    }

    fn factory_members(&self, factory_pid: &Pid) -> Vec<Arc<Configuration>> {
        let members = self.inner.factory_members(factory_pid);
        self.run_hook();
        members
    }
}

pub fn props(pairs: &[(&str, i64)]) -> Properties {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}
