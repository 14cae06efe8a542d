//! Presence events: consumers appearing, changing identity and going away.

use crate::dispatch::Shape;
use crate::tracker::Tracker;
use cadmin_domain::{Owner, Pid};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// A consumer as seen by the presence service.
pub struct ConsumerRef<C: ?Sized> {
    /// `None` when the consumer does not advertise a pid; such consumers are not tracked.
    pub pid: Option<Pid>,
    pub owner: Owner,
    pub consumer: Arc<C>,
}

impl<C: ?Sized> Clone for ConsumerRef<C> {
    fn clone(&self) -> Self {
        Self { pid: self.pid.clone(), owner: self.owner.clone(), consumer: self.consumer.clone() }
    }
}

impl<C: ?Sized> fmt::Debug for ConsumerRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRef")
            .field("pid", &self.pid)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Receives presence events synchronously.
pub trait PresenceListener<C: ?Sized>: Send + Sync {
    fn arrived(&self, reference: &ConsumerRef<C>);
    /// The consumer's pid changed (possibly to or from `None`).
    fn modified(&self, reference: &ConsumerRef<C>);
    fn departed(&self, reference: &ConsumerRef<C>);
}

impl<S: Shape> PresenceListener<S::Consumer> for Tracker<S> {
    fn arrived(&self, reference: &ConsumerRef<S::Consumer>) {
        let Some(pid) = &reference.pid else {
            trace!(kind = S::KIND, owner = %reference.owner, "Ignoring consumer without a pid");
            return;
        };
        // Duplicates are already logged by the registry.
        if let Err(err) = Tracker::arrived(self, pid, &reference.owner, reference.consumer.clone()) {
            debug!(kind = S::KIND, pid = %pid, error = %err, "Arrival rejected");
        }
    }

    fn modified(&self, reference: &ConsumerRef<S::Consumer>) {
        if let Err(err) =
            Tracker::modified(self, reference.pid.as_ref(), &reference.owner, reference.consumer.clone())
        {
            debug!(kind = S::KIND, pid = ?reference.pid, error = %err, "Modification rejected");
        }
    }

    fn departed(&self, reference: &ConsumerRef<S::Consumer>) {
        let pid = reference.pid.clone().or_else(|| self.registry().reverse_lookup(&reference.consumer));
        if let Some(pid) = pid {
            Tracker::departed(self, &pid, &reference.consumer);
        }
    }
}

/// Identifies one registration with a [`PresenceHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId(u64);

/// A minimal in-process presence service.
///
/// Listener callbacks always run after the hub's own locks are released, so
/// listeners may call back into the hub. Lock order: services, then listeners.
pub struct PresenceHub<C: ?Sized + Send + Sync + 'static> {
    listeners: RwLock<Vec<Arc<dyn PresenceListener<C>>>>,
    services: Mutex<FxHashMap<ServiceId, ConsumerRef<C>>>,
    next_id: AtomicU64,
}

impl<C: ?Sized + Send + Sync + 'static> fmt::Debug for PresenceHub<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceHub")
            .field("listeners", &self.listeners.read().len())
            .field("services", &self.services.lock().len())
            .finish()
    }
}

impl<C: ?Sized + Send + Sync + 'static> Default for PresenceHub<C> {
    fn default() -> Self {
        Self { listeners: RwLock::default(), services: Mutex::default(), next_id: AtomicU64::new(1) }
    }
}

impl<C: ?Sized + Send + Sync + 'static> PresenceHub<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and replays every current registration to it as an arrival.
    ///
    /// A consumer published concurrently is seen exactly once: either replayed here
    /// or fired by its own registration.
    pub fn add_listener(&self, listener: Arc<dyn PresenceListener<C>>) {
        let mut current: Vec<_> = {
            let services = self.services.lock();
            self.listeners.write().push(listener.clone());
            services.iter().map(|(id, r)| (*id, r.clone())).collect()
        };
        current.sort_by_key(|(id, _)| id.0);
        for (_, reference) in &current {
            listener.arrived(reference);
        }
    }

    /// Publishes a consumer. Listeners see it as an arrival.
    pub fn register(&self, pid: Option<Pid>, owner: Owner, consumer: Arc<C>) -> ServiceId {
        let id = ServiceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let reference = ConsumerRef { pid, owner, consumer };
        let listeners = {
            let mut services = self.services.lock();
            services.insert(id, reference.clone());
            self.listeners.read().clone()
        };
        Self::fire(&listeners, |listener| listener.arrived(&reference));
        id
    }

    /// Changes the advertised pid of a published consumer. Listeners see a modification.
    pub fn set_pid(&self, id: ServiceId, pid: Option<Pid>) -> bool {
        let (reference, listeners) = {
            let mut services = self.services.lock();
            let Some(reference) = services.get_mut(&id) else {
                return false;
            };
            reference.pid = pid;
            (reference.clone(), self.listeners.read().clone())
        };
        Self::fire(&listeners, |listener| listener.modified(&reference));
        true
    }

    /// Withdraws a consumer. Listeners see a departure.
    pub fn unregister(&self, id: ServiceId) -> bool {
        let (reference, listeners) = {
            let mut services = self.services.lock();
            let Some(reference) = services.remove(&id) else {
                return false;
            };
            (reference, self.listeners.read().clone())
        };
        Self::fire(&listeners, |listener| listener.departed(&reference));
        true
    }

    /// Runs `event` for a listener snapshot taken under the services lock.
    fn fire(listeners: &[Arc<dyn PresenceListener<C>>], event: impl Fn(&dyn PresenceListener<C>)) {
        for listener in listeners {
            event(listener.as_ref());
        }
    }
}
