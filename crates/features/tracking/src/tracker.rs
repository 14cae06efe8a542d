use crate::dispatch::{Notification, Shape};
use crate::error::TrackingError;
use crate::registry::{ConsumerRegistry, RegistrationToken};
use cadmin_domain::{Owner, Pid};
use cadmin_queue::{QueueStats, SerializedTaskQueue, ShutdownMode};
use cadmin_store::{BindingPolicy, ChangeListener, ConfigurationGuard, ConfigurationStore};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// What an arrival did with each candidate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub token: RegistrationToken,
    /// Records bound to the consumer's owner; one notification was queued for each.
    pub bound: Vec<Pid>,
    /// Records the owner was not allowed to claim.
    pub denied: Vec<Pid>,
    /// Records that belong to the other consumer shape.
    pub mismatched: Vec<Pid>,
}

/// Outcome of a "modified" presence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// The consumer already holds this pid.
    Unchanged,
    /// The consumer lost its pid; its previous registration (if any) was removed.
    Departed { previous: Option<Pid> },
    /// The previous registration (if any) was removed and the consumer arrived under the new pid.
    Rebound { previous: Option<Pid>, arrival: Arrival },
}

/// Binds records to consumers of one shape and delivers their changes in order.
///
/// Lock order, outermost first: the tracker's reconcile lock, record locks (ascending pid),
/// the registry lock, the queue's sender lock. Store notifications enter at the record lock.
pub struct Tracker<S: Shape> {
    store: Arc<dyn ConfigurationStore>,
    policy: Arc<dyn BindingPolicy>,
    registry: ConsumerRegistry<S::Consumer>,
    queue: SerializedTaskQueue<Notification>,
    reconcile: Mutex<()>,
    shape: PhantomData<S>,
}

impl<S: Shape> fmt::Debug for Tracker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("kind", &S::KIND)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<S: Shape> Tracker<S> {
    /// Creates the tracker and starts its delivery worker.
    ///
    /// # Errors
    /// Returns [`TrackingError::Queue`] if the worker thread cannot be started.
    pub fn new(
        store: Arc<dyn ConfigurationStore>,
        policy: Arc<dyn BindingPolicy>,
    ) -> Result<Self, TrackingError> {
        Ok(Self {
            store,
            policy,
            registry: ConsumerRegistry::new(S::KIND),
            queue: SerializedTaskQueue::new(S::QUEUE)?,
            reconcile: Mutex::new(()),
            shape: PhantomData,
        })
    }

    /// A consumer appeared under `pid`.
    ///
    /// Registers it, then binds every candidate record the owner may claim and queues
    /// one "updated" notification per bound record, in pid order.
    ///
    /// # Errors
    /// * [`TrackingError::AlreadyRegistered`] if another consumer holds `pid`.
    /// * [`TrackingError::Queue`] if the tracker was shut down. A shutdown racing the
    ///   arrival undoes its registration and bindings.
    pub fn arrived(
        &self,
        pid: &Pid,
        owner: &Owner,
        consumer: Arc<S::Consumer>,
    ) -> Result<Arrival, TrackingError> {
        let _reconcile = self.reconcile.lock();
        self.add(pid, owner, consumer)
    }

    /// A consumer went away. Only removes the registration if `consumer` is the
    /// registered handle; the owner's bindings under `pid` are then released so
    /// another owner may claim the records. Nothing is delivered.
    pub fn departed(&self, pid: &Pid, consumer: &Arc<S::Consumer>) -> bool {
        let _reconcile = self.reconcile.lock();
        self.remove(pid, consumer)
    }

    /// The consumer's identity changed: `pid` is its new pid, `None` if it no longer has one.
    ///
    /// # Errors
    /// Same as [`arrived`](Self::arrived). When the new pid is held by another
    /// consumer the previous registration is still removed.
    pub fn modified(
        &self,
        pid: Option<&Pid>,
        owner: &Owner,
        consumer: Arc<S::Consumer>,
    ) -> Result<Modification, TrackingError> {
        let _reconcile = self.reconcile.lock();

        if let Some(pid) = pid
            && self.registry.is_registered(pid, &consumer)
        {
            return Ok(Modification::Unchanged);
        }

        let previous = self.registry.reverse_lookup(&consumer);
        if let Some(previous) = &previous {
            self.remove(previous, &consumer);
        }

        match pid {
            None => Ok(Modification::Departed { previous }),
            Some(pid) => {
                let arrival = self.add(pid, owner, consumer)?;
                Ok(Modification::Rebound { previous, arrival })
            },
        }
    }

    /// Store hook: `record` was updated. Must be called with the record locked.
    ///
    /// Returns `true` if a notification was queued.
    pub fn notify_updated(&self, record: &mut ConfigurationGuard<'_>) -> bool {
        let Some(consumer) = self.bound_consumer(record) else {
            return false;
        };
        let Some(properties) = record.properties() else {
            return false;
        };
        self.dispatch(S::updated(consumer, record.pid().clone(), properties))
    }

    /// Store hook: `record` was deleted. Must be called with the record locked.
    ///
    /// Returns `true` if a notification was queued.
    pub fn notify_deleted(&self, record: &mut ConfigurationGuard<'_>) -> bool {
        let Some(consumer) = self.bound_consumer(record) else {
            return false;
        };
        self.dispatch(S::deleted(consumer, record.pid().clone()))
    }

    /// Blocks until every notification queued so far has been delivered.
    ///
    /// # Errors
    /// Returns [`TrackingError::Queue`] after shutdown or when called from a consumer callback.
    pub fn flush(&self) -> Result<(), TrackingError> {
        self.queue.flush().map_err(TrackingError::from)
    }

    /// Stops delivery. Further arrivals fail; store notifications are dropped.
    ///
    /// # Errors
    /// Returns [`TrackingError::Queue`] if the worker could not be joined.
    pub fn shutdown(&self, mode: ShutdownMode) -> Result<(), TrackingError> {
        debug!(kind = S::KIND, ?mode, "Tracker shutting down");
        self.queue.shutdown(mode).map_err(TrackingError::from)
    }

    #[must_use]
    pub const fn registry(&self) -> &ConsumerRegistry<S::Consumer> {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    fn add(
        &self,
        key: &Pid,
        owner: &Owner,
        consumer: Arc<S::Consumer>,
    ) -> Result<Arrival, TrackingError> {
        if self.queue.is_closed() {
            return Err(TrackingError::Queue {
                source: cadmin_queue::QueueError::Closed {
                    message: "tracker is shut down".into(),
                    context: None,
                },
                context: Some(S::QUEUE.into()),
            });
        }

        // Registered before enumerating: a record created after this point is bound by
        // its own store notification, one created before is among the candidates.
        let token = self.registry.register(key, owner, consumer.clone())?;
        let records = S::candidates(self.store.as_ref(), key);
        let mut guards: Vec<_> = records.iter().map(|record| record.lock()).collect();

        let mut arrival =
            Arrival { token, bound: Vec::new(), denied: Vec::new(), mismatched: Vec::new() };
        let mut failure = None;

        for guard in &mut guards {
            let pid = guard.pid().clone();
            if !guard.is_visible() {
                trace!(kind = S::KIND, pid = %pid, "Skipping deleted or empty configuration");
                continue;
            }
            if S::key_of(guard).as_ref() != Some(key) {
                warn!(pid = %pid, "Configuration for service.pid={pid} should only be used by a {}", S::OTHER);
                arrival.mismatched.push(pid);
                continue;
            }
            if !guard.try_bind(owner, self.policy.as_ref()) {
                warn!(pid = %pid, owner = %owner, "Configuration for service.pid={pid} could not be bound to {owner}");
                arrival.denied.push(pid);
                continue;
            }
            if let Some(properties) = guard.properties() {
                if let Err(err) = self.queue.enqueue(S::updated(consumer.clone(), pid.clone(), properties)) {
                    failure = Some(err);
                    break;
                }
                arrival.bound.push(pid);
            }
        }

        if let Some(err) = failure {
            self.registry.unregister_if(key, &consumer);
            let released = Self::release(&mut guards, key, owner);
            warn!(kind = S::KIND, pid = %key, owner = %owner, released, error = %err, "Arrival rolled back");
            return Err(TrackingError::from(err));
        }

        debug!(
            kind = S::KIND,
            pid = %key,
            owner = %owner,
            bound = arrival.bound.len(),
            denied = arrival.denied.len(),
            "Consumer arrived"
        );
        Ok(arrival)
    }

    fn remove(&self, key: &Pid, consumer: &Arc<S::Consumer>) -> bool {
        let Some(registration) = self.registry.take_if(key, consumer) else {
            debug!(kind = S::KIND, pid = %key, removed = false, "Consumer departed");
            return false;
        };

        let records = S::candidates(self.store.as_ref(), key);
        let mut guards: Vec<_> = records.iter().map(|record| record.lock()).collect();
        let released = Self::release(&mut guards, key, &registration.owner);
        debug!(
            kind = S::KIND,
            pid = %key,
            owner = %registration.owner,
            released,
            "Consumer departed"
        );
        true
    }

    /// Unbinds the records under `key` held by `owner`; returns how many were released.
    fn release(guards: &mut [ConfigurationGuard<'_>], key: &Pid, owner: &Owner) -> usize {
        let mut released = 0;
        for guard in guards {
            if S::key_of(guard).as_ref() == Some(key) && guard.bound_owner() == Some(owner) {
                guard.unbind();
                released += 1;
            }
        }
        released
    }

    /// The consumer responsible for `record`, after re-affirming the binding to its owner.
    fn bound_consumer(&self, record: &mut ConfigurationGuard<'_>) -> Option<Arc<S::Consumer>> {
        let key = S::key_of(record)?;
        let registration = self.registry.lookup(&key)?;
        if record.try_bind(&registration.owner, self.policy.as_ref()) {
            Some(registration.consumer)
        } else {
            debug!(
                kind = S::KIND,
                pid = %record.pid(),
                owner = %registration.owner,
                "Change not delivered: configuration bound to another owner"
            );
            None
        }
    }

    fn dispatch(&self, notification: Notification) -> bool {
        match self.queue.enqueue(notification) {
            Ok(()) => true,
            Err(err) => {
                error!(kind = S::KIND, error = %err, "Notification dropped");
                false
            },
        }
    }
}

impl<S: Shape> ChangeListener for Tracker<S> {
    fn updated(&self, record: &mut ConfigurationGuard<'_>) {
        self.notify_updated(record);
    }

    fn deleted(&self, record: &mut ConfigurationGuard<'_>) {
        self.notify_deleted(record);
    }
}
