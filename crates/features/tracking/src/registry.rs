use crate::error::TrackingError;
use cadmin_domain::{Owner, Pid};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Distinguishes one successful registration from any other, even for the same pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationToken(u64);

/// A live registration: who handles the pid and on whose behalf.
pub struct Registration<C: ?Sized> {
    pub consumer: Arc<C>,
    pub owner: Owner,
    pub token: RegistrationToken,
}

impl<C: ?Sized> Clone for Registration<C> {
    fn clone(&self) -> Self {
        Self { consumer: self.consumer.clone(), owner: self.owner.clone(), token: self.token }
    }
}

impl<C: ?Sized> fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("owner", &self.owner)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Pid → consumer map with at most one consumer per pid.
///
/// The internal lock is held only for map access and never while calling out,
/// so it can always be taken while holding record locks.
pub struct ConsumerRegistry<C: ?Sized> {
    kind: &'static str,
    entries: Mutex<FxHashMap<Pid, Registration<C>>>,
    next_token: AtomicU64,
}

impl<C: ?Sized> fmt::Debug for ConsumerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("kind", &self.kind)
            .field("registered", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl<C: ?Sized> ConsumerRegistry<C> {
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: Mutex::default(), next_token: AtomicU64::new(1) }
    }

    /// Registers `consumer` under `pid`.
    ///
    /// # Errors
    /// Returns [`TrackingError::AlreadyRegistered`] if `pid` is taken; the existing
    /// registration is left untouched.
    pub fn register(
        &self,
        pid: &Pid,
        owner: &Owner,
        consumer: Arc<C>,
    ) -> Result<RegistrationToken, TrackingError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(pid) {
            drop(entries);
            warn!(kind = self.kind, pid = %pid, owner = %owner, "{} already registered for service.pid={pid}", self.kind);
            return Err(TrackingError::AlreadyRegistered {
                message: format!("{} already registered for service.pid={pid}", self.kind).into(),
                context: Some(owner.to_string().into()),
            });
        }

        let token = RegistrationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        entries.insert(pid.clone(), Registration { consumer, owner: owner.clone(), token });
        trace!(kind = self.kind, pid = %pid, owner = %owner, ?token, "Consumer registered");
        Ok(token)
    }

    /// Removes whatever is registered under `pid`. Removing an absent pid is a no-op.
    pub fn unregister(&self, pid: &Pid) -> bool {
        let removed = self.entries.lock().remove(pid).is_some();
        if removed {
            trace!(kind = self.kind, pid = %pid, "Consumer unregistered");
        }
        removed
    }

    /// Removes the registration under `pid` only if it belongs to `consumer`.
    pub fn unregister_if(&self, pid: &Pid, consumer: &Arc<C>) -> bool {
        self.take_if(pid, consumer).is_some()
    }

    /// Like [`unregister_if`](Self::unregister_if), returning the removed registration.
    pub fn take_if(&self, pid: &Pid, consumer: &Arc<C>) -> Option<Registration<C>> {
        let mut entries = self.entries.lock();
        if !entries.get(pid).is_some_and(|entry| same_handle(&entry.consumer, consumer)) {
            return None;
        }
        let removed = entries.remove(pid);
        trace!(kind = self.kind, pid = %pid, "Consumer unregistered");
        removed
    }

    #[must_use]
    pub fn lookup(&self, pid: &Pid) -> Option<Registration<C>> {
        self.entries.lock().get(pid).cloned()
    }

    /// The pid `consumer` is registered under, if any.
    #[must_use]
    pub fn reverse_lookup(&self, consumer: &Arc<C>) -> Option<Pid> {
        self.entries
            .lock()
            .iter()
            .find(|(_, entry)| same_handle(&entry.consumer, consumer))
            .map(|(pid, _)| pid.clone())
    }

    /// `true` if `consumer` is the one registered under `pid`.
    #[must_use]
    pub fn is_registered(&self, pid: &Pid, consumer: &Arc<C>) -> bool {
        self.entries.lock().get(pid).is_some_and(|entry| same_handle(&entry.consumer, consumer))
    }

    /// Registered pids, sorted.
    #[must_use]
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<_> = self.entries.lock().keys().cloned().collect();
        pids.sort();
        pids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Handle identity: same allocation, regardless of vtable.
fn same_handle<C: ?Sized>(a: &Arc<C>, b: &Arc<C>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
