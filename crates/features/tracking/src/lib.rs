//! # Configuration tracking
//!
//! Tracks configuration consumers, binds configuration records to them and delivers
//! record changes in order on a dedicated worker per tracker.
//!
//! ## Architecture
//!
//! 1.  **[`ConsumerRegistry`]**: pid → consumer, at most one consumer per pid.
//! 2.  **[`Tracker`]**: reconciles consumer arrivals and departures with the records in a
//!     [`ConfigurationStore`](cadmin_store::ConfigurationStore), and turns store changes into
//!     notifications.
//! 3.  **[`Notification`]**: one immutable delivery, built while the record is locked and run
//!     once by the tracker's [`SerializedTaskQueue`](cadmin_queue::SerializedTaskQueue).
//! 4.  **[`PresenceListener`]** / **[`PresenceHub`]**: how consumers announce themselves.
//!
//! Two consumer shapes share one tracker implementation through [`Shape`]:
//! [`ManagedServiceTracker`] for singletons and [`ManagedServiceFactoryTracker`] for factories.
//!
//! ## Example
//!
//! ```rust
//! use cadmin_domain::{Owner, Pid, Properties};
//! use cadmin_store::{AllowAll, MemoryStore};
//! use cadmin_tracking::{ConsumerError, ManagedService, ManagedServiceTracker};
//! use std::sync::Arc;
//!
//! struct Http;
//!
//! impl ManagedService for Http {
//!     fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError> {
//!         let _port = properties.and_then(|p| p.get("port"));
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let pid = Pid::new("org.example.http");
//! store.create(pid.clone(), None)?;
//! store.update(&pid, Properties::new().with("port", 8080), &())?;
//!
//! let tracker = ManagedServiceTracker::new(store.clone(), Arc::new(AllowAll))?;
//! let arrival = tracker.arrived(&pid, &Owner::new("bundle:1"), Arc::new(Http))?;
//! assert_eq!(arrival.bound, vec![pid.clone()]);
//!
//! // Later changes go through the tracker while the record is locked.
//! store.update(&pid, Properties::new().with("port", 8443), &tracker)?;
//! tracker.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod consumer;
pub mod dispatch;
mod error;
pub mod presence;
mod registry;
mod tracker;

pub use crate::consumer::{ConsumerError, ConsumerErrorExt, ManagedService, ManagedServiceFactory};
pub use crate::dispatch::{Factory, Notification, Shape, Singleton};
pub use crate::error::{TrackingError, TrackingErrorExt};
pub use crate::presence::{ConsumerRef, PresenceHub, PresenceListener, ServiceId};
pub use crate::registry::{ConsumerRegistry, Registration, RegistrationToken};
pub use crate::tracker::{Arrival, Modification, Tracker};

/// Tracker for singleton consumers.
pub type ManagedServiceTracker = Tracker<Singleton>;

/// Tracker for factory consumers.
pub type ManagedServiceFactoryTracker = Tracker<Factory>;
