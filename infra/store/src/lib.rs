//! Configuration records and the store that owns them.
//!
//! # Core Features
//!
//! - **Record Locks**: Every [`Configuration`] carries its own non-reentrant lock. The
//!   [`ConfigurationGuard`] returned by [`Configuration::lock`] is the only way to read the
//!   deleted flag, the properties or the binding, so holding one is proof the lock is held.
//! - **Sticky Binding**: A record binds to at most one [`Owner`](cadmin_domain::Owner). A later
//!   claim by another owner fails without overwriting the first.
//! - **Pluggable Authorization**: [`BindingPolicy`] decides whether an unbound record may be
//!   claimed. Closures implement it directly.
//! - **Change Notification**: [`MemoryStore`] calls a [`ChangeListener`] with the record still
//!   locked after every update and delete.
//!
//! # Lock ordering
//!
//! Callers that lock several records must lock them in ascending pid order.
//! [`ConfigurationStore::factory_members`] already returns them that way.
//!
//! # Examples
//!
//! ```rust
//! use cadmin_domain::{Owner, Pid, Properties};
//! use cadmin_store::{AllowAll, MemoryStore, StoreError};
//!
//! # fn main() -> Result<(), StoreError> {
//! let store = MemoryStore::new();
//! let pid = Pid::new("org.example.http");
//! store.create(pid.clone(), None)?;
//! store.update(&pid, Properties::new().with("port", 8080), &())?;
//!
//! let record = store.get(&pid)?;
//! let mut guard = record.lock();
//! assert!(guard.try_bind(&Owner::new("bundle:1"), &AllowAll));
//! assert!(!guard.try_bind(&Owner::new("bundle:2"), &AllowAll));
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod policy;
mod record;

pub use error::{StoreError, StoreErrorExt};
pub use memory::{ChangeListener, ConfigurationStore, MemoryStore};
pub use policy::{AllowAll, BindingPolicy};
pub use record::{Configuration, ConfigurationGuard};
