//! Facade crate for the configuration engine.
//! Re-exports domain/kernel primitives and wires the record store, both trackers
//! and their presence hubs into one [`ConfigurationAdmin`].
//! Keep this crate thin: it should compose other crates, not implement tracking logic.
//!
//! ## Example
//! ```rust
//! use cadmin::domain::{Owner, Pid, Properties};
//! use cadmin::tracking::{ConsumerError, ManagedService};
//! use cadmin::ConfigurationAdmin;
//! use std::sync::Arc;
//!
//! struct Http;
//!
//! impl ManagedService for Http {
//!     fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError> {
//!         println!("http: {properties:?}");
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), cadmin::AdminError> {
//! let admin = ConfigurationAdmin::builder().build()?;
//! let pid = Pid::new("org.example.http");
//! admin.get_configuration(&pid);
//! admin.update(&pid, Properties::new().with("port", 8080))?;
//!
//! admin.services().register(Some(pid), Owner::new("bundle:1"), Arc::new(Http));
//! admin.flush()?;
//! admin.shutdown()?;
//! # Ok(())
//! # }
//! ```

mod admin;
mod error;

pub use crate::admin::{ConfigurationAdmin, ConfigurationAdminBuilder};
pub use crate::error::{AdminError, AdminErrorExt};
pub use cadmin_domain as domain;
pub use cadmin_kernel as kernel;
pub use cadmin_queue as queue;
pub use cadmin_store as store;
pub use cadmin_tracking as tracking;
