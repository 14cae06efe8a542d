//! # Domain Models
//!
//! This crate contains pure domain types with a single dependency (`serde`).
//! Keep it lean: no I/O, no locking, no heavy logic, just identifiers, property
//! values and the engine configuration.

pub mod config;
pub mod constants;
pub mod model;

pub use model::{Owner, Pid, Properties, PropertyValue};
