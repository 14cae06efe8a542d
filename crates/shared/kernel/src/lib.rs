//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it re-exports ergonomic helpers for IDs and config loading.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous IDs:
//! ```rust
//! # use cadmin_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
//!
//! Factory members get a pid derived from their factory:
//! ```rust
//! # use cadmin_kernel::{domain::Pid, factory_member_pid};
//! let pid = factory_member_pid(&Pid::new("org.example.pool"));
//! assert!(pid.as_str().starts_with("org.example.pool."));
//! ```
//!
//! ## Config loading
//! ```rust,ignore
//! use cadmin_kernel::config::load_config;
//! let cfg: cadmin_domain::config::EngineConfig = load_config(Some("cadmin.toml")).unwrap();
//! ```
pub mod config;

use cadmin_domain::Pid;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use cadmin_domain as domain;
pub use nanoid::nanoid;

/// Generates an unambiguous `NanoID` (no visually confusing characters).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}

/// Pid for a new member of `factory`: `<factoryPid>.<nanoid>`.
#[must_use]
pub fn factory_member_pid(factory: &Pid) -> Pid {
    Pid::from(format!("{factory}.{}", safe_nanoid!()))
}
