//! # cadmin daemon
//!
//! Boots the configuration engine from an [`EngineConfig`], attaches logging
//! consumers for the configured pids, seeds the configured records and shuts the
//! delivery queues down according to `queue.shutdown`.
//!
//! ## Example
//! ```no_run
//! use cadmin_daemon::Daemon;
//!
//! fn main() -> anyhow::Result<()> {
//!     Daemon::builder().build()?.run()
//! }
//! ```

mod consumers;

pub use crate::consumers::{LoggingFactory, LoggingService};

use anyhow::{Context, Result};
use cadmin::ConfigurationAdmin;
use cadmin::domain::config::EngineConfig;
use std::sync::Arc;
use tracing::info;

/// A fluent builder for the [`Daemon`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct DaemonBuilder {
    cfg: EngineConfig,
}

impl DaemonBuilder {
    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Starts the engine and attaches one logging consumer per configured pid.
    ///
    /// # Errors
    /// Returns an error if a delivery worker cannot be started.
    pub fn build(self) -> Result<Daemon> {
        let admin = ConfigurationAdmin::builder()
            .config(self.cfg.clone())
            .build()
            .context("Failed to start the configuration engine")?;

        let owner = &self.cfg.daemon.owner;
        for pid in &self.cfg.daemon.services {
            admin.services().register(
                Some(pid.clone()),
                owner.clone(),
                Arc::new(LoggingService::new(pid.clone())),
            );
        }
        for pid in &self.cfg.daemon.factories {
            admin.factories().register(
                Some(pid.clone()),
                owner.clone(),
                Arc::new(LoggingFactory::new(pid.clone())),
            );
        }

        info!(
            owner = %owner,
            services = self.cfg.daemon.services.len(),
            factories = self.cfg.daemon.factories.len(),
            "Daemon consumers attached"
        );
        Ok(Daemon { cfg: self.cfg, admin })
    }
}

/// A running engine with the daemon's consumers attached.
#[must_use = "call .run() to seed the records"]
#[derive(Debug)]
pub struct Daemon {
    cfg: EngineConfig,
    admin: ConfigurationAdmin,
}

impl Daemon {
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::default()
    }

    #[must_use]
    pub const fn admin(&self) -> &ConfigurationAdmin {
        &self.admin
    }

    /// Seeds the configured records, waits for their delivery and shuts down.
    ///
    /// # Errors
    /// Returns an error if a seed record is invalid or the queues fail to stop.
    pub fn run(self) -> Result<()> {
        let pids = self.admin.seed(&self.cfg.records).context("Failed to seed records")?;
        self.admin.flush().context("Failed to deliver seeded records")?;

        let services = self.admin.service_tracker().stats();
        let factories = self.admin.factory_tracker().stats();
        info!(
            records = pids.len(),
            delivered = services.delivered + factories.delivered,
            failed = services.failed + factories.failed,
            "Seeded records delivered"
        );

        self.admin.shutdown().context("Failed to stop the delivery queues")
    }
}
