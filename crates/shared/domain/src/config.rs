use crate::model::{Owner, Pid, Properties};
use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level engine configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfigInner {
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
    pub daemon: DaemonConfig,
    /// Records created and updated when the engine boots.
    pub records: Vec<RecordSeed>,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(flatten, default)]
    inner: Arc<EngineConfigInner>,
}

impl Deref for EngineConfig {
    type Target = EngineConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for EngineConfig {
    fn deref_mut(&mut self) -> &mut EngineConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// What a delivery queue does with pending tasks when it is shut down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Run every pending task to completion before the worker exits.
    #[default]
    Drain,
    /// Drop pending tasks; the task currently running still completes.
    Discard,
}

/// Delivery queue settings, shared by both trackers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub shutdown: ShutdownMode,
}

/// Logging settings consumed by `cadmin-logger`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub name: String,
    /// One of `trace`, `debug`, `info`, `warn`, `error`, `off`.
    pub level: String,
    pub console: bool,
    pub path: Option<PathBuf>,
    pub json: bool,
    pub env_filter: Option<String>,
    pub max_files: usize,
}

/// Consumers the daemon attaches on startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub owner: Owner,
    pub services: Vec<Pid>,
    pub factories: Vec<Pid>,
}

/// A configuration record to create at boot.
///
/// Singleton records set `pid`; factory records set `factory_pid` and get a
/// generated pid unless one is given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordSeed {
    pub pid: Option<Pid>,
    pub factory_pid: Option<Pid>,
    pub properties: Properties,
}

// --- Default ---

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "cadmin".to_owned(),
            level: "info".to_owned(),
            console: true,
            path: None,
            json: false,
            env_filter: None,
            max_files: 10,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { owner: Owner::new("cadmin-daemon"), services: Vec::new(), factories: Vec::new() }
    }
}
