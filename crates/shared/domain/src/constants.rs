//! Well-known property keys injected into delivered configurations.

/// Persistent identifier of the configuration record.
pub const SERVICE_PID: &str = "service.pid";

/// Factory identifier of a factory-owned configuration record.
pub const FACTORY_PID: &str = "service.factoryPid";

/// Name of the singleton delivery queue (also its worker thread name).
pub const SERVICE_QUEUE: &str = "ManagedService Update Queue";

/// Name of the factory delivery queue (also its worker thread name).
pub const FACTORY_QUEUE: &str = "ManagedServiceFactory Update Queue";
