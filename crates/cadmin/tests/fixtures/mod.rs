use cadmin::domain::{Pid, Properties};
use cadmin::tracking::{ConsumerError, ManagedService, ManagedServiceFactory};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Updated(Option<Properties>),
    FactoryUpdated(Pid, Properties),
    FactoryDeleted(Pid),
}

/// Records every callback it receives, in delivery order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl ManagedService for Recorder {
    fn updated(&self, properties: Option<&Properties>) -> Result<(), ConsumerError> {
        self.events.lock().push(Event::Updated(properties.cloned()));
        Ok(())
    }
}

impl ManagedServiceFactory for Recorder {
    fn updated(&self, pid: &Pid, properties: &Properties) -> Result<(), ConsumerError> {
        self.events.lock().push(Event::FactoryUpdated(pid.clone(), properties.clone()));
        Ok(())
    }

    fn deleted(&self, pid: &Pid) -> Result<(), ConsumerError> {
        self.events.lock().push(Event::FactoryDeleted(pid.clone()));
        Ok(())
    }
}
