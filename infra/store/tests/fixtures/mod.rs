use cadmin_domain::{Owner, Pid, Properties};
use cadmin_store::{ChangeListener, ConfigurationGuard};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Updated(Pid, Option<Properties>),
    Deleted(Pid, bool),
}

/// Records every callback; optionally claims records for an owner while notified.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub changes: Mutex<Vec<Change>>,
    pub claim_for: Option<Owner>,
}

impl RecordingListener {
    pub fn claiming(owner: &str) -> Self {
        Self { changes: Mutex::default(), claim_for: Some(Owner::new(owner)) }
    }

    pub fn take(&self) -> Vec<Change> {
        std::mem::take(&mut *self.changes.lock())
    }
}

impl ChangeListener for RecordingListener {
    fn updated(&self, record: &mut ConfigurationGuard<'_>) {
        if let Some(owner) = &self.claim_for {
            record.try_bind(owner, &cadmin_store::AllowAll);
        }
        self.changes.lock().push(Change::Updated(record.pid().clone(), record.properties()));
    }

    fn deleted(&self, record: &mut ConfigurationGuard<'_>) {
        self.changes.lock().push(Change::Deleted(record.pid().clone(), record.is_deleted()));
    }
}
