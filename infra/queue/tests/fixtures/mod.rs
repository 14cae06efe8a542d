use cadmin_queue::{QueueError, SerializedTaskQueue, Task};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};

pub type Log = Arc<Mutex<Vec<u32>>>;

pub enum TestTask {
    Record(Log, u32),
    RecordThread(Arc<Mutex<Option<String>>>),
    Fail { with_cause: bool },
    Panic,
    Gate { started: mpsc::Sender<()>, release: mpsc::Receiver<()> },
    Flush(Arc<SerializedTaskQueue<TestTask>>, mpsc::Sender<&'static str>),
    /// Counts how often its label is built.
    Labelled(Arc<AtomicUsize>),
}

impl Task for TestTask {
    type Error = QueueError;

    fn run(self) -> Result<(), Self::Error> {
        match self {
            Self::Record(log, id) => log.lock().push(id),
            Self::RecordThread(slot) => {
                *slot.lock() = std::thread::current().name().map(ToOwned::to_owned);
            },
            Self::Fail { with_cause: true } => {
                return Err(QueueError::Spawn {
                    source: std::io::Error::other("disk on fire"),
                    context: Some("fixture".into()),
                });
            },
            Self::Fail { with_cause: false } => return Err("fixture failure".into()),
            Self::Panic => panic!("fixture panic"),
            Self::Gate { started, release } => {
                let _ = started.send(());
                let _ = release.recv();
            },
            Self::Flush(queue, report) => {
                let outcome = queue.flush().map_or_else(|err| err.kind(), |()| "Ok");
                let _ = report.send(outcome);
            },
            Self::Labelled(_) => {},
        }
        Ok(())
    }

    fn describe(&self) -> Cow<'static, str> {
        match self {
            Self::Record(_, id) => format!("record #{id}").into(),
            Self::RecordThread(_) => "record-thread".into(),
            Self::Fail { .. } => "fail".into(),
            Self::Panic => "panic".into(),
            Self::Gate { .. } => "gate".into(),
            Self::Flush(..) => "flush".into(),
            Self::Labelled(count) => {
                count.fetch_add(1, Ordering::SeqCst);
                "labelled".into()
            },
        }
    }
}

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn queue(name: &str) -> SerializedTaskQueue<TestTask> {
    SerializedTaskQueue::new(name).expect("worker thread starts")
}

/// A task that blocks the worker until the returned sender fires.
/// Waits until the worker has actually picked it up.
pub fn hold_worker(queue: &SerializedTaskQueue<TestTask>) -> mpsc::Sender<()> {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    queue.enqueue(TestTask::Gate { started: started_tx, release: release_rx }).expect("enqueue gate");
    started_rx.recv().expect("gate starts");
    release_tx
}
