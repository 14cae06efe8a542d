use crate::error::QueueError;
use crate::task::Task;
use cadmin_domain::config::ShutdownMode;
use parking_lot::Mutex;
use std::any::Any;
use std::error::Error as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, trace};

enum Message<T> {
    Task(T),
    Barrier(oneshot::Sender<()>),
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks enqueued but not yet picked up by the worker.
    pub pending: u64,
    pub delivered: u64,
    /// Tasks that returned an error or panicked.
    pub failed: u64,
    /// Tasks dropped by a [`ShutdownMode::Discard`] shutdown.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    discard: AtomicBool,
    pending: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

/// A FIFO of tasks drained by one dedicated worker thread.
///
/// Cloning is not supported; share it behind an `Arc`.
pub struct SerializedTaskQueue<T: Task> {
    name: Arc<str>,
    sender: Mutex<Option<mpsc::UnboundedSender<Message<T>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    counters: Arc<Counters>,
}

impl<T: Task> std::fmt::Debug for SerializedTaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedTaskQueue")
            .field("name", &self.name)
            .field("open", &self.sender.lock().is_some())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<T: Task> SerializedTaskQueue<T> {
    /// Starts the worker thread. The thread carries `name`.
    ///
    /// # Errors
    /// Returns [`QueueError::Spawn`] if the OS refuses to create the thread.
    pub fn new(name: impl Into<Arc<str>>) -> Result<Self, QueueError> {
        let name: Arc<str> = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn({
                let name = name.clone();
                let counters = counters.clone();
                move || run_worker(&name, rx, &counters)
            })
            .map_err(|source| QueueError::Spawn {
                source,
                context: Some(format!("queue '{name}'").into()),
            })?;

        debug!(queue = %name, "Delivery worker started");

        Ok(Self {
            worker_id: worker.thread().id(),
            name,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Appends a task. Never blocks on delivery.
    ///
    /// # Errors
    /// Returns [`QueueError::Closed`] once the queue has been shut down.
    pub fn enqueue(&self, task: T) -> Result<(), QueueError> {
        let guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(self.closed());
        };

        let label = tracing::enabled!(Level::TRACE).then(|| task.describe());
        self.counters.pending.fetch_add(1, Ordering::AcqRel);
        if tx.send(Message::Task(task)).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(self.closed());
        }

        if let Some(label) = label {
            trace!(queue = %self.name, task = %label, "Task enqueued");
        }
        Ok(())
    }

    /// Blocks until every task enqueued before this call has finished.
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    /// * [`QueueError::Closed`] if the queue was already shut down.
    /// * [`QueueError::Reentrant`] when called from a task on this queue.
    pub fn flush(&self) -> Result<(), QueueError> {
        if thread::current().id() == self.worker_id {
            return Err(QueueError::Reentrant {
                message: "flush called from the delivery worker".into(),
                context: Some(self.name.to_string().into()),
            });
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let guard = self.sender.lock();
            let Some(tx) = guard.as_ref() else {
                return Err(self.closed());
            };
            if tx.send(Message::Barrier(ack_tx)).is_err() {
                return Err(self.closed());
            }
        }

        // A dropped barrier means the worker exited; nothing is left to wait for.
        let _ = ack_rx.blocking_recv();
        Ok(())
    }

    /// Stops accepting tasks and waits for the worker to exit.
    ///
    /// With [`ShutdownMode::Drain`] every queued task still runs; with
    /// [`ShutdownMode::Discard`] queued tasks are dropped. Calling it again is a no-op.
    /// When invoked from a task on this queue it does not wait.
    ///
    /// # Errors
    /// Returns [`QueueError::Internal`] if the worker thread could not be joined.
    pub fn shutdown(&self, mode: ShutdownMode) -> Result<(), QueueError> {
        if mode == ShutdownMode::Discard {
            self.counters.discard.store(true, Ordering::Release);
        }
        if self.sender.lock().take().is_some() {
            debug!(queue = %self.name, ?mode, "Queue shutting down");
        }

        if thread::current().id() == self.worker_id {
            return Ok(());
        }
        let Some(worker) = self.worker.lock().take() else {
            return Ok(());
        };
        worker.join().map_err(|panic| QueueError::Internal {
            message: panic_message(panic.as_ref()).into(),
            context: Some(format!("joining worker of '{}'", self.name).into()),
        })
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.counters.pending.load(Ordering::Acquire),
            delivered: self.counters.delivered.load(Ordering::Acquire),
            failed: self.counters.failed.load(Ordering::Acquire),
            discarded: self.counters.discarded.load(Ordering::Acquire),
        }
    }

    fn closed(&self) -> QueueError {
        QueueError::Closed {
            message: "queue no longer accepts tasks".into(),
            context: Some(self.name.to_string().into()),
        }
    }
}

impl<T: Task> Drop for SerializedTaskQueue<T> {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit on its own.
        self.sender.get_mut().take();
    }
}

fn run_worker<T: Task>(name: &str, mut rx: mpsc::UnboundedReceiver<Message<T>>, counters: &Counters) {
    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Barrier(ack) => {
                let _ = ack.send(());
            },
            Message::Task(task) => {
                counters.pending.fetch_sub(1, Ordering::AcqRel);
                if counters.discard.load(Ordering::Acquire) {
                    counters.discarded.fetch_add(1, Ordering::AcqRel);
                    trace!(queue = %name, task = %task.describe(), "Task discarded");
                    continue;
                }
                execute(name, task, counters);
            },
        }
    }
    debug!(queue = %name, "Delivery worker stopped");
}

fn execute<T: Task>(name: &str, task: T, counters: &Counters) {
    let label = task.describe();

    match catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::AcqRel);
            trace!(queue = %name, task = %label, "Task delivered");
        },
        Ok(Err(err)) => {
            counters.failed.fetch_add(1, Ordering::AcqRel);
            match err.source() {
                Some(cause) => {
                    error!(queue = %name, task = %label, error = %err, cause = %cause, "Task failed");
                },
                None => error!(queue = %name, task = %label, error = %err, "Task failed"),
            }
        },
        Err(panic) => {
            counters.failed.fetch_add(1, Ordering::AcqRel);
            error!(queue = %name, task = %label, panic = %panic_message(panic.as_ref()), "Task panicked");
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
