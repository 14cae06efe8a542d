//! # Serialized Task Queue
//!
//! A FIFO queue with exactly one worker thread. Tasks run one at a time, in
//! enqueue order, and never on the caller's thread.
//!
//! ## Features
//!
//! * **Ordering**: A single consumer drains a `tokio` unbounded channel, so tasks
//!   enqueued from one thread run in that order.
//! * **Isolation**: A task that returns an error or panics is logged and counted;
//!   the worker keeps going.
//! * **Non-blocking enqueue**: `enqueue` never waits for delivery.
//! * **Barriers**: `flush` blocks until everything enqueued before it has run.
//!
//! # Example
//!
//! ```rust
//! use cadmin_queue::{QueueError, SerializedTaskQueue, ShutdownMode, Task};
//! use std::borrow::Cow;
//! use std::sync::{Arc, Mutex};
//!
//! struct Push(Arc<Mutex<Vec<u32>>>, u32);
//!
//! impl Task for Push {
//!     type Error = QueueError;
//!
//!     fn run(self) -> Result<(), Self::Error> {
//!         self.0.lock().map_err(|_| QueueError::from("poisoned"))?.push(self.1);
//!         Ok(())
//!     }
//!
//!     fn describe(&self) -> Cow<'static, str> {
//!         Cow::Borrowed("push")
//!     }
//! }
//!
//! # fn main() -> Result<(), QueueError> {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let queue = SerializedTaskQueue::new("doc queue")?;
//! for i in 0..3 {
//!     queue.enqueue(Push(seen.clone(), i))?;
//! }
//! queue.shutdown(ShutdownMode::Drain)?;
//! assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
//! # Ok(())
//! # }
//! ```

mod error;
mod queue;
mod task;

pub use cadmin_domain::config::ShutdownMode;
pub use error::{QueueError, QueueErrorExt};
pub use queue::{QueueStats, SerializedTaskQueue};
pub use task::Task;
