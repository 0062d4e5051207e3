//! Queued invocations for delivery on the UI thread.
//!
//! Background work never touches owner state directly. Instead it wraps the
//! UI-side step in a [`QueuedInvocation`] and posts it through a
//! [`UiExecutor`]. The UI loop drains the queue and runs each invocation on
//! its own thread.
//!
//! # How It Works
//!
//! 1. The UI thread creates a [`UiQueue`] and hands out [`UiQueueHandle`]s.
//! 2. Background tasks post invocations through a handle (any thread).
//! 3. The UI loop calls [`UiQueue::process_pending`] (or
//!    [`UiQueue::wait_and_process`]) and the invocations run in post order.
//!
//! ```
//! use tether_core::invocation::{QueuedInvocation, UiExecutor, UiQueue};
//!
//! let queue = UiQueue::new();
//! let handle = queue.handle();
//!
//! std::thread::spawn(move || {
//!     handle.post(QueuedInvocation::new(|| println!("on the UI thread"))).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! assert_eq!(queue.process_pending(), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{CoreError, Result};
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A type-erased invocation that runs later on the UI thread.
pub struct QueuedInvocation {
    id: u64,
    invoke: Box<dyn FnOnce() + Send>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            invoke: Box::new(invoke),
        }
    }

    /// The unique ID of this invocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute the invocation.
    pub fn execute(self) {
        (self.invoke)();
    }
}

impl std::fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedInvocation")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Something that can run invocations on the UI thread.
///
/// Implemented by [`UiQueueHandle`]; applications embedding Tether in an
/// existing event loop implement it over that loop's own posting mechanism.
pub trait UiExecutor: Send + Sync {
    /// Schedule `invocation` to run on the UI thread.
    fn post(&self, invocation: QueuedInvocation) -> Result<()>;
}

/// A channel-backed UI queue, drained by the thread that created it.
pub struct UiQueue {
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
    affinity: ThreadAffinity,
}

impl UiQueue {
    /// Create a queue owned by the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            affinity: ThreadAffinity::current(),
        }
    }

    /// Get a handle that posts into this queue from any thread.
    pub fn handle(&self) -> UiQueueHandle {
        UiQueueHandle {
            sender: self.sender.clone(),
        }
    }

    /// The thread this queue is drained on.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Number of invocations waiting to run.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every invocation currently queued. Returns how many ran.
    pub fn process_pending(&self) -> usize {
        self.affinity.debug_assert_same_thread();
        let mut count = 0;
        while let Ok(invocation) = self.receiver.try_recv() {
            self.run(invocation);
            count += 1;
        }
        count
    }

    /// Block until at least one invocation arrives (or `timeout` elapses),
    /// then drain the queue. Returns how many ran.
    pub fn wait_and_process(&self, timeout: Duration) -> usize {
        self.affinity.debug_assert_same_thread();
        match self.receiver.recv_timeout(timeout) {
            Ok(invocation) => {
                self.run(invocation);
                1 + self.process_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Keep draining until `count` invocations have run or `timeout` elapses.
    /// Returns how many ran.
    pub fn process_at_least(&self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;
        while ran < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let processed = self.wait_and_process(remaining);
            if processed == 0 {
                break;
            }
            ran += processed;
        }
        ran
    }

    fn run(&self, invocation: QueuedInvocation) {
        tracing::trace!(target: targets::INVOCATION, id = invocation.id(), "running queued invocation");
        invocation.execute();
    }
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiQueue")
            .field("pending", &self.pending())
            .field("affinity", &self.affinity)
            .finish()
    }
}

/// A cloneable, thread-safe handle that posts into a [`UiQueue`].
#[derive(Clone, Debug)]
pub struct UiQueueHandle {
    sender: Sender<QueuedInvocation>,
}

impl UiExecutor for UiQueueHandle {
    fn post(&self, invocation: QueuedInvocation) -> Result<()> {
        self.sender
            .send(invocation)
            .map_err(|_| CoreError::QueueClosed)
    }
}
