//! Thread affinity checks for UI-owned state.
//!
//! Owner state, overlay views and application callbacks may only be touched
//! from the thread that drains the UI queue. [`ThreadAffinity`] records that
//! thread and lets code verify it is running there:
//!
//! ```
//! use tether_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_same_thread());
//! affinity.debug_assert_same_thread();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

/// Flag to enable/disable runtime thread checks globally.
static THREAD_CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Enable or disable runtime thread checks.
///
/// Checks are enabled in debug builds and disabled in release builds unless
/// overridden here.
pub fn set_thread_checks_enabled(enabled: bool) {
    THREAD_CHECKS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Check if runtime thread checks are currently enabled.
#[inline]
pub fn are_thread_checks_enabled() -> bool {
    THREAD_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Records the thread a piece of state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The thread this affinity is bound to.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the bound thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Panics if checks are enabled and the calling thread is not the bound one.
    #[track_caller]
    pub fn debug_assert_same_thread(&self) {
        if are_thread_checks_enabled() && !self.is_same_thread() {
            let current = std::thread::current();
            panic!(
                "thread affinity violation: expected {:?}, running on {:?} ({})",
                self.thread_id,
                current.id(),
                current.name().unwrap_or("<unnamed>")
            );
        }
    }
}
