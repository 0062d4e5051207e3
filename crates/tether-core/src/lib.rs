//! Core UI-side primitives for Tether.
//!
//! This crate provides the pieces of Tether that live on the UI side of an
//! owner-scoped request:
//!
//! - **Owners**: the screen, embedded panel or modal dialog a request belongs
//!   to, and the [`OwnerLivenessGuard`] that decides whether it may still
//!   receive callbacks
//! - **Progress**: the [`ProgressRefCounter`] that drives a shared busy
//!   overlay from the set of in-flight request ids
//! - **Invocation**: the [`UiQueue`] / [`UiExecutor`] seam used to hop from
//!   background tasks back onto the UI thread
//! - **Cancellation**: a cooperative [`AsyncCancellationToken`]
//!
//! # Hopping to the UI thread
//!
//! ```
//! use tether_core::{QueuedInvocation, UiExecutor, UiQueue};
//!
//! let queue = UiQueue::new();
//! let handle = queue.handle();
//!
//! // From any thread:
//! handle.post(QueuedInvocation::new(|| println!("delivered"))).unwrap();
//!
//! // On the UI thread, inside its loop:
//! queue.process_pending();
//! ```

pub mod cancel;
mod error;
pub mod invocation;
pub mod logging;
pub mod owner;
pub mod progress;
pub mod thread_check;

pub use cancel::AsyncCancellationToken;
pub use error::{CoreError, Result};
pub use invocation::{QueuedInvocation, UiExecutor, UiQueue, UiQueueHandle};
pub use owner::{
    LifecycleFlags, LifecycleState, OverlayView, Owner, OwnerKind, OwnerLivenessGuard, ViewHandle,
};
pub use progress::{ProgressRefCounter, ProgressToken};
pub use thread_check::ThreadAffinity;
