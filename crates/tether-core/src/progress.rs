//! Busy-overlay bookkeeping keyed by request id.
//!
//! [`ProgressRefCounter`] records which request ids currently hold the
//! owner's overlay. The overlay is visible iff at least one
//! [`ProgressToken`] is live.
//!
//! A request id is an all-or-nothing busy marker: [`release`] removes every
//! token recorded for that id, however many acquires used it.
//!
//! ```ignore
//! use tether_core::progress::ProgressRefCounter;
//!
//! let progress = ProgressRefCounter::new();
//! progress.acquire(&*owner, 7, true);   // overlay shown
//! progress.acquire(&*owner, 8, true);
//! progress.release(7);                  // still shown, 8 is busy
//! progress.release(8);                  // hidden
//! ```
//!
//! [`release`]: ProgressRefCounter::release

use parking_lot::Mutex;

use crate::logging::targets;
use crate::owner::{Owner, ViewHandle};

/// A live `(id, view)` busy marker.
#[derive(Clone)]
pub struct ProgressToken {
    /// The request id holding the overlay.
    pub id: i32,
    /// The overlay view the token keeps visible.
    pub view: ViewHandle,
}

impl std::fmt::Debug for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressToken")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ProgressState {
    /// Overlay view resolved from the owner on first acquire.
    view: Option<ViewHandle>,
    tokens: Vec<ProgressToken>,
    shown: bool,
}

/// Tracks which request ids keep the shared overlay busy.
///
/// `acquire` and `release` run inside a single critical section, so the
/// "is the set empty now" decision is made atomically with the mutation.
#[derive(Default)]
pub struct ProgressRefCounter {
    state: Mutex<ProgressState>,
}

impl ProgressRefCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as busy and show the overlay.
    ///
    /// A no-op when `show_progress` is false. Returns the overlay view, or
    /// `None` if the owner has no overlay slot.
    pub fn acquire(&self, owner: &dyn Owner, id: i32, show_progress: bool) -> Option<ViewHandle> {
        if !show_progress {
            return None;
        }

        let mut state = self.state.lock();
        let view = match &state.view {
            Some(view) => view.clone(),
            None => {
                let view = owner.resolve_overlay_view()?;
                state.view = Some(view.clone());
                view
            }
        };

        state.tokens.push(ProgressToken {
            id,
            view: view.clone(),
        });
        if !state.shown {
            view.set_visible(true);
            view.set_touch_absorbing(true);
            state.shown = true;
        }

        tracing::debug!(
            target: targets::PROGRESS,
            id,
            live = state.tokens.len(),
            "progress acquired"
        );
        Some(view)
    }

    /// Remove every token recorded for `id`, hiding the overlay if none remain.
    ///
    /// Releasing an id that was never acquired is a no-op. Returns `true` if
    /// this call hid the overlay.
    pub fn release(&self, id: i32) -> bool {
        let mut state = self.state.lock();
        let before = state.tokens.len();
        state.tokens.retain(|token| token.id != id);
        let removed = before - state.tokens.len();

        if removed > 0 {
            tracing::debug!(
                target: targets::PROGRESS,
                id,
                removed,
                live = state.tokens.len(),
                "progress released"
            );
        }

        if state.tokens.is_empty() && state.shown {
            if let Some(view) = &state.view {
                view.set_visible(false);
                view.set_touch_absorbing(false);
            }
            state.shown = false;
            return true;
        }
        false
    }

    /// Whether any request currently holds the overlay.
    pub fn is_busy(&self) -> bool {
        !self.state.lock().tokens.is_empty()
    }

    /// Whether `id` currently holds at least one token.
    pub fn is_acquired(&self, id: i32) -> bool {
        self.state.lock().tokens.iter().any(|token| token.id == id)
    }

    /// Number of live tokens.
    pub fn token_count(&self) -> usize {
        self.state.lock().tokens.len()
    }

    /// Snapshot of the live tokens.
    pub fn tokens(&self) -> Vec<ProgressToken> {
        self.state.lock().tokens.clone()
    }
}

impl std::fmt::Debug for ProgressRefCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProgressRefCounter")
            .field("tokens", &state.tokens)
            .field("shown", &state.shown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::{LifecycleState, OverlayView, OwnerKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeOverlay {
        visible: AtomicBool,
        absorbing: AtomicBool,
        show_count: AtomicUsize,
    }

    impl OverlayView for FakeOverlay {
        fn set_visible(&self, visible: bool) {
            if visible {
                self.show_count.fetch_add(1, Ordering::SeqCst);
            }
            self.visible.store(visible, Ordering::SeqCst);
        }

        fn set_touch_absorbing(&self, absorbing: bool) {
            self.absorbing.store(absorbing, Ordering::SeqCst);
        }

        fn is_visible(&self) -> bool {
            self.visible.load(Ordering::SeqCst)
        }
    }

    struct FakeOwner {
        overlay: Option<Arc<FakeOverlay>>,
        resolves: AtomicUsize,
    }

    impl FakeOwner {
        fn with_overlay() -> (Self, Arc<FakeOverlay>) {
            let overlay = Arc::new(FakeOverlay::default());
            (
                Self {
                    overlay: Some(overlay.clone()),
                    resolves: AtomicUsize::new(0),
                },
                overlay,
            )
        }
    }

    impl Owner for FakeOwner {
        fn kind(&self) -> OwnerKind {
            OwnerKind::Screen
        }

        fn lifecycle(&self) -> LifecycleState {
            LifecycleState::default()
        }

        fn resolve_overlay_view(&self) -> Option<ViewHandle> {
            self.resolves.fetch_add(1, Ordering::SeqCst);
            self.overlay.clone().map(|o| o as ViewHandle)
        }
    }

    #[test]
    fn test_acquire_shows_and_release_hides() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        assert!(progress.acquire(&owner, 7, true).is_some());
        assert!(overlay.is_visible());
        assert!(overlay.absorbing.load(Ordering::SeqCst));
        assert!(progress.is_busy());

        assert!(progress.release(7));
        assert!(!overlay.is_visible());
        assert!(!overlay.absorbing.load(Ordering::SeqCst));
        assert!(!progress.is_busy());
    }

    #[test]
    fn test_no_progress_is_noop() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        assert!(progress.acquire(&owner, 1, false).is_none());
        assert!(!overlay.is_visible());
        assert_eq!(owner.resolves.load(Ordering::SeqCst), 0);
        assert!(!progress.release(1));
    }

    #[test]
    fn test_overlay_stays_until_last_id_released() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        progress.acquire(&owner, 1, true);
        progress.acquire(&owner, 2, true);
        assert_eq!(overlay.show_count.load(Ordering::SeqCst), 1);

        assert!(!progress.release(1));
        assert!(overlay.is_visible());
        assert!(progress.release(2));
        assert!(!overlay.is_visible());
    }

    #[test]
    fn test_release_removes_all_tokens_for_id() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        progress.acquire(&owner, 5, true);
        progress.acquire(&owner, 5, true);
        assert_eq!(progress.token_count(), 2);

        assert!(progress.release(5));
        assert_eq!(progress.token_count(), 0);
        assert!(!overlay.is_visible());
    }

    #[test]
    fn test_view_is_resolved_once() {
        let (owner, _overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        progress.acquire(&owner, 1, true);
        progress.release(1);
        progress.acquire(&owner, 2, true);
        assert_eq!(owner.resolves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_owner_without_overlay_slot() {
        let owner = FakeOwner {
            overlay: None,
            resolves: AtomicUsize::new(0),
        };
        let progress = ProgressRefCounter::new();

        assert!(progress.acquire(&owner, 3, true).is_none());
        assert!(!progress.is_busy());
        assert!(!progress.release(3));
    }

    #[test]
    fn test_release_unknown_id_keeps_others() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = ProgressRefCounter::new();

        progress.acquire(&owner, 1, true);
        assert!(!progress.release(99));
        assert!(overlay.is_visible());
        assert!(progress.is_acquired(1));
    }

    #[test]
    fn test_concurrent_release_settles_hidden() {
        let (owner, overlay) = FakeOwner::with_overlay();
        let progress = Arc::new(ProgressRefCounter::new());

        for id in 0..16 {
            progress.acquire(&owner, id, true);
        }

        let handles: Vec<_> = (0..16)
            .map(|id| {
                let progress = progress.clone();
                std::thread::spawn(move || progress.release(id))
            })
            .collect();
        let hid: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(hid, 1);
        assert!(!overlay.is_visible());
        assert!(!progress.is_busy());
    }
}
