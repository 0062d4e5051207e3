//! UI owners and their liveness.
//!
//! An [`Owner`] is the screen, embedded panel or modal dialog on whose behalf
//! a request is issued. Owners can be torn down at any moment, so every
//! callback boundary asks [`OwnerLivenessGuard::is_alive`] again right before
//! running application code.
//!
//! # Owner kinds
//!
//! | Kind       | Dead when                                             |
//! |------------|-------------------------------------------------------|
//! | `Screen`   | it has begun its teardown transition                  |
//! | `Embedded` | it has no surface, is being removed, or is detached   |
//! | `Modal`    | it has no surface, is being removed, or is detached   |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The three kinds of UI owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    /// A full-screen owner (a top-level screen).
    Screen,
    /// An owner embedded in a container (a panel inside a screen).
    Embedded,
    /// A modal owner (a dialog).
    Modal,
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Screen => write!(f, "screen"),
            Self::Embedded => write!(f, "embedded"),
            Self::Modal => write!(f, "modal"),
        }
    }
}

/// A snapshot of an owner's lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    /// The owner has begun its teardown transition.
    pub finishing: bool,
    /// The owner currently has a visual surface.
    pub has_surface: bool,
    /// The owner is being removed from its parent.
    pub removing: bool,
    /// The owner has been detached from its parent.
    pub detached: bool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            finishing: false,
            has_surface: true,
            removing: false,
            detached: false,
        }
    }
}

/// Atomic lifecycle flags an owner can embed to report its [`LifecycleState`].
///
/// The UI thread flips the flags as the owner moves through its lifecycle;
/// any thread may take a snapshot.
#[derive(Debug)]
pub struct LifecycleFlags {
    finishing: AtomicBool,
    has_surface: AtomicBool,
    removing: AtomicBool,
    detached: AtomicBool,
}

impl LifecycleFlags {
    /// Flags for a freshly shown owner: surface present, nothing torn down.
    pub fn new() -> Self {
        Self {
            finishing: AtomicBool::new(false),
            has_surface: AtomicBool::new(true),
            removing: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        }
    }

    /// Take a snapshot of the current flags.
    pub fn snapshot(&self) -> LifecycleState {
        LifecycleState {
            finishing: self.finishing.load(Ordering::Acquire),
            has_surface: self.has_surface.load(Ordering::Acquire),
            removing: self.removing.load(Ordering::Acquire),
            detached: self.detached.load(Ordering::Acquire),
        }
    }

    /// Mark the start of the teardown transition.
    pub fn begin_finishing(&self) {
        self.finishing.store(true, Ordering::Release);
    }

    /// Record whether the owner has a visual surface.
    pub fn set_has_surface(&self, has_surface: bool) {
        self.has_surface.store(has_surface, Ordering::Release);
    }

    /// Mark the owner as being removed from its parent.
    pub fn begin_removing(&self) {
        self.removing.store(true, Ordering::Release);
    }

    /// Mark the owner as detached from its parent.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }
}

impl Default for LifecycleFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// The shared "busy" overlay an owner can display.
///
/// Implementations are only called from the UI thread.
pub trait OverlayView: Send + Sync {
    /// Show or hide the overlay.
    fn set_visible(&self, visible: bool);

    /// Install or remove the handler that swallows taps while busy.
    fn set_touch_absorbing(&self, absorbing: bool);

    /// Whether the overlay is currently visible.
    fn is_visible(&self) -> bool;
}

/// A shared reference to an owner's overlay view.
pub type ViewHandle = Arc<dyn OverlayView>;

/// A UI entity on whose behalf requests are issued.
pub trait Owner: Send + Sync {
    /// Which kind of owner this is.
    fn kind(&self) -> OwnerKind;

    /// The current lifecycle flags. Read fresh on every liveness check.
    fn lifecycle(&self) -> LifecycleState;

    /// Resolve the overlay view, materializing it on first use.
    ///
    /// Returns `None` when the owner has no overlay slot.
    fn resolve_overlay_view(&self) -> Option<ViewHandle>;

    /// Look up a localized string resource, formatted with `args`.
    fn resource_string(&self, id: u32, args: &[&str]) -> Option<String> {
        let _ = (id, args);
        None
    }
}

/// Answers whether an owner can still safely receive a callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerLivenessGuard;

impl OwnerLivenessGuard {
    /// Evaluate liveness from the owner's current lifecycle flags.
    pub fn is_alive(owner: &dyn Owner) -> bool {
        Self::is_alive_state(owner.kind(), owner.lifecycle())
    }

    /// Evaluate liveness for a given kind and lifecycle snapshot.
    pub fn is_alive_state(kind: OwnerKind, state: LifecycleState) -> bool {
        match kind {
            OwnerKind::Screen => !state.finishing,
            OwnerKind::Embedded => state.has_surface && !state.removing && !state.detached,
            OwnerKind::Modal => state.has_surface && !state.removing && !state.detached,
        }
    }
}
