//! Error types for Tether core.

/// Errors raised by the UI-side primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The UI queue has been dropped and can no longer accept invocations.
    #[error("UI queue is closed")]
    QueueClosed,
}

/// A specialized Result type for Tether core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
