//! Logging targets for Tether.
//!
//! Tether uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. Applications that want to see the logs install one:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("tether_net::dispatch=debug")
//!         .init();
//! }
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// UI invocation queue target.
    pub const INVOCATION: &str = "tether_core::invocation";
    /// Progress overlay bookkeeping target.
    pub const PROGRESS: &str = "tether_core::progress";
    /// Request dispatch and delivery target.
    pub const DISPATCH: &str = "tether_net::dispatch";
    /// Response post-processing target.
    pub const PIPELINE: &str = "tether_net::pipeline";
    /// Transport adapter target.
    pub const TRANSPORT: &str = "tether_net::transport";
}

/// Span names used throughout Tether for tracing.
pub mod span_names {
    /// One request, from dispatch to release.
    pub const REQUEST: &str = "tether::request";
    /// Delivery of a processed response on the UI thread.
    pub const DELIVERY: &str = "tether::delivery";
}
