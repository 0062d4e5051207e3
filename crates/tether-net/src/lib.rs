//! Networking module for Tether.
//!
//! This crate issues HTTP requests on behalf of a UI owner (a screen, an
//! embedded panel or a modal dialog) that may be torn down at any time:
//!
//! - **Descriptors**: [`RequestDescriptor`](http::RequestDescriptor) describes
//!   one call; GET/DELETE carry a query, POST/PUT a literal body
//! - **Pipeline**: gzip inflation, cookie propagation, 304 header merge and
//!   charset-aware decoding for every response
//! - **Dispatch**: the [`Dispatcher`](http::Dispatcher) routes results to
//!   per-method channels on the UI thread, never after the owner died, and
//!   keeps the owner's busy overlay balanced
//!
//! # Error Classification
//!
//! Transport failures (timeouts, refused connections, error statuses) reach
//! the method channel with an absent body. Pipeline failures and
//! parse-category [`CallbackError`]s additionally fire the JSON-error hook.
//! A dead owner receives nothing at all.
//!
//! ```ignore
//! use tether_net::http::{HttpMethod, RequestDescriptor};
//!
//! let descriptor = RequestDescriptor::with_body(
//!     HttpMethod::Post,
//!     "https://api.example.com/items",
//!     Some(r#"{"name":"tether"}"#.to_string()),
//!     3,
//! )?
//! .header("Content-Type", "application/json");
//!
//! let handle = dispatcher.request_api(descriptor)?;
//! ```

mod error;
pub mod http;

pub use error::{
    CallbackError, DescriptorError, DispatchError, NetworkError, PipelineError, ResponseFailure,
    Result,
};
