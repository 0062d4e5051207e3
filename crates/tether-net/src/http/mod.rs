//! Owner-scoped HTTP dispatch.
//!
//! This module provides the request side of Tether: descriptors, the
//! transport seam with its reqwest adapter, the response pipeline and the
//! [`Dispatcher`] that ties them to a UI owner.
//!
//! # Flow
//!
//! ```text
//! RequestDescriptor -> Dispatcher::request_api
//!     -> ProgressRefCounter::acquire          (UI thread)
//!     -> Transport::submit                    (tokio)
//!     -> ResponsePipeline::process            (tokio)
//!     -> liveness check, MethodChannel, hooks (UI thread)
//!     -> ProgressRefCounter::release          (UI thread)
//! ```
//!
//! # Implementing a Transport
//!
//! ```ignore
//! use futures_util::FutureExt;
//! use tether_net::http::{RawResponse, Transport, TransportRequest, TransportResult};
//!
//! struct Canned;
//!
//! impl Transport for Canned {
//!     fn submit(&self, _request: TransportRequest) -> BoxFuture<'static, TransportResult> {
//!         async { Ok(RawResponse::new(200, "ok")) }.boxed()
//!     }
//! }
//! ```

mod client;
mod cookie;
mod dispatcher;
mod pipeline;
mod request;
mod response;
mod transport;

pub use client::{HttpClientBuilder, HttpClientConfig, ReqwestTransport};
pub use cookie::{CookieStore, MemoryCookieStore};
pub use dispatcher::{
    DeliveryReport, DispatchState, Dispatcher, DispatcherBuilder, DispatcherConfig,
    ErrorHookPolicy, ErrorHooks, MethodChannel, Outcome, RequestHandle, parse_json,
};
pub use pipeline::{ConditionalCache, DEFAULT_CACHE_CAPACITY, PipelineConfig, ResponsePipeline};
pub use request::{HttpMethod, RequestDescriptor};
pub use response::{ApiResponse, RawResponse};
pub use transport::{RetryPolicy, Transport, TransportFailure, TransportRequest, TransportResult};
