//! Owner-scoped request dispatch.
//!
//! A [`Dispatcher`] belongs to one [`Owner`]. Every call to
//! [`Dispatcher::request_api`] runs one operation through this state machine:
//!
//! ```text
//! Idle -> Dispatched -> ResponsePending -> Delivering -> Done
//!            \               /
//!             +-> Cancelled +
//! ```
//!
//! The transport call and the [`ResponsePipeline`] run on the tokio runtime.
//! Exactly one invocation per operation is then posted to the UI executor;
//! it re-checks cancellation and owner liveness, routes the response to the
//! channel registered for the request's method, fires the error hooks and
//! finally releases the request's progress token. Release happens for every
//! operation, including suppressed and cancelled ones.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether_core::UiQueue;
//! use tether_net::http::{
//!     ApiResponse, Dispatcher, HttpClientBuilder, HttpMethod, MethodChannel,
//!     RequestDescriptor,
//! };
//! use tether_net::CallbackError;
//! # use tether_core::{LifecycleState, Owner, OwnerKind, ViewHandle};
//! # struct Screen;
//! # impl Owner for Screen {
//! #     fn kind(&self) -> OwnerKind { OwnerKind::Screen }
//! #     fn lifecycle(&self) -> LifecycleState { LifecycleState::default() }
//! #     fn resolve_overlay_view(&self) -> Option<ViewHandle> { None }
//! # }
//!
//! struct Items;
//!
//! impl MethodChannel for Items {
//!     fn on_finished(
//!         &self,
//!         _descriptor: &RequestDescriptor,
//!         _response: &ApiResponse,
//!         body: Option<&str>,
//!     ) -> Result<(), CallbackError> {
//!         let items: Vec<String> = tether_net::http::parse_json(body)?;
//!         println!("{} items", items.len());
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = UiQueue::new();
//! let dispatcher = Dispatcher::builder()
//!     .owner(Arc::new(Screen))
//!     .transport(Arc::new(HttpClientBuilder::new().build()?))
//!     .executor(Arc::new(queue.handle()))
//!     .get_channel(Arc::new(Items))
//!     .build()?;
//!
//! let descriptor = RequestDescriptor::with_query(
//!     HttpMethod::Get,
//!     "https://api.example.com/items",
//!     [("page", "1")],
//!     1,
//! )?;
//! let handle = dispatcher.request_api(descriptor)?;
//!
//! // Later, in the UI loop:
//! queue.process_pending();
//! # let _ = handle;
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use tether_core::logging::{span_names, targets};
use tether_core::{
    AsyncCancellationToken, Owner, OwnerLivenessGuard, ProgressRefCounter, QueuedInvocation,
    UiExecutor,
};
use tokio::runtime::Handle;
use tracing::Instrument;

use super::cookie::CookieStore;
use super::pipeline::{PipelineConfig, ResponsePipeline};
use super::request::{HttpMethod, RequestDescriptor};
use super::response::ApiResponse;
use super::transport::{RetryPolicy, Transport, TransportRequest};
use crate::error::{CallbackError, DispatchError};

/// Global operation counter for unique handle IDs.
static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// Application callbacks for one HTTP method.
///
/// `body` is the decoded response body, absent on any failure.
pub trait MethodChannel: Send + Sync {
    /// Called once the response is available.
    ///
    /// Returning a parse-category [`CallbackError`] marks the operation as a
    /// parse failure; any other error aborts delivery of this operation.
    fn on_finished(
        &self,
        descriptor: &RequestDescriptor,
        response: &ApiResponse,
        body: Option<&str>,
    ) -> Result<(), CallbackError>;

    /// Called after [`on_finished`](Self::on_finished) returns, if the owner
    /// is still alive.
    fn on_update_view(
        &self,
        descriptor: &RequestDescriptor,
        response: &ApiResponse,
        body: Option<&str>,
    ) -> Result<(), CallbackError> {
        let _ = (descriptor, response, body);
        Ok(())
    }
}

/// Error-display hooks shared by all methods.
///
/// Both hooks receive the raw response text, error payloads included.
pub trait ErrorHooks: Send + Sync {
    /// A method channel reported a parse-category error, or the body could
    /// not be decompressed or decoded.
    fn on_json_error(&self, descriptor: &RequestDescriptor, response: &ApiResponse, body: Option<&str>) {
        let _ = (descriptor, response, body);
    }

    /// Show a generic error. Returns whether any error UI was shown.
    fn on_generic_error(
        &self,
        descriptor: &RequestDescriptor,
        response: &ApiResponse,
        body: Option<&str>,
    ) -> bool;
}

/// Deserialize a channel body, mapping failures into the parse category.
///
/// An absent body is reported as [`CallbackError::MalformedJson`].
pub fn parse_json<T: DeserializeOwned>(body: Option<&str>) -> Result<T, CallbackError> {
    let body = body.ok_or_else(|| CallbackError::MalformedJson("empty body".to_string()))?;
    Ok(serde_json::from_str(body)?)
}

/// When the generic error hook runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorHookPolicy {
    /// Only for failed responses or parse failures.
    #[default]
    OnFailure,
    /// After every delivery.
    Always,
}

/// Dispatcher configuration.
#[derive(Clone, Debug, Default)]
pub struct DispatcherConfig {
    /// Retry behavior passed to the transport with every request.
    pub retry: RetryPolicy,
    /// When the generic error hook runs.
    pub error_hook_policy: ErrorHookPolicy,
    /// Response pipeline settings.
    pub pipeline: PipelineConfig,
}

/// Where an operation is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Not yet submitted.
    Idle,
    /// Submitted to the transport.
    Dispatched,
    /// The transport answered; delivery is queued on the UI thread.
    ResponsePending,
    /// Callbacks are running.
    Delivering,
    /// Finished; progress has been released.
    Done,
    /// Cancelled before delivery; progress has been released once `Done`
    /// cleanup ran.
    Cancelled,
}

/// Which hooks ran for a delivered operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The method channel's `on_finished` ran.
    pub finished_called: bool,
    /// The method channel's `on_update_view` ran.
    pub update_view_called: bool,
    /// The body could not be processed or parsed.
    pub parse_failure: bool,
    /// The JSON-error hook ran.
    pub json_error_hook_called: bool,
    /// The generic error hook's return value, if it ran.
    pub generic_error_shown: Option<bool>,
}

/// How an operation ended.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The owner was alive and callbacks ran.
    Delivered(DeliveryReport),
    /// The owner was dead or the dispatcher cleared; nothing ran.
    Suppressed,
    /// Cancelled before delivery.
    Cancelled,
    /// A channel failed with a non-parse error, or delivery was impossible.
    Failed(Arc<DispatchError>),
}

impl Outcome {
    /// The error behind a [`Failed`](Self::Failed) outcome.
    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    fn failed(err: impl Into<DispatchError>) -> Self {
        Self::Failed(Arc::new(err.into()))
    }
}

/// `Failed` outcomes are equal only when they share the same error.
impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Delivered(a), Self::Delivered(b)) => a == b,
            (Self::Suppressed, Self::Suppressed) | (Self::Cancelled, Self::Cancelled) => true,
            (Self::Failed(a), Self::Failed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

struct Operation {
    id: u64,
    span: tracing::Span,
    descriptor: RequestDescriptor,
    token: AsyncCancellationToken,
    state: Mutex<DispatchState>,
    outcome: Mutex<Option<Outcome>>,
}

impl Operation {
    fn new(descriptor: RequestDescriptor) -> Self {
        let id = NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!(
            target: targets::DISPATCH,
            span_names::REQUEST,
            operation = id,
            method = %descriptor.method(),
            id = descriptor.id()
        );
        Self {
            id,
            span,
            descriptor,
            token: AsyncCancellationToken::new(),
            state: Mutex::new(DispatchState::Idle),
            outcome: Mutex::new(None),
        }
    }

    fn cancel(&self) -> bool {
        {
            let mut state = self.state.lock();
            match *state {
                DispatchState::Idle | DispatchState::Dispatched | DispatchState::ResponsePending => {
                    *state = DispatchState::Cancelled;
                }
                _ => return false,
            }
        }
        self.token.cancel();
        true
    }

    /// Move `from` to `to` unless the operation was cancelled meanwhile.
    fn advance(&self, from: DispatchState, to: DispatchState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }
}

/// A handle to one dispatched operation.
#[derive(Clone)]
pub struct RequestHandle {
    operation: Arc<Operation>,
}

impl RequestHandle {
    /// Unique id of this operation.
    pub fn id(&self) -> u64 {
        self.operation.id
    }

    /// The caller-chosen request id of the descriptor.
    pub fn request_id(&self) -> i32 {
        self.operation.descriptor.id()
    }

    /// Cancel the operation.
    ///
    /// No application callback runs after this returns `true`; progress is
    /// still released. Returns `false` if delivery already started.
    pub fn cancel(&self) -> bool {
        self.operation.cancel()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatchState {
        *self.operation.state.lock()
    }

    /// How the operation ended, once it has.
    pub fn outcome(&self) -> Option<Outcome> {
        self.operation.outcome.lock().clone()
    }

    /// Whether the operation has finished, including progress release.
    pub fn is_finished(&self) -> bool {
        self.operation.outcome.lock().is_some()
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.operation.id)
            .field("request_id", &self.operation.descriptor.id())
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Clone, Default)]
struct Channels {
    get: Option<Arc<dyn MethodChannel>>,
    post: Option<Arc<dyn MethodChannel>>,
    put: Option<Arc<dyn MethodChannel>>,
    delete: Option<Arc<dyn MethodChannel>>,
}

impl Channels {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Arc<dyn MethodChannel>> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
        }
    }

    fn route(&self, method: HttpMethod) -> Option<Arc<dyn MethodChannel>> {
        match method {
            HttpMethod::Get => self.get.clone(),
            HttpMethod::Post => self.post.clone(),
            HttpMethod::Put => self.put.clone(),
            HttpMethod::Delete => self.delete.clone(),
        }
    }
}

struct DispatcherInner {
    owner: RwLock<Option<Arc<dyn Owner>>>,
    channels: RwLock<Channels>,
    error_hooks: RwLock<Option<Arc<dyn ErrorHooks>>>,
    progress: Arc<ProgressRefCounter>,
    transport: Arc<dyn Transport>,
    pipeline: ResponsePipeline,
    executor: Arc<dyn UiExecutor>,
    runtime: Handle,
    config: DispatcherConfig,
    operations: Mutex<HashMap<u64, Arc<Operation>>>,
}

impl DispatcherInner {
    fn owner_alive(&self) -> bool {
        self.owner
            .read()
            .as_deref()
            .is_some_and(OwnerLivenessGuard::is_alive)
    }

    /// Runs on the UI thread, once per operation.
    fn deliver(&self, operation: &Operation, response: Option<ApiResponse>) {
        let descriptor = &operation.descriptor;
        let span = tracing::debug_span!(
            target: targets::DISPATCH,
            parent: &operation.span,
            span_names::DELIVERY
        );
        let _guard = span.enter();

        let outcome = match response {
            Some(response)
                if operation.advance(DispatchState::ResponsePending, DispatchState::Delivering) =>
            {
                self.route(descriptor, &response)
            }
            _ => Outcome::Cancelled,
        };

        self.finish(operation, outcome);
    }

    fn route(&self, descriptor: &RequestDescriptor, response: &ApiResponse) -> Outcome {
        if !self.owner_alive() {
            tracing::debug!(target: targets::DISPATCH, "owner gone, suppressing delivery");
            return Outcome::Suppressed;
        }

        let channel = self.channels.read().route(descriptor.method());
        let hooks = self.error_hooks.read().clone();
        let body = response.body();
        let mut report = DeliveryReport {
            parse_failure: response.failure().is_some_and(|f| f.is_parse_failure()),
            ..Default::default()
        };

        if let Some(channel) = channel {
            let mut result = channel.on_finished(descriptor, response, body);
            report.finished_called = true;

            if result.is_ok() && self.owner_alive() {
                result = channel.on_update_view(descriptor, response, body);
                report.update_view_called = true;
            }

            match result {
                Ok(()) => {}
                Err(err) if err.is_parse_error() => {
                    tracing::debug!(target: targets::DISPATCH, error = %err, "channel reported parse failure");
                    report.parse_failure = true;
                }
                Err(err) => {
                    tracing::error!(
                        target: targets::DISPATCH,
                        method = %descriptor.method(),
                        url = descriptor.url(),
                        error = %err,
                        "unhandled callback error"
                    );
                    return Outcome::failed(DispatchError::Callback(err));
                }
            }
        }

        let Some(hooks) = hooks.filter(|_| descriptor.checks_error()) else {
            return Outcome::Delivered(report);
        };

        if report.parse_failure && self.owner_alive() {
            hooks.on_json_error(descriptor, response, response.text());
            report.json_error_hook_called = true;
        }

        let wants_generic = match self.config.error_hook_policy {
            ErrorHookPolicy::Always => true,
            ErrorHookPolicy::OnFailure => !response.is_success() || report.parse_failure,
        };
        if wants_generic && self.owner_alive() {
            report.generic_error_shown =
                Some(hooks.on_generic_error(descriptor, response, response.text()));
        }

        Outcome::Delivered(report)
    }

    /// Release progress and record the outcome. Runs exactly once per operation.
    fn finish(&self, operation: &Operation, outcome: Outcome) {
        self.progress.release(operation.descriptor.id());

        {
            let mut state = operation.state.lock();
            if *state != DispatchState::Cancelled {
                *state = DispatchState::Done;
            }
        }
        self.operations.lock().remove(&operation.id);

        tracing::debug!(
            target: targets::DISPATCH,
            operation = operation.id,
            id = operation.descriptor.id(),
            ?outcome,
            "operation finished"
        );
        *operation.outcome.lock() = Some(outcome);
    }
}

/// Issues requests on behalf of one owner and delivers results safely.
///
/// Cloning yields another handle to the same dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Submit a request.
    ///
    /// Returns immediately; results arrive later through the registered
    /// channels, on the UI executor. Must be called on the UI thread since
    /// it may show the owner's overlay.
    pub fn request_api(&self, descriptor: RequestDescriptor) -> Result<RequestHandle, DispatchError> {
        let Some(owner) = self.inner.owner.read().clone() else {
            tracing::warn!(
                target: targets::DISPATCH,
                url = descriptor.url(),
                "request on a cleared dispatcher"
            );
            return Err(DispatchError::Disposed);
        };

        let operation = Arc::new(Operation::new(descriptor));
        let entered = operation.span.enter();
        let descriptor = &operation.descriptor;
        let method = descriptor.method();

        self.inner
            .progress
            .acquire(owner.as_ref(), descriptor.id(), descriptor.shows_progress());

        let request = TransportRequest::from_descriptor(descriptor, self.inner.config.retry);
        let url = request.url.clone();
        let call = self.inner.transport.submit(request);

        operation.advance(DispatchState::Idle, DispatchState::Dispatched);
        self.inner
            .operations
            .lock()
            .insert(operation.id, operation.clone());

        tracing::debug!(
            target: targets::DISPATCH,
            url = %url,
            show_progress = descriptor.shows_progress(),
            "request dispatched"
        );

        let inner = self.inner.clone();
        let task_operation = operation.clone();
        let task = async move {
            let operation = task_operation;
            let result = tokio::select! {
                biased;
                _ = operation.token.cancelled() => None,
                result = call => Some(result),
            };

            let response = result.map(|result| inner.pipeline.process(method, &url, result));
            if response.is_some() {
                operation.advance(DispatchState::Dispatched, DispatchState::ResponsePending);
            }

            let delivery = {
                let inner = inner.clone();
                let operation = operation.clone();
                QueuedInvocation::new(move || inner.deliver(&operation, response))
            };
            if let Err(err) = inner.executor.post(delivery) {
                tracing::warn!(
                    target: targets::DISPATCH,
                    operation = operation.id,
                    error = %err,
                    "cannot deliver, releasing progress off the UI thread"
                );
                inner.finish(&operation, Outcome::failed(err));
            }
        };
        self.inner.runtime.spawn(task.instrument(operation.span.clone()));
        drop(entered);

        Ok(RequestHandle { operation })
    }

    /// Cancel every in-flight operation. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let operations: Vec<_> = self.inner.operations.lock().values().cloned().collect();
        operations.iter().filter(|op| op.cancel()).count()
    }

    /// Whether no operation is in flight.
    pub fn is_idle(&self) -> bool {
        self.inner.operations.lock().is_empty()
    }

    /// Number of operations in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.operations.lock().len()
    }

    /// Whether the owner is present and alive right now.
    pub fn is_owner_alive(&self) -> bool {
        self.inner.owner_alive()
    }

    /// Whether [`clear`](Self::clear) has run.
    pub fn is_cleared(&self) -> bool {
        self.inner.owner.read().is_none()
    }

    /// The progress counter driving the owner's overlay.
    pub fn progress(&self) -> &Arc<ProgressRefCounter> {
        &self.inner.progress
    }

    /// The response pipeline.
    pub fn pipeline(&self) -> &ResponsePipeline {
        &self.inner.pipeline
    }

    /// Look up a string resource from the owner, only while it is alive.
    pub fn resource_string(&self, id: u32, args: &[&str]) -> Option<String> {
        let owner = self.inner.owner.read().clone()?;
        if !OwnerLivenessGuard::is_alive(owner.as_ref()) {
            return None;
        }
        owner.resource_string(id, args)
    }

    /// Drop the owner, every method channel, the error hooks and the
    /// conditional-response cache.
    ///
    /// In-flight operations are suppressed when they complete and still
    /// release their progress. Further requests fail with
    /// [`DispatchError::Disposed`].
    pub fn clear(&self) {
        let owner = self.inner.owner.write().take();
        *self.inner.channels.write() = Channels::default();
        *self.inner.error_hooks.write() = None;
        self.inner.pipeline.cache().clear();

        if owner.is_some() {
            tracing::debug!(
                target: targets::DISPATCH,
                in_flight = self.in_flight(),
                "dispatcher cleared"
            );
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cleared", &self.is_cleared())
            .field("in_flight", &self.in_flight())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
///
/// The owner, transport and UI executor are required. Without an explicit
/// runtime handle the current tokio runtime is used.
#[derive(Default)]
pub struct DispatcherBuilder {
    owner: Option<Arc<dyn Owner>>,
    transport: Option<Arc<dyn Transport>>,
    executor: Option<Arc<dyn UiExecutor>>,
    runtime: Option<Handle>,
    cookies: Option<Arc<dyn CookieStore>>,
    progress: Option<Arc<ProgressRefCounter>>,
    channels: Channels,
    error_hooks: Option<Arc<dyn ErrorHooks>>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The owner requests are issued for.
    pub fn owner(mut self, owner: Arc<dyn Owner>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// The transport requests are submitted through.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// The executor deliveries are posted to.
    pub fn executor(mut self, executor: Arc<dyn UiExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The tokio runtime background work is spawned on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Forward `Set-Cookie` headers to `store`.
    pub fn cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    /// Share a progress counter with other dispatchers of the same owner.
    pub fn progress(mut self, progress: Arc<ProgressRefCounter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Register the channel for `method`.
    pub fn channel(mut self, method: HttpMethod, channel: Arc<dyn MethodChannel>) -> Self {
        *self.channels.slot(method) = Some(channel);
        self
    }

    /// Register the GET channel.
    pub fn get_channel(self, channel: Arc<dyn MethodChannel>) -> Self {
        self.channel(HttpMethod::Get, channel)
    }

    /// Register the POST channel.
    pub fn post_channel(self, channel: Arc<dyn MethodChannel>) -> Self {
        self.channel(HttpMethod::Post, channel)
    }

    /// Register the PUT channel.
    pub fn put_channel(self, channel: Arc<dyn MethodChannel>) -> Self {
        self.channel(HttpMethod::Put, channel)
    }

    /// Register the DELETE channel.
    pub fn delete_channel(self, channel: Arc<dyn MethodChannel>) -> Self {
        self.channel(HttpMethod::Delete, channel)
    }

    /// Register the error hooks.
    pub fn error_hooks(mut self, hooks: Arc<dyn ErrorHooks>) -> Self {
        self.error_hooks = Some(hooks);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set when the generic error hook runs.
    pub fn error_hook_policy(mut self, policy: ErrorHookPolicy) -> Self {
        self.config.error_hook_policy = policy;
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let owner = self.owner.ok_or(DispatchError::MissingComponent("owner"))?;
        let transport = self
            .transport
            .ok_or(DispatchError::MissingComponent("transport"))?;
        let executor = self
            .executor
            .ok_or(DispatchError::MissingComponent("UI executor"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| DispatchError::NoRuntime)?,
        };

        let mut pipeline = ResponsePipeline::new(self.config.pipeline.clone());
        if let Some(cookies) = self.cookies {
            pipeline = pipeline.with_cookie_store(cookies);
        }

        Ok(Dispatcher {
            inner: Arc::new(DispatcherInner {
                owner: RwLock::new(Some(owner)),
                channels: RwLock::new(self.channels),
                error_hooks: RwLock::new(self.error_hooks),
                progress: self.progress.unwrap_or_default(),
                transport,
                pipeline,
                executor,
                runtime,
                config: self.config,
                operations: Mutex::new(HashMap::new()),
            }),
        })
    }
}
