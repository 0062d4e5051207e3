//! Shared fixtures for dispatcher tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tether_core::{
    LifecycleFlags, LifecycleState, OverlayView, Owner, OwnerKind, UiQueue, ViewHandle,
};
use tether_net::NetworkError;
use tether_net::http::{
    ApiResponse, DispatcherBuilder, ErrorHooks, HttpMethod, MethodChannel, RequestDescriptor,
    RequestHandle, Transport, TransportFailure, TransportRequest, TransportResult,
};
use tether_net::CallbackError;
use tokio::sync::oneshot;

/// Overlay that counts show/hide transitions.
#[derive(Default)]
pub struct TestOverlay {
    visible: AtomicBool,
    absorbing: AtomicBool,
    shows: AtomicUsize,
    hides: AtomicUsize,
}

impl TestOverlay {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }

    pub fn is_absorbing(&self) -> bool {
        self.absorbing.load(Ordering::SeqCst)
    }
}

impl OverlayView for TestOverlay {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        if visible {
            self.shows.fetch_add(1, Ordering::SeqCst);
        } else {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn set_touch_absorbing(&self, absorbing: bool) {
        self.absorbing.store(absorbing, Ordering::SeqCst);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

pub struct TestOwner {
    kind: OwnerKind,
    pub flags: LifecycleFlags,
    pub overlay: Arc<TestOverlay>,
}

impl TestOwner {
    pub fn new(kind: OwnerKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            flags: LifecycleFlags::new(),
            overlay: Arc::new(TestOverlay::default()),
        })
    }

    /// Tear the owner down the way its kind does.
    pub fn kill(&self) {
        match self.kind {
            OwnerKind::Screen => self.flags.begin_finishing(),
            OwnerKind::Embedded => self.flags.detach(),
            OwnerKind::Modal => self.flags.set_has_surface(false),
        }
    }
}

impl Owner for TestOwner {
    fn kind(&self) -> OwnerKind {
        self.kind
    }

    fn lifecycle(&self) -> LifecycleState {
        self.flags.snapshot()
    }

    fn resolve_overlay_view(&self) -> Option<ViewHandle> {
        Some(self.overlay.clone())
    }

    fn resource_string(&self, id: u32, args: &[&str]) -> Option<String> {
        match id {
            1 => Some(format!("Hello, {}", args.join(" "))),
            _ => None,
        }
    }
}

struct Call {
    request: TransportRequest,
    responder: Option<oneshot::Sender<TransportResult>>,
}

/// A transport whose calls stay pending until the test answers them.
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn request(&self, index: usize) -> TransportRequest {
        self.calls.lock()[index].request.clone()
    }

    /// Answer call `index`. Returns false if it was already answered or dropped.
    pub fn respond(&self, index: usize, result: TransportResult) -> bool {
        let responder = self.calls.lock()[index].responder.take();
        responder.is_some_and(|tx| tx.send(result).is_ok())
    }

    pub fn ok(&self, index: usize, status: u16, body: impl Into<bytes::Bytes>) -> bool {
        self.respond(index, Ok(tether_net::http::RawResponse::new(status, body)))
    }

    pub fn fail(&self, index: usize, error: NetworkError) -> bool {
        self.respond(index, Err(TransportFailure::without_response(error)))
    }
}

impl Transport for ScriptedTransport {
    fn submit(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push(Call {
            request,
            responder: Some(tx),
        });
        async move {
            rx.await
                .unwrap_or_else(|_| Err(TransportFailure::without_response(NetworkError::Cancelled)))
        }
        .boxed()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Finished(HttpMethod, Option<String>),
    UpdateView(HttpMethod),
    JsonError(Option<String>),
    GenericError(Option<String>),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub enum Behavior {
    Succeed,
    ParseJson,
    Fail,
    KillOwner(Arc<TestOwner>),
}

pub struct RecordingChannel {
    method: HttpMethod,
    log: EventLog,
    behavior: Behavior,
}

impl RecordingChannel {
    pub fn new(method: HttpMethod, log: EventLog, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            method,
            log,
            behavior,
        })
    }
}

impl MethodChannel for RecordingChannel {
    fn on_finished(
        &self,
        _descriptor: &RequestDescriptor,
        _response: &ApiResponse,
        body: Option<&str>,
    ) -> Result<(), CallbackError> {
        self.log
            .lock()
            .push(Event::Finished(self.method, body.map(str::to_string)));
        match &self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::ParseJson => {
                tether_net::http::parse_json::<serde_json::Value>(body).map(|_| ())
            }
            Behavior::Fail => Err(CallbackError::other("channel exploded")),
            Behavior::KillOwner(owner) => {
                owner.kill();
                Ok(())
            }
        }
    }

    fn on_update_view(
        &self,
        _descriptor: &RequestDescriptor,
        _response: &ApiResponse,
        _body: Option<&str>,
    ) -> Result<(), CallbackError> {
        self.log.lock().push(Event::UpdateView(self.method));
        Ok(())
    }
}

pub struct RecordingHooks {
    log: EventLog,
}

impl ErrorHooks for RecordingHooks {
    fn on_json_error(&self, _: &RequestDescriptor, _: &ApiResponse, body: Option<&str>) {
        self.log
            .lock()
            .push(Event::JsonError(body.map(str::to_string)));
    }

    fn on_generic_error(&self, _: &RequestDescriptor, _: &ApiResponse, body: Option<&str>) -> bool {
        self.log
            .lock()
            .push(Event::GenericError(body.map(str::to_string)));
        true
    }
}

/// One owner, its UI queue, a scripted transport and recording callbacks.
pub struct Harness {
    pub queue: UiQueue,
    pub owner: Arc<TestOwner>,
    pub transport: Arc<ScriptedTransport>,
    pub log: EventLog,
}

impl Harness {
    pub fn new(kind: OwnerKind) -> Self {
        Self {
            queue: UiQueue::new(),
            owner: TestOwner::new(kind),
            transport: ScriptedTransport::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn overlay(&self) -> &TestOverlay {
        &self.owner.overlay
    }

    /// A builder with every channel recording and the error hooks installed.
    pub fn builder(&self) -> DispatcherBuilder {
        self.bare_builder()
            .channel(HttpMethod::Get, self.channel(HttpMethod::Get, Behavior::Succeed))
            .channel(HttpMethod::Post, self.channel(HttpMethod::Post, Behavior::Succeed))
            .channel(HttpMethod::Put, self.channel(HttpMethod::Put, Behavior::Succeed))
            .channel(HttpMethod::Delete, self.channel(HttpMethod::Delete, Behavior::Succeed))
            .error_hooks(self.hooks())
    }

    /// A builder with only the owner, transport and executor.
    pub fn bare_builder(&self) -> DispatcherBuilder {
        DispatcherBuilder::new()
            .owner(self.owner.clone())
            .transport(self.transport.clone())
            .executor(Arc::new(self.queue.handle()))
    }

    pub fn channel(&self, method: HttpMethod, behavior: Behavior) -> Arc<RecordingChannel> {
        RecordingChannel::new(method, self.log.clone(), behavior)
    }

    pub fn hooks(&self) -> Arc<RecordingHooks> {
        Arc::new(RecordingHooks {
            log: self.log.clone(),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().clone()
    }

    /// Drain the UI queue until `handle` finished.
    pub fn settle(&self, handle: &RequestHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            self.queue.wait_and_process(Duration::from_millis(20));
        }
        assert!(handle.is_finished(), "operation {} never finished", handle.id());
    }
}

pub fn get(url: &str, id: i32) -> RequestDescriptor {
    RequestDescriptor::with_query(HttpMethod::Get, url, Vec::<(String, String)>::new(), id)
        .expect("GET descriptor")
}

pub fn post(url: &str, body: &str, id: i32) -> RequestDescriptor {
    RequestDescriptor::with_body(HttpMethod::Post, url, Some(body.to_string()), id)
        .expect("POST descriptor")
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}
