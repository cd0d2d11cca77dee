//! Callback-style interception: a request object mirroring the open/send
//! lifecycle of the event-based primitive.
//!
//! `open` records the normalized method and URL and always forwards to the
//! wrapped upstream. `send` resolves against the mock table: a miss forwards
//! the body unchanged and the upstream's completion flows back through the
//! same event surface; a match never touches the network and instead
//! synthesizes the completed lifecycle after a simulated delay.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::simulated_latency;
use crate::config::ConfigHandle;
use crate::response::{CONTENT_TYPE_JSON, INTERCEPT_MARKER};

/// XHR-style ready states. Only `Opened` and `Done` are produced here; the
/// fabricated response is delivered atomically, without a `Loading` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

/// Final state delivered by an upstream request.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

pub type UpstreamCompletion = Box<dyn FnOnce(UpstreamResponse) + Send>;

/// One in-flight upstream request, the wrapped "original" open/send pair.
///
/// Completion delivers the final state only; intermediate ready states and
/// body chunking are not modeled.
pub trait UpstreamXhr: Send {
    fn open(&mut self, method: &str, url: &str);
    fn send(&mut self, body: Option<Bytes>, complete: UpstreamCompletion);
}

/// Factory producing one [`UpstreamXhr`] per request object.
pub trait XhrUpstream: Send + Sync {
    fn request(&self) -> Box<dyn UpstreamXhr>;
}

#[derive(Debug)]
struct XhrState {
    method: String,
    url: String,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    response_text: String,
    response_headers: Vec<(String, String)>,
}

impl Default for XhrState {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            url: String::new(),
            ready_state: ReadyState::Unsent,
            status: 0,
            status_text: String::new(),
            response_text: String::new(),
            response_headers: Vec::new(),
        }
    }
}

type Callback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct XhrCallbacks {
    ready_state_change: Option<Callback>,
    load: Option<Callback>,
    load_end: Option<Callback>,
}

/// Creates request objects bound to a config snapshot source and an
/// upstream factory.
pub struct XhrInterceptor {
    config: ConfigHandle,
    upstream: Arc<dyn XhrUpstream>,
}

impl XhrInterceptor {
    pub fn new(config: ConfigHandle, upstream: Arc<dyn XhrUpstream>) -> Self {
        Self { config, upstream }
    }

    /// A fresh request object, the counterpart of constructing the
    /// primitive directly.
    pub fn request(&self) -> MockXhr {
        MockXhr {
            state: Arc::new(Mutex::new(XhrState::default())),
            callbacks: Arc::new(Mutex::new(XhrCallbacks::default())),
            config: self.config.clone(),
            upstream: Arc::new(Mutex::new(self.upstream.request())),
        }
    }
}

/// The callback-based request object.
///
/// Clones share the same underlying request; a clone captured by an event
/// callback observes the completed state.
#[derive(Clone)]
pub struct MockXhr {
    state: Arc<Mutex<XhrState>>,
    callbacks: Arc<Mutex<XhrCallbacks>>,
    config: ConfigHandle,
    upstream: Arc<Mutex<Box<dyn UpstreamXhr>>>,
}

impl MockXhr {
    /// Record the upper-cased method and the URL, then forward to the
    /// upstream open so unrelated upstream behavior is preserved.
    pub fn open(&self, method: &str, url: &str) {
        let method = method.to_ascii_uppercase();
        {
            let mut state = self.state.lock();
            state.method = method.clone();
            state.url = url.to_string();
            state.ready_state = ReadyState::Opened;
        }
        self.upstream.lock().open(&method, url);
    }

    /// Resolve the recorded URL; fabricate on match, forward on miss.
    pub fn send(&self, body: Option<Bytes>) {
        let (url, method) = {
            let state = self.state.lock();
            (state.url.clone(), state.method.clone())
        };

        let config = self.config.snapshot();
        if let Some(payload) = config.resolve(&url, &method) {
            debug!(%method, %url, "xhr intercepted");
            let payload = payload.clone();
            let delay = simulated_latency();
            let xhr = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                xhr.complete_with_mock(&payload);
            });
            return;
        }

        let xhr = self.clone();
        self.upstream.lock().send(
            body,
            Box::new(move |response| xhr.complete_with_upstream(response)),
        );
    }

    pub fn on_ready_state_change(&self, callback: impl FnMut() + Send + 'static) {
        self.callbacks.lock().ready_state_change = Some(Box::new(callback));
    }

    pub fn on_load(&self, callback: impl FnMut() + Send + 'static) {
        self.callbacks.lock().load = Some(Box::new(callback));
    }

    pub fn on_load_end(&self, callback: impl FnMut() + Send + 'static) {
        self.callbacks.lock().load_end = Some(Box::new(callback));
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    pub fn status(&self) -> u16 {
        self.state.lock().status
    }

    pub fn status_text(&self) -> String {
        self.state.lock().status_text.clone()
    }

    pub fn response_text(&self) -> String {
        self.state.lock().response_text.clone()
    }

    /// The generic response field; identical to [`response_text`](Self::response_text)
    /// for this JSON-only surface.
    pub fn response(&self) -> String {
        self.response_text()
    }

    /// Case-insensitive response header lookup.
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .response_headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    /// All response headers, CRLF-joined in `name: value` form.
    pub fn get_all_response_headers(&self) -> String {
        let state = self.state.lock();
        state
            .response_headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    fn complete_with_mock(&self, payload: &serde_json::Value) {
        let body = serde_json::to_string(payload).unwrap_or_default();
        {
            let mut state = self.state.lock();
            state.ready_state = ReadyState::Done;
            state.status = 200;
            state.status_text = "OK".to_string();
            state.response_text = body;
            state.response_headers = vec![
                ("content-type".to_string(), CONTENT_TYPE_JSON.to_string()),
                (INTERCEPT_MARKER.to_string(), "true".to_string()),
            ];
        }
        self.fire_completion_events();
    }

    fn complete_with_upstream(&self, response: UpstreamResponse) {
        {
            let mut state = self.state.lock();
            state.ready_state = ReadyState::Done;
            state.status = response.status;
            state.status_text = response.status_text;
            state.response_text = response.body;
            state.response_headers = response.headers;
        }
        self.fire_completion_events();
    }

    /// Fire state-change, load, load-end, in that order. Each callback is
    /// taken out of the registry for the duration of its call so it may
    /// register a replacement without deadlocking.
    fn fire_completion_events(&self) {
        for event in [XhrEvent::ReadyStateChange, XhrEvent::Load, XhrEvent::LoadEnd] {
            self.fire(event);
        }
    }

    fn fire(&self, event: XhrEvent) {
        let callback = XhrEvent::slot(event, &mut self.callbacks.lock()).take();
        if let Some(mut callback) = callback {
            callback();
            let mut callbacks = self.callbacks.lock();
            let slot = XhrEvent::slot(event, &mut callbacks);
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum XhrEvent {
    ReadyStateChange,
    Load,
    LoadEnd,
}

impl XhrEvent {
    fn slot(event: XhrEvent, callbacks: &mut XhrCallbacks) -> &mut Option<Callback> {
        match event {
            XhrEvent::ReadyStateChange => &mut callbacks.ready_state_change,
            XhrEvent::Load => &mut callbacks.load,
            XhrEvent::LoadEnd => &mut callbacks.load_end,
        }
    }
}

/// Upstream backed by a real HTTP client.
///
/// Transport failures are collapsed to a status 0 completion with an empty
/// body, the closest analogue of the primitive's error surface.
pub struct ReqwestXhrUpstream {
    client: reqwest::Client,
}

impl ReqwestXhrUpstream {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestXhrUpstream {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl XhrUpstream for ReqwestXhrUpstream {
    fn request(&self) -> Box<dyn UpstreamXhr> {
        Box::new(ReqwestXhrRequest {
            client: self.client.clone(),
            method: "GET".to_string(),
            url: String::new(),
        })
    }
}

struct ReqwestXhrRequest {
    client: reqwest::Client,
    method: String,
    url: String,
}

impl UpstreamXhr for ReqwestXhrRequest {
    fn open(&mut self, method: &str, url: &str) {
        self.method = method.to_string();
        self.url = url.to_string();
    }

    fn send(&mut self, body: Option<Bytes>, complete: UpstreamCompletion) {
        let method = reqwest::Method::from_bytes(self.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut builder = self.client.request(method, &self.url);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        tokio::spawn(async move {
            let response = match builder.send().await {
                Ok(upstream) => {
                    let status = upstream.status();
                    let headers = upstream
                        .headers()
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_string(),
                                value.to_str().unwrap_or("").to_string(),
                            )
                        })
                        .collect();
                    UpstreamResponse {
                        status: status.as_u16(),
                        status_text: status.canonical_reason().unwrap_or("").to_string(),
                        headers,
                        body: upstream.text().await.unwrap_or_default(),
                    }
                }
                Err(_) => UpstreamResponse {
                    status: 0,
                    status_text: String::new(),
                    headers: Vec::new(),
                    body: String::new(),
                },
            };
            complete(response);
        });
    }
}
