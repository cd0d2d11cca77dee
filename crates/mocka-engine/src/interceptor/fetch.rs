//! Promise-style interception: a transport wrapper that resolves matching
//! requests locally and forwards everything else untouched.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Method, Response, Uri};
use tracing::debug;

use super::simulated_latency;
use crate::config::ConfigHandle;
use crate::response::SyntheticResponse;

/// A request as handed to the transport. Convertible from a plain string
/// URL, a parsed URI, or built explicitly when method, headers or a body
/// are needed.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: hyper::http::HeaderName, value: hyper::http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        FetchRequest::get(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        FetchRequest::get(url)
    }
}

impl From<Uri> for FetchRequest {
    fn from(uri: Uri) -> Self {
        FetchRequest::get(uri.to_string())
    }
}

/// Error surface of a transport. Interception itself never fails; these
/// only arise from the wrapped primitive.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The promise-based request primitive.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn execute(&self, request: FetchRequest) -> Result<Response<Full<Bytes>>, TransportError>;
}

/// Wraps a transport with mock resolution.
///
/// On a match the response is fabricated locally after a simulated delay;
/// on a miss the wrapped transport receives the original request and its
/// result is returned unmodified, indistinguishable from no wrapper being
/// installed. Wrapping an already wrapped transport just re-wraps; the
/// innermost transport stays reachable through the chain.
pub struct MockFetch<T> {
    inner: T,
    config: ConfigHandle,
}

impl<T: FetchTransport> MockFetch<T> {
    pub fn new(inner: T, config: ConfigHandle) -> Self {
        Self { inner, config }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: FetchTransport> FetchTransport for MockFetch<T> {
    async fn execute(&self, request: FetchRequest) -> Result<Response<Full<Bytes>>, TransportError> {
        let config = self.config.snapshot();
        if let Some(payload) = config.resolve(&request.url, request.method.as_str()) {
            debug!(method = %request.method, url = %request.url, "fetch intercepted");
            let delay = simulated_latency();
            let response = SyntheticResponse::json(payload);
            tokio::time::sleep(delay).await;
            return Ok(response.build_full());
        }
        self.inner.execute(request).await
    }
}

/// Pass-through transport backed by a real HTTP client. This is the
/// "original primitive" a production consumer hands to [`MockFetch`].
#[derive(Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchTransport for ReqwestTransport {
    async fn execute(&self, request: FetchRequest) -> Result<Response<Full<Bytes>>, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let upstream = builder
            .send()
            .await
            .map_err(|e| TransportError::Upstream(Box::new(e)))?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| TransportError::Upstream(Box::new(e)))?;

        let mut response = Response::builder()
            .status(status)
            .body(Full::new(bytes))
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        response.headers_mut().extend(headers);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEngine;
    use crate::response::INTERCEPT_MARKER;
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    /// Records every request it sees and answers with a fixed 204.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Arc<Mutex<Vec<FetchRequest>>>,
    }

    #[async_trait]
    impl FetchTransport for RecordingTransport {
        async fn execute(
            &self,
            request: FetchRequest,
        ) -> Result<Response<Full<Bytes>>, TransportError> {
            self.requests.lock().push(request);
            Ok(Response::builder()
                .status(hyper::StatusCode::NO_CONTENT)
                .body(Full::new(Bytes::new()))
                .unwrap())
        }
    }

    fn armed_engine() -> MockEngine {
        let engine = MockEngine::new("shop.test");
        engine.apply(
            &serde_json::from_value(json!({
                "ruleSet": [
                    {
                        "key": "grp",
                        "origin": "shop.test",
                        "children": [{"path": "/api/cart/:id", "payload": {"code": 0}}]
                    }
                ]
            }))
            .unwrap(),
        );
        engine
    }

    #[tokio::test]
    async fn test_match_fabricates_response() {
        let engine = armed_engine();
        let fetch = MockFetch::new(RecordingTransport::default(), engine.handle());

        let response = fetch
            .execute("https://shop.test/api/cart/42?x=1".into())
            .await
            .unwrap();

        assert_eq!(response.status(), hyper::StatusCode::OK);
        assert_eq!(
            response.headers().get(INTERCEPT_MARKER).unwrap(),
            "true"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"code":0}"#);
        // The wrapped transport never saw the request.
        assert!(fetch.inner().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_miss_passes_through_unmodified() {
        let engine = armed_engine();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            requests: requests.clone(),
        };
        let fetch = MockFetch::new(transport, engine.handle());

        let request = FetchRequest::new(Method::POST, "https://shop.test/api/other")
            .header(
                hyper::header::ACCEPT,
                hyper::http::HeaderValue::from_static("application/json"),
            )
            .body(Bytes::from_static(b"untouched"));
        let response = fetch.execute(request).await.unwrap();

        assert_eq!(response.status(), hyper::StatusCode::NO_CONTENT);
        let seen = requests.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url, "https://shop.test/api/other");
        assert_eq!(
            seen[0].headers.get(hyper::header::ACCEPT).unwrap(),
            "application/json"
        );
        assert_eq!(seen[0].body.as_deref(), Some(&b"untouched"[..]));
    }

    #[tokio::test]
    async fn test_disabled_config_never_intercepts() {
        let engine = MockEngine::new("shop.test");
        engine.apply(
            &serde_json::from_value(json!({
                "ruleSet": [
                    {"key": "grp", "origin": "shop.test",
                     "children": [{"path": "/api/cart/:id", "payload": {"code": 0}}]}
                ],
                "enabled": false
            }))
            .unwrap(),
        );
        let fetch = MockFetch::new(RecordingTransport::default(), engine.handle());

        fetch
            .execute("https://shop.test/api/cart/42".into())
            .await
            .unwrap();
        assert_eq!(fetch.inner().requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_rewrap_keeps_original_reachable() {
        let engine = armed_engine();
        let inner = MockFetch::new(RecordingTransport::default(), engine.handle());
        let outer = MockFetch::new(inner, engine.handle());

        // A miss traverses both wrappers down to the true transport.
        outer
            .execute("https://shop.test/api/untracked".into())
            .await
            .unwrap();
        assert_eq!(outer.inner().inner().requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_match_waits_simulated_latency() {
        let engine = armed_engine();
        let fetch = MockFetch::new(RecordingTransport::default(), engine.handle());

        let start = std::time::Instant::now();
        fetch
            .execute("https://shop.test/api/cart/1".into())
            .await
            .unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(50));
    }

    #[test]
    fn test_request_conversions() {
        let from_str: FetchRequest = "https://a.test/x".into();
        assert_eq!(from_str.method, Method::GET);
        assert_eq!(from_str.url, "https://a.test/x");

        let uri: Uri = "https://a.test/y".parse().unwrap();
        let from_uri: FetchRequest = uri.into();
        assert_eq!(from_uri.url, "https://a.test/y");
    }
}
