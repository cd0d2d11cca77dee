//! Synthetic response construction.
//!
//! Fabricated responses follow one fixed contract: status 200/"OK", a JSON
//! content type, the interception marker header, and the payload serialized
//! compactly as the body.

use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use std::str::FromStr;

/// Marker header signaling that a response was fabricated rather than
/// fetched.
pub const INTERCEPT_MARKER: &str = "x-mocka-intercepted";
pub const CONTENT_TYPE_JSON: &str = "application/json";

pub struct SyntheticResponse {
    body: String,
    headers: HeaderMap,
}

impl SyntheticResponse {
    /// A mock response carrying `payload` serialized with no pretty-printing.
    pub fn json(payload: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            hyper::header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        headers.insert(
            HeaderName::from_static(INTERCEPT_MARKER),
            HeaderValue::from_static("true"),
        );
        SyntheticResponse {
            body: serde_json::to_string(payload).unwrap_or_default(),
            headers,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                self
            }
            _ => self,
        }
    }

    /// The serialized body, as the XHR surface exposes it.
    pub fn body_text(&self) -> &str {
        &self.body
    }

    pub fn build_full(self) -> Response<Full<Bytes>> {
        let body = Full::new(Bytes::from(self.body));

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .body(body)
            .unwrap();

        response.headers_mut().extend(self.headers);
        response
    }
}
