//! Mock resolution: from a request URL to a payload, or no match.

use hyper::Uri;

use crate::flatten::{FlatEntry, FlatMockTable};
use crate::matcher::normalize_path;

/// Immutable snapshot consulted by one interception attempt.
///
/// A configuration change never mutates a snapshot; it builds a new one and
/// swaps it in, so in-flight resolutions keep the table they started with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterceptorConfig {
    pub table: FlatMockTable,
    pub enabled: bool,
}

impl InterceptorConfig {
    /// A snapshot that never matches anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Resolve `url` against the table, in table order.
    ///
    /// `method` is accepted for API completeness but deliberately not
    /// filtered on: mocks are path-only. This is a documented limitation
    /// of the resolution contract, not an oversight to fix.
    ///
    /// Returns `None` when the enabled flag is off, without inspecting the
    /// table at all.
    pub fn resolve(&self, url: &str, _method: &str) -> Option<&serde_json::Value> {
        self.resolve_entry(url).map(|entry| &entry.payload)
    }

    /// Like [`resolve`](Self::resolve) but yields the whole table entry.
    pub fn resolve_entry(&self, url: &str) -> Option<&FlatEntry> {
        if !self.enabled {
            return None;
        }
        self.table.lookup(&request_path(url))
    }
}

/// Extract the path component of a request URL.
///
/// Absolute URLs are parsed and reduced to their path (scheme, host and
/// query stripped). Anything that does not parse degrades to the raw string
/// as the path, with a `/` prefixed when absent; resolution never fails on
/// a malformed URL.
pub fn request_path(url: &str) -> String {
    if let Ok(uri) = url.parse::<Uri>() {
        // Guard against authority-only parses ("example.com") where the
        // path component would be empty.
        if uri.scheme().is_some() || url.starts_with('/') {
            return uri.path().to_string();
        }
    }
    normalize_path(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::rules::RuleSet;
    use serde_json::json;

    fn config(enabled: bool) -> InterceptorConfig {
        let rule_set: RuleSet = serde_json::from_value(json!([
            {
                "key": "grp",
                "origin": "shop.test",
                "children": [
                    {"path": "/api/cart/:id", "payload": {"code": 0}},
                    {"path": "/api/user/list", "payload": {"code": 1}}
                ]
            }
        ]))
        .unwrap();
        InterceptorConfig {
            table: flatten(&rule_set, "shop.test"),
            enabled,
        }
    }

    #[test]
    fn test_request_path_absolute_url() {
        assert_eq!(
            request_path("https://shop.test/api/cart/42?x=1"),
            "/api/cart/42"
        );
        assert_eq!(request_path("http://shop.test:8080/api/user/list"), "/api/user/list");
    }

    #[test]
    fn test_request_path_origin_form() {
        assert_eq!(request_path("/api/cart/42?x=1"), "/api/cart/42");
    }

    #[test]
    fn test_request_path_fallback() {
        // Unparseable inputs become the path itself, slash-prefixed.
        assert_eq!(request_path("api cart"), "/api cart");
        assert_eq!(request_path("example.com"), "/example.com");
    }

    #[test]
    fn test_resolve_match_and_miss() {
        let config = config(true);
        assert_eq!(
            config.resolve("https://shop.test/api/cart/42?x=1", "GET"),
            Some(&json!({"code": 0}))
        );
        assert_eq!(
            config.resolve("https://shop.test/api/user/list", "POST"),
            Some(&json!({"code": 1}))
        );
        assert_eq!(config.resolve("https://shop.test/api/other", "GET"), None);
    }

    #[test]
    fn test_resolve_ignores_method() {
        let config = config(true);
        for method in ["GET", "POST", "DELETE", "PATCH"] {
            assert!(config.resolve("/api/user/list", method).is_some());
        }
    }

    #[test]
    fn test_disabled_short_circuits() {
        let config = config(false);
        assert!(!config.table.is_empty());
        assert_eq!(config.resolve("https://shop.test/api/cart/42", "GET"), None);
        assert_eq!(config.resolve("/api/user/list", "GET"), None);
    }
}
