//! Parameter-aware path matching.
//!
//! This is the sole routing algorithm of the engine: exact equality first,
//! then segment-wise comparison where a `:param` mock segment matches any
//! single request segment. No multi-segment wildcards, no query-string
//! matching, no regex. Case-sensitive throughout.

/// Normalize a path to start with `/`.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Whether `request_path` satisfies `mock_path`.
///
/// Pure function of its inputs: the same two paths always produce the same
/// answer.
pub fn path_matches(request_path: &str, mock_path: &str) -> bool {
    let request = normalize_path(request_path);
    let mock = normalize_path(mock_path);

    if request == mock {
        return true;
    }

    let mock_parts: Vec<&str> = mock.split('/').collect();
    let request_parts: Vec<&str> = request.split('/').collect();

    if mock_parts.len() != request_parts.len() {
        return false;
    }

    mock_parts
        .iter()
        .zip(&request_parts)
        .all(|(mock_part, request_part)| mock_part.starts_with(':') || mock_part == request_part)
}

/// Compiled form of a mock path, so exact paths skip re-splitting on every
/// lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PathPattern {
    Exact(String),
    /// Normalized segments, at least one of which is a `:param`.
    Params(Vec<String>),
}

impl PathPattern {
    pub fn compile(mock_path: &str) -> Self {
        let normalized = normalize_path(mock_path);
        if normalized.split('/').any(|segment| segment.starts_with(':')) {
            PathPattern::Params(normalized.split('/').map(str::to_string).collect())
        } else {
            PathPattern::Exact(normalized)
        }
    }

    pub fn matches(&self, request_path: &str) -> bool {
        let request = normalize_path(request_path);
        match self {
            PathPattern::Exact(mock) => *mock == request,
            PathPattern::Params(segments) => {
                let request_parts: Vec<&str> = request.split('/').collect();
                if request_parts.len() != segments.len() {
                    return false;
                }
                segments
                    .iter()
                    .zip(&request_parts)
                    .all(|(mock_part, request_part)| {
                        mock_part.starts_with(':') || mock_part == request_part
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(path_matches("/api/user/list", "/api/user/list"));
        assert!(!path_matches("/api/user/list", "/api/user/detail"));
    }

    #[test]
    fn test_param_match() {
        assert!(path_matches("/api/user/123", "/api/user/:id"));
        assert!(!path_matches("/api/user/123/extra", "/api/user/:id"));
        assert!(path_matches("/api/order/7/item/9", "/api/order/:oid/item/:iid"));
    }

    #[test]
    fn test_segment_count_mismatch() {
        assert!(!path_matches("/a/b", "/a"));
        assert!(!path_matches("/a", "/a/b"));
    }

    #[test]
    fn test_leading_slash_normalization() {
        assert!(path_matches("api/user/list", "/api/user/list"));
        assert!(path_matches("/api/user/list", "api/user/list"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!path_matches("/API/user", "/api/user"));
    }

    #[test]
    fn test_no_prefix_wildcard() {
        // A param segment never spans multiple request segments.
        assert!(!path_matches("/api/user/1/2", "/api/user/:id"));
    }

    #[test]
    fn test_determinism() {
        for _ in 0..3 {
            assert!(path_matches("/api/user/123", "/api/user/:id"));
            assert!(!path_matches("/api/user", "/api/user/:id"));
        }
    }

    #[test]
    fn test_pattern_compile() {
        assert_eq!(
            PathPattern::compile("/api/user/list"),
            PathPattern::Exact("/api/user/list".to_string())
        );
        assert!(matches!(
            PathPattern::compile("/api/user/:id"),
            PathPattern::Params(_)
        ));
        // Compilation normalizes the leading slash.
        assert_eq!(
            PathPattern::compile("api/ping"),
            PathPattern::Exact("/api/ping".to_string())
        );
    }

    #[test]
    fn test_pattern_matches_agrees_with_free_function() {
        let cases = [
            ("/api/user/123", "/api/user/:id"),
            ("/api/user/123", "/api/user/list"),
            ("/a/b", "/a"),
            ("api/ping", "/api/ping"),
        ];
        for (request, mock) in cases {
            assert_eq!(
                PathPattern::compile(mock).matches(request),
                path_matches(request, mock),
                "disagreement for {request} vs {mock}"
            );
        }
    }
}
