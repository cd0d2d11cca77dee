//! Rule-set model shared by the live interceptors and the declarative
//! synchronizer.
//!
//! The rule set is produced by an external editor and delivered as JSON.
//! The engine only ever reads an immutable snapshot of it; nothing here is
//! mutated in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single path-to-payload mock entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRule {
    /// Stable identifier, derived from the owning group key plus the path.
    /// May be empty in hand-written rule files; see [`EndpointRule::derived_key`].
    #[serde(default)]
    pub key: String,
    /// Request path, possibly containing `:param` segments.
    pub path: String,
    /// The JSON value returned in place of a real response. Carried as-is,
    /// even when it looks odd; validation is the editor's concern.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub disabled: bool,
}

impl EndpointRule {
    /// Key used when the editor did not assign one.
    pub fn derived_key(group_key: &str, path: &str) -> String {
        format!("{group_key}:{path}")
    }
}

/// A named collection of endpoints sharing an origin scope and an
/// enable/disable flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRule {
    pub key: String,
    /// Hostname the group applies to. Empty means any origin.
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub children: Vec<EndpointRule>,
}

/// Ordered sequence of groups; the single root snapshot handed to the
/// flattener. Each endpoint is reachable from exactly one group (a tree,
/// not a graph).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    pub groups: Vec<GroupRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total endpoint count across all groups, enabled or not.
    pub fn endpoint_count(&self) -> usize {
        self.groups.iter().map(|g| g.children.len()).sum()
    }
}

/// Precomputed reverse index from endpoint key to owning group key.
///
/// Replaces a per-request tree walk: ownership is resolved once per rule-set
/// snapshot and looked up in O(1) afterwards.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    owner: HashMap<String, String>,
}

impl GroupIndex {
    pub fn build(rule_set: &RuleSet) -> Self {
        let mut owner = HashMap::new();
        for group in &rule_set.groups {
            for endpoint in &group.children {
                let key = if endpoint.key.is_empty() {
                    EndpointRule::derived_key(&group.key, &endpoint.path)
                } else {
                    endpoint.key.clone()
                };
                owner.entry(key).or_insert_with(|| group.key.clone());
            }
        }
        Self { owner }
    }

    pub fn owning_group(&self, endpoint_key: &str) -> Option<&str> {
        self.owner.get(endpoint_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_from_json() {
        let json = r#"[
            {
                "key": "grp-user",
                "origin": "shop.test",
                "children": [
                    {"key": "api:/api/user/list", "path": "/api/user/list", "payload": {"code": 0}}
                ]
            }
        ]"#;
        let rule_set: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(rule_set.groups.len(), 1);
        let group = &rule_set.groups[0];
        assert_eq!(group.origin, "shop.test");
        assert!(!group.disabled);
        assert_eq!(group.children[0].path, "/api/user/list");
        assert!(!group.children[0].disabled);
    }

    #[test]
    fn test_endpoint_defaults() {
        // Key, payload, and disabled flag are all optional in the input.
        let json = r#"{"path": "/api/ping"}"#;
        let endpoint: EndpointRule = serde_json::from_str(json).unwrap();
        assert!(endpoint.key.is_empty());
        assert!(endpoint.payload.is_null());
        assert!(!endpoint.disabled);
    }

    #[test]
    fn test_group_index_ownership() {
        let rule_set: RuleSet = serde_json::from_value(serde_json::json!([
            {
                "key": "grp-a",
                "children": [
                    {"key": "api:/a", "path": "/a"},
                    {"path": "/b"}
                ]
            },
            {
                "key": "grp-b",
                "children": [
                    {"key": "api:/c", "path": "/c"}
                ]
            }
        ]))
        .unwrap();

        let index = GroupIndex::build(&rule_set);
        assert_eq!(index.len(), 3);
        assert_eq!(index.owning_group("api:/a"), Some("grp-a"));
        assert_eq!(index.owning_group("grp-a:/b"), Some("grp-a"));
        assert_eq!(index.owning_group("api:/c"), Some("grp-b"));
        assert_eq!(index.owning_group("api:/missing"), None);
    }

    #[test]
    fn test_endpoint_count() {
        let rule_set: RuleSet = serde_json::from_value(serde_json::json!([
            {"key": "a", "children": [{"path": "/1"}, {"path": "/2"}]},
            {"key": "b", "disabled": true, "children": [{"path": "/3"}]}
        ]))
        .unwrap();
        assert_eq!(rule_set.endpoint_count(), 3);
    }
}
