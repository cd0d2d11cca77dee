//! Flattening the hierarchical rule set into the table consulted at match
//! time.
//!
//! Flattening is a pure function of the rule set and the current origin. It
//! is rerun whenever either changes; the output is never mutated in place.

use std::collections::HashSet;

use crate::matcher::{normalize_path, PathPattern};
use crate::rules::{EndpointRule, RuleSet};

/// One resolved table entry: an enabled endpoint of an enabled, in-scope
/// group.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub endpoint_key: String,
    pub group_key: String,
    /// Normalized mock path (leading `/`).
    pub path: String,
    pub pattern: PathPattern,
    pub payload: serde_json::Value,
}

/// The resolved, filtered mapping actually consulted at match time.
///
/// Entries keep rule-set order: groups in declaration order, endpoints in
/// order within their group. When two enabled endpoints flatten to the same
/// path, the first one wins and later duplicates are dropped, so lookups are
/// deterministic regardless of how often the table is rebuilt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMockTable {
    entries: Vec<FlatEntry>,
}

impl FlatMockTable {
    /// First entry whose pattern matches the request path, in table order.
    pub fn lookup(&self, request_path: &str) -> Option<&FlatEntry> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.matches(request_path))
    }

    pub fn entries(&self) -> &[FlatEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_key(endpoint: &EndpointRule, group_key: &str) -> String {
    if endpoint.key.is_empty() {
        EndpointRule::derived_key(group_key, &endpoint.path)
    } else {
        endpoint.key.clone()
    }
}

/// Flatten `rule_set` for one origin.
///
/// A group contributes its enabled children when it is enabled itself and
/// its origin is empty or equals `current_origin`. An endpoint whose group
/// is excluded disappears silently; that is scoping, not an error.
pub fn flatten(rule_set: &RuleSet, current_origin: &str) -> FlatMockTable {
    let mut entries = Vec::new();
    let mut seen_paths = HashSet::new();

    for group in &rule_set.groups {
        if group.disabled {
            continue;
        }
        if !group.origin.is_empty() && group.origin != current_origin {
            continue;
        }
        for endpoint in &group.children {
            if endpoint.disabled {
                continue;
            }
            let path = normalize_path(&endpoint.path);
            if !seen_paths.insert(path.clone()) {
                continue;
            }
            entries.push(FlatEntry {
                endpoint_key: entry_key(endpoint, &group.key),
                group_key: group.key.clone(),
                pattern: PathPattern::compile(&path),
                path,
                payload: endpoint.payload.clone(),
            });
        }
    }

    FlatMockTable { entries }
}

/// One entry of the origin-global view used by the declarative synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedEntry {
    pub endpoint_key: String,
    /// Owning group's origin; empty for any-origin groups.
    pub origin: String,
    /// Normalized mock path.
    pub path: String,
    pub payload: serde_json::Value,
}

/// Flatten every enabled endpoint of every enabled group, across all
/// origins. The declarative mode runs before any page context exists, so it
/// cannot scope by origin here; the origin is carried on each entry instead.
pub fn flatten_all(rule_set: &RuleSet) -> Vec<ScopedEntry> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for group in &rule_set.groups {
        if group.disabled {
            continue;
        }
        for endpoint in &group.children {
            if endpoint.disabled {
                continue;
            }
            let path = normalize_path(&endpoint.path);
            if !seen.insert((group.origin.clone(), path.clone())) {
                continue;
            }
            entries.push(ScopedEntry {
                endpoint_key: entry_key(endpoint, &group.key),
                origin: group.origin.clone(),
                path,
                payload: endpoint.payload.clone(),
            });
        }
    }

    entries
}
