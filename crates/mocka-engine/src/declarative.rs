//! Declarative redirect-rule synchronization.
//!
//! This mode installs persistent redirect rules that act before any client
//! code runs, so it cannot scope by origin at install time. Instead the
//! origin is encoded into each rule's URL filter, one rule per enabled,
//! non-disabled endpoint, and the whole list is re-asserted on every
//! rule-set change.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::flatten::flatten_all;
use crate::rules::RuleSet;

/// Largest ID the derivation produces; IDs are always in `1..=MAX_RULE_ID`.
pub const MAX_RULE_ID: u32 = 0x7FFF_FFFF;

/// Derive the stable numeric ID for a rule key.
///
/// FNV-1a over the key bytes, folded into a bounded positive integer. The
/// process-local standard hasher is deliberately not used here: rule IDs
/// must survive restarts so that add/remove reconciliation never leaks
/// stale IDs. Distinct keys collide only with vanishing probability.
pub fn rule_id(key: &str) -> u32 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    (hash % u64::from(MAX_RULE_ID)) as u32 + 1
}

/// Resource classes a rule applies to; redirect rules are restricted to
/// XHR-class traffic (fetch/XHR, not documents or scripts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Xmlhttprequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub redirect: RedirectTarget,
}

/// One persistent redirect rule as the platform consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativeRule {
    pub id: u32,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

fn filter_host(origin: &str) -> &str {
    if origin.is_empty() {
        "*"
    } else {
        origin
    }
}

/// Build the complete rule list for a rule set: every enabled endpoint of
/// every enabled group, across all origins.
pub fn build_rules(rule_set: &RuleSet) -> Vec<DeclarativeRule> {
    flatten_all(rule_set)
        .iter()
        .map(|entry| {
            let host = filter_host(&entry.origin);
            let key = format!("{}{}", host, entry.path);
            let payload_json = serde_json::to_string(&entry.payload).unwrap_or_default();
            DeclarativeRule {
                id: rule_id(&key),
                condition: RuleCondition {
                    url_filter: format!("*://{}{}*", host, entry.path),
                    resource_types: vec![ResourceType::Xmlhttprequest],
                },
                action: RuleAction {
                    kind: ActionKind::Redirect,
                    redirect: RedirectTarget {
                        url: format!(
                            "data:application/json;base64,{}",
                            BASE64_STANDARD.encode(payload_json)
                        ),
                    },
                },
            }
        })
        .collect()
}

/// Store rejection; the previous rule list must be treated as unknown
/// afterwards.
#[derive(Debug, thiserror::Error)]
#[error("declarative rule store rejected the update: {0}")]
pub struct StoreError(pub String);

/// The platform's persistent rule list. One `update` call atomically adds
/// `add` and removes the rules with IDs in `remove_ids`; it either applies
/// as a whole or fails as a whole.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn update(
        &self,
        add: Vec<DeclarativeRule>,
        remove_ids: Vec<u32>,
    ) -> Result<(), StoreError>;
}

/// Mirrors a rule set into a [`RuleStore`].
///
/// `sync` takes `&mut self` so updates can never overlap: each one is
/// awaited before the next can be issued.
pub struct RuleSynchronizer<S> {
    store: S,
}

impl<S: RuleStore> RuleSynchronizer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recompute the full rule list and re-assert it in one add+remove
    /// update. Because IDs are derived from content, removing the new
    /// list's own IDs reconciles unchanged rules in place, so re-running
    /// with an unchanged rule set is idempotent.
    ///
    /// A rejected update is logged and returned; there is no automatic
    /// retry, and the installed list is unknown until the next sync.
    pub async fn sync(&mut self, rule_set: &RuleSet) -> Result<(), StoreError> {
        let rules = build_rules(rule_set);
        let ids: Vec<u32> = rules.iter().map(|rule| rule.id).collect();
        debug!(rules = rules.len(), "applying declarative rule list");

        match self.store.update(rules, ids).await {
            Ok(()) => {
                info!("declarative rule list applied");
                Ok(())
            }
            Err(err) => {
                error!(%err, "declarative rule update failed, installed list unknown until next sync");
                Err(err)
            }
        }
    }
}
