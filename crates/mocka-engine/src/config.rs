//! Engine configuration: the full-resnapshot input unit, the shared
//! snapshot handle the interceptors read from, and the reactive config port.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::flatten::flatten;
use crate::resolver::InterceptorConfig;
use crate::rules::RuleSet;

/// The complete mocking configuration as delivered by the surrounding
/// application: the whole rule set plus the global enable flag.
///
/// Change notifications always carry a full `MockConfig`, never a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    #[serde(default)]
    pub rule_set: RuleSet,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            rule_set: RuleSet::default(),
            enabled: true,
        }
    }
}

impl MockConfig {
    /// Load a configuration from a YAML or JSON file, by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        Ok(config)
    }
}

/// Cloneable handle to the current [`InterceptorConfig`] snapshot.
///
/// Readers take an `Arc` to the snapshot and keep using it even if a newer
/// one is installed mid-flight; installs swap the whole snapshot.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<InterceptorConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: InterceptorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<InterceptorConfig> {
        self.inner.read().clone()
    }

    pub fn install(&self, config: InterceptorConfig) {
        *self.inner.write() = Arc::new(config);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(InterceptorConfig::disabled())
    }
}

/// Owns the snapshot for one origin and re-arms it on configuration
/// changes.
pub struct MockEngine {
    origin: String,
    handle: ConfigHandle,
}

impl MockEngine {
    /// Engine for `origin`, starting with an empty, disabled snapshot.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            handle: ConfigHandle::default(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Handle to hand to the interceptors.
    pub fn handle(&self) -> ConfigHandle {
        self.handle.clone()
    }

    /// Rebuild the table for this engine's origin and swap the snapshot.
    pub fn apply(&self, config: &MockConfig) {
        let table = flatten(&config.rule_set, &self.origin);
        info!(
            origin = %self.origin,
            enabled = config.enabled,
            mocks = table.len(),
            "mock configuration applied"
        );
        self.handle.install(InterceptorConfig {
            table,
            enabled: config.enabled,
        });
    }

    /// The reactive config port: follow `rx` and re-apply on every
    /// notification. The current value is applied immediately, then the
    /// task re-arms the engine whenever the sender publishes a new full
    /// snapshot. The task ends when the sender is dropped.
    pub fn spawn_watch(&self, mut rx: watch::Receiver<MockConfig>) -> tokio::task::JoinHandle<()> {
        let handle = self.handle.clone();
        let origin = self.origin.clone();
        tokio::spawn(async move {
            loop {
                let config = rx.borrow_and_update().clone();
                let table = flatten(&config.rule_set, &origin);
                debug!(origin = %origin, mocks = table.len(), "config change, table rebuilt");
                handle.install(InterceptorConfig {
                    table,
                    enabled: config.enabled,
                });
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
