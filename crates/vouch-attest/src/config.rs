use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use vouch_core::SchemaId;

use crate::error::{LifecycleError, LifecycleResult};

/// Configuration handed to the lifecycle manager at construction.
///
/// `schemas` maps a logical record type (e.g. `"forecast"`) to the schema
/// identifier it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestConfig {
    /// Upper bound on every single ledger call, in milliseconds.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaId>,
}

fn default_publish_timeout_ms() -> u64 {
    30_000
}

impl Default for AttestConfig {
    fn default() -> Self {
        Self {
            publish_timeout_ms: default_publish_timeout_ms(),
            schemas: BTreeMap::new(),
        }
    }
}

impl AttestConfig {
    pub fn with_schema(mut self, record_type: impl Into<String>, schema: impl Into<SchemaId>) -> Self {
        self.schemas.insert(record_type.into(), schema.into());
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn schema_for(&self, record_type: &str) -> LifecycleResult<&SchemaId> {
        self.schemas
            .get(record_type)
            .ok_or_else(|| LifecycleError::SchemaNotConfigured(record_type.to_string()))
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        if self.publish_timeout_ms == 0 {
            return Err(LifecycleError::InvalidConfig(
                "publish_timeout_ms must be > 0".into(),
            ));
        }
        for (record_type, schema) in &self.schemas {
            if record_type.is_empty() {
                return Err(LifecycleError::InvalidConfig(
                    "record type names must be non-empty".into(),
                ));
            }
            if schema.is_empty() {
                return Err(LifecycleError::InvalidConfig(format!(
                    "schema id for '{}' is empty",
                    record_type
                )));
            }
        }
        Ok(())
    }
}
