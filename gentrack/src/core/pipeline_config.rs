//! Caller-supplied generation request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The generation parameters submitted for a pipeline.
///
/// The tracker never interprets the contents; the object is posted to the
/// generation service as-is and reattached to every snapshot of the pipeline.
/// Shared as `Arc<PipelineConfig>` so all snapshots carry the same instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineConfig(Map<String, Value>);

impl PipelineConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns true if no fields are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PipelineConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for PipelineConfig {
    type Error = crate::errors::TrackerError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::errors::TrackerError::Serialization(format!(
                "pipeline config must be a JSON object, got {other}"
            ))),
        }
    }
}
