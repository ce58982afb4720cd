//! Pipeline status snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{PipelineConfig, PipelineId, PipelineState, StageState};

/// 3D model generation stage.
pub const STAGE_GENERATION: &str = "generation";
/// Texture / retexture stage.
pub const STAGE_RETEXTURING: &str = "retexturing";
/// Sprite rendering stage.
pub const STAGE_SPRITES: &str = "sprites";

/// Stages every newly submitted pipeline starts with.
pub const DEFAULT_STAGES: [&str; 3] = [STAGE_GENERATION, STAGE_RETEXTURING, STAGE_SPRITES];

/// Progress of one named stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageProgress {
    /// Stage state.
    #[serde(default)]
    pub status: StageState,
    /// Percentage complete.
    #[serde(default)]
    pub progress: u32,
    /// Failure message for this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageProgress {
    /// Creates a stage record in the given state.
    #[must_use]
    pub fn new(status: StageState, progress: u32) -> Self {
        Self {
            status,
            progress,
            error: None,
        }
    }

    /// Creates a pending stage record.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }
}

/// The generation service's view of a pipeline at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Pipeline identifier.
    pub id: PipelineId,
    /// Overall state.
    pub status: PipelineState,
    /// Overall percentage complete, recorded as reported.
    #[serde(default)]
    pub progress: u32,
    /// Named sub-stage records.
    #[serde(default)]
    pub stages: BTreeMap<String, StageProgress>,
    /// Artifacts produced so far, keyed by stage.
    #[serde(default)]
    pub results: Map<String, Value>,
    /// Failure message, present when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The submitted config, reattached locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Arc<PipelineConfig>>,
}

impl PipelineStatus {
    /// Creates the snapshot recorded right after submission.
    #[must_use]
    pub fn initial(id: PipelineId, config: Arc<PipelineConfig>) -> Self {
        Self {
            id,
            status: PipelineState::Initializing,
            progress: 0,
            stages: DEFAULT_STAGES
                .iter()
                .map(|name| ((*name).to_string(), StageProgress::pending()))
                .collect(),
            results: Map::new(),
            error: None,
            config: Some(config),
        }
    }

    /// Attaches (or replaces) the config.
    #[must_use]
    pub fn with_config(mut self, config: Option<Arc<PipelineConfig>>) -> Self {
        self.config = config;
        self
    }

    /// Returns true if the snapshot is in an absorbing state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns a stage record by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageProgress> {
        self.stages.get(name)
    }

    /// Returns a result artifact by stage name.
    #[must_use]
    pub fn result(&self, stage: &str) -> Option<&Value> {
        self.results.get(stage)
    }

    /// Carries forward results from an earlier snapshot that this one omits.
    ///
    /// Results are append-only: a key reported once is never retracted, while
    /// a newer value for the same key replaces the older one.
    pub fn retain_results_from(&mut self, previous: &Self) {
        for (key, value) in &previous.results {
            if !self.results.contains_key(key) {
                self.results.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_snapshot() {
        let config = Arc::new(PipelineConfig::new().with("prompt", "goblin"));
        let status = PipelineStatus::initial(PipelineId::new("p1"), config.clone());

        assert_eq!(status.status, PipelineState::Initializing);
        assert_eq!(status.progress, 0);
        assert_eq!(status.stages.len(), DEFAULT_STAGES.len());
        assert!(status.stages.values().all(|s| s.status == StageState::Pending));
        assert!(status.results.is_empty());
        assert!(Arc::ptr_eq(status.config.as_ref().unwrap(), &config));
    }

    #[test]
    fn test_deserialize_service_response() {
        let body = json!({
            "id": "p1",
            "status": "processing",
            "progress": 40,
            "stages": {
                "generation": {"status": "completed", "progress": 100},
                "retexturing": {"status": "processing", "progress": 20}
            },
            "results": {"generation": {"modelUrl": "https://cdn.example/model.glb"}}
        });

        let status: PipelineStatus = serde_json::from_value(body).unwrap();
        assert_eq!(status.status, PipelineState::Processing);
        assert_eq!(status.progress, 40);
        assert_eq!(status.stage(STAGE_GENERATION).unwrap().status, StageState::Completed);
        assert!(status.result(STAGE_GENERATION).is_some());
        assert!(status.config.is_none());
        assert!(status.error.is_none());
    }

    #[test]
    fn test_deserialize_minimal_failed_response() {
        let body = json!({"id": "p2", "status": "failed", "error": "Meshy task timed out"});
        let status: PipelineStatus = serde_json::from_value(body).unwrap();
        assert!(status.is_terminal());
        assert_eq!(status.error.as_deref(), Some("Meshy task timed out"));
        assert!(status.stages.is_empty());
    }

    #[test]
    fn test_retain_results_never_retracts() {
        let config = Arc::new(PipelineConfig::new());
        let mut previous = PipelineStatus::initial(PipelineId::new("p"), config.clone());
        previous.results.insert("generation".into(), json!({"modelUrl": "a"}));
        previous.results.insert("retexturing".into(), json!({"textureUrl": "old"}));

        let mut next = PipelineStatus::initial(PipelineId::new("p"), config);
        next.results.insert("retexturing".into(), json!({"textureUrl": "new"}));
        next.retain_results_from(&previous);

        assert_eq!(next.result("generation"), Some(&json!({"modelUrl": "a"})));
        assert_eq!(next.result("retexturing"), Some(&json!({"textureUrl": "new"})));
    }

    #[test]
    fn test_config_skipped_when_absent() {
        let status: PipelineStatus =
            serde_json::from_value(json!({"id": "p3", "status": "initializing"})).unwrap();
        let value = serde_json::to_value(&status).unwrap();
        assert!(value.get("config").is_none());
        assert!(value.get("error").is_none());
    }
}
