//! Fake transports for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::core::{PipelineConfig, PipelineId, PipelineStatus};
use crate::errors::{Result, TrackerError};
use crate::transport::PipelineTransport;

/// One scripted answer to a status fetch.
#[derive(Debug, Clone)]
pub enum FetchStep {
    /// Return this snapshot.
    Status(PipelineStatus),
    /// Fail with this message.
    Error(String),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<FetchStep>,
    last: Option<FetchStep>,
    fetches: usize,
}

#[derive(Debug, Default)]
struct SubmitScript {
    ids: VecDeque<PipelineId>,
    failures: VecDeque<Option<String>>,
    submitted: Vec<PipelineConfig>,
}

/// A transport that replays scripted responses and counts calls.
///
/// Fetches consume the pipeline's script in order; once it runs out the
/// last step repeats. Fetching an unscripted id fails with a fetch error.
/// Submissions return queued ids, or fresh UUIDs when none are queued.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<PipelineId, Script>>,
    submit: Mutex<SubmitScript>,
}

impl ScriptedTransport {
    /// Creates a transport with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the id returned by the next successful submission.
    pub fn queue_id(&self, id: impl Into<PipelineId>) {
        self.submit.lock().ids.push_back(id.into());
    }

    /// Makes the next submission fail, with or without a reported message.
    pub fn fail_next_submit(&self, message: Option<&str>) {
        self.submit
            .lock()
            .failures
            .push_back(message.map(ToString::to_string));
    }

    /// Appends steps to a pipeline's fetch script.
    pub fn script(&self, id: &PipelineId, steps: Vec<FetchStep>) {
        self.scripts
            .lock()
            .entry(id.clone())
            .or_default()
            .steps
            .extend(steps);
    }

    /// Appends snapshots to a pipeline's fetch script.
    pub fn script_statuses(&self, id: &PipelineId, statuses: Vec<PipelineStatus>) {
        self.script(id, statuses.into_iter().map(FetchStep::Status).collect());
    }

    /// Returns the number of fetches issued for a pipeline.
    #[must_use]
    pub fn fetch_count(&self, id: &PipelineId) -> usize {
        self.scripts.lock().get(id).map_or(0, |s| s.fetches)
    }

    /// Returns the configs submitted so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<PipelineConfig> {
        self.submit.lock().submitted.clone()
    }
}

#[async_trait]
impl PipelineTransport for ScriptedTransport {
    async fn submit(&self, config: &PipelineConfig) -> Result<PipelineId> {
        let mut submit = self.submit.lock();
        if let Some(failure) = submit.failures.pop_front() {
            return Err(TrackerError::submission(failure));
        }
        submit.submitted.push(config.clone());
        Ok(submit
            .ids
            .pop_front()
            .unwrap_or_else(|| PipelineId::new(Uuid::new_v4().to_string())))
    }

    async fn fetch(&self, id: &PipelineId) -> Result<PipelineStatus> {
        let mut scripts = self.scripts.lock();
        let script = scripts.entry(id.clone()).or_default();
        script.fetches += 1;

        let step = match script.steps.pop_front() {
            Some(step) => {
                script.last = Some(step.clone());
                Some(step)
            }
            None => script.last.clone(),
        };

        match step {
            Some(FetchStep::Status(status)) => Ok(status),
            Some(FetchStep::Error(message)) => Err(TrackerError::fetch(Some(message))),
            None => Err(TrackerError::fetch(Some(format!("Pipeline {id} not found")))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineState;
    use crate::testing::snapshot;

    #[tokio::test]
    async fn test_script_replays_then_repeats_last() {
        let transport = ScriptedTransport::new();
        let id = PipelineId::new("p");
        transport.script(
            &id,
            vec![
                FetchStep::Error("blip".to_string()),
                FetchStep::Status(snapshot(&id, PipelineState::Processing, 10)),
            ],
        );

        assert!(transport.fetch(&id).await.is_err());
        assert_eq!(transport.fetch(&id).await.unwrap().progress, 10);
        assert_eq!(transport.fetch(&id).await.unwrap().progress, 10);
        assert_eq!(transport.fetch_count(&id), 3);
    }

    #[tokio::test]
    async fn test_unscripted_fetch_fails() {
        let transport = ScriptedTransport::new();
        let err = transport.fetch(&PipelineId::new("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "Pipeline nope not found");
    }

    #[tokio::test]
    async fn test_submit_ids_and_failures() {
        let transport = ScriptedTransport::new();
        transport.queue_id("first");
        transport.fail_next_submit(Some("rate limited"));

        let err = transport.submit(&PipelineConfig::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "rate limited");

        let id = transport.submit(&PipelineConfig::new()).await.unwrap();
        assert_eq!(id.as_str(), "first");

        let generated = transport.submit(&PipelineConfig::new()).await.unwrap();
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
        assert_eq!(transport.submitted().len(), 2);
    }
}
