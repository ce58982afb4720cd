//! End-to-end polling behaviour of the tracker over a scripted transport.

use gentrack::events::{CollectingEventSink, EventKind, TrackerEvent};
use gentrack::poller::PollExit;
use gentrack::prelude::*;
use gentrack::testing::{
    assert_event_count, assert_same_config, assert_terminal, init_test_tracing, snapshot,
    FetchStep, ScriptedTransport, SnapshotBuilder,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const INTERVAL: Duration = Duration::from_millis(100);

fn setup() -> (Arc<ScriptedTransport>, PipelineTracker, Arc<CollectingEventSink>) {
    init_test_tracing();
    let transport = Arc::new(ScriptedTransport::new());
    let tracker = PipelineTracker::new(
        transport.clone(),
        TrackerConfig::new().with_poll_interval(INTERVAL),
    )
    .unwrap();
    let sink = Arc::new(CollectingEventSink::new());
    tracker.events().attach_sink(sink.clone());
    (transport, tracker, sink)
}

fn asset_request() -> PipelineConfig {
    PipelineConfig::new()
        .with("prompt", "a mossy stone golem")
        .with("style", "low-poly")
        .with("entityType", "npc")
}

/// Lets the poller run for `ticks` intervals of paused time.
async fn run_for(ticks: u32) {
    tokio::time::sleep(INTERVAL * ticks + INTERVAL / 2).await;
}

#[tokio::test(start_paused = true)]
async fn test_event_sequence_for_simple_run() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_seq");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 50),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(3).await;

    assert_eq!(
        sink.event_types(),
        vec![
            "pipeline:started",
            "progress",
            "statusChange",
            "update",
            "progress",
            "statusChange",
            "update",
            "pipeline:completed",
        ]
    );
    assert_eq!(transport.submitted(), vec![asset_request()]);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_state_stops_fetching() {
    let (transport, tracker, _sink) = setup();
    let id = PipelineId::new("pl_terminal");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 10),
            snapshot(&id, PipelineState::Processing, 60),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(5).await;
    assert_eq!(transport.fetch_count(&id), 3);

    run_for(10).await;
    assert_eq!(transport.fetch_count(&id), 3);
    assert!(!tracker.is_polling(&id));
    assert_terminal(&tracker.get_pipeline_status(&id).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_progress_and_status_events_only_on_change() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_delta");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 0),
            snapshot(&id, PipelineState::Processing, 0),
            snapshot(&id, PipelineState::Processing, 50),
            snapshot(&id, PipelineState::Processing, 50),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(6).await;

    let progress: Vec<u32> = sink
        .events_of_kind(EventKind::Progress)
        .into_iter()
        .filter_map(|event| match event {
            TrackerEvent::Progress(e) => Some(e.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0, 50, 100]);
    assert_event_count(&sink, EventKind::Update, 5);
    assert_event_count(&sink, EventKind::StatusChange, 2);
}

#[tokio::test(start_paused = true)]
async fn test_completion_is_exclusive() {
    let (transport, tracker, sink) = setup();
    let done = PipelineId::new("pl_done");
    let broken = PipelineId::new("pl_broken");
    transport.queue_id(done.clone());
    transport.queue_id(broken.clone());
    transport.script_statuses(&done, vec![snapshot(&done, PipelineState::Completed, 100)]);
    transport.script_statuses(
        &broken,
        vec![
            snapshot(&broken, PipelineState::Processing, 20),
            SnapshotBuilder::new(broken.clone())
                .progress(20)
                .failed("Retexturing provider rejected the mesh")
                .build(),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(4).await;

    let completed: Vec<_> = sink
        .events_of_kind(EventKind::Completed)
        .iter()
        .map(|e| e.pipeline_id().clone())
        .collect();
    assert_eq!(completed, vec![done.clone()]);

    let failed = sink.events_of_kind(EventKind::Failed);
    assert_eq!(failed.len(), 1);
    match &failed[0] {
        TrackerEvent::Failed(e) => {
            assert_eq!(e.pipeline_id, broken);
            assert_eq!(
                e.error.as_deref(),
                Some("Retexturing provider rejected the mesh")
            );
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_does_not_stop_polling() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_flaky");
    transport.queue_id(id.clone());
    transport.script(
        &id,
        vec![
            FetchStep::Status(snapshot(&id, PipelineState::Processing, 10)),
            FetchStep::Error("upstream timeout".to_string()),
            FetchStep::Status(snapshot(&id, PipelineState::Processing, 20)),
            FetchStep::Status(snapshot(&id, PipelineState::Processing, 30)),
            FetchStep::Status(snapshot(&id, PipelineState::Completed, 100)),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(6).await;

    assert_eq!(transport.fetch_count(&id), 5);
    assert_event_count(&sink, EventKind::Error, 1);
    assert_event_count(&sink, EventKind::Update, 4);
    assert_event_count(&sink, EventKind::Completed, 1);

    match &sink.events_of_kind(EventKind::Error)[0] {
        TrackerEvent::Error(e) => assert_eq!(e.error, "upstream timeout"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_persistent_fetch_errors_keep_polling() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_down");
    transport.queue_id(id.clone());
    transport.script(&id, vec![FetchStep::Error("service unavailable".to_string())]);

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(4).await;

    assert_eq!(transport.fetch_count(&id), 5);
    assert_event_count(&sink, EventKind::Error, 5);
    assert!(tracker.is_polling(&id));
    assert_eq!(
        tracker.get_pipeline_status(&id).unwrap().status,
        PipelineState::Initializing
    );
}

#[tokio::test(start_paused = true)]
async fn test_clear_inactive_keeps_active_entries_untouched() {
    let (transport, tracker, _sink) = setup();
    let finished = PipelineId::new("pl_finished");
    let running = PipelineId::new("pl_running");
    transport.queue_id(finished.clone());
    transport.queue_id(running.clone());
    transport.script_statuses(
        &finished,
        vec![snapshot(&finished, PipelineState::Completed, 100)],
    );
    transport.script_statuses(
        &running,
        vec![snapshot(&running, PipelineState::Processing, 45)],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(2).await;
    assert_eq!(tracker.get_active_pipelines().len(), 2);

    let before = tracker.get_entry(&running).unwrap();
    assert_eq!(tracker.clear_inactive_pipelines(), 1);
    let after = tracker.get_entry(&running).unwrap();

    assert_eq!(before, after);
    assert!(tracker.get_pipeline_status(&finished).is_none());
    assert_eq!(tracker.clear_inactive_pipelines(), 0);
    assert!(tracker.is_polling(&running));
}

#[tokio::test(start_paused = true)]
async fn test_clearing_a_manually_refreshed_entry_stops_its_poller() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_refreshed");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 60),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    tokio::time::sleep(INTERVAL / 2).await;

    let refreshed = tracker.fetch_status(&id).await.unwrap();
    assert_terminal(&refreshed);
    assert!(tracker.is_polling(&id));

    assert_eq!(tracker.clear_inactive_pipelines(), 1);
    assert!(!tracker.is_polling(&id));

    run_for(5).await;
    assert_eq!(transport.fetch_count(&id), 2);
    assert_event_count(&sink, EventKind::Completed, 0);
    assert_event_count(&sink, EventKind::Update, 1);
    assert!(tracker.get_pipeline_status(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_config_is_carried_unmodified() {
    let (transport, tracker, _sink) = setup();
    let id = PipelineId::new("pl_config");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 30),
            snapshot(&id, PipelineState::Processing, 70),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );

    let updates = Arc::new(Mutex::new(Vec::new()));
    {
        let updates = updates.clone();
        tracker
            .events()
            .on_update(move |status| updates.lock().push(status.clone()));
    }

    tracker.start_pipeline(asset_request()).await.unwrap();
    let config = tracker.get_entry(&id).unwrap().config;
    assert_eq!(*config, asset_request());

    run_for(1).await;
    let refreshed = assert_ok!(tracker.fetch_status(&id).await);
    assert_same_config(&refreshed, &config);

    run_for(3).await;
    let updates = updates.lock();
    assert_eq!(updates.len(), 3);
    for status in updates.iter() {
        assert_same_config(status, &config);
    }
    assert_same_config(&tracker.get_pipeline_status(&id).unwrap(), &config);
}

#[tokio::test(start_paused = true)]
async fn test_results_accumulate_across_ticks() {
    let (transport, tracker, _sink) = setup();
    let id = PipelineId::new("pl_results");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            SnapshotBuilder::new(id.clone())
                .status(PipelineState::Processing)
                .progress(40)
                .stage("generation", StageState::Completed, 100)
                .result("generation", json!({"modelUrl": "https://cdn.example/golem.glb"}))
                .build(),
            SnapshotBuilder::new(id.clone())
                .status(PipelineState::Completed)
                .progress(100)
                .stage("retexturing", StageState::Completed, 100)
                .result("retexturing", json!({"textureUrl": "https://cdn.example/golem.png"}))
                .build(),
        ],
    );

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(2).await;

    let status = tracker.get_pipeline_status(&id).unwrap();
    assert!(status.result("generation").is_some());
    assert!(status.result("retexturing").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_is_returned() {
    let (transport, tracker, sink) = setup();
    transport.fail_next_submit(Some("Insufficient credits"));

    let err = assert_err!(tracker.start_pipeline(asset_request()).await);

    assert!(matches!(err, TrackerError::Submission(ref m) if m == "Insufficient credits"));
    assert!(sink.is_empty());
    assert!(tracker.get_active_pipelines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_status_for_untracked_id() {
    let (transport, tracker, _sink) = setup();
    let id = PipelineId::new("pl_elsewhere");
    transport.script_statuses(&id, vec![snapshot(&id, PipelineState::Processing, 5)]);

    let status = tracker.fetch_status(&id).await.unwrap();

    assert!(status.config.is_none());
    assert!(tracker.get_pipeline_status(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_every_poller() {
    let (transport, tracker, _sink) = setup();
    let ids = [PipelineId::new("pl_a"), PipelineId::new("pl_b")];
    for id in &ids {
        transport.queue_id(id.clone());
        transport.script_statuses(id, vec![snapshot(id, PipelineState::Processing, 10)]);
        tracker.start_pipeline(asset_request()).await.unwrap();
    }
    run_for(1).await;
    assert_eq!(tracker.polling_count(), 2);

    let mut exits = tracker.shutdown_and_wait().await;
    exits.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        exits,
        vec![
            (ids[0].clone(), PollExit::Cancelled),
            (ids[1].clone(), PollExit::Cancelled)
        ]
    );
    assert_eq!(tracker.polling_count(), 0);

    let counts: Vec<usize> = ids.iter().map(|id| transport.fetch_count(id)).collect();
    run_for(5).await;
    let after: Vec<usize> = ids.iter().map(|id| transport.fetch_count(id)).collect();
    assert_eq!(counts, after);
    // Entries survive shutdown.
    assert_eq!(tracker.get_active_pipelines().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_polling() {
    let (transport, tracker, _sink) = setup();
    let id = PipelineId::new("pl_dropped");
    transport.queue_id(id.clone());
    transport.script_statuses(&id, vec![snapshot(&id, PipelineState::Processing, 10)]);

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(1).await;
    drop(tracker);

    run_for(1).await;
    let fetched = transport.fetch_count(&id);
    run_for(5).await;
    assert_eq!(transport.fetch_count(&id), fetched);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_subscriber_does_not_break_polling() {
    let (transport, tracker, sink) = setup();
    let id = PipelineId::new("pl_panic");
    transport.queue_id(id.clone());
    transport.script_statuses(
        &id,
        vec![
            snapshot(&id, PipelineState::Processing, 50),
            snapshot(&id, PipelineState::Completed, 100),
        ],
    );
    tracker.events().on_update(|_| panic!("broken dashboard widget"));

    tracker.start_pipeline(asset_request()).await.unwrap();
    run_for(3).await;

    assert_event_count(&sink, EventKind::Update, 2);
    assert_event_count(&sink, EventKind::Completed, 1);
}
