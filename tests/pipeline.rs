//! Pipeline Integration Tests
//!
//! Full runs of the job against a mock Hacker News API.

use hnpipe::config::Settings;
use hnpipe::core::{EventStore, Job, Orchestrator, JOB_NAME, TOPSTORIES_TABLE};
use hnpipe::domain::{AssetKey, EventType, MetadataValue, RunState, RunTrigger, StepStatus};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers `/v0/item/{id}.json` with a small story titled after its id
struct StoryResponder;

impl Respond for StoryResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id: u64 = request
            .url
            .path()
            .trim_start_matches("/v0/item/")
            .trim_end_matches(".json")
            .parse()
            .unwrap();

        ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "by": "pg",
            "score": id * 10,
            "title": format!("Story number {}", id),
            "type": "story"
        }))
    }
}

async fn mount_top_stories(server: &MockServer, ids: Vec<u64>) {
    Mock::given(method("GET"))
        .and(path("/v0/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ids))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v0/item/\d+\.json$"))
        .respond_with(StoryResponder)
        .mount(server)
        .await;
}

fn settings_for(temp: &TempDir, server: &MockServer) -> Settings {
    let mut settings = Settings::rooted_at(temp.path());
    settings.api.base_url = server.uri();
    settings.api.timeout_seconds = 5;
    settings
}

#[tokio::test]
async fn test_full_run_materializes_all_assets() {
    let server = MockServer::start().await;
    mount_top_stories(&server, (1..=150).collect()).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();

    let run = orchestrator
        .run_job(&Job::all_assets(JOB_NAME), RunTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert_eq!(run.current_step, 3);
    for asset in AssetKey::ALL {
        assert!(run.is_step_completed(asset.as_str()), "{} not completed", asset);
    }

    // 150 ids upstream, only the first 100 are kept
    let ids = orchestrator
        .latest_value(AssetKey::TopstoryIds)
        .await
        .unwrap()
        .unwrap()
        .into_ids()
        .unwrap();
    assert_eq!(ids.len(), 100);
    assert_eq!(ids.as_slice()[0], 1);
    assert_eq!(ids.as_slice()[99], 100);

    // One row per id, in id order
    let table = orchestrator
        .latest_value(AssetKey::Topstories)
        .await
        .unwrap()
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(table.len(), ids.len());
    assert_eq!(table.column("id")[..3], [Some(json!(1)), Some(json!(2)), Some(json!(3))]);

    let words = orchestrator
        .latest_value(AssetKey::MostFrequentWords)
        .await
        .unwrap()
        .unwrap()
        .into_words()
        .unwrap();
    assert_eq!(words.len(), 25);
    assert_eq!(words.entries()[0].word, "story");
    assert_eq!(words.entries()[0].count, 100);
    assert_eq!(words.entries()[1].word, "number");
    assert_eq!(words.entries()[1].count, 100);
    // Ties keep first-seen order
    assert_eq!(words.entries()[2].word, "1");
    assert_eq!(words.entries()[24].word, "23");

    assert_eq!(
        orchestrator.warehouse().row_count(TOPSTORIES_TABLE).unwrap(),
        Some(100)
    );
}

#[tokio::test]
async fn test_run_records_metadata() {
    let server = MockServer::start().await;
    mount_top_stories(&server, vec![7, 8, 9]).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();
    let run = orchestrator
        .run_job(&Job::all_assets(JOB_NAME), RunTrigger::Manual)
        .await
        .unwrap();

    let topstories = &run.metadata["topstories"];
    assert_eq!(topstories.get("num_records"), Some(&MetadataValue::Int(3)));
    match topstories.get("preview") {
        Some(MetadataValue::Markdown(preview)) => assert!(preview.contains("Story number 7")),
        other => panic!("unexpected preview: {:?}", other),
    }

    match run.metadata["most_frequent_words"].get("plot") {
        Some(MetadataValue::Markdown(plot)) => {
            assert!(plot.starts_with("![img](data:image/png;base64,"))
        }
        other => panic!("unexpected plot: {:?}", other),
    }

    // The same state is reconstructed from the event log
    let status = orchestrator.get_run_status(run.id).await.unwrap();
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.job_name, JOB_NAME);
    assert_eq!(status.selection, AssetKey::ALL.to_vec());
    assert_eq!(status.metadata["topstories"], run.metadata["topstories"]);
}

#[tokio::test]
async fn test_failed_item_fetch_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/item/3.json"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_top_stories(&server, vec![1, 2, 3, 4]).await;

    let temp = TempDir::new().unwrap();
    let settings = settings_for(&temp, &server);
    let runs_dir = settings.runs_dir();
    let orchestrator = Orchestrator::new(settings).unwrap();

    let run = orchestrator
        .run_job(&Job::all_assets(JOB_NAME), RunTrigger::Manual)
        .await
        .unwrap();

    match &run.state {
        RunState::Failed { error } => assert!(error.contains("HTTP 500"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(run.is_step_completed("topstory_ids"));
    assert_eq!(run.step_statuses["topstories"], StepStatus::Failed);
    assert!(!run.step_statuses.contains_key("most_frequent_words"));

    let events = EventStore::open(&runs_dir, run.id)
        .await
        .unwrap()
        .replay()
        .await
        .unwrap();
    let tail: Vec<_> = events.iter().rev().take(2).map(|e| e.event_type).collect();
    assert_eq!(tail, vec![EventType::RunFailed, EventType::StepFailed]);
    assert_eq!(
        orchestrator.run_artifacts(run.id).await.unwrap(),
        vec!["topstory_ids"]
    );

    // Nothing downstream of the failure was stored
    assert!(orchestrator
        .latest_value(AssetKey::Topstories)
        .await
        .unwrap()
        .is_none());
    assert_eq!(orchestrator.warehouse().row_count(TOPSTORIES_TABLE).unwrap(), None);
}

#[tokio::test]
async fn test_partial_selection_reads_upstream_from_storage() {
    let server = MockServer::start().await;
    mount_top_stories(&server, vec![1, 2]).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();
    orchestrator
        .run_job(&Job::all_assets(JOB_NAME), RunTrigger::Manual)
        .await
        .unwrap();

    let job = Job::with_selection(JOB_NAME, &[AssetKey::MostFrequentWords]).unwrap();
    let run = orchestrator.run_job(&job, RunTrigger::Manual).await.unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert_eq!(run.selection, vec![AssetKey::MostFrequentWords]);
    assert_eq!(run.current_step, 1);
    assert!(!run.step_statuses.contains_key("topstories"));
    assert_eq!(
        orchestrator.run_artifacts(run.id).await.unwrap(),
        vec!["most_frequent_words"]
    );
    assert!(orchestrator.run_artifacts(uuid::Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn test_missing_upstream_fails_run() {
    let server = MockServer::start().await;
    mount_top_stories(&server, vec![1]).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();

    let job = Job::with_selection(JOB_NAME, &[AssetKey::Topstories]).unwrap();
    let run = orchestrator.run_job(&job, RunTrigger::Manual).await.unwrap();

    match &run.state {
        RunState::Failed { error } => {
            assert!(error.contains("never been materialized"), "{}", error)
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_listing_completes() {
    let server = MockServer::start().await;
    mount_top_stories(&server, Vec::new()).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();
    let run = orchestrator
        .run_job(&Job::all_assets(JOB_NAME), RunTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert_eq!(
        run.metadata["topstories"].get("num_records"),
        Some(&MetadataValue::Int(0))
    );
    let words = orchestrator
        .latest_value(AssetKey::MostFrequentWords)
        .await
        .unwrap()
        .unwrap()
        .into_words()
        .unwrap();
    assert!(words.is_empty());
}

#[tokio::test]
async fn test_concurrent_fetch_keeps_id_order() {
    let server = MockServer::start().await;
    mount_top_stories(&server, vec![5, 3, 9, 1, 7]).await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_for(&temp, &server);
    settings.api.fetch_concurrency = 4;
    let orchestrator = Orchestrator::new(settings).unwrap();

    let job = Job::with_selection(JOB_NAME, &[AssetKey::TopstoryIds, AssetKey::Topstories]).unwrap();
    let run = orchestrator.run_job(&job, RunTrigger::Manual).await.unwrap();
    assert_eq!(run.state, RunState::Completed);

    let table = orchestrator
        .latest_value(AssetKey::Topstories)
        .await
        .unwrap()
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(
        table.column("id"),
        vec![Some(json!(5)), Some(json!(3)), Some(json!(9)), Some(json!(1)), Some(json!(7))]
    );
}

#[tokio::test]
async fn test_list_runs_most_recent_first() {
    let server = MockServer::start().await;
    mount_top_stories(&server, vec![1]).await;

    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(settings_for(&temp, &server)).unwrap();

    let job = Job::all_assets(JOB_NAME);
    let first = orchestrator.run_job(&job, RunTrigger::Manual).await.unwrap();
    let second = orchestrator
        .run_job(
            &job,
            RunTrigger::Schedule {
                name: "hackernews_schedule".to_string(),
            },
        )
        .await
        .unwrap();

    let runs = orchestrator.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second.id);
    assert_eq!(runs[1].id, first.id);
    assert_eq!(runs[0].trigger.to_string(), "schedule:hackernews_schedule");

    assert_eq!(orchestrator.list_runs(1).await.unwrap().len(), 1);
}
