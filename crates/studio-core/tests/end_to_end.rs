use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use studio_core::{
    HeuristicInvoker, ObservationLevel, OverallDecision, StageDecision, Studio, StudioConfig,
    Submission,
};
use studio_test_utils::{
    b2b_submission, heuristic_studio, FailingRecorder, RecordingRecorder, ScriptedInvoker,
    SlowRecorder,
};

#[tokio::test]
async fn test_b2b_idea_is_approved_with_heuristic() {
    let outcome = heuristic_studio().submit(b2b_submission()).await.unwrap();
    let run = &outcome.run;

    let judge = &run.stages()[0];
    assert!(judge.output()["score"].as_u64().unwrap() >= 75);
    assert_eq!(judge.decision(), StageDecision::Go);
    assert!(run.stages().iter().all(|r| r.decision() == StageDecision::Go));
    assert_eq!(run.decision(), OverallDecision::Approved);
    assert_eq!(run.reason(), "All agents passed.");
    assert!(run.poc().unwrap().html.to_lowercase().contains("<html"));
    assert!(run.next_actions().is_empty());
}

#[tokio::test]
async fn test_empty_idea_opens_no_trace_and_runs_no_stage() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let recorder = Arc::new(RecordingRecorder::new());
    let studio = Studio::new(StudioConfig::default(), invoker.clone()).with_recorder(recorder.clone());

    let err = studio.submit(Submission::new("")).await.unwrap_err();
    assert!(err.is_validation());
    assert!(invoker.invoked().is_empty());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_submit_traces_the_whole_run() {
    let recorder = Arc::new(RecordingRecorder::new());
    let studio = heuristic_studio().with_recorder(recorder.clone());
    let outcome = studio.submit(b2b_submission()).await.unwrap();

    let traces = recorder.traces();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].name, "idea_to_poc_pipeline");
    assert_eq!(traces[0].metadata, json!({ "flow": "submit" }));
    assert_eq!(
        traces[0].input,
        json!({
            "idea": "B2B SaaS automation for invoicing",
            "founderName": "Ada",
            "targetUser": "Finance teams",
        })
    );
    assert_eq!(recorder.observation_counts(), (5, 5, 5, 5));

    let updates = recorder.trace_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].output, serde_json::to_value(&outcome.run).unwrap());
}

#[tokio::test]
async fn test_failing_recorder_does_not_change_the_run() {
    let baseline = heuristic_studio().submit(b2b_submission()).await.unwrap();
    let studio = heuristic_studio().with_recorder(Arc::new(FailingRecorder));
    let outcome = studio.submit(b2b_submission()).await.unwrap();
    assert_eq!(outcome.run, baseline.run);
}

#[tokio::test]
async fn test_stalled_recorder_is_bounded_by_budget() {
    let studio = Studio::new(
        StudioConfig::default().with_recorder_budget_ms(5),
        Arc::new(HeuristicInvoker::new()),
    )
    .with_recorder(Arc::new(SlowRecorder::new(Duration::from_secs(30))));

    let outcome = tokio::time::timeout(Duration::from_secs(5), studio.submit(b2b_submission()))
        .await
        .expect("stalled recorder must not block the run")
        .unwrap();
    assert_eq!(outcome.run.decision(), OverallDecision::Approved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_independent() {
    let studio = Arc::new(heuristic_studio());
    let ideas = ["B2B SaaS automation for invoicing", "A cozy board game cafe"];
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let studio = studio.clone();
            let idea = ideas[i % 2];
            tokio::spawn(async move { (idea, studio.submit(Submission::new(idea)).await) })
        })
        .collect();

    for handle in handles {
        let (idea, outcome) = handle.await.unwrap();
        let expected = if idea.contains("SaaS") {
            OverallDecision::Approved
        } else {
            OverallDecision::ConditionalApproval
        };
        assert_eq!(outcome.unwrap().run.decision(), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_runs_proceed_concurrently() {
    let invoker = Arc::new(ScriptedInvoker::new().with_delay(Duration::from_millis(100)));
    let studio = Studio::new(StudioConfig::default(), invoker.clone());

    let started = Instant::now();
    let (first, second) = tokio::join!(
        studio.submit(b2b_submission()),
        studio.submit(b2b_submission())
    );
    let elapsed = started.elapsed();

    assert_eq!(first.unwrap().run.decision(), OverallDecision::Approved);
    assert_eq!(second.unwrap().run.decision(), OverallDecision::Approved);
    // four gates plus the builder, per run
    assert_eq!(invoker.invoked().len(), 10);
    assert!(elapsed >= Duration::from_millis(500), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(900), "{:?}", elapsed);
}

#[tokio::test]
async fn test_abandoned_run_closes_open_observations_as_errors() {
    let invoker = Arc::new(ScriptedInvoker::new().with_delay(Duration::from_millis(500)));
    let recorder = Arc::new(RecordingRecorder::new());
    let studio = Studio::new(StudioConfig::default(), invoker.clone()).with_recorder(recorder.clone());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), studio.submit(b2b_submission())).await;
    assert!(abandoned.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(invoker.invoked().len(), 1);
    let (span_starts, span_ends, generation_starts, generation_ends) = recorder.observation_counts();
    assert_eq!(span_starts, 1);
    assert_eq!(span_ends, span_starts);
    assert_eq!(generation_ends, generation_starts);
    assert_eq!(recorder.span_levels(), vec![ObservationLevel::Error]);
}
