mod common;

use common::{
    FakeMaterializer, GatedGenerator, Harness, InMemorySessionRepository, ScriptedGenerator,
    SequencedProviders, TIMEOUT, bytes_file, provider,
};
use paraimage_application::{Orchestrator, OrchestratorDeps, OrchestratorOptions, OrchestratorHandle};
use paraimage_core::Window;
use chrono::{Duration, Utc};
use paraimage_core::generation::GenerationError;
use paraimage_core::{ParaImageError, Session, Message};
use std::sync::Arc;

fn ab_providers() -> Vec<paraimage_core::ProviderConfig> {
    vec![provider("P", &["a", "b"])]
}

#[tokio::test]
async fn test_submit_issues_one_call_per_eligible_window() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 3).await;
    let windows = harness.handle.windows().await.unwrap();
    harness.handle.rebind(windows[2].id, "P::ghost").await.unwrap();

    let calls = harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;

    assert_eq!(calls, 2);
    assert_eq!(generator.calls().len(), 2);
    let windows = harness.handle.windows().await.unwrap();
    for window in &windows {
        let user_messages = window.messages.iter().filter(|m| m.is_user()).count();
        assert_eq!(user_messages, 1, "window {} should hold the prompt once", window.id);
    }
    assert_eq!(windows[2].messages.len(), 1);
    assert!(!windows[2].generating);
}

#[tokio::test]
async fn test_cat_scenario_settles_each_window_independently() {
    let generator = Arc::new(ScriptedGenerator::new().with(
        "b",
        Err(GenerationError::Provider {
            status: Some(504),
            message: "timeout".to_string(),
        }),
    ));
    let harness = Harness::start(generator, ab_providers(), 2).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;

    let windows = harness.handle.windows().await.unwrap();
    assert_eq!(windows[0].model_key.as_deref(), Some("P::a"));
    assert_eq!(windows[0].messages.len(), 2);
    assert_eq!(
        windows[0].messages[1].image().map(|i| i.url.as_str()),
        Some("https://img/a")
    );
    assert_eq!(windows[1].messages[1].error(), Some("timeout"));
    assert!(windows.iter().all(|w| !w.generating));

    for key in ["P::a", "P::b"] {
        let history = harness.handle.history(key).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].title, "cat");
        assert_eq!(history[0].messages.len(), 2);
    }

    let stored = harness.sessions.stored(&windows[0].session_id).unwrap();
    assert_eq!(stored.messages.len(), 2);
}

#[tokio::test]
async fn test_generating_tracks_latest_dispatch() {
    let generator = Arc::new(GatedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 2).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    generator.wait_for_calls(2).await;
    let windows = harness.handle.windows().await.unwrap();
    assert!(windows.iter().all(|w| w.generating));

    generator.release_all();
    harness.idle().await;

    let windows = harness.handle.windows().await.unwrap();
    assert!(windows.iter().all(|w| !w.generating));
    assert!(windows.iter().all(|w| w.messages.len() == 2));
}

#[tokio::test]
async fn test_retry_while_generating_issues_no_call() {
    let generator = Arc::new(GatedGenerator::new());
    let harness = Harness::start(generator.clone(), vec![provider("P", &["a"])], 1).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    generator.wait_for_calls(1).await;
    let window = harness.handle.windows().await.unwrap().remove(0);

    let issued = harness
        .handle
        .retry(window.id, window.messages[0].id.clone())
        .await
        .unwrap();

    assert!(!issued);
    assert_eq!(generator.call_count(), 1);

    generator.release_all();
    harness.idle().await;

    let issued = harness
        .handle
        .retry(window.id, window.messages[0].id.clone())
        .await
        .unwrap();
    assert!(issued);
    generator.wait_for_calls(1).await;
    generator.release_all();
    harness.idle().await;

    let window = harness.handle.windows().await.unwrap().remove(0);
    assert_eq!(window.messages.len(), 3);
    assert_eq!(window.messages.iter().filter(|m| m.is_user()).count(), 1);
}

#[tokio::test]
async fn test_continued_session_is_updated_in_place() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, vec![provider("P", &["a"])], 1).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;
    let window = harness.handle.windows().await.unwrap().remove(0);
    let session_id = window.session_id.clone();
    let created_at = harness.handle.find_session(&session_id).await.unwrap().unwrap().created_at;

    harness.handle.clear(window.id).await.unwrap();
    assert_ne!(harness.handle.windows().await.unwrap()[0].session_id, session_id);

    assert!(harness.handle.continue_session(window.id, &session_id).await.unwrap());
    harness.handle.submit("dog", vec![]).await.unwrap();
    harness.idle().await;

    let history = harness.handle.history("P::a").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, session_id);
    assert_eq!(history[0].messages.len(), 4);
    assert_eq!(history[0].created_at, created_at);
    assert_eq!(history[0].title, "cat");
    assert_eq!(harness.sessions.stored(&session_id).unwrap().messages.len(), 4);
}

#[tokio::test]
async fn test_reference_failure_aborts_whole_submission() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 2).await;

    let err = harness
        .handle
        .submit("cat", vec![bytes_file("ok.png"), bytes_file("broken.png")])
        .await
        .unwrap_err();

    assert!(matches!(err, ParaImageError::Reference { .. }));
    assert!(generator.calls().is_empty());
    let windows = harness.handle.windows().await.unwrap();
    assert!(windows.iter().all(|w| w.is_empty()));
}

#[tokio::test]
async fn test_references_reach_every_call() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 2).await;

    harness
        .handle
        .submit("", vec![bytes_file("ref.png")])
        .await
        .unwrap();
    harness.idle().await;

    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.references.len() == 1));
    let history = harness.handle.history("P::a").await.unwrap();
    assert_eq!(history[0].title, "Image conversation");
}

#[tokio::test]
async fn test_empty_submission_is_rejected() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 2).await;

    let err = harness.handle.submit("  ", vec![]).await.unwrap_err();

    assert!(matches!(err, ParaImageError::EmptySubmission));
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_is_swallowed() {
    let sessions = Arc::new(InMemorySessionRepository::new());
    sessions.fail_writes(true);
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start_with(generator, ab_providers(), 1, sessions.clone()).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;

    assert!(!sessions.writes().is_empty());
    let window = harness.handle.windows().await.unwrap().remove(0);
    assert!(sessions.stored(&window.session_id).is_none());
    assert_eq!(harness.handle.history("P::a").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_writes_reach_store_in_recording_order() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, vec![provider("P", &["a"])], 1).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.handle.submit("dog", vec![]).await.unwrap();
    harness.idle().await;

    let session_id = harness.handle.windows().await.unwrap()[0].session_id.clone();
    let counts: Vec<_> = harness
        .sessions
        .writes()
        .iter()
        .filter(|s| s.id == session_id)
        .map(|s| s.messages.len())
        .collect();
    let mut sorted = counts.clone();
    sorted.sort();
    assert_eq!(counts, sorted);
    assert_eq!(counts.last(), Some(&4));
}

#[tokio::test]
async fn test_history_is_hydrated_from_store() {
    let sessions = Arc::new(InMemorySessionRepository::new());
    let at = Utc::now() - Duration::hours(1);
    sessions.seed(Session {
        id: "stored-1".to_string(),
        model_key: "P::a".to_string(),
        title: "a lighthouse".to_string(),
        messages: vec![Message::user("a lighthouse", vec![])],
        created_at: at,
        updated_at: at,
    });
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start_with(generator, ab_providers(), 1, sessions).await;

    let history = harness.handle.history("P::a").await.unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "a lighthouse");
    assert!(harness.handle.history("P::b").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_hydration_is_retried() {
    let sessions = Arc::new(InMemorySessionRepository::new());
    sessions.fail_reads(true);
    let at = Utc::now();
    sessions.seed(Session {
        id: "stored-1".to_string(),
        model_key: "P::a".to_string(),
        title: "t".to_string(),
        messages: vec![Message::user("t", vec![])],
        created_at: at,
        updated_at: at,
    });
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start_with(generator, vec![provider("P", &["a"])], 1, sessions.clone()).await;
    assert!(harness.handle.history("P::a").await.unwrap().is_empty());

    sessions.fail_reads(false);
    harness.handle.hydrate_history().await.unwrap();
    harness.idle().await;

    assert_eq!(harness.handle.history("P::a").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_settlement_after_close_is_dropped() {
    let generator = Arc::new(GatedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 2).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    generator.wait_for_calls(2).await;
    let windows = harness.handle.windows().await.unwrap();
    harness.handle.close(windows[0].id).await.unwrap();

    generator.release_all();
    harness.idle().await;

    let remaining = harness.handle.windows().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, windows[1].id);
    assert_eq!(remaining[0].messages.len(), 2);
    assert!(!remaining[0].generating);
}

#[tokio::test]
async fn test_rebound_window_still_receives_late_result() {
    let generator = Arc::new(GatedGenerator::new());
    let harness = Harness::start(generator.clone(), ab_providers(), 1).await;

    harness.handle.submit("cat", vec![]).await.unwrap();
    generator.wait_for_calls(1).await;
    let window = harness.handle.windows().await.unwrap().remove(0);
    harness.handle.rebind(window.id, "P::b").await.unwrap();

    let rebound = harness.handle.windows().await.unwrap().remove(0);
    assert!(!rebound.generating);
    assert!(rebound.is_empty());
    assert_eq!(harness.handle.history("P::a").await.unwrap().len(), 1);

    generator.release_all();
    harness.idle().await;

    let rebound = harness.handle.windows().await.unwrap().remove(0);
    assert_eq!(rebound.model_key.as_deref(), Some("P::b"));
    assert_eq!(rebound.messages.len(), 1);
    assert!(rebound.messages[0].image().is_some());
}

#[tokio::test]
async fn test_provider_removal_repairs_windows() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 2).await;
    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;
    let before = harness.handle.windows().await.unwrap();

    harness.providers.replace(vec![provider("P", &["b"])]);
    let count = harness.handle.refresh_providers().await.unwrap();
    harness.idle().await;

    assert_eq!(count, 1);
    let after = harness.handle.windows().await.unwrap();
    assert_eq!(after[0].model_key.as_deref(), Some("P::b"));
    assert!(after[0].is_empty());
    assert_ne!(after[0].session_id, before[0].session_id);
    assert_eq!(after[1].session_id, before[1].session_id);
    assert!(harness.sessions.stored(&before[0].session_id).is_some());
}

#[tokio::test]
async fn test_closing_only_window_keeps_one() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 1).await;
    let window = harness.handle.windows().await.unwrap().remove(0);

    harness.handle.close(window.id).await.unwrap();

    let windows = harness.handle.windows().await.unwrap();
    assert_eq!(windows.len(), 1);
    assert!(windows[0].model_key.is_none());
}

#[tokio::test]
async fn test_focus_collapses_layout() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 3).await;

    harness.handle.focus("P::b").await.unwrap();

    let windows = harness.handle.windows().await.unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].model_key.as_deref(), Some("P::b"));
}

/// Asserts that each window's conversation survives in memory and in the store.
async fn assert_recorded(harness: &Harness, windows: &[Window]) {
    for window in windows {
        let model_key = window.model_key.as_deref().unwrap();
        let history = harness.handle.history(model_key).await.unwrap();
        let recorded = history
            .iter()
            .find(|s| s.id == window.session_id)
            .unwrap_or_else(|| panic!("window {} missing from history", window.id));
        assert_eq!(recorded.messages, window.messages);

        let stored = harness.sessions.stored(&window.session_id).unwrap();
        assert_eq!(stored.messages, window.messages);
    }
}

#[tokio::test]
async fn test_layout_shrink_records_dropped_windows() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 3).await;
    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;
    let before = harness.handle.windows().await.unwrap();

    harness.handle.set_layout_count(1).await.unwrap();
    harness.idle().await;

    let after = harness.handle.windows().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(before[1].messages.len(), 2);
    assert_recorded(&harness, &before[1..]).await;
}

#[tokio::test]
async fn test_close_records_outgoing_window() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 2).await;
    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;
    let before = harness.handle.windows().await.unwrap();

    harness.handle.close(before[0].id).await.unwrap();
    harness.idle().await;

    let after = harness.handle.windows().await.unwrap();
    assert!(after.iter().all(|w| w.id != before[0].id));
    assert_recorded(&harness, &before[..1]).await;
}

#[tokio::test]
async fn test_focus_records_every_collapsed_window() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 3).await;
    harness.handle.submit("cat", vec![]).await.unwrap();
    harness.idle().await;
    let before = harness.handle.windows().await.unwrap();

    harness.handle.focus("P::b").await.unwrap();
    harness.idle().await;

    let after = harness.handle.windows().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[1].id);
    let collapsed: Vec<Window> = before.into_iter().filter(|w| w.id != after[0].id).collect();
    assert_eq!(collapsed.len(), 2);
    assert_recorded(&harness, &collapsed).await;
}

async fn wait_idle(handle: &OrchestratorHandle) {
    tokio::time::timeout(TIMEOUT, handle.wait_idle())
        .await
        .expect("orchestrator did not go idle")
        .unwrap();
}

#[tokio::test]
async fn test_slow_stale_provider_refresh_is_discarded() {
    let fast = std::time::Duration::ZERO;
    let slow = std::time::Duration::from_millis(200);
    let providers = Arc::new(SequencedProviders::new(vec![
        (fast, ab_providers()),
        // Read before the config regained model b, answered last
        (slow, vec![provider("P", &["a"])]),
        (fast, ab_providers()),
    ]));
    let handle = Orchestrator::spawn(
        OrchestratorDeps {
            generator: Arc::new(ScriptedGenerator::new()),
            sessions: Arc::new(InMemorySessionRepository::new()),
            providers,
            materializer: Arc::new(FakeMaterializer),
        },
        OrchestratorOptions {
            layout_count: 2,
            image_size: None,
        },
    );
    handle.refresh_providers().await.unwrap();
    handle.submit("cat", vec![]).await.unwrap();
    wait_idle(&handle).await;

    let (stale, fresh) = tokio::join!(handle.refresh_providers(), handle.refresh_providers());
    wait_idle(&handle).await;

    assert_eq!(fresh.unwrap(), 2);
    assert_eq!(stale.unwrap(), 2);
    let keys: Vec<_> = handle
        .models()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.key)
        .collect();
    assert_eq!(keys, vec!["P::a", "P::b"]);
    let windows = handle.windows().await.unwrap();
    assert_eq!(windows[1].model_key.as_deref(), Some("P::b"));
    assert_eq!(windows[1].messages.len(), 2);
}

#[tokio::test]
async fn test_stopped_orchestrator_reports_error() {
    let generator = Arc::new(ScriptedGenerator::new());
    let harness = Harness::start(generator, ab_providers(), 1).await;

    harness.handle.shutdown();
    tokio::task::yield_now().await;

    let err = harness.handle.windows().await.unwrap_err();
    assert!(matches!(err, ParaImageError::OrchestratorStopped));
}
