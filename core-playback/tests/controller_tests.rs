//! Session controller behaviour against a recording engine.

mod common;

use common::{controller, track, wait_until, CallbackProbe, EngineCall, FakeEngine};
use core_playback::{PlaybackError, SessionCallbacks, SessionState};
use core_runtime::events::{CoreEvent, PlaybackEvent, StopReason};
use parking_lot::Mutex;
use std::sync::Arc;

#[tokio::test]
async fn play_reaches_playing_and_registers_one_listener() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);

    controller
        .play(track("p", 0, 2), SessionCallbacks::noop())
        .await
        .unwrap();

    let session = controller.session().unwrap();
    assert_eq!(session.state, SessionState::Playing);
    assert_eq!(session.post_id, "p");
    assert_eq!(session.track_index, 0);
    assert_eq!(session.total_tracks, 2);
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::RemoveListener,
            EngineCall::Stop,
            EngineCall::Start("https://cdn.hostakkhor.com/p/0.mp3".to_string()),
            EngineCall::AddListener,
        ]
    );
}

#[tokio::test]
async fn second_play_supersedes_first_exactly_once() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let first = CallbackProbe::new();
    let second = CallbackProbe::new();

    controller
        .play(track("a", 0, 1), first.callbacks())
        .await
        .unwrap();
    controller
        .play(track("b", 0, 1), second.callbacks())
        .await
        .unwrap();

    assert_eq!(first.stops(), 1);
    assert_eq!(second.stops(), 0);
    let session = controller.session().unwrap();
    assert_eq!(session.post_id, "b");
    assert_eq!(session.state, SessionState::Playing);
    assert!(!engine.overlapped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_plays_never_overlap_the_engine() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let probe = CallbackProbe::new();

    let mut handles = Vec::new();
    for index in 0..10 {
        let controller = controller.clone();
        let callbacks = probe.callbacks();
        handles.push(tokio::spawn(async move {
            controller
                .play(track(&format!("post-{index}"), 0, 1), callbacks)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(!engine.overlapped());
    assert_eq!(engine.starts().len(), 10);
    assert_eq!(probe.stops(), 9);
    assert_eq!(controller.state(), SessionState::Playing);
}

#[tokio::test]
async fn stop_without_session_is_a_no_op() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let changes = Arc::new(Mutex::new(0));
    let counter = changes.clone();
    let _subscription = controller.on_session_change(move |_| *counter.lock() += 1);

    assert!(controller.stop().await.is_none());
    assert!(controller.stop().await.is_none());

    assert!(engine.calls().is_empty());
    assert_eq!(*changes.lock(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn stop_returns_final_record_and_fires_on_stop_once() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let probe = CallbackProbe::new();

    controller
        .play(track("p", 1, 2), probe.callbacks())
        .await
        .unwrap();
    engine.tick(4_000, 90_000);

    let ended = controller.stop().await.unwrap();
    assert_eq!(ended.state, SessionState::Stopped);
    assert_eq!(ended.track_index, 1);
    assert_eq!(ended.position_ms, 4_000);
    assert!(controller.stop().await.is_none());

    assert_eq!(probe.stops(), 1);
    assert!(!engine.has_listener());
}

#[tokio::test]
async fn pause_then_play_same_track_resumes() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let probe = CallbackProbe::new();

    controller
        .play(track("p", 0, 1), probe.callbacks())
        .await
        .unwrap();
    engine.tick(12_500, 60_000);
    controller.pause().await;
    assert_eq!(controller.state(), SessionState::Paused);

    controller
        .play(track("p", 0, 1), probe.callbacks())
        .await
        .unwrap();

    let session = controller.session().unwrap();
    assert_eq!(session.state, SessionState::Playing);
    assert_eq!(session.position_ms, 12_500);
    assert_eq!(engine.starts().len(), 1);
    assert_eq!(engine.count(&EngineCall::Resume), 1);
    assert_eq!(probe.stops(), 0);
}

#[tokio::test]
async fn play_same_playing_track_keeps_stream() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);

    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    let id = controller.session().unwrap().id;
    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();

    assert_eq!(controller.session().unwrap().id, id);
    assert_eq!(engine.starts().len(), 1);
}

#[tokio::test]
async fn pause_is_ignored_unless_playing() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);

    controller.pause().await;
    assert!(engine.calls().is_empty());

    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    controller.pause().await;
    controller.pause().await;

    assert_eq!(engine.count(&EngineCall::Pause), 1);
}

#[tokio::test]
async fn failed_start_returns_to_idle() {
    let engine = FakeEngine::new();
    engine.fail_url("https://cdn.hostakkhor.com/p/0.mp3");
    let controller = controller(&engine);
    let probe = CallbackProbe::new();

    let result = controller.play(track("p", 0, 1), probe.callbacks()).await;

    assert!(matches!(result, Err(PlaybackError::EngineUnavailable { .. })));
    assert!(controller.session().is_none());
    assert_eq!(probe.stops(), 1);
    assert!(!engine.has_listener());

    // The user may retry another track right away
    controller
        .play(track("q", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    assert_eq!(controller.state(), SessionState::Playing);
}

#[tokio::test]
async fn engine_stop_failure_is_absorbed() {
    let engine = FakeEngine::new();
    engine.fail_stop(true);
    let controller = controller(&engine);
    let probe = CallbackProbe::new();

    controller
        .play(track("p", 0, 1), probe.callbacks())
        .await
        .unwrap();
    let ended = controller.stop().await;

    assert!(ended.is_some());
    assert_eq!(probe.stops(), 1);
    assert!(controller.session().is_none());
}

#[tokio::test]
async fn superseded_listener_never_delivers() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let first = CallbackProbe::new();
    let second = CallbackProbe::new();

    controller
        .play(track("a", 0, 1), first.callbacks())
        .await
        .unwrap();
    engine.tick(100, 10_000);
    let stale = engine.captured_listener().unwrap();

    controller
        .play(track("b", 0, 1), second.callbacks())
        .await
        .unwrap();

    // A late tick from the old registration is dropped
    stale(bridge_traits::PositionUpdate::new(200, 10_000));
    engine.tick(50, 20_000);

    assert_eq!(first.progress(), vec![(100, 10_000)]);
    assert_eq!(second.progress(), vec![(50, 20_000)]);
}

#[tokio::test]
async fn seek_updates_position() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);

    assert!(!controller.seek_to(5_000).await);
    assert!(engine.calls().is_empty());

    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    assert!(controller.seek_to(30_000).await);

    let session = controller.session().unwrap();
    assert_eq!(session.position_ms, 30_000);
    assert_eq!(session.state, SessionState::Playing);
    assert_eq!(engine.count(&EngineCall::Seek(30_000)), 1);
}

#[tokio::test]
async fn end_of_track_delivers_progress_then_stops() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let probe = CallbackProbe::new();
    let mut events = controller.event_bus().subscribe();

    controller
        .play(track("p", 0, 1), probe.callbacks())
        .await
        .unwrap();
    engine.tick(59_900, 60_000);
    engine.tick(60_000, 60_000);
    engine.tick(60_000, 60_000);

    wait_until(|| controller.session().is_none()).await;

    assert_eq!(probe.progress().last(), Some(&(60_000, 60_000)));
    assert_eq!(probe.stops(), 1);

    let mut completed = 0;
    let mut stopped_reason = None;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Playback(PlaybackEvent::Completed { .. }) => completed += 1,
            CoreEvent::Playback(PlaybackEvent::Stopped { reason, .. }) => {
                stopped_reason = Some(reason)
            }
            _ => {}
        }
    }
    assert_eq!(completed, 1);
    assert_eq!(stopped_reason, Some(StopReason::Completed));
}

#[tokio::test]
async fn session_listeners_see_identity_and_state_only() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = controller.on_session_change(move |session| {
        sink.lock()
            .push(session.map(|s| (s.post_id.clone(), s.track_index, s.state)));
    });

    controller
        .play(track("p", 0, 2), SessionCallbacks::noop())
        .await
        .unwrap();
    for position in (0..1_000).step_by(100) {
        engine.tick(position, 60_000);
    }
    controller
        .play(track("p", 1, 2), SessionCallbacks::noop())
        .await
        .unwrap();
    controller.stop().await;

    let p = "p".to_string();
    assert_eq!(
        *seen.lock(),
        vec![
            Some((p.clone(), 0, SessionState::Loading)),
            Some((p.clone(), 0, SessionState::Playing)),
            None,
            Some((p.clone(), 1, SessionState::Loading)),
            Some((p, 1, SessionState::Playing)),
            None,
        ]
    );
}

#[tokio::test]
async fn events_follow_the_session_lifecycle() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let mut events = controller.event_bus().subscribe();

    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    controller.pause().await;
    controller
        .play(track("p", 0, 1), SessionCallbacks::noop())
        .await
        .unwrap();
    controller.stop().await;

    let mut kinds = Vec::new();
    while let Ok(CoreEvent::Playback(event)) = events.try_recv() {
        kinds.push(match event {
            PlaybackEvent::Started { .. } => "started",
            PlaybackEvent::Paused { .. } => "paused",
            PlaybackEvent::Resumed { .. } => "resumed",
            PlaybackEvent::Stopped { reason, .. } => {
                assert_eq!(reason, StopReason::Requested);
                "stopped"
            }
            _ => "other",
        });
    }
    assert_eq!(kinds, vec!["started", "paused", "resumed", "stopped"]);
}

#[tokio::test]
async fn seek_track_only_moves_its_own_session() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let mine = track("a", 1, 2);

    assert!(!controller.seek_track(&mine, 1_000).await);

    controller
        .play(mine.clone(), SessionCallbacks::noop())
        .await
        .unwrap();
    assert!(!controller.seek_track(&track("a", 0, 2), 2_000).await);
    assert!(!controller.seek_track(&track("b", 1, 2), 3_000).await);
    assert_eq!(engine.count(&EngineCall::Seek(2_000)), 0);
    assert_eq!(engine.count(&EngineCall::Seek(3_000)), 0);

    assert!(controller.seek_track(&mine, 4_000).await);
    assert_eq!(controller.session().unwrap().position_ms, 4_000);
    assert_eq!(engine.count(&EngineCall::Seek(4_000)), 1);
}
