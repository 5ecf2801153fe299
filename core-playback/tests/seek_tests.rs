//! Scrub suppression against live engine ticks.

mod common;

use common::{controller, track, CallbackProbe, EngineCall, FakeEngine};
use core_playback::SeekCoordinator;

#[tokio::test]
async fn ticks_do_not_move_display_while_seeking() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let probe = CallbackProbe::new();
    let seek = SeekCoordinator::new();
    let song = track("p", 0, 1);

    controller
        .play(
            song.clone(),
            probe.callbacks().with_seek_coordinator(seek.clone()),
        )
        .await
        .unwrap();
    engine.tick(10_000, 120_000);

    seek.begin_seek(10_000);
    seek.update_seek(45_000);
    engine.tick(10_100, 120_000);
    engine.tick(10_200, 120_000);

    assert_eq!(probe.progress(), vec![(10_000, 120_000)]);
    assert_eq!(seek.display_position(10_200), 45_000);

    assert!(seek.complete_seek(&controller, &song, 60_000).await);
    assert!(!seek.is_seeking());
    assert_eq!(engine.count(&EngineCall::Seek(60_000)), 1);
    assert_eq!(controller.session().unwrap().position_ms, 60_000);

    engine.tick(60_100, 120_000);
    assert_eq!(probe.progress().last(), Some(&(60_100, 120_000)));
    assert_eq!(seek.display_position(60_100), 60_100);
}

#[tokio::test]
async fn complete_seek_without_session_still_closes_window() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let seek = SeekCoordinator::new();

    seek.begin_seek(0);
    assert!(!seek.complete_seek(&controller, &track("p", 0, 1), 5_000).await);

    assert!(!seek.is_seeking());
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn complete_seek_for_another_track_is_dropped() {
    let engine = FakeEngine::new();
    let controller = controller(&engine);
    let seek = SeekCoordinator::new();

    controller
        .play(track("b", 0, 1), CallbackProbe::new().callbacks())
        .await
        .unwrap();
    engine.tick(4_000, 80_000);

    seek.begin_seek(12_000);
    assert!(!seek.complete_seek(&controller, &track("a", 0, 1), 70_000).await);

    assert!(!seek.is_seeking());
    assert_eq!(engine.count(&EngineCall::Seek(70_000)), 0);
    assert_eq!(controller.session().unwrap().position_ms, 4_000);
}
