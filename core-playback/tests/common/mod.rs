//! Shared test doubles for core-playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioEngine, BridgeError, PositionCallback, PositionUpdate};
use core_playback::{SessionCallbacks, SessionController, TrackRef};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Calls received by [`FakeEngine`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start(String),
    Pause,
    Resume,
    Stop,
    Seek(u64),
    AddListener,
    RemoveListener,
}

/// Recording engine that behaves like the native single-stream player:
/// starting while a stream is running fails with "player already running".
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    listener: Mutex<Option<PositionCallback>>,
    failing_urls: Mutex<HashSet<String>>,
    fail_stop: AtomicBool,
    running: AtomicBool,
    overlapped: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `start_player` fail for `url`.
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().insert(url.to_string());
    }

    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn starts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Start(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// `true` if a start was ever issued while a stream was running.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Emits one position tick. Returns `false` when no listener is registered.
    pub fn tick(&self, position_ms: u64, duration_ms: u64) -> bool {
        let listener = self.listener.lock().clone();
        match listener {
            Some(callback) => {
                callback(PositionUpdate::new(position_ms, duration_ms));
                true
            }
            None => false,
        }
    }

    /// The currently registered listener, kept alive past its removal.
    pub fn captured_listener(&self) -> Option<PositionCallback> {
        self.listener.lock().clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn start_player(&self, audio_url: &str) -> BridgeResult<()> {
        self.record(EngineCall::Start(audio_url.to_string()));

        let already_running = self.running.load(Ordering::SeqCst);
        tokio::task::yield_now().await;
        if already_running {
            self.overlapped.store(true, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed(
                "player already running".to_string(),
            ));
        }

        if self.failing_urls.lock().contains(audio_url) {
            return Err(BridgeError::InvalidSource(format!(
                "cannot open {}",
                audio_url
            )));
        }

        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause_player(&self) -> BridgeResult<()> {
        self.record(EngineCall::Pause);
        Ok(())
    }

    async fn resume_player(&self) -> BridgeResult<()> {
        self.record(EngineCall::Resume);
        Ok(())
    }

    async fn stop_player(&self) -> BridgeResult<()> {
        self.record(EngineCall::Stop);
        tokio::task::yield_now().await;
        self.running.store(false, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("stop failed".to_string()));
        }
        Ok(())
    }

    async fn seek_to_player(&self, position_ms: u64) -> BridgeResult<()> {
        self.record(EngineCall::Seek(position_ms));
        Ok(())
    }

    fn add_position_listener(&self, callback: PositionCallback) {
        self.record(EngineCall::AddListener);
        *self.listener.lock() = Some(callback);
    }

    fn remove_position_listener(&self) {
        self.record(EngineCall::RemoveListener);
        *self.listener.lock() = None;
    }
}

/// Records what a session's callbacks received.
#[derive(Default)]
pub struct CallbackProbe {
    progress: Mutex<Vec<(u64, u64)>>,
    stops: AtomicUsize,
}

impl CallbackProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn callbacks(self: &Arc<Self>) -> SessionCallbacks {
        let progress = Arc::clone(self);
        let stops = Arc::clone(self);
        SessionCallbacks::new(
            move |position, duration| progress.progress.lock().push((position, duration)),
            move || {
                stops.stops.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    pub fn progress(&self) -> Vec<(u64, u64)> {
        self.progress.lock().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub fn controller(engine: &Arc<FakeEngine>) -> SessionController {
    SessionController::new(engine.clone(), EventBus::new(64))
}

pub fn track(post_id: &str, index: usize, total_tracks: usize) -> TrackRef {
    TrackRef::new(
        post_id,
        index,
        format!("https://cdn.hostakkhor.com/{post_id}/{index}.mp3"),
        total_tracks,
    )
}

/// Yields until `condition` holds, failing the test after two seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
