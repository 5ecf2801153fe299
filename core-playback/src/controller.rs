//! # Playback Session Controller
//!
//! Owns the single process-wide playback session and is the only component
//! allowed to drive the [`AudioEngine`].
//!
//! ## Overview
//!
//! - Commands (`play`, `pause`, `stop`, `seek_to` and their per-track
//!   forms) are serialized through one async operation lock, so a second
//!   `start_player` can never be issued before the previous stream has been
//!   stopped.
//! - Every session carries a fresh [`SessionId`]. The engine position
//!   listener captures that id and drops ticks for any other session.
//! - Teardown removes the session under the tick delivery lock. Once a
//!   teardown has returned, no tick for the old session reaches its
//!   `on_progress` callback.
//! - Callbacks and session listeners are always invoked with no internal
//!   lock held except the delivery lock around `on_progress`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{SessionCallbacks, SessionController, TrackRef};
//! use core_runtime::events::EventBus;
//!
//! let controller = SessionController::new(engine, EventBus::default());
//! let _subscription = controller.on_session_change(|session| {
//!     println!("now playing: {:?}", session.map(|s| (&s.post_id, s.track_index)));
//! });
//!
//! controller
//!     .play(
//!         TrackRef::new("post-1", 0, "https://cdn.example.com/a.mp3", 2),
//!         SessionCallbacks::new(|pos, dur| println!("{pos}/{dur}"), || println!("stopped")),
//!     )
//!     .await?;
//! ```

use crate::error::{PlaybackError, Result};
use crate::session::{PlaybackSession, SessionCallbacks, SessionId, SessionState, TrackRef};
use bridge_traits::{AudioEngine, PositionCallback, PositionUpdate};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, StopReason};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, trace, warn};

/// Listener notified when the active session's identity or state changes.
///
/// Receives `None` once no session is active.
pub type SessionListener = Arc<dyn Fn(Option<&PlaybackSession>) + Send + Sync>;

type PublishedKey = Option<(SessionId, SessionState)>;

struct ActiveSession {
    session: PlaybackSession,
    callbacks: SessionCallbacks,
    /// Set once the end-of-track tick has scheduled completion.
    completion_armed: bool,
}

struct ControllerInner {
    engine: Arc<dyn AudioEngine>,
    event_bus: EventBus,
    /// Serializes every command that touches the engine.
    operation: tokio::sync::Mutex<()>,
    active: Mutex<Option<ActiveSession>>,
    /// Held while a tick is delivered and while a session is removed.
    delivery: Mutex<()>,
    listeners: Mutex<Vec<(u64, SessionListener)>>,
    last_published: Mutex<PublishedKey>,
    next_listener_id: AtomicU64,
}

impl ControllerInner {
    fn take_active(&self) -> Option<ActiveSession> {
        let _delivery = self.delivery.lock();
        self.active.lock().take()
    }

    fn set_state(&self, state: SessionState) {
        if let Some(active) = self.active.lock().as_mut() {
            active.session.state = state;
        }
    }

    fn snapshot(&self) -> Option<PlaybackSession> {
        self.active.lock().as_ref().map(|active| active.session.clone())
    }

    /// Publishes the current session to listeners if its identity or state
    /// differs from the last published value.
    fn notify(&self) {
        let snapshot = self.snapshot();
        let key = snapshot.as_ref().map(|session| (session.id, session.state));
        {
            let mut last = self.last_published.lock();
            if *last == key {
                return;
            }
            *last = key;
        }

        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(snapshot.as_ref());
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is not an error for the controller
        self.event_bus.emit(CoreEvent::Playback(event)).ok();
    }

    /// Delivers one engine tick. Returns `true` when the tick finished the
    /// track and completion still has to be scheduled.
    fn deliver_tick(&self, session_id: SessionId, update: PositionUpdate) -> bool {
        let _delivery = self.delivery.lock();

        let (callbacks, finished) = {
            let mut guard = self.active.lock();
            let Some(active) = guard.as_mut().filter(|a| a.session.id == session_id) else {
                trace!(%session_id, "Dropping tick for ended session");
                return false;
            };

            active.session.position_ms = update.position_ms;
            active.session.duration_ms = update.duration_ms;

            let finished = update.is_finished() && !active.completion_armed;
            active.completion_armed |= finished;
            (active.callbacks.clone(), finished)
        };

        callbacks.deliver_progress(update.position_ms, update.duration_ms);
        finished
    }
}

/// Handle to the playback session controller.
///
/// Cloning is cheap; all clones drive the same session and engine.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    /// Creates a controller that exclusively owns `engine`.
    pub fn new(engine: Arc<dyn AudioEngine>, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                engine,
                event_bus,
                operation: tokio::sync::Mutex::new(()),
                active: Mutex::new(None),
                delivery: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                last_published: Mutex::new(None),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Event bus the controller publishes [`PlaybackEvent`]s on.
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Snapshot of the active session, if any.
    pub fn session(&self) -> Option<PlaybackSession> {
        self.inner.snapshot()
    }

    /// State of the active session, or `Idle` when there is none.
    pub fn state(&self) -> SessionState {
        self.inner
            .active
            .lock()
            .as_ref()
            .map(|active| active.session.state)
            .unwrap_or_default()
    }

    /// State of `track`: the session state if `track` is the active track,
    /// otherwise `Idle`.
    pub fn state_for(&self, track: &TrackRef) -> SessionState {
        self.inner
            .active
            .lock()
            .as_ref()
            .filter(|active| active.session.is_for(track))
            .map(|active| active.session.state)
            .unwrap_or_default()
    }

    /// Returns `true` if `track` is the active session's track.
    pub fn is_active_track(&self, track: &TrackRef) -> bool {
        self.inner
            .active
            .lock()
            .as_ref()
            .is_some_and(|active| active.session.is_for(track))
    }

    /// Plays `track`, superseding any other session.
    ///
    /// - Same track and `Paused`: resumes from the last known position.
    /// - Same track otherwise: keeps playing; only the callbacks are replaced.
    /// - Different track: the previous session is torn down (its `on_stop`
    ///   fires once) before the engine is started for `track`.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidTrack`] if `track` fails validation; the
    ///   engine is not touched.
    /// - [`PlaybackError::EngineUnavailable`] if the engine cannot start or
    ///   resume; the session is cleared and `on_stop` is invoked first.
    #[instrument(skip(self, track, callbacks), fields(post_id = %track.post_id, track_index = track.index))]
    pub async fn play(&self, track: TrackRef, callbacks: SessionCallbacks) -> Result<()> {
        track.validate()?;
        let _operation = self.inner.operation.lock().await;

        let existing = {
            let mut guard = self.inner.active.lock();
            match guard.as_mut() {
                Some(active) if active.session.is_for(&track) => {
                    active.callbacks = callbacks.clone();
                    Some(active.session.state)
                }
                _ => None,
            }
        };

        match existing {
            Some(SessionState::Paused) => self.resume_locked().await,
            Some(state) => {
                debug!(%state, "Track already active");
                Ok(())
            }
            None => self.start_locked(track, callbacks).await,
        }
    }

    /// Pauses the active session. Does nothing unless it is `Playing`.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        let _operation = self.inner.operation.lock().await;

        let playing = self
            .inner
            .snapshot()
            .filter(|session| session.state == SessionState::Playing);
        let Some(session) = playing else {
            let err = PlaybackError::InvalidState(format!("pause() while {}", self.state()));
            debug!(error = %err, "Ignoring pause");
            return;
        };

        match self.inner.engine.pause_player().await {
            Ok(()) => {
                self.inner.set_state(SessionState::Paused);
                self.inner.notify();
                let position_ms = self
                    .inner
                    .snapshot()
                    .map_or(session.position_ms, |s| s.position_ms);
                self.inner.emit(PlaybackEvent::Paused {
                    post_id: session.post_id.clone(),
                    track_index: session.track_index,
                    position_ms,
                });
                info!(session_id = %session.id, position_ms, "Playback paused");
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Engine pause failed; resetting session");
                self.teardown_locked(StopReason::EngineError).await;
            }
        }
    }

    /// Tears down the active session.
    ///
    /// Idempotent: with no active session nothing happens and `None` is
    /// returned. Otherwise returns the final record of the torn-down session
    /// in state [`SessionState::Stopped`].
    pub async fn stop(&self) -> Option<PlaybackSession> {
        self.stop_with_reason(StopReason::Requested).await
    }

    /// [`stop`](Self::stop) with the reason reported on the event bus.
    #[instrument(skip(self))]
    pub async fn stop_with_reason(&self, reason: StopReason) -> Option<PlaybackSession> {
        let _operation = self.inner.operation.lock().await;

        let has_session = self.inner.active.lock().is_some();
        if !has_session {
            debug!("No active session to stop");
            return None;
        }

        self.teardown_locked(reason).await
    }

    /// Stops the session only if it plays `track` and is `Playing` or
    /// `Paused`. Returns `true` if a session was torn down.
    ///
    /// A card uses this to stop its own audio without touching a session
    /// another card has started since.
    #[instrument(skip(self, track), fields(post_id = %track.post_id, track_index = track.index))]
    pub async fn stop_track(&self, track: &TrackRef, reason: StopReason) -> bool {
        let _operation = self.inner.operation.lock().await;

        let state = self.state_for(track);
        if !state.is_engaged() {
            debug!(%state, "Track not engaged; nothing to stop");
            return false;
        }

        self.teardown_locked(reason).await.is_some()
    }

    /// Moves the active session to `position_ms`. The engine clamps values
    /// beyond the duration.
    ///
    /// Returns `true` if the engine applied the seek. Does nothing without
    /// an active session. On engine failure the previous position and state
    /// are kept.
    #[instrument(skip(self))]
    pub async fn seek_to(&self, position_ms: u64) -> bool {
        let _operation = self.inner.operation.lock().await;
        self.seek_locked(position_ms).await
    }

    /// Seeks only if the active session plays `track` and is `Playing` or
    /// `Paused`. Returns `true` if the engine applied the seek.
    ///
    /// A card uses this so a drag that ends after another card took over
    /// the session never moves the other card's audio.
    #[instrument(skip(self, track), fields(post_id = %track.post_id, track_index = track.index))]
    pub async fn seek_track(&self, track: &TrackRef, position_ms: u64) -> bool {
        let _operation = self.inner.operation.lock().await;

        let state = self.state_for(track);
        if !state.is_engaged() {
            debug!(%state, "Track not engaged; ignoring seek");
            return false;
        }

        self.seek_locked(position_ms).await
    }

    /// Registers a listener for session identity/state changes.
    ///
    /// Position ticks never trigger the listener. The listener stays
    /// registered until the returned [`SessionSubscription`] is dropped.
    pub fn on_session_change<F>(&self, listener: F) -> SessionSubscription
    where
        F: Fn(Option<&PlaybackSession>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));

        SessionSubscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered session listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    async fn seek_locked(&self, position_ms: u64) -> bool {
        let prior = {
            let mut guard = self.inner.active.lock();
            guard.as_mut().map(|active| {
                let prior = active.session.state;
                active.session.state = SessionState::Seeking;
                (prior, active.session.clone())
            })
        };
        let Some((prior, session)) = prior else {
            let err = PlaybackError::InvalidState("seek_to() with no active session".to_string());
            debug!(error = %err, "Ignoring seek");
            return false;
        };
        self.inner.notify();

        let result = self.inner.engine.seek_to_player(position_ms).await;

        {
            let mut guard = self.inner.active.lock();
            if let Some(active) = guard.as_mut() {
                active.session.state = prior;
                if result.is_ok() {
                    active.session.position_ms = position_ms;
                }
            }
        }
        self.inner.notify();

        match result {
            Ok(()) => {
                self.inner.emit(PlaybackEvent::Seeked {
                    post_id: session.post_id,
                    track_index: session.track_index,
                    position_ms,
                });
                debug!(position_ms, "Seek applied");
                true
            }
            Err(e) => {
                warn!(error = %e, "Engine seek failed; keeping previous position");
                false
            }
        }
    }

    async fn resume_locked(&self) -> Result<()> {
        let Some(session) = self.inner.snapshot() else {
            return Err(PlaybackError::InvalidState(
                "resume with no active session".to_string(),
            ));
        };

        match self.inner.engine.resume_player().await {
            Ok(()) => {
                self.inner.set_state(SessionState::Playing);
                self.inner.notify();
                self.inner.emit(PlaybackEvent::Resumed {
                    post_id: session.post_id.clone(),
                    track_index: session.track_index,
                    position_ms: session.position_ms,
                });
                info!(session_id = %session.id, position_ms = session.position_ms, "Playback resumed");
                Ok(())
            }
            Err(e) => {
                let err = PlaybackError::EngineUnavailable {
                    url: redact_url(&session.audio_url).to_string(),
                    reason: e.to_string(),
                };
                warn!(session_id = %session.id, error = %err, "Engine resume failed; resetting session");
                self.teardown_locked(StopReason::EngineError).await;
                self.emit_error(&session.post_id, session.track_index, &err);
                Err(err)
            }
        }
    }

    async fn start_locked(&self, track: TrackRef, callbacks: SessionCallbacks) -> Result<()> {
        // Supersession teardown. The engine runs a single stream, so it is
        // stopped before every start even when no session is recorded.
        self.teardown_locked(StopReason::Superseded).await;

        let session = PlaybackSession::loading(&track);
        let session_id = session.id;
        *self.inner.active.lock() = Some(ActiveSession {
            session,
            callbacks,
            completion_armed: false,
        });
        self.inner.notify();

        debug!(%session_id, url = redact_url(&track.audio_url), "Starting engine");

        if let Err(e) = self.inner.engine.start_player(&track.audio_url).await {
            let err = PlaybackError::EngineUnavailable {
                url: redact_url(&track.audio_url).to_string(),
                reason: e.to_string(),
            };
            warn!(%session_id, error = %err, "Engine failed to start; session reset");

            if let Some(failed) = self.inner.take_active() {
                failed.callbacks.fire_stop();
            }
            self.inner.notify();
            self.emit_error(&track.post_id, track.index, &err);
            return Err(err);
        }

        self.inner
            .engine
            .add_position_listener(self.position_listener(session_id));
        self.inner.set_state(SessionState::Playing);
        self.inner.notify();
        self.inner.emit(PlaybackEvent::Started {
            post_id: track.post_id.clone(),
            track_index: track.index,
            total_tracks: track.total_tracks,
        });
        info!(%session_id, "Playback started");
        Ok(())
    }

    /// Removes the listener, clears the session and stops the engine.
    ///
    /// Engine stop failures are logged and swallowed. The torn-down session's
    /// `on_stop` fires exactly once. Must be called with the operation lock
    /// held.
    async fn teardown_locked(&self, reason: StopReason) -> Option<PlaybackSession> {
        self.inner.engine.remove_position_listener();
        let ended = self.inner.take_active();

        if let Err(e) = self.inner.engine.stop_player().await {
            let err = PlaybackError::Teardown(e.to_string());
            if ended.is_some() {
                warn!(error = %err, %reason, "Engine stop failed; continuing");
            } else {
                debug!(error = %err, %reason, "Defensive engine stop failed");
            }
        }

        let ended = ended?;
        ended.callbacks.fire_stop();
        self.inner.notify();

        let mut session = ended.session;
        session.state = SessionState::Stopped;
        self.inner.emit(PlaybackEvent::Stopped {
            post_id: session.post_id.clone(),
            track_index: session.track_index,
            reason,
        });
        info!(session_id = %session.id, %reason, position_ms = session.position_ms, "Session stopped");
        Some(session)
    }

    fn emit_error(&self, post_id: &str, track_index: usize, err: &PlaybackError) {
        self.inner.emit(PlaybackEvent::Error {
            post_id: post_id.to_string(),
            track_index,
            message: err.to_string(),
            recoverable: true,
        });
    }

    fn position_listener(&self, session_id: SessionId) -> PositionCallback {
        let inner = Arc::downgrade(&self.inner);
        let runtime = Handle::try_current().ok();

        Arc::new(move |update: PositionUpdate| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if !inner.deliver_tick(session_id, update) {
                return;
            }

            match &runtime {
                Some(handle) => {
                    let controller = SessionController { inner };
                    handle.spawn(async move {
                        controller.complete(session_id).await;
                    });
                }
                None => {
                    warn!(%session_id, "No runtime to finish completed track");
                }
            }
        })
    }

    /// Ends `session_id` after its last tick, unless another command has
    /// already replaced it.
    async fn complete(&self, session_id: SessionId) {
        let _operation = self.inner.operation.lock().await;

        let current = self.inner.snapshot();
        let Some(session) = current.filter(|session| session.id == session_id) else {
            debug!(%session_id, "Completed session already torn down");
            return;
        };

        self.inner.emit(PlaybackEvent::Completed {
            post_id: session.post_id.clone(),
            track_index: session.track_index,
        });
        self.teardown_locked(StopReason::Completed).await;
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

/// Registration returned by [`SessionController::on_session_change`].
///
/// Dropping it unsubscribes the listener.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct SessionSubscription {
    inner: Weak<ControllerInner>,
    id: u64,
}

impl SessionSubscription {
    /// Removes the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for SessionSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSubscription")
            .field("id", &self.id)
            .finish()
    }
}
