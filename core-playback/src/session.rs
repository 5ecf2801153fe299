//! Session data model: track identity, the active session record, and the
//! callbacks a caller hands to `play`.

use crate::error::{PlaybackError, Result};
use crate::seek::SeekCoordinator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for one playback session lifetime.
///
/// A new id is minted for every `play()` that starts a track, so engine ticks
/// captured for a superseded session can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one audio track inside a post.
///
/// Two `TrackRef`s are equal iff `post_id` and `index` match; the URL and
/// track count ride along so the controller can start the engine and
/// validate bounds.
///
/// # Examples
///
/// ```
/// use core_playback::TrackRef;
///
/// let a = TrackRef::new("post-1", 0, "https://cdn.example.com/a.mp3", 2);
/// let b = TrackRef::new("post-1", 0, "https://cdn.example.com/a.mp3?v=2", 2);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRef {
    /// Owning post
    pub post_id: String,
    /// Index into the post's track list
    pub index: usize,
    /// Opaque media reference handed to the engine
    pub audio_url: String,
    /// Number of tracks in the owning post
    pub total_tracks: usize,
}

impl TrackRef {
    pub fn new(
        post_id: impl Into<String>,
        index: usize,
        audio_url: impl Into<String>,
        total_tracks: usize,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            index,
            audio_url: audio_url.into(),
            total_tracks,
        }
    }

    /// Checks that the reference can describe a playable track.
    pub fn validate(&self) -> Result<()> {
        if self.post_id.is_empty() {
            return Err(PlaybackError::InvalidTrack(
                "post id cannot be empty".to_string(),
            ));
        }

        if self.audio_url.trim().is_empty() {
            return Err(PlaybackError::InvalidTrack(format!(
                "track {} of post {} has no audio url",
                self.index, self.post_id
            )));
        }

        if self.total_tracks == 0 {
            return Err(PlaybackError::InvalidTrack(format!(
                "post {} has no tracks",
                self.post_id
            )));
        }

        if self.index >= self.total_tracks {
            return Err(PlaybackError::InvalidTrack(format!(
                "track index {} out of range for {} tracks",
                self.index, self.total_tracks
            )));
        }

        Ok(())
    }

    /// Returns `true` if this reference names the given `(post, index)` pair.
    pub fn is(&self, post_id: &str, index: usize) -> bool {
        self.post_id == post_id && self.index == index
    }
}

impl PartialEq for TrackRef {
    fn eq(&self, other: &Self) -> bool {
        self.is(&other.post_id, other.index)
    }
}

impl Eq for TrackRef {}

impl Hash for TrackRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.post_id.hash(state);
        self.index.hash(state);
    }
}

/// The ordered audio tracks attached to one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTracks {
    post_id: String,
    audio_urls: Vec<String>,
}

impl PostTracks {
    pub fn new(post_id: impl Into<String>, audio_urls: Vec<String>) -> Self {
        Self {
            post_id: post_id.into(),
            audio_urls,
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn len(&self) -> usize {
        self.audio_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_urls.is_empty()
    }

    /// Builds the `TrackRef` for `index`, or `None` when out of range.
    pub fn track(&self, index: usize) -> Option<TrackRef> {
        self.audio_urls
            .get(index)
            .map(|url| TrackRef::new(self.post_id.clone(), index, url.clone(), self.len()))
    }
}

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No session. Reported for absent sessions.
    #[default]
    Idle,
    /// `start_player` is in flight.
    Loading,
    Playing,
    Paused,
    /// A `seek_to` is in flight.
    Seeking,
    /// Final state of a torn-down session record.
    Stopped,
}

impl SessionState {
    /// `Loading` or `Playing`: the states that hold the engine.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Loading | SessionState::Playing)
    }

    /// `Playing` or `Paused`: the states a focus loss must stop.
    pub fn is_engaged(&self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Seeking => "seeking",
            SessionState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Snapshot of the single process-wide playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub post_id: String,
    pub track_index: usize,
    pub total_tracks: usize,
    pub audio_url: String,
    pub position_ms: u64,
    /// 0 until the engine reports a real duration.
    pub duration_ms: u64,
    pub state: SessionState,
}

impl PlaybackSession {
    pub(crate) fn loading(track: &TrackRef) -> Self {
        Self {
            id: SessionId::new(),
            post_id: track.post_id.clone(),
            track_index: track.index,
            total_tracks: track.total_tracks,
            audio_url: track.audio_url.clone(),
            position_ms: 0,
            duration_ms: 0,
            state: SessionState::Loading,
        }
    }

    /// Returns `true` if this session plays `track`.
    pub fn is_for(&self, track: &TrackRef) -> bool {
        track.is(&self.post_id, self.track_index)
    }

    /// Returns `true` if this session plays any track of `post_id`.
    pub fn belongs_to(&self, post_id: &str) -> bool {
        self.post_id == post_id
    }

    pub fn track_ref(&self) -> TrackRef {
        TrackRef::new(
            self.post_id.clone(),
            self.track_index,
            self.audio_url.clone(),
            self.total_tracks,
        )
    }
}

/// Invoked with `(position_ms, duration_ms)` on every delivered engine tick.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Invoked once when the session that owns it is torn down.
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Callbacks attached to a session by the caller of `play`.
///
/// They are stored on the active session record and replaced wholesale when
/// a later `play()` supersedes or resumes that session.
#[derive(Clone)]
pub struct SessionCallbacks {
    pub(crate) on_progress: ProgressCallback,
    pub(crate) on_stop: StopCallback,
    pub(crate) seek: Option<SeekCoordinator>,
}

impl SessionCallbacks {
    pub fn new<P, S>(on_progress: P, on_stop: S) -> Self
    where
        P: Fn(u64, u64) + Send + Sync + 'static,
        S: Fn() + Send + Sync + 'static,
    {
        Self {
            on_progress: Arc::new(on_progress),
            on_stop: Arc::new(on_stop),
            seek: None,
        }
    }

    /// Callbacks that ignore every notification.
    pub fn noop() -> Self {
        Self::new(|_, _| {}, || {})
    }

    /// Suppress progress delivery while `seek` reports an active drag.
    pub fn with_seek_coordinator(mut self, seek: SeekCoordinator) -> Self {
        self.seek = Some(seek);
        self
    }

    pub(crate) fn deliver_progress(&self, position_ms: u64, duration_ms: u64) -> bool {
        if self.seek.as_ref().is_some_and(|seek| seek.is_seeking()) {
            return false;
        }
        (self.on_progress)(position_ms, duration_ms);
        true
    }

    pub(crate) fn fire_stop(&self) {
        (self.on_stop)();
    }
}

impl fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("seek", &self.seek)
            .finish_non_exhaustive()
    }
}
