//! # Track Player
//!
//! View model behind one post card's audio controls. It ties the shared
//! [`SessionController`] to the card's own tracks, scrub state and gate, and
//! exposes the values a card renders.
//!
//! The card's track cursor is not stored: it is the active session's index
//! when the session belongs to this post, and 0 otherwise.

use crate::controller::SessionController;
use crate::error::{PlaybackError, Result};
use crate::gate::{GateSignals, VisibilityGate};
use crate::navigation::{resolve_next, resolve_previous};
use crate::seek::SeekCoordinator;
use crate::session::{PostTracks, SessionCallbacks, SessionState, TrackRef};
use core_runtime::events::StopReason;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Values a card renders for its audio controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDisplay {
    /// Last engine-reported position (reset to 0 on stop).
    pub position_ms: u64,
    /// Reported track length. 0 until the first tick and after a stop.
    pub duration_ms: u64,
    /// A play or resume command is in flight.
    pub is_loading: bool,
    /// User-visible notice from the last failed command.
    pub notice: Option<String>,
}

/// Formats milliseconds as zero-padded `mm:ss`. Minutes do not wrap at 60.
///
/// ```
/// use core_playback::format_time;
///
/// assert_eq!(format_time(0), "00:00");
/// assert_eq!(format_time(61_999), "01:01");
/// assert_eq!(format_time(3_600_000), "60:00");
/// ```
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1_000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Fraction of the track played, clamped to `0.0..=1.0`. A zero duration
/// yields 0.0.
pub fn progress_fraction(position_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}

/// Per-card audio player.
pub struct TrackPlayer {
    controller: SessionController,
    tracks: PostTracks,
    seek: SeekCoordinator,
    gate: VisibilityGate,
    display: Arc<Mutex<PlayerDisplay>>,
}

impl TrackPlayer {
    /// Creates the player for a post's tracks.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidTrack`] if the post has no tracks.
    pub fn new(controller: SessionController, tracks: PostTracks) -> Result<Self> {
        let first = tracks.track(0).ok_or_else(|| {
            PlaybackError::InvalidTrack(format!("post {} has no audio tracks", tracks.post_id()))
        })?;
        let gate = VisibilityGate::new(controller.clone(), first, GateSignals::default());

        Ok(Self {
            controller,
            tracks,
            seek: SeekCoordinator::new(),
            gate,
            display: Arc::new(Mutex::new(PlayerDisplay::default())),
        })
    }

    pub fn tracks(&self) -> &PostTracks {
        &self.tracks
    }

    pub fn seek(&self) -> &SeekCoordinator {
        &self.seek
    }

    pub fn gate(&self) -> &VisibilityGate {
        &self.gate
    }

    /// Index of the track this card shows.
    pub fn current_index(&self) -> usize {
        self.controller
            .session()
            .filter(|session| session.belongs_to(self.tracks.post_id()))
            .map(|session| session.track_index)
            .filter(|index| *index < self.tracks.len())
            .unwrap_or(0)
    }

    pub fn current_track(&self) -> Result<TrackRef> {
        let index = self.current_index();
        self.tracks.track(index).ok_or_else(|| {
            PlaybackError::InvalidTrack(format!(
                "post {} has no track {}",
                self.tracks.post_id(),
                index
            ))
        })
    }

    /// Session state of the card's current track.
    pub fn state(&self) -> SessionState {
        self.current_track()
            .map(|track| self.controller.state_for(&track))
            .unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    /// Pauses when the card's track is playing, otherwise plays it (resuming
    /// if it is paused).
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let track = self.current_track()?;
        if self.controller.state_for(&track) == SessionState::Playing {
            self.controller.pause().await;
            return Ok(());
        }
        self.play_index(track.index).await
    }

    /// Plays the next track. Returns `Ok(None)` without doing anything at
    /// the last track.
    pub async fn next_track(&self) -> Result<Option<usize>> {
        let Some(index) = resolve_next(self.current_index(), self.tracks.len()) else {
            return Ok(None);
        };
        self.play_index(index).await?;
        Ok(Some(index))
    }

    /// Plays the previous track. Returns `Ok(None)` without doing anything
    /// at the first track.
    pub async fn previous_track(&self) -> Result<Option<usize>> {
        let Some(index) = resolve_previous(self.current_index()) else {
            return Ok(None);
        };
        self.play_index(index).await?;
        Ok(Some(index))
    }

    pub fn can_go_next(&self) -> bool {
        resolve_next(self.current_index(), self.tracks.len()).is_some()
    }

    pub fn can_go_previous(&self) -> bool {
        resolve_previous(self.current_index()).is_some()
    }

    /// Stops the card's track if it is the active one.
    pub async fn stop(&self) -> bool {
        match self.current_track() {
            Ok(track) => self.controller.stop_track(&track, StopReason::Requested).await,
            Err(_) => false,
        }
    }

    /// Forwards visibility/focus changes to the card's gate.
    pub async fn on_visibility_change(&self, signals: GateSignals) -> bool {
        if let Ok(track) = self.current_track() {
            self.gate.set_track(track);
        }
        self.gate.update(signals).await
    }

    pub fn begin_seek(&self) {
        let position_ms = self.display.lock().position_ms;
        self.seek.begin_seek(position_ms);
    }

    pub fn update_seek(&self, value_ms: u64) {
        self.seek.update_seek(value_ms);
    }

    /// Ends the drag and seeks the card's track to `target_ms`. Returns
    /// `true` if the seek was applied.
    ///
    /// On success the display moves to the target before ticks take over
    /// again, so a paused track does not snap back to the old position. A
    /// card that no longer owns the session seeks nothing.
    pub async fn complete_seek(&self, target_ms: u64) -> bool {
        let applied = match self.current_track() {
            Ok(track) => self.seek.commit_seek(&self.controller, &track, target_ms).await,
            Err(_) => false,
        };
        if applied {
            self.display.lock().position_ms = target_ms;
        }
        self.seek.end_seek();
        applied
    }

    pub fn display(&self) -> PlayerDisplay {
        self.display.lock().clone()
    }

    /// Position to render: the dragged value while seeking.
    pub fn display_position(&self) -> u64 {
        let position_ms = self.display.lock().position_ms;
        self.seek.display_position(position_ms)
    }

    /// The slider stays disabled until the engine reports a duration.
    pub fn slider_enabled(&self) -> bool {
        self.display.lock().duration_ms > 0
    }

    pub fn progress(&self) -> f64 {
        let duration_ms = self.display.lock().duration_ms;
        progress_fraction(self.display_position(), duration_ms)
    }

    /// `"mm:ss / mm:ss"` label for the position and duration.
    pub fn time_label(&self) -> String {
        let duration_ms = self.display.lock().duration_ms;
        format!(
            "{} / {}",
            format_time(self.display_position()),
            format_time(duration_ms)
        )
    }

    pub fn dismiss_notice(&self) {
        self.display.lock().notice = None;
    }

    async fn play_index(&self, index: usize) -> Result<()> {
        let track = self.tracks.track(index).ok_or_else(|| {
            PlaybackError::InvalidTrack(format!(
                "post {} has no track {}",
                self.tracks.post_id(),
                index
            ))
        })?;

        {
            let mut display = self.display.lock();
            display.is_loading = true;
            display.notice = None;
        }

        let result = self
            .controller
            .play(track.clone(), self.session_callbacks())
            .await;

        {
            let mut display = self.display.lock();
            display.is_loading = false;
            if let Err(err) = &result {
                display.notice = err.user_message().map(str::to_string);
            }
        }

        match &result {
            Ok(()) => self.gate.set_track(track),
            Err(err) => warn!(post_id = %track.post_id, track_index = index, error = %err, "Card failed to play track"),
        }
        result
    }

    fn session_callbacks(&self) -> SessionCallbacks {
        let progress = Arc::clone(&self.display);
        let stopped = Arc::clone(&self.display);

        SessionCallbacks::new(
            move |position_ms, duration_ms| {
                let mut display = progress.lock();
                display.position_ms = position_ms;
                display.duration_ms = duration_ms;
            },
            move || {
                let mut display = stopped.lock();
                display.position_ms = 0;
                display.duration_ms = 0;
            },
        )
        .with_seek_coordinator(self.seek.clone())
    }
}

impl std::fmt::Debug for TrackPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackPlayer")
            .field("post_id", &self.tracks.post_id())
            .field("track_count", &self.tracks.len())
            .field("current_index", &self.current_index())
            .field("display", &self.display())
            .finish()
    }
}
