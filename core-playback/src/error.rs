//! # Playback Error Types
//!
//! Error taxonomy for the session controller and its satellite policies.

use thiserror::Error;

/// Notice shown to the user when a track cannot be played.
pub const PLAY_FAILED_NOTICE: &str = "Failed to play audio";

/// Errors that can occur during playback coordination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The engine could not open or resume the given media reference.
    ///
    /// `url` is stored with its query string stripped.
    #[error("Audio engine could not play {url}: {reason}")]
    EngineUnavailable { url: String, reason: String },

    /// Stopping the engine or removing its listener failed during teardown.
    #[error("Teardown failed: {0}")]
    Teardown(String),

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// A command was issued in a state where it has no meaning
    /// (e.g. `pause()` with no active session).
    #[error("Invalid playback state: {0}")]
    InvalidState(String),

    /// The track reference cannot describe a playable track.
    #[error("Invalid track: {0}")]
    InvalidTrack(String),
}

impl PlaybackError {
    /// Returns `true` if the UI should surface a notice for this error.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, PlaybackError::EngineUnavailable { .. })
    }

    /// Returns `true` for errors that rapid taps and UI races produce
    /// routinely and that must never reach the user.
    pub fn is_benign(&self) -> bool {
        matches!(self, PlaybackError::InvalidState(_))
    }

    /// Message suitable for a transient alert, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        self.is_user_visible().then_some(PLAY_FAILED_NOTICE)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
