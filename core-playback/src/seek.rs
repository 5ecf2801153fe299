//! Scrub handling for one on-screen player.
//!
//! While the user drags the position slider, engine ticks must not move the
//! displayed position. The coordinator owns that window: the display shows
//! the dragged value from [`SeekCoordinator::begin_seek`] until
//! [`SeekCoordinator::complete_seek`] has handed the target to the
//! controller.
//!
//! Seeks are addressed to the player's own track. A drag that ends after
//! another player took over the session is dropped.

use crate::controller::SessionController;
use crate::session::TrackRef;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Transient scrub state of one player instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekState {
    pub is_seeking: bool,
    /// Value under the user's finger, shown instead of the engine position.
    pub pending_value_ms: u64,
}

/// Shared handle to a player's [`SeekState`].
///
/// Clones observe the same state, so the handle can be attached to the
/// session callbacks and kept by the view model at the same time.
#[derive(Debug, Clone, Default)]
pub struct SeekCoordinator {
    state: Arc<Mutex<SeekState>>,
}

impl SeekCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag at `current_position_ms`.
    pub fn begin_seek(&self, current_position_ms: u64) {
        *self.state.lock() = SeekState {
            is_seeking: true,
            pending_value_ms: current_position_ms,
        };
    }

    /// Tracks the drag. Ignored when no drag is in progress.
    pub fn update_seek(&self, value_ms: u64) {
        let mut state = self.state.lock();
        if state.is_seeking {
            state.pending_value_ms = value_ms;
        }
    }

    /// Ends the drag: seeks `track` to `target_ms`, then lets engine ticks
    /// drive the display again. Returns `true` if the engine applied the
    /// seek.
    ///
    /// The window closes even if the controller ignores the seek.
    pub async fn complete_seek(
        &self,
        controller: &SessionController,
        track: &TrackRef,
        target_ms: u64,
    ) -> bool {
        let applied = self.commit_seek(controller, track, target_ms).await;
        self.end_seek();
        applied
    }

    /// Abandons the drag without seeking.
    pub fn cancel_seek(&self) {
        self.end_seek();
    }

    /// Hands `target_ms` to the controller with the window still open.
    pub(crate) async fn commit_seek(
        &self,
        controller: &SessionController,
        track: &TrackRef,
        target_ms: u64,
    ) -> bool {
        self.update_seek(target_ms);
        let applied = controller.seek_track(track, target_ms).await;
        debug!(post_id = %track.post_id, track_index = track.index, target_ms, applied, "Seek committed");
        applied
    }

    pub(crate) fn end_seek(&self) {
        self.state.lock().is_seeking = false;
    }

    pub fn is_seeking(&self) -> bool {
        self.state.lock().is_seeking
    }

    pub fn state(&self) -> SeekState {
        *self.state.lock()
    }

    /// Position to render given the latest engine-reported position.
    pub fn display_position(&self, engine_position_ms: u64) -> u64 {
        let state = self.state.lock();
        if state.is_seeking {
            state.pending_value_ms
        } else {
            engine_position_ms
        }
    }
}
