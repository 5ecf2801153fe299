//! Visibility/focus gate for one on-screen player.
//!
//! The host feeds two signals per card: whether the card is the active
//! player slot of its list, and whether the hosting screen is focused. A
//! true-to-false edge on either one stops the card's track if it is
//! `Playing` or `Paused`.

use crate::controller::SessionController;
use crate::session::TrackRef;
use core_runtime::events::StopReason;
use parking_lot::Mutex;
use tracing::debug;

/// Signals observed by a [`VisibilityGate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateSignals {
    /// The card holds the list's "currently playing" slot.
    pub is_active_player: bool,
    /// The screen hosting the card is focused.
    pub is_screen_focused: bool,
}

impl GateSignals {
    pub fn new(is_active_player: bool, is_screen_focused: bool) -> Self {
        Self {
            is_active_player,
            is_screen_focused,
        }
    }

    /// Returns `true` if moving from `self` to `next` drops either signal.
    pub fn lost_in(&self, next: &GateSignals) -> bool {
        (self.is_active_player && !next.is_active_player)
            || (self.is_screen_focused && !next.is_screen_focused)
    }
}

/// Stops a card's audio when the card loses its slot or its screen.
pub struct VisibilityGate {
    controller: SessionController,
    track: Mutex<TrackRef>,
    signals: Mutex<GateSignals>,
}

impl VisibilityGate {
    pub fn new(controller: SessionController, track: TrackRef, initial: GateSignals) -> Self {
        Self {
            controller,
            track: Mutex::new(track),
            signals: Mutex::new(initial),
        }
    }

    /// Points the gate at the card's current track.
    pub fn set_track(&self, track: TrackRef) {
        *self.track.lock() = track;
    }

    pub fn track(&self) -> TrackRef {
        self.track.lock().clone()
    }

    pub fn signals(&self) -> GateSignals {
        *self.signals.lock()
    }

    /// Applies new signal values. Returns `true` if a session was stopped.
    ///
    /// Only a true-to-false edge can issue a command, and only the card's
    /// own track is ever stopped.
    pub async fn update(&self, next: GateSignals) -> bool {
        let previous = std::mem::replace(&mut *self.signals.lock(), next);
        if !previous.lost_in(&next) {
            return false;
        }

        let track = self.track();
        let stopped = self
            .controller
            .stop_track(&track, StopReason::FocusLost)
            .await;
        debug!(
            post_id = %track.post_id,
            track_index = track.index,
            stopped,
            "Gate signal dropped"
        );
        stopped
    }

    pub async fn set_active_player(&self, is_active_player: bool) -> bool {
        let next = GateSignals {
            is_active_player,
            ..self.signals()
        };
        self.update(next).await
    }

    pub async fn set_screen_focused(&self, is_screen_focused: bool) -> bool {
        let next = GateSignals {
            is_screen_focused,
            ..self.signals()
        };
        self.update(next).await
    }
}

impl std::fmt::Debug for VisibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let track = self.track();
        f.debug_struct("VisibilityGate")
            .field("post_id", &track.post_id)
            .field("track_index", &track.index)
            .field("signals", &self.signals())
            .finish()
    }
}
