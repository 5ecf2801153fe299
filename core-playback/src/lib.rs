//! # Playback Coordination Core
//!
//! Coordinates audio playback across every post card of the feed on top of
//! a single native audio engine.
//!
//! ## Overview
//!
//! This crate handles:
//! - The process-wide playback session and its mutual exclusion
//!   ([`SessionController`])
//! - Next/previous track resolution within a post ([`navigation`])
//! - Stopping a card's audio when it loses visibility or focus
//!   ([`VisibilityGate`])
//! - Keeping engine ticks from fighting the user's scrub gesture
//!   ([`SeekCoordinator`])
//! - The per-card view model that combines them ([`TrackPlayer`])
//!
//! Only the controller ever calls the [`AudioEngine`](bridge_traits::AudioEngine).

pub mod controller;
pub mod error;
pub mod gate;
pub mod navigation;
pub mod player;
pub mod seek;
pub mod session;

pub use controller::{SessionController, SessionListener, SessionSubscription};
pub use error::{PlaybackError, Result, PLAY_FAILED_NOTICE};
pub use gate::{GateSignals, VisibilityGate};
pub use navigation::{resolve_next, resolve_previous};
pub use player::{format_time, progress_fraction, PlayerDisplay, TrackPlayer};
pub use seek::{SeekCoordinator, SeekState};
pub use session::{
    PlaybackSession, PostTracks, ProgressCallback, SessionCallbacks, SessionId, SessionState,
    StopCallback, TrackRef,
};
