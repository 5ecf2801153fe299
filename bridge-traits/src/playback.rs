//! Audio engine bridge trait and position reporting types.
//!
//! The host ships exactly one native audio record/playback resource. It is a
//! process-wide singleton that supports a single concurrent stream and is not
//! reentrant: callers must not issue a second `start_player` before the
//! previous stream has been stopped. The core drives it exclusively through
//! the session controller in `core-playback`.

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Position report emitted by the engine on every subscription tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionUpdate {
    /// Current playback position in milliseconds.
    pub position_ms: u64,
    /// Duration of the loaded stream in milliseconds (0 until known).
    pub duration_ms: u64,
}

impl PositionUpdate {
    /// Create a new position update.
    pub fn new(position_ms: u64, duration_ms: u64) -> Self {
        Self {
            position_ms,
            duration_ms,
        }
    }

    /// Returns `true` when the report marks the end of the stream.
    ///
    /// A zero duration means the engine has not reported a real duration yet,
    /// which is never treated as finished.
    pub fn is_finished(&self) -> bool {
        self.duration_ms > 0 && self.position_ms >= self.duration_ms
    }
}

/// Callback invoked by the engine from its timer context on every tick.
pub type PositionCallback = Arc<dyn Fn(PositionUpdate) + Send + Sync>;

/// Native playback engine driven by the core.
///
/// Implementations wrap the platform player (e.g. AVPlayer or ExoPlayer). All
/// control methods suspend until the native call resolves.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{AudioEngine, PositionUpdate};
/// use std::sync::Arc;
///
/// async fn preview(engine: &dyn AudioEngine, url: &str) -> bridge_traits::error::Result<()> {
///     engine.stop_player().await.ok();
///     engine.start_player(url).await?;
///     engine.add_position_listener(Arc::new(|update: PositionUpdate| {
///         println!("{} / {}", update.position_ms, update.duration_ms);
///     }));
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait AudioEngine: Send + Sync {
    /// Begin playback of a remote or local media resource.
    ///
    /// Fails if the resource is unreachable or malformed.
    async fn start_player(&self, audio_url: &str) -> Result<()>;

    /// Pause the current stream, keeping its position.
    async fn pause_player(&self) -> Result<()>;

    /// Resume a paused stream.
    async fn resume_player(&self) -> Result<()>;

    /// Stop the current stream and release it.
    async fn stop_player(&self) -> Result<()>;

    /// Jump to an absolute position. The engine clamps out-of-range values.
    async fn seek_to_player(&self, position_ms: u64) -> Result<()>;

    /// Register the position listener. Replaces any previous registration.
    fn add_position_listener(&self, callback: PositionCallback);

    /// Remove the position listener, if any.
    fn remove_position_listener(&self);

    /// Configure how often position ticks are emitted.
    async fn set_subscription_interval(&self, _interval: Duration) -> Result<()> {
        Ok(())
    }
}
