//! # Player Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `PlayerConfig`
//! instance that holds the host capabilities and tuning knobs the core needs.
//! It enforces fail-fast validation so a missing audio engine is reported at
//! bootstrap instead of on the first tap of a play button.
//!
//! ## Required Dependencies
//!
//! - `AudioEngine` - The single native playback resource
//!
//! ## Optional Dependencies
//!
//! - `LifecycleObserver` - App foreground/background transitions
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = PlayerConfig::builder()
//!     .engine(Arc::new(MyNativeEngine::new()))
//!     .position_update_interval(Duration::from_millis(250))
//!     .stop_on_background(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::PlayerConfig;
//!
//! // This will panic with an actionable error message
//! let config = PlayerConfig::builder()
//!     .build()
//!     .expect("Should fail - missing audio engine");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioEngine, LifecycleObserver};
use std::sync::Arc;
use std::time::Duration;

/// Default engine tick interval (0.1 s).
pub const DEFAULT_POSITION_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest tick interval accepted by [`PlayerConfig::validate`].
pub const MIN_POSITION_UPDATE_INTERVAL: Duration = Duration::from_millis(10);

/// Longest tick interval accepted by [`PlayerConfig::validate`].
pub const MAX_POSITION_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Core configuration for the playback core.
///
/// Use [`PlayerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PlayerConfig {
    /// Native playback engine (required)
    pub engine: Arc<dyn AudioEngine>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// How often the engine reports position ticks
    pub position_update_interval: Duration,

    /// Per-subscriber buffer of the playback event bus
    pub event_buffer_size: usize,

    /// Stop the active session when the app leaves the foreground
    pub stop_on_background: bool,
}

impl std::fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("engine", &"AudioEngine { ... }")
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field("position_update_interval", &self.position_update_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("stop_on_background", &self.stop_on_background)
            .finish()
    }
}

impl PlayerConfig {
    /// Creates a new builder for constructing a `PlayerConfig`.
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The tick interval lies within 10 ms ..= 5 s
    /// - The event buffer holds at least one event
    pub fn validate(&self) -> Result<()> {
        if self.position_update_interval < MIN_POSITION_UPDATE_INTERVAL {
            return Err(Error::Config(format!(
                "Position update interval of {}ms is below the minimum of {}ms",
                self.position_update_interval.as_millis(),
                MIN_POSITION_UPDATE_INTERVAL.as_millis()
            )));
        }

        if self.position_update_interval > MAX_POSITION_UPDATE_INTERVAL {
            return Err(Error::Config(format!(
                "Position update interval of {}ms exceeds maximum of {}ms",
                self.position_update_interval.as_millis(),
                MAX_POSITION_UPDATE_INTERVAL.as_millis()
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioEngine".to_string(),
        message: "AudioEngine implementation is required for playback. \
                 iOS: inject the AVPlayer-backed engine. \
                 Android: inject the ExoPlayer-backed engine. \
                 Tests: inject a recording fake."
            .to_string(),
    }
}

/// Builder for constructing [`PlayerConfig`] instances.
#[derive(Default)]
pub struct PlayerConfigBuilder {
    engine: Option<Arc<dyn AudioEngine>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    position_update_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    stop_on_background: Option<bool>,
}

impl PlayerConfigBuilder {
    /// Sets the native audio engine (required).
    pub fn engine(mut self, engine: Arc<dyn AudioEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    ///
    /// Without an observer the core never reacts to the app being
    /// backgrounded; cards still stop themselves through their gate.
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the engine tick interval.
    ///
    /// Default: 100 ms
    pub fn position_update_interval(mut self, interval: Duration) -> Self {
        self.position_update_interval = Some(interval);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables stopping playback when the app is backgrounded.
    ///
    /// Default: true
    pub fn stop_on_background(mut self, enabled: bool) -> Self {
        self.stop_on_background = Some(enabled);
        self
    }

    /// Builds the final `PlayerConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(PlayerConfig)` on success, or an error if:
    /// - The audio engine is missing
    /// - Configuration values are out of range
    pub fn build(self) -> Result<PlayerConfig> {
        let engine = self.engine.ok_or_else(engine_missing_error)?;

        let config = PlayerConfig {
            engine,
            lifecycle_observer: self.lifecycle_observer,
            position_update_interval: self
                .position_update_interval
                .unwrap_or(DEFAULT_POSITION_UPDATE_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            stop_on_background: self.stop_on_background.unwrap_or(true),
        };

        config.validate()?;

        Ok(config)
    }
}
