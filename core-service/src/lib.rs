//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (audio engine, lifecycle
//! observer) into the playback core. A host builds a
//! [`PlayerConfig`](core_runtime::config::PlayerConfig), calls
//! [`AudioService::bootstrap`] once at startup and hands the service's
//! [`SessionController`] or per-card [`TrackPlayer`]s to its screens.
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//! use core_service::AudioService;
//!
//! let config = PlayerConfig::builder()
//!     .engine(native_engine)
//!     .lifecycle_observer(app_lifecycle)
//!     .build()?;
//! let service = AudioService::bootstrap(config).await?;
//! let card = service.track_player(post_tracks)?;
//! card.toggle_play_pause().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{PostTracks, SessionController, TrackPlayer, TrackRef};
pub use core_runtime::config::PlayerConfig;
pub use core_runtime::logging::{init_logging, LoggingConfig};

use bridge_traits::{LifecycleChangeStream, LifecycleObserver};
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent, Receiver, StopReason};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Primary façade exposed to host applications.
pub struct AudioService {
    config: PlayerConfig,
    controller: SessionController,
    lifecycle_task: Mutex<Option<JoinHandle<()>>>,
}

impl AudioService {
    /// Bootstraps the playback core.
    ///
    /// - Sets the engine tick interval. A failure is logged and ignored.
    /// - Creates the event bus and the session controller.
    /// - Starts watching app lifecycle changes when an observer is
    ///   configured. A failed subscription is logged and leaves the service
    ///   running without it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub async fn bootstrap(config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        if let Err(e) = config
            .engine
            .set_subscription_interval(config.position_update_interval)
            .await
        {
            warn!(error = %e, "Engine rejected position update interval; using its default");
        }

        let event_bus = EventBus::new(config.event_buffer_size);
        let controller = SessionController::new(Arc::clone(&config.engine), event_bus);

        let service = Self {
            config,
            controller,
            lifecycle_task: Mutex::new(None),
        };
        service.start_lifecycle_watch().await;

        info!(
            interval_ms = service.config.position_update_interval.as_millis() as u64,
            stop_on_background = service.config.stop_on_background,
            "Audio service ready"
        );
        Ok(service)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// The process-wide session controller.
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn event_bus(&self) -> &EventBus {
        self.controller.event_bus()
    }

    /// Subscribes to playback and lifecycle events.
    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus().subscribe()
    }

    /// Creates the view model for one post card.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Playback`] if the post has no tracks.
    pub fn track_player(&self, tracks: PostTracks) -> Result<TrackPlayer> {
        Ok(TrackPlayer::new(self.controller.clone(), tracks)?)
    }

    /// Returns `true` while the lifecycle watcher is running.
    pub fn is_watching_lifecycle(&self) -> bool {
        self.lifecycle_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops the watcher and any active session.
    pub async fn shutdown(&self) {
        let task = self.lifecycle_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
        self.controller.stop().await;
        info!("Audio service shut down");
    }

    async fn start_lifecycle_watch(&self) {
        let Some(observer) = self.config.lifecycle_observer.clone() else {
            debug!("No lifecycle observer configured");
            return;
        };

        let focused = match observer.get_state().await {
            Ok(state) => state.is_foreground(),
            Err(e) => {
                warn!(error = %e, "Could not read lifecycle state; assuming foreground");
                true
            }
        };

        let changes = match subscribe(observer.as_ref()).await {
            Some(changes) => changes,
            None => return,
        };

        let task = tokio::spawn(watch_lifecycle(
            changes,
            self.controller.clone(),
            focused,
            self.config.stop_on_background,
        ));
        *self.lifecycle_task.lock() = Some(task);
    }
}

impl Drop for AudioService {
    fn drop(&mut self) {
        if let Some(task) = self.lifecycle_task.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("watching_lifecycle", &self.is_watching_lifecycle())
            .finish()
    }
}

async fn subscribe(observer: &dyn LifecycleObserver) -> Option<Box<dyn LifecycleChangeStream>> {
    match observer.subscribe_changes().await {
        Ok(changes) => Some(changes),
        Err(e) => {
            warn!(error = %e, "Lifecycle subscription failed; background stop disabled");
            None
        }
    }
}

async fn watch_lifecycle(
    mut changes: Box<dyn LifecycleChangeStream>,
    controller: SessionController,
    mut focused: bool,
    stop_on_background: bool,
) {
    while let Some(state) = changes.next().await {
        let now_focused = state.is_foreground();
        if now_focused == focused {
            continue;
        }
        focused = now_focused;

        controller
            .event_bus()
            .emit(CoreEvent::Lifecycle(LifecycleEvent::FocusChanged { focused }))
            .ok();
        debug!(?state, focused, "App focus changed");

        if !focused && stop_on_background {
            if let Some(session) = controller.stop_with_reason(StopReason::FocusLost).await {
                info!(
                    post_id = %session.post_id,
                    track_index = session.track_index,
                    "Stopped playback on app background"
                );
            }
        }
    }
    debug!("Lifecycle stream closed");
}
