//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the
//! platform-specific implementations supplied by the mobile shell. Each trait
//! represents a capability the core requires but that is implemented
//! differently per platform (iOS, Android, desktop).
//!
//! ## Traits
//!
//! - [`AudioEngine`](playback::AudioEngine) - The single native audio playback resource
//! - [`LifecycleObserver`](lifecycle::LifecycleObserver) - App foreground/background transitions
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert native errors into `BridgeError` and include
//! actionable context (e.g. which media reference failed to open).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single engine instance can be
//! shared across async tasks and driven from the engine's own timer thread.

pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioEngine, PositionCallback, PositionUpdate};
