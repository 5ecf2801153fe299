//! Workspace umbrella crate.
//!
//! Host applications can depend on `hostakkhor-workspace` and enable the
//! `service` feature to pull in the audio playback core without wiring each
//! workspace crate individually.

#[cfg(feature = "service")]
pub use core_service::*;
