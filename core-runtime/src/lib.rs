//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback and service
//! crates depend on. It establishes the logging conventions, the validated
//! player configuration, and the event broadcasting used by app-wide
//! observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
