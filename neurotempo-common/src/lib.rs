//! # NeuroTempo Common Library
//!
//! Shared code for the NeuroTempo service crates:
//! - Error type shared by configuration and persistence helpers
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Event types (`NeuroEvent`) and the broadcast `EventBus`
//! - SSE stream over the event bus
//! - Settings table bootstrap
//! - Timestamp helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
