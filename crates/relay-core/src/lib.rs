//! Core logic for the channel relay.
//!
//! This crate is transport-agnostic. Fetching from the source and delivering
//! to channels/webhooks live behind ports (traits) implemented in adapter
//! crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod pacing;
pub mod payload;
pub mod relay;
pub mod watermark;

pub use errors::{Error, Result};
