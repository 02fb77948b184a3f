//! Tempra Test Harness
//!
//! This crate provides:
//! - Lossy transports for delivery testing
//! - A scripted spectator with a manual clock
//! - End-to-end scenarios (under `tests/`)

pub mod chaos;
pub mod scenario;

pub use chaos::*;
pub use scenario::*;
