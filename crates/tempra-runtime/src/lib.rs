//! Tempra Runtime - running the performer server and the spectator display
//!
//! Spectator side:
//! - [`Spectator`]: stopwatch + gate + local queue mirror, driven by user actions
//! - [`SpectatorLoop`]: fixed-interval polling and user actions on one task
//! - [`HttpClient`]: fetch/ack (and performer push) over HTTP
//!
//! Performer side:
//! - [`server`]: HTTP binding of the directive queue
//!
//! Shared:
//! - [`config`]: layered configuration
//! - [`telemetry`]: logging setup

pub mod config;
pub mod telemetry;
pub mod spectator;
pub mod driver;
pub mod http;
pub mod server;

pub use self::config::*;
pub use spectator::*;
pub use driver::*;
pub use http::*;
