//! Tempra Queue - delivering directives from performer to spectator
//!
//! Performer side:
//! - [`DirectiveStore`]: per-token FIFO with enqueue/fetch/ack
//! - [`MemoryStore`]: in-process store
//! - [`PresetBook`]: expands named presets before they are queued
//!
//! Spectator side:
//! - [`PendingQueue`]: local mirror of the fetched queue (holds list progress)
//! - [`ProcessedSet`]: bounded at-most-once guard
//! - [`DirectiveTransport`]: how fetch/ack reach the store

pub mod store;
pub mod memory;
pub mod preset;
pub mod pending;
pub mod processed;
pub mod transport;

pub use store::*;
pub use memory::*;
pub use preset::*;
pub use pending::*;
pub use processed::*;
pub use transport::*;
