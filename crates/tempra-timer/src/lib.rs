//! Tempra Timer - the stopwatch the spectator sees
//!
//! This crate owns elapsed-time accounting:
//! - Clock sources (monotonic for real use, manual for tests)
//! - The Idle/Running/Stopped state machine and its lap bookkeeping
//! - Press counters consulted by directive conditions
//!
//! Elapsed time only ever jumps through [`Stopwatch::adopt`].

pub mod clock;
pub mod stopwatch;

pub use clock::*;
pub use stopwatch::*;
