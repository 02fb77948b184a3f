//! Tempra Force - deciding whether and how the displayed time is rewritten
//!
//! - [`engine`]: pure mapping of (elapsed, directive) to a forced elapsed time
//! - [`gate`]: trigger and condition checks for the head directive on a timer event

pub mod engine;
pub mod gate;

pub use engine::*;
pub use gate::*;
