//! Tempra Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout Tempra:
//! - Identifiers (Token, EntryId)
//! - Time primitives (ElapsedMs and its MM:SS,CC decomposition)
//! - Force directives, queue entries and their wire shape
//! - Error taxonomy

pub mod id;
pub mod time;
pub mod directive;
pub mod error;

pub use id::*;
pub use time::*;
pub use directive::*;
pub use error::*;
