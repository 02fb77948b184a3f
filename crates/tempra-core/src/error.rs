//! Error types for Tempra

use thiserror::Error;

use crate::{Mode, Token};

/// Core Tempra errors
#[derive(Error, Debug)]
pub enum TempraError {
    // Queue errors
    #[error("Token not found: {0}")]
    TokenNotFound(Token),

    #[error("Invalid directive: {0}")]
    InvalidDirective(String),

    // Engine errors
    #[error("Force cannot be resolved: mode {mode}")]
    UnresolvableForce { mode: Mode },

    // Timer errors
    #[error("Invalid transition: cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },

    // Transport errors
    #[error("Transport error: {0}")]
    TransportError(String),

    // Host errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl TempraError {
    /// Errors that are retried silently instead of surfacing to the spectator
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TempraError::TransportError(_) | TempraError::UnresolvableForce { .. }
        )
    }
}

/// Result type for Tempra operations
pub type TempraResult<T> = Result<T, TempraError>;
