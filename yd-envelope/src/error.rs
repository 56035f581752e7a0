//! Error types for the red envelope lottery

use yd_ledger::Address;

/// Result type for envelope operations
pub type EnvelopeResult<T> = std::result::Result<T, EnvelopeError>;

/// Envelope errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Envelope amount must be greater than zero")]
    ZeroAmount,

    #[error("Envelope share count must be greater than zero")]
    ZeroCount,

    #[error("Amount too small: every share needs at least one unit")]
    AmountTooSmall,

    #[error("An envelope with unclaimed shares is already active")]
    AlreadyActive,

    #[error("No envelope has been set")]
    NotSet,

    #[error("Account {0} already grabbed from this envelope")]
    AlreadyGrabbed(Address),

    #[error("All shares have been grabbed")]
    Exhausted,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl EnvelopeError {
    /// Whether the caller could succeed later without changing the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnvelopeError::AlreadyActive | EnvelopeError::NotSet)
    }
}
