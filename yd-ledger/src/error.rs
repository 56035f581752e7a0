//! Error types for the course marketplace ledger

use crate::{Address, Amount, CourseId};

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Ledger error types
///
/// Every variant aborts the operation that raised it with no observable side effects.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Course does not exist: {0}")]
    NotFound(CourseId),

    #[error("Unauthorized caller: {caller}")]
    Unauthorized { caller: Address },

    #[error("Course is not active: {0}")]
    CourseInactive(CourseId),

    #[error("Instructor cannot buy own course")]
    SelfPurchase,

    #[error("Already enrolled in course {course_id}: {student}")]
    AlreadyEnrolled { course_id: CourseId, student: Address },

    #[error("Price must be greater than 0")]
    InvalidPrice,

    #[error("Metadata reference cannot be empty")]
    InvalidMetadata,

    #[error("Invalid recipient: null account")]
    InvalidRecipient,

    #[error("Invalid sender: null account")]
    InvalidSender,

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Amount, available: Amount },

    #[error("Fee cannot exceed 20%: got {0}")]
    FeeTooHigh(u8),

    #[error("Must send ETH to buy tokens")]
    ZeroAmount,

    #[error("Not enough tokens available: need {needed}, have {available}")]
    InsufficientSupply { needed: Amount, available: Amount },

    #[error("Token amount too small")]
    AmountTooSmall,

    #[error("Contract ETH balance insufficient: need {needed}, have {available}")]
    InsufficientReserve { needed: Amount, available: Amount },

    #[error("No ETH to withdraw")]
    NothingToWithdraw,

    #[error("Access denied to course {course_id} for {caller}: must purchase course first")]
    AccessDenied { course_id: CourseId, caller: Address },

    #[error("Marketplace is paused")]
    Paused,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether retrying the same call could succeed without changing its inputs
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Io(_))
    }

    /// Get error category
    pub fn category(&self) -> LedgerErrorCategory {
        match self {
            LedgerError::NotFound(_) => LedgerErrorCategory::NotFound,
            LedgerError::Unauthorized { .. } | LedgerError::AccessDenied { .. } => {
                LedgerErrorCategory::Authorization
            }
            LedgerError::SelfPurchase
            | LedgerError::InvalidPrice
            | LedgerError::InvalidMetadata
            | LedgerError::InvalidRecipient
            | LedgerError::InvalidSender
            | LedgerError::FeeTooHigh(_)
            | LedgerError::ZeroAmount
            | LedgerError::AmountTooSmall
            | LedgerError::InvalidAmount(_) => LedgerErrorCategory::Validation,
            LedgerError::InsufficientBalance { .. }
            | LedgerError::InsufficientAllowance { .. }
            | LedgerError::InsufficientSupply { .. }
            | LedgerError::InsufficientReserve { .. }
            | LedgerError::NothingToWithdraw => LedgerErrorCategory::Funds,
            LedgerError::CourseInactive(_)
            | LedgerError::AlreadyEnrolled { .. }
            | LedgerError::Paused => LedgerErrorCategory::State,
            LedgerError::Overflow => LedgerErrorCategory::Arithmetic,
            LedgerError::Config(_)
            | LedgerError::Snapshot(_)
            | LedgerError::Serialization(_)
            | LedgerError::Io(_) => LedgerErrorCategory::Storage,
        }
    }
}

/// Ledger error categories for handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorCategory {
    /// Unknown course
    NotFound,
    /// Caller lacks the required role
    Authorization,
    /// Malformed input
    Validation,
    /// Balance, allowance, supply or reserve too low
    Funds,
    /// Course or enrollment state forbids the call
    State,
    /// Checked arithmetic failed
    Arithmetic,
    /// Configuration, snapshot or file system
    Storage,
}
