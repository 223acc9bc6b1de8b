//! Posting error types.
//!
//! The taxonomy drives dispatcher behavior: validation errors are permanent
//! (the event is parked), transient errors are retried with the same
//! idempotency key.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while posting a business event to the ledger.
#[derive(Debug, Error)]
pub enum PostingError {
    // ========== Validation Errors (permanent) ==========
    /// Event payload does not match its event type's schema.
    #[error("Invalid event payload: {reason}")]
    InvalidPayload {
        /// What was wrong with the payload.
        reason: String,
    },

    /// Unknown event type string.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Event amount cannot be zero.
    #[error("Event amount cannot be zero")]
    ZeroAmount,

    /// Event amount cannot be negative.
    #[error("Event amount cannot be negative")]
    NegativeAmount,

    /// Constructed lines do not balance. Never silently forced to balance.
    #[error("Journal is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// A line must carry exactly one of debit or credit.
    #[error("Journal line must have exactly one of debit or credit set")]
    InvalidLine,

    /// No account exists for the given code (rule target or configured default).
    #[error("No account found for code {code}")]
    AccountNotFound {
        /// The unresolvable account code.
        code: String,
    },

    // ========== Transient Errors (retryable) ==========
    /// Per-event processing deadline exceeded.
    #[error("Posting timed out")]
    Timeout,

    /// Storage failure; safe to retry with the same idempotency key.
    #[error("Database error: {0}")]
    Database(String),
}

impl PostingError {
    /// Returns the error code for logs and API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
            Self::UnknownEventType(_) => "UNKNOWN_EVENT_TYPE",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::Unbalanced { .. } => "UNBALANCED_JOURNAL",
            Self::InvalidLine => "INVALID_LINE",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the dispatcher should retry the event.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Database(_))
    }

    /// Returns true if this is a permanent validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !self.is_retryable()
    }
}
