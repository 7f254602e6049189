//! Error types for fee, refund and configuration failures

/// Result type for refund operations
pub type RefundResult<T> = Result<T, RefundError>;

/// Result type for fee operations
pub type FeeResult<T> = Result<T, FeeError>;

/// Why a refund was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefundError {
    #[error("Refund amount must be greater than zero")]
    InvalidAmount,

    #[error("Refund amount {requested} exceeds refundable balance of {max_refundable}")]
    ExceedsRefundable { requested: i64, max_refundable: i64 },

    #[error("Refunds must be requested at least {deadline_hours} hours before the event starts")]
    PastDeadline { deadline_hours: i64 },

    #[error("The refund window for this event has closed")]
    RefundWindowClosed,

    #[error("Invalid refund transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// Why a charge cannot be created
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("Charge amount {amount} is below the minimum of {minimum}")]
    BelowMinimumCharge { amount: i64, minimum: i64 },
}

/// Fee schedule or refund policy could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for: {0}")]
    InvalidValue(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}
