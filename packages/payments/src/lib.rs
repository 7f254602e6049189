//! Tickets Payments - fee and refund math for community event ticketing
//!
//! Pure, synchronous calculators used by the checkout and refund handlers.
//! Nothing in this crate performs I/O: persistence, Stripe calls and
//! notifications stay with the caller.
//!
//! ## Calculators
//!
//! | Calculator | Entry point | Description |
//! |------------|-------------|-------------|
//! | Fees | [`FeeCalculator::calculate_fees`] | Platform fee, processor fee and organizer payout |
//! | Orders | [`calculate_order_breakdown`] | What the buyer pays for a ticket |
//! | Refunds | [`calculate_refund_breakdown`] | Proportional split of a refund |
//! | Validation | [`validate_refund_amount`] | Refund amount against the remaining balance |
//! | Eligibility | [`check_refund_eligibility`] | Refund window against the event start |
//!
//! All amounts are `i64` minor currency units (cents). Rates are
//! [`rust_decimal::Decimal`]; binary floating point is never used.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tickets_payments::{FeeSchedule, RefundCalculator};
//!
//! let refunds = RefundCalculator::new(FeeSchedule::from_env()?);
//! let order = refunds.calculate_order_breakdown(10_000);
//! let validation = refunds.validate_refund_amount(&order, 5_344, 0)?;
//! let breakdown = refunds.calculate_refund_breakdown(&order, 5_344, false);
//! ```

mod config;
mod error;
mod fees;
mod request;

pub mod money;
pub mod refund;

pub use config::{FeeSchedule, ProcessorFeeTreatment, RefundPolicy};
pub use error::{ConfigError, FeeError, FeeResult, RefundError, RefundResult};
pub use fees::{FeeBreakdown, FeeCalculator};
pub use refund::{
    OrderBreakdown, RefundBreakdown, RefundCalculator, RefundEligibility, RefundValidation,
    calculate_order_breakdown, calculate_refund_breakdown, calculate_refund_breakdown_after,
    check_refund_eligibility, check_refund_eligibility_at, ensure_refund_eligible_at,
    validate_refund_amount,
};
pub use request::{RefundReason, RefundRequest, RefundStatus};
