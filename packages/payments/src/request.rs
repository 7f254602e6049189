//! Refund request lifecycle
//!
//! `pending -> validated -> succeeded | failed`. The calculators only take
//! part in the `validated` step; issuing the refund with the processor and
//! persisting the outcome is the caller's job.

use crate::error::{RefundError, RefundResult};
use crate::refund::{
    OrderBreakdown, RefundBreakdown, calculate_refund_breakdown_after, validate_refund_amount,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    RequestedByCustomer,
    EventCancelled,
    Duplicate,
    Fraudulent,
    Other(String),
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefundReason::RequestedByCustomer => write!(f, "requested_by_customer"),
            RefundReason::EventCancelled => write!(f, "event_cancelled"),
            RefundReason::Duplicate => write!(f, "duplicate"),
            RefundReason::Fraudulent => write!(f, "fraudulent"),
            RefundReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Validated,
    Succeeded,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// A refund an administrator asked for against one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub order_id: String,
    pub amount_cents: i64,
    pub reason: RefundReason,
    /// Refunded on this order before this request
    pub already_refunded_cents: i64,
    pub status: RefundStatus,
    /// Set once validated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<RefundBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RefundRequest {
    pub fn new(
        order_id: impl Into<String>,
        amount_cents: i64,
        reason: RefundReason,
        already_refunded_cents: i64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            amount_cents,
            reason,
            already_refunded_cents,
            status: RefundStatus::Pending,
            breakdown: None,
            failure: None,
        }
    }

    /// Check the amount against `order` and compute the split, taking
    /// earlier refunds on the order into account. On error the request
    /// stays pending.
    #[tracing::instrument(skip(self, order), fields(order_id = %self.order_id, amount = self.amount_cents))]
    pub fn validate(&mut self, order: &OrderBreakdown) -> RefundResult<RefundBreakdown> {
        self.transition(RefundStatus::Pending, RefundStatus::Validated)?;

        validate_refund_amount(order, self.amount_cents, self.already_refunded_cents)?;

        let breakdown = calculate_refund_breakdown_after(
            order,
            self.amount_cents,
            self.already_refunded_cents,
        );

        self.breakdown = Some(breakdown);
        self.status = RefundStatus::Validated;
        tracing::info!(
            total_refund = breakdown.total_refund_cents,
            organizer_impact = breakdown.organizer_impact_cents,
            "Refund request validated"
        );
        Ok(breakdown)
    }

    /// The processor confirmed the refund
    #[tracing::instrument(skip(self), fields(order_id = %self.order_id))]
    pub fn mark_succeeded(&mut self) -> RefundResult<()> {
        self.transition(RefundStatus::Validated, RefundStatus::Succeeded)?;
        self.status = RefundStatus::Succeeded;
        tracing::info!("Refund succeeded");
        Ok(())
    }

    /// The processor rejected the refund
    #[tracing::instrument(skip(self, message), fields(order_id = %self.order_id))]
    pub fn mark_failed(&mut self, message: impl Into<String>) -> RefundResult<()> {
        self.transition(RefundStatus::Validated, RefundStatus::Failed)?;
        let message = message.into();
        tracing::warn!(error = %message, "Refund failed");
        self.failure = Some(message);
        self.status = RefundStatus::Failed;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RefundStatus::Succeeded | RefundStatus::Failed)
    }

    /// Total refunded on the order once this request has settled
    pub fn refunded_total_after(&self) -> i64 {
        let settled = match (self.status, self.breakdown) {
            (RefundStatus::Succeeded, Some(breakdown)) => breakdown.total_refund_cents,
            _ => 0,
        };
        self.already_refunded_cents.max(0).saturating_add(settled)
    }

    fn transition(&self, expected: RefundStatus, to: RefundStatus) -> RefundResult<()> {
        if self.status != expected {
            return Err(RefundError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        Ok(())
    }
}
