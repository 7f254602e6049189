//! Order breakdowns, proportional refunds and refund eligibility
//!
//! A partial refund is split between the ticket price and the platform fee
//! in the same proportion the buyer originally paid them. The split is
//! computed as an exact rational and rounded on the platform side; the
//! ticket side takes the rest so the two always add up to the amount
//! actually refunded.
//!
//! The split is taken over the cumulative refunded amount, so a series of
//! partial refunds that drains an order returns exactly the ticket price
//! and exactly the platform fee, whatever the rounding along the way.

use crate::config::{FeeSchedule, ProcessorFeeTreatment, RefundPolicy};
use crate::error::{RefundError, RefundResult};
use crate::fees::{FeeCalculator, clamp_non_negative};
use crate::money::proportional_cents;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// What a buyer paid for one ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBreakdown {
    pub ticket_price_cents: i64,
    pub platform_fee_cents: i64,
    /// Bookkeeping only unless the schedule passes it to the buyer
    pub processor_fee_cents: i64,
    pub buyer_total_cents: i64,
}

impl OrderBreakdown {
    /// Ticket price plus platform fee, the part of the order a refund can
    /// return. Differs from the buyer total only when the processor fee
    /// was passed to the buyer; that fee is never refunded.
    pub fn refundable_total_cents(&self) -> i64 {
        self.ticket_price_cents.saturating_add(self.platform_fee_cents)
    }

    /// Balance still refundable after `already_refunded_cents`
    pub fn remaining_refundable(&self, already_refunded_cents: i64) -> i64 {
        (self.refundable_total_cents() - already_refunded_cents.max(0)).max(0)
    }

    pub fn is_fully_refunded(&self, already_refunded_cents: i64) -> bool {
        already_refunded_cents >= self.refundable_total_cents()
    }

    /// Platform fee share of the first `refunded_cents` returned on this order
    fn platform_share_of(&self, refunded_cents: i64) -> i64 {
        let refundable = self.refundable_total_cents();
        proportional_cents(
            self.platform_fee_cents,
            refunded_cents.clamp(0, refundable),
            refundable,
        )
    }
}

/// How a refund is split between the organizer and the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBreakdown {
    pub ticket_refund_cents: i64,
    pub platform_fee_refund_cents: i64,
    pub total_refund_cents: i64,
    /// Clawed back from the organizer's payout
    pub organizer_impact_cents: i64,
}

impl RefundBreakdown {
    fn new(ticket_refund_cents: i64, platform_fee_refund_cents: i64) -> Self {
        Self {
            ticket_refund_cents,
            platform_fee_refund_cents,
            total_refund_cents: ticket_refund_cents.saturating_add(platform_fee_refund_cents),
            organizer_impact_cents: ticket_refund_cents,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundValidation {
    pub is_valid: bool,
    pub max_refundable: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundEligibility {
    pub is_eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// 0 when not eligible
    pub refund_percentage: u8,
}

impl From<RefundResult<u8>> for RefundEligibility {
    fn from(result: RefundResult<u8>) -> Self {
        match result {
            Ok(refund_percentage) => Self {
                is_eligible: true,
                reason: None,
                refund_percentage,
            },
            Err(e) => Self {
                is_eligible: false,
                reason: Some(e.to_string()),
                refund_percentage: 0,
            },
        }
    }
}

/// Builds order breakdowns for a fee schedule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefundCalculator {
    fees: FeeCalculator,
}

impl RefundCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self {
            fees: FeeCalculator::new(schedule),
        }
    }

    pub fn fees(&self) -> &FeeCalculator {
        &self.fees
    }

    pub fn calculate_order_breakdown(&self, ticket_price_cents: i64) -> OrderBreakdown {
        let ticket_price_cents = clamp_non_negative(ticket_price_cents, "ticket_price_cents");
        let platform_fee_cents = self.fees.platform_fee(ticket_price_cents);
        let charged_cents = ticket_price_cents.saturating_add(platform_fee_cents);
        let processor_fee_cents = self.fees.processor_fee(charged_cents);

        let buyer_total_cents = match self.fees.schedule().processor_fee_treatment {
            ProcessorFeeTreatment::Absorbed => charged_cents,
            ProcessorFeeTreatment::PassedToBuyer => {
                charged_cents.saturating_add(processor_fee_cents)
            }
        };

        OrderBreakdown {
            ticket_price_cents,
            platform_fee_cents,
            processor_fee_cents,
            buyer_total_cents,
        }
    }

    pub fn calculate_refund_breakdown(
        &self,
        order: &OrderBreakdown,
        refund_amount_cents: i64,
        is_full_refund: bool,
    ) -> RefundBreakdown {
        calculate_refund_breakdown(order, refund_amount_cents, is_full_refund)
    }

    pub fn calculate_refund_breakdown_after(
        &self,
        order: &OrderBreakdown,
        refund_amount_cents: i64,
        already_refunded_cents: i64,
    ) -> RefundBreakdown {
        calculate_refund_breakdown_after(order, refund_amount_cents, already_refunded_cents)
    }

    pub fn validate_refund_amount(
        &self,
        order: &OrderBreakdown,
        refund_amount_cents: i64,
        already_refunded_cents: i64,
    ) -> RefundResult<RefundValidation> {
        validate_refund_amount(order, refund_amount_cents, already_refunded_cents)
    }
}

/// Order breakdown under the default [`FeeSchedule`]
pub fn calculate_order_breakdown(ticket_price_cents: i64) -> OrderBreakdown {
    RefundCalculator::default().calculate_order_breakdown(ticket_price_cents)
}

/// Split `refund_amount_cents` between ticket price and platform fee.
///
/// A full refund, or any amount covering ticket price and platform fee,
/// returns both components in full. Non-positive partial amounts refund
/// nothing.
pub fn calculate_refund_breakdown(
    order: &OrderBreakdown,
    refund_amount_cents: i64,
    is_full_refund: bool,
) -> RefundBreakdown {
    if is_full_refund {
        return RefundBreakdown::new(order.ticket_price_cents, order.platform_fee_cents);
    }
    calculate_refund_breakdown_after(order, refund_amount_cents, 0)
}

/// Split a refund issued after `already_refunded_cents` were returned on
/// the same order.
///
/// The platform side is the difference between the platform share of the
/// cumulative refund before and after this one, so rounding never lets
/// the ticket side of successive refunds add up past the ticket price.
/// Amounts past the remaining balance are capped to it.
pub fn calculate_refund_breakdown_after(
    order: &OrderBreakdown,
    refund_amount_cents: i64,
    already_refunded_cents: i64,
) -> RefundBreakdown {
    let refundable = order.refundable_total_cents();
    let before = already_refunded_cents.clamp(0, refundable);
    let after = before
        .saturating_add(refund_amount_cents.max(0))
        .min(refundable);
    if after <= before {
        return RefundBreakdown::default();
    }

    let amount = after - before;
    let platform_fee_refund = order.platform_share_of(after) - order.platform_share_of(before);
    let breakdown = RefundBreakdown::new(amount - platform_fee_refund, platform_fee_refund);

    tracing::debug!(
        amount,
        already_refunded = before,
        ticket_refund = breakdown.ticket_refund_cents,
        platform_fee_refund = breakdown.platform_fee_refund_cents,
        "Calculated refund breakdown"
    );

    breakdown
}

/// Check `refund_amount_cents` against what is left to refund on `order`.
pub fn validate_refund_amount(
    order: &OrderBreakdown,
    refund_amount_cents: i64,
    already_refunded_cents: i64,
) -> RefundResult<RefundValidation> {
    let max_refundable = order.remaining_refundable(already_refunded_cents);

    if refund_amount_cents <= 0 {
        tracing::warn!(amount = refund_amount_cents, "Rejected non-positive refund");
        return Err(RefundError::InvalidAmount);
    }
    if refund_amount_cents > max_refundable {
        tracing::warn!(
            amount = refund_amount_cents,
            max_refundable,
            "Rejected refund above refundable balance"
        );
        return Err(RefundError::ExceedsRefundable {
            requested: refund_amount_cents,
            max_refundable,
        });
    }

    Ok(RefundValidation {
        is_valid: true,
        max_refundable,
    })
}

/// Refund eligibility right now. `None` uses [`RefundPolicy::default`].
pub fn check_refund_eligibility(
    event_start: DateTime<Utc>,
    policy: Option<&RefundPolicy>,
) -> RefundEligibility {
    let default_policy = RefundPolicy::default();
    check_refund_eligibility_at(event_start, policy.unwrap_or(&default_policy), Utc::now())
}

pub fn check_refund_eligibility_at(
    event_start: DateTime<Utc>,
    policy: &RefundPolicy,
    now: DateTime<Utc>,
) -> RefundEligibility {
    ensure_refund_eligible_at(event_start, policy, now).into()
}

/// Same decision as [`check_refund_eligibility_at`], as a `Result` carrying
/// the refund percentage.
pub fn ensure_refund_eligible_at(
    event_start: DateTime<Utc>,
    policy: &RefundPolicy,
    now: DateTime<Utc>,
) -> RefundResult<u8> {
    if let Some(cutoff) = policy.no_refund_after {
        if now > cutoff {
            return Err(RefundError::RefundWindowClosed);
        }
    }

    let until_event = event_start.signed_duration_since(now);
    let past_deadline = match TimeDelta::try_hours(policy.deadline_hours) {
        Some(deadline) => until_event < deadline,
        None => true,
    };
    if past_deadline {
        return Err(RefundError::PastDeadline {
            deadline_hours: policy.deadline_hours,
        });
    }

    Ok(policy.refund_percentage)
}
