//! Platform and processor fee calculation

use crate::config::FeeSchedule;
use crate::error::{FeeError, FeeResult};
use crate::money::round_half_up;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fees taken out of a gross ticket price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub gross_amount_cents: i64,
    pub platform_fee_cents: i64,
    pub processor_fee_cents: i64,
    pub total_fee_cents: i64,
    /// What the organizer is paid out. Negative when fixed fees exceed a
    /// tiny gross amount.
    pub net_amount_cents: i64,
}

/// Applies a [`FeeSchedule`] to ticket prices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Split `gross_amount_cents` into platform fee, processor fee and the
    /// organizer's net payout.
    ///
    /// Each fee is rounded to the cent on its own before the two are
    /// summed, which is how the processor itemizes its own statements.
    pub fn calculate_fees(&self, gross_amount_cents: i64) -> FeeBreakdown {
        let gross = clamp_non_negative(gross_amount_cents, "gross_amount_cents");

        let platform_fee_cents = self.platform_fee(gross);
        let processor_fee_cents = self.processor_fee(gross);
        let total_fee_cents = platform_fee_cents.saturating_add(processor_fee_cents);

        let breakdown = FeeBreakdown {
            gross_amount_cents: gross,
            platform_fee_cents,
            processor_fee_cents,
            total_fee_cents,
            net_amount_cents: gross.saturating_sub(total_fee_cents),
        };

        tracing::debug!(
            gross = breakdown.gross_amount_cents,
            platform_fee = breakdown.platform_fee_cents,
            processor_fee = breakdown.processor_fee_cents,
            net = breakdown.net_amount_cents,
            "Calculated fees"
        );

        breakdown
    }

    /// Platform fee on a ticket price. Free tickets carry no fee.
    pub fn platform_fee(&self, amount_cents: i64) -> i64 {
        percentage_plus_fixed(
            amount_cents,
            self.schedule.platform_fee_rate,
            self.schedule.platform_fixed_fee_cents,
        )
    }

    /// Processor fee on a charged amount. Nothing is charged for free
    /// tickets, so nothing is owed.
    pub fn processor_fee(&self, amount_cents: i64) -> i64 {
        percentage_plus_fixed(
            amount_cents,
            self.schedule.processor_fee_rate,
            self.schedule.processor_fixed_fee_cents,
        )
    }

    /// Reject charges the processor would refuse.
    pub fn validate_charge_amount(&self, gross_amount_cents: i64) -> FeeResult<()> {
        if gross_amount_cents < self.schedule.minimum_charge_cents {
            tracing::warn!(
                amount = gross_amount_cents,
                minimum = self.schedule.minimum_charge_cents,
                "Charge below processor minimum"
            );
            return Err(FeeError::BelowMinimumCharge {
                amount: gross_amount_cents,
                minimum: self.schedule.minimum_charge_cents,
            });
        }
        Ok(())
    }
}

fn percentage_plus_fixed(amount_cents: i64, rate: Decimal, fixed_cents: i64) -> i64 {
    if amount_cents <= 0 {
        return 0;
    }
    let variable_cents = match Decimal::from(amount_cents).checked_mul(rate) {
        Some(fee) => round_half_up(fee),
        None => {
            tracing::warn!(amount = amount_cents, %rate, "Fee overflowed, saturating");
            if rate.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    };
    variable_cents.saturating_add(fixed_cents)
}

pub(crate) fn clamp_non_negative(amount_cents: i64, field: &'static str) -> i64 {
    if amount_cents < 0 {
        tracing::warn!(field, amount = amount_cents, "Negative price clamped to zero");
        return 0;
    }
    amount_cents
}
