//! Fee schedule and refund policy configuration

use crate::error::ConfigError;
use crate::money::proportional_cents;
use crate::refund::OrderBreakdown;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Who pays the payment processor's fee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorFeeTreatment {
    /// The platform absorbs the processor fee; it is bookkeeping only
    #[default]
    Absorbed,
    /// The processor fee is added on top of the buyer total
    PassedToBuyer,
}

impl FromStr for ProcessorFeeTreatment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absorbed" | "platform" => Ok(Self::Absorbed),
            "passed_to_buyer" | "buyer" => Ok(Self::PassedToBuyer),
            _ => Err(format!("Unknown processor fee treatment: {}", s)),
        }
    }
}

/// Rates and fixed fees applied to every paid ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    /// Platform fee as a fraction of the ticket price (0.059 = 5.9%)
    #[serde(default = "default_platform_fee_rate")]
    pub platform_fee_rate: Decimal,
    /// Fixed platform surcharge per paid ticket
    #[serde(default = "default_platform_fixed_fee_cents")]
    pub platform_fixed_fee_cents: i64,
    /// Processor fee as a fraction of the charged amount
    #[serde(default = "default_processor_fee_rate")]
    pub processor_fee_rate: Decimal,
    /// Fixed processor fee per charge
    #[serde(default = "default_processor_fixed_fee_cents")]
    pub processor_fixed_fee_cents: i64,
    #[serde(default)]
    pub processor_fee_treatment: ProcessorFeeTreatment,
    /// Smallest amount the processor will charge
    #[serde(default = "default_minimum_charge_cents")]
    pub minimum_charge_cents: i64,
}

fn default_platform_fee_rate() -> Decimal {
    Decimal::new(59, 3)
}
fn default_platform_fixed_fee_cents() -> i64 {
    99
}
fn default_processor_fee_rate() -> Decimal {
    Decimal::new(29, 3)
}
fn default_processor_fixed_fee_cents() -> i64 {
    30
}
fn default_minimum_charge_cents() -> i64 {
    50
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::ticketing()
    }
}

impl FeeSchedule {
    /// 5.9% + $0.99 platform fee, processor fee absorbed by the platform
    pub fn ticketing() -> Self {
        Self {
            platform_fee_rate: default_platform_fee_rate(),
            platform_fixed_fee_cents: default_platform_fixed_fee_cents(),
            processor_fee_rate: default_processor_fee_rate(),
            processor_fixed_fee_cents: default_processor_fixed_fee_cents(),
            processor_fee_treatment: ProcessorFeeTreatment::Absorbed,
            minimum_charge_cents: default_minimum_charge_cents(),
        }
    }

    /// 3% platform fee with the 2.9% + $0.30 processor fee passed to the buyer
    pub fn payment_intent() -> Self {
        Self {
            platform_fee_rate: Decimal::new(3, 2),
            platform_fixed_fee_cents: 0,
            processor_fee_rate: default_processor_fee_rate(),
            processor_fixed_fee_cents: default_processor_fixed_fee_cents(),
            processor_fee_treatment: ProcessorFeeTreatment::PassedToBuyer,
            minimum_charge_cents: default_minimum_charge_cents(),
        }
    }

    /// Load the schedule from the environment, falling back to
    /// [`FeeSchedule::ticketing`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::ticketing();
        let schedule = Self {
            platform_fee_rate: env_or("PLATFORM_FEE_RATE", defaults.platform_fee_rate)?,
            platform_fixed_fee_cents: env_or(
                "PLATFORM_FIXED_FEE_CENTS",
                defaults.platform_fixed_fee_cents,
            )?,
            processor_fee_rate: env_or("PROCESSOR_FEE_RATE", defaults.processor_fee_rate)?,
            processor_fixed_fee_cents: env_or(
                "PROCESSOR_FIXED_FEE_CENTS",
                defaults.processor_fixed_fee_cents,
            )?,
            processor_fee_treatment: env_or(
                "PROCESSOR_FEE_TREATMENT",
                defaults.processor_fee_treatment,
            )?,
            minimum_charge_cents: env_or("MINIMUM_CHARGE_CENTS", defaults.minimum_charge_cents)?,
        };

        schedule.validate()?;
        tracing::info!(
            platform_fee_rate = %schedule.platform_fee_rate,
            platform_fixed_fee_cents = schedule.platform_fixed_fee_cents,
            processor_fee_rate = %schedule.processor_fee_rate,
            processor_fixed_fee_cents = schedule.processor_fixed_fee_cents,
            treatment = ?schedule.processor_fee_treatment,
            "Loaded fee schedule"
        );
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate_ok = |rate: Decimal| rate >= Decimal::ZERO && rate < Decimal::ONE;

        if !rate_ok(self.platform_fee_rate) {
            return Err(ConfigError::OutOfRange("platform_fee_rate".to_string()));
        }
        if !rate_ok(self.processor_fee_rate) {
            return Err(ConfigError::OutOfRange("processor_fee_rate".to_string()));
        }
        if self.platform_fixed_fee_cents < 0 {
            return Err(ConfigError::OutOfRange(
                "platform_fixed_fee_cents".to_string(),
            ));
        }
        if self.processor_fixed_fee_cents < 0 {
            return Err(ConfigError::OutOfRange(
                "processor_fixed_fee_cents".to_string(),
            ));
        }
        if self.minimum_charge_cents < 0 {
            return Err(ConfigError::OutOfRange("minimum_charge_cents".to_string()));
        }
        Ok(())
    }
}

/// When and how much of an order can be refunded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPolicy {
    /// Refunds close this many hours before the event starts
    #[serde(default = "default_deadline_hours")]
    pub deadline_hours: i64,
    /// Share of the refundable balance returned, 0..=100
    #[serde(default = "default_refund_percentage")]
    pub refund_percentage: u8,
    /// Hard cutoff regardless of the event start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_refund_after: Option<DateTime<Utc>>,
}

fn default_deadline_hours() -> i64 {
    24
}
fn default_refund_percentage() -> u8 {
    100
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            deadline_hours: default_deadline_hours(),
            refund_percentage: default_refund_percentage(),
            no_refund_after: None,
        }
    }
}

impl RefundPolicy {
    pub fn from_env() -> Result<Self, ConfigError> {
        let policy = Self {
            deadline_hours: env_or("REFUND_DEADLINE_HOURS", default_deadline_hours())?,
            refund_percentage: env_or("REFUND_PERCENTAGE", default_refund_percentage())?,
            no_refund_after: match env::var("REFUND_NO_REFUND_AFTER") {
                Ok(raw) => Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .map_err(|_| {
                            ConfigError::InvalidValue("REFUND_NO_REFUND_AFTER".to_string())
                        })?
                        .with_timezone(&Utc),
                ),
                Err(_) => None,
            },
        };

        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refund_percentage > 100 {
            return Err(ConfigError::OutOfRange("refund_percentage".to_string()));
        }
        if self.deadline_hours < 0 {
            return Err(ConfigError::OutOfRange("deadline_hours".to_string()));
        }
        Ok(())
    }

    /// Largest refund this policy allows on `order` given what has already
    /// been returned.
    pub fn max_refund_cents(&self, order: &OrderBreakdown, already_refunded_cents: i64) -> i64 {
        let allowed = proportional_cents(
            order.refundable_total_cents(),
            i64::from(self.refund_percentage.min(100)),
            100,
        );
        (allowed - already_refunded_cents.max(0)).max(0)
    }
}

fn env_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ticketing_defaults() {
        let schedule = FeeSchedule::default();
        assert_eq!(schedule.platform_fee_rate, dec!(0.059));
        assert_eq!(schedule.platform_fixed_fee_cents, 99);
        assert_eq!(schedule.processor_fee_rate, dec!(0.029));
        assert_eq!(schedule.processor_fixed_fee_cents, 30);
        assert_eq!(
            schedule.processor_fee_treatment,
            ProcessorFeeTreatment::Absorbed
        );
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_payment_intent_preset() {
        let schedule = FeeSchedule::payment_intent();
        assert_eq!(schedule.platform_fee_rate, dec!(0.03));
        assert_eq!(schedule.platform_fixed_fee_cents, 0);
        assert_eq!(
            schedule.processor_fee_treatment,
            ProcessorFeeTreatment::PassedToBuyer
        );
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut schedule = FeeSchedule::default();
        schedule.platform_fee_rate = dec!(1.0);
        assert_eq!(
            schedule.validate(),
            Err(ConfigError::OutOfRange("platform_fee_rate".to_string()))
        );

        let mut schedule = FeeSchedule::default();
        schedule.processor_fixed_fee_cents = -1;
        assert!(schedule.validate().is_err());

        let policy = RefundPolicy {
            refund_percentage: 101,
            ..RefundPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let schedule: FeeSchedule =
            serde_json::from_str(r#"{"platformFeeRate": "0.05"}"#).unwrap();
        assert_eq!(schedule.platform_fee_rate, dec!(0.05));
        assert_eq!(schedule.platform_fixed_fee_cents, 99);
        assert_eq!(
            schedule.processor_fee_treatment,
            ProcessorFeeTreatment::Absorbed
        );

        let policy: RefundPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RefundPolicy::default());
    }

    #[test]
    fn test_treatment_parse() {
        assert_eq!(
            "absorbed".parse::<ProcessorFeeTreatment>().unwrap(),
            ProcessorFeeTreatment::Absorbed
        );
        assert_eq!(
            "PASSED_TO_BUYER".parse::<ProcessorFeeTreatment>().unwrap(),
            ProcessorFeeTreatment::PassedToBuyer
        );
        assert!("split".parse::<ProcessorFeeTreatment>().is_err());
    }

    #[test]
    fn test_policy_caps_refund() {
        let order = OrderBreakdown {
            ticket_price_cents: 10_000,
            platform_fee_cents: 689,
            processor_fee_cents: 340,
            buyer_total_cents: 10_689,
        };
        let half = RefundPolicy {
            refund_percentage: 50,
            ..RefundPolicy::default()
        };
        assert_eq!(half.max_refund_cents(&order, 0), 5_345);
        assert_eq!(half.max_refund_cents(&order, 5_000), 345);
        assert_eq!(half.max_refund_cents(&order, 6_000), 0);
        assert_eq!(RefundPolicy::default().max_refund_cents(&order, 0), 10_689);
    }
}
