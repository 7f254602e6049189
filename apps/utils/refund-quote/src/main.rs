use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde::Serialize;
use tickets_payments::{
    FeeCalculator, FeeSchedule, OrderBreakdown, RefundBreakdown, RefundCalculator, RefundPolicy,
    RefundValidation, check_refund_eligibility_at, money::format_cents,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "refund-quote", about = "Quote ticket fees and refunds")]
struct Cli {
    /// Fee schedule to quote with
    #[arg(long, value_enum, default_value_t = ScheduleSource::Env, global = true)]
    schedule: ScheduleSource,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScheduleSource {
    /// 5.9% + $0.99, processor fee absorbed
    Ticketing,
    /// 3% platform fee, processor fee paid by the buyer
    PaymentIntent,
    /// PLATFORM_FEE_RATE and friends, defaults to ticketing
    Env,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Platform fee, processor fee and organizer payout for a gross amount
    Fees {
        #[arg(long, allow_hyphen_values = true)]
        gross: i64,
    },
    /// What a buyer pays for a ticket
    Order {
        #[arg(long, allow_hyphen_values = true)]
        price: i64,
    },
    /// Validate and split a refund against a ticket order
    Refund {
        #[arg(long, allow_hyphen_values = true)]
        price: i64,
        #[arg(long, allow_hyphen_values = true)]
        amount: i64,
        /// Already refunded on this order
        #[arg(
            long,
            default_value_t = 0,
            allow_hyphen_values = true,
            value_parser = clap::value_parser!(i64).range(0..)
        )]
        already: i64,
        #[arg(long)]
        full: bool,
    },
    /// Whether an event is still inside its refund window
    Eligibility {
        /// Event start, RFC 3339
        #[arg(long)]
        event: DateTime<Utc>,
        #[arg(long)]
        deadline_hours: Option<i64>,
        #[arg(long)]
        percentage: Option<u8>,
        #[arg(long)]
        no_refund_after: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundQuote {
    order: OrderBreakdown,
    validation: RefundValidation,
    breakdown: RefundBreakdown,
    summary: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let schedule = load_schedule(cli.schedule)?;
    tracing::debug!(?schedule, "Using fee schedule");

    let output = run(cli.command, schedule)?;
    println!("{}", output);
    Ok(())
}

fn load_schedule(source: ScheduleSource) -> Result<FeeSchedule, Box<dyn std::error::Error>> {
    Ok(match source {
        ScheduleSource::Ticketing => FeeSchedule::ticketing(),
        ScheduleSource::PaymentIntent => FeeSchedule::payment_intent(),
        ScheduleSource::Env => FeeSchedule::from_env()?,
    })
}

fn run(command: Command, schedule: FeeSchedule) -> Result<String, Box<dyn std::error::Error>> {
    let json = match command {
        Command::Fees { gross } => {
            let fees = FeeCalculator::new(schedule);
            fees.validate_charge_amount(gross)?;
            serde_json::to_string_pretty(&fees.calculate_fees(gross))?
        }
        Command::Order { price } => {
            let order = RefundCalculator::new(schedule).calculate_order_breakdown(price);
            serde_json::to_string_pretty(&order)?
        }
        Command::Refund {
            price,
            amount,
            already,
            full,
        } => {
            let refunds = RefundCalculator::new(schedule);
            let order = refunds.calculate_order_breakdown(price);
            let validation = refunds.validate_refund_amount(&order, amount, already)?;
            let breakdown = if full && already == 0 {
                refunds.calculate_refund_breakdown(&order, amount, true)
            } else {
                refunds.calculate_refund_breakdown_after(&order, amount, already)
            };
            let summary = format!(
                "Refund {} of {}: {} ticket, {} platform fee",
                format_cents(breakdown.total_refund_cents),
                format_cents(order.buyer_total_cents),
                format_cents(breakdown.ticket_refund_cents),
                format_cents(breakdown.platform_fee_refund_cents),
            );
            serde_json::to_string_pretty(&RefundQuote {
                order,
                validation,
                breakdown,
                summary,
            })?
        }
        Command::Eligibility {
            event,
            deadline_hours,
            percentage,
            no_refund_after,
        } => {
            let mut policy = RefundPolicy::from_env()?;
            if let Some(hours) = deadline_hours {
                policy.deadline_hours = hours;
            }
            if let Some(percentage) = percentage {
                policy.refund_percentage = percentage;
            }
            if no_refund_after.is_some() {
                policy.no_refund_after = no_refund_after;
            }
            policy.validate()?;

            let eligibility = check_refund_eligibility_at(event, &policy, Utc::now());
            serde_json::to_string_pretty(&eligibility)?
        }
    };
    Ok(json)
}
