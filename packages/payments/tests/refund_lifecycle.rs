use chrono::{TimeDelta, TimeZone, Utc};
use tickets_payments::{
    FeeCalculator, FeeSchedule, OrderBreakdown, RefundCalculator, RefundError, RefundPolicy,
    RefundReason, RefundRequest, RefundStatus, ensure_refund_eligible_at,
};

/// Refund `price` in `amounts` through the request lifecycle, then check the
/// order was returned component by component and nothing more can be taken.
fn drain_order(schedule: FeeSchedule, price: i64, amounts: &[i64]) -> OrderBreakdown {
    let refunds = RefundCalculator::new(schedule);
    let order = refunds.calculate_order_breakdown(price);

    let mut already_refunded = 0;
    let mut organizer_clawback = 0;
    let mut platform_returned = 0;

    for &amount in amounts {
        let mut request = RefundRequest::new(
            "ord_multi",
            amount,
            RefundReason::RequestedByCustomer,
            already_refunded,
        );
        let breakdown = request.validate(&order).expect("amount fits balance");
        assert_eq!(breakdown.total_refund_cents, amount);
        request.mark_succeeded().expect("validated request");

        organizer_clawback += breakdown.organizer_impact_cents;
        platform_returned += breakdown.platform_fee_refund_cents;
        already_refunded = request.refunded_total_after();
        assert!(organizer_clawback <= order.ticket_price_cents);
    }

    assert!(order.is_fully_refunded(already_refunded));
    assert_eq!(organizer_clawback, order.ticket_price_cents);
    assert_eq!(platform_returned, order.platform_fee_cents);

    let mut extra = RefundRequest::new("ord_multi", 1, RefundReason::Duplicate, already_refunded);
    assert_eq!(
        extra.validate(&order),
        Err(RefundError::ExceedsRefundable {
            requested: 1,
            max_refundable: 0
        })
    );
    assert_eq!(extra.status, RefundStatus::Pending);

    order
}

#[test]
fn partial_refunds_until_order_is_drained() {
    let order = drain_order(FeeSchedule::ticketing(), 10_000, &[2_500, 4_000, 4_189]);
    assert_eq!(order.buyer_total_cents, 10_689);

    // Every step rounds the platform share
    drain_order(FeeSchedule::ticketing(), 1_000, &[333, 333, 333, 159]);
}

#[test]
fn partial_refunds_with_processor_fee_passed_to_buyer() {
    let order = drain_order(FeeSchedule::payment_intent(), 10_000, &[2_500, 4_000, 3_800]);
    assert_eq!(order.buyer_total_cents, 10_629);
    assert_eq!(order.refundable_total_cents(), 10_300);

    drain_order(FeeSchedule::payment_intent(), 10_000, &[10_000, 300]);
    drain_order(FeeSchedule::payment_intent(), 2_999, &[1, 1_000, 1_000, 1_088]);
}

#[test]
fn passed_through_processor_fee_cannot_be_refunded() {
    let refunds = RefundCalculator::new(FeeSchedule::payment_intent());
    let order = refunds.calculate_order_breakdown(10_000);

    let mut request = RefundRequest::new("ord_pi", 10_500, RefundReason::EventCancelled, 0);
    assert_eq!(
        request.validate(&order),
        Err(RefundError::ExceedsRefundable {
            requested: 10_500,
            max_refundable: 10_300
        })
    );

    let mut request = RefundRequest::new(
        "ord_pi",
        order.buyer_total_cents,
        RefundReason::EventCancelled,
        0,
    );
    assert!(request.validate(&order).is_err());
}

#[test]
fn policy_percentage_limits_the_refund() {
    let refunds = RefundCalculator::default();
    let order = refunds.calculate_order_breakdown(4_000);
    let policy = RefundPolicy {
        deadline_hours: 48,
        refund_percentage: 50,
        no_refund_after: None,
    };

    let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
    let event_start = now + TimeDelta::days(5);
    let percentage = ensure_refund_eligible_at(event_start, &policy, now).unwrap();
    assert_eq!(percentage, 50);

    let cap = policy.max_refund_cents(&order, 0);
    assert!(refunds.validate_refund_amount(&order, cap, 0).is_ok());

    let breakdown = refunds.calculate_refund_breakdown(&order, cap, false);
    assert_eq!(breakdown.total_refund_cents, cap);
    assert!(breakdown.ticket_refund_cents < order.ticket_price_cents);

    assert_eq!(
        ensure_refund_eligible_at(event_start, &policy, event_start - TimeDelta::hours(47)),
        Err(RefundError::PastDeadline { deadline_hours: 48 })
    );
}

#[test]
fn checkout_and_refund_agree_on_platform_fee() {
    let schedule = FeeSchedule::ticketing();
    let fees = FeeCalculator::new(schedule.clone());
    let refunds = RefundCalculator::new(schedule);

    for price in [50, 1_500, 2_999, 10_000, 75_000] {
        let order = refunds.calculate_order_breakdown(price);
        let checkout = fees.calculate_fees(price);
        assert_eq!(order.platform_fee_cents, checkout.platform_fee_cents);
        assert!(fees.validate_charge_amount(order.buyer_total_cents).is_ok());

        let full = refunds.calculate_refund_breakdown(&order, order.buyer_total_cents, true);
        assert_eq!(full.ticket_refund_cents, order.ticket_price_cents);
        assert_eq!(full.platform_fee_refund_cents, order.platform_fee_cents);
    }
}
