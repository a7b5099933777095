//! Position matcher: consumes one normalized execution against the
//! open state of its bucket.
//!
//! A bucket (account, trade day, instrument, class) holds at most one
//! open leg at a time. Same-side submissions merge into it at the
//! volume-weighted average price; opposite-side submissions match
//! greedily at the minimum quantity, splitting fee inputs
//! proportionally, and any residual stays (or becomes) the bucket's
//! open leg.

use uuid::Uuid;

use crate::domain::{Decimal, ExecutionLeg, LegSide, Side};
use crate::error::{CoreError, CoreResult};

use super::{CompletedMatch, MatchOutcome};

/// Apply one incoming open leg to the bucket's current open leg.
///
/// Pure function: exact decimal arithmetic, no leg with quantity <= 0
/// is ever produced. Completed legs in the outcome still carry zero
/// charges/PnL; [`super::finalize_completed`] stamps those before
/// persistence.
///
/// # Errors
/// `CoreError::Conflict` if either leg is not genuinely open, or the
/// two legs belong to different buckets.
pub fn match_execution(
    open: Option<ExecutionLeg>,
    incoming: ExecutionLeg,
) -> CoreResult<MatchOutcome> {
    let incoming_side = require_open(&incoming)?;

    let open_leg = match open {
        None => {
            return Ok(MatchOutcome {
                new_open: Some(incoming),
                ..Default::default()
            })
        }
        Some(leg) => leg,
    };

    let open_side = require_open(&open_leg)?;
    if open_leg.bucket_key() != incoming.bucket_key() {
        return Err(CoreError::Conflict(format!(
            "legs {} and {} belong to different buckets",
            open_leg.id, incoming.id
        )));
    }

    if open_side == incoming_side {
        Ok(merge_same_side(open_leg, incoming))
    } else {
        Ok(match_opposite(open_leg, open_side, incoming))
    }
}

fn require_open(leg: &ExecutionLeg) -> CoreResult<Side> {
    if !leg.is_open {
        return Err(CoreError::Conflict(format!("leg {} is not open", leg.id)));
    }
    leg.side
        .trade_side()
        .ok_or_else(|| CoreError::Conflict(format!("leg {} is completed, not open", leg.id)))
}

/// Merge a same-side submission into the existing open leg at the
/// volume-weighted average price. No completed leg is produced.
fn merge_same_side(mut open: ExecutionLeg, incoming: ExecutionLeg) -> MatchOutcome {
    let old_qty = open.quantity;
    let new_qty = incoming.quantity;
    let total_qty = old_qty + new_qty;

    let vwap = (open.open_price() * old_qty + incoming.open_price() * new_qty) / total_qty;
    match open.side {
        LegSide::Buy => open.entry_price = Some(vwap),
        LegSide::Sell => open.exit_price = Some(vwap),
        LegSide::Completed => unreachable!("merge operates on open legs"),
    }

    open.quantity = total_qty;
    open.fees = open.fees.plus(incoming.fees);

    MatchOutcome {
        updated_open: Some(open),
        ..Default::default()
    }
}

/// Greedy opposite-side match at the minimum of the two quantities.
fn match_opposite(mut open: ExecutionLeg, open_side: Side, mut incoming: ExecutionLeg) -> MatchOutcome {
    let matched_qty = open.quantity.min(incoming.quantity);

    let open_share = open.fees.share(matched_qty, open.quantity);
    let incoming_share = incoming.fees.share(matched_qty, incoming.quantity);

    let (entry_price, exit_price, buy_fees, sell_fees) = match open_side {
        Side::Buy => (
            open.open_price(),
            incoming.open_price(),
            open_share,
            incoming_share,
        ),
        Side::Sell => (
            incoming.open_price(),
            open.open_price(),
            incoming_share,
            open_share,
        ),
    };

    let completed = ExecutionLeg {
        id: Uuid::new_v4(),
        account: open.account.clone(),
        instrument: open.instrument.clone(),
        class: open.class,
        trade_day: open.trade_day,
        side: LegSide::Completed,
        quantity: matched_qty,
        entry_price: Some(entry_price),
        exit_price: Some(exit_price),
        fees: buy_fees.plus(sell_fees),
        is_open: false,
        gross_pnl: Decimal::zero(),
        net_pnl: Decimal::zero(),
        total_charges: Decimal::zero(),
        counterparty_ref: Some(open.id),
    };

    let mut outcome = MatchOutcome {
        completed: vec![CompletedMatch {
            leg: completed,
            buy_fees,
            sell_fees,
        }],
        ..Default::default()
    };

    // Residual fees by subtraction so the two parts reconcile exactly
    // to the undivided amount.
    let open_remaining = open.quantity - matched_qty;
    if open_remaining.is_zero() {
        outcome.deleted_open = Some(open.id);
    } else {
        open.quantity = open_remaining;
        open.fees = open.fees.minus(open_share);
        outcome.updated_open = Some(open);
    }

    let incoming_remaining = incoming.quantity - matched_qty;
    if incoming_remaining.is_positive() {
        incoming.quantity = incoming_remaining;
        incoming.fees = incoming.fees.minus(incoming_share);
        outcome.new_open = Some(incoming);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, FeeInputs, InstrumentClass, InstrumentId};
    use chrono::NaiveDate;

    fn leg(side: Side, qty: i64, price: &str, brokerage: i64) -> ExecutionLeg {
        ExecutionLeg::open(
            AccountId::new("acct-1"),
            InstrumentId::new("RELIANCE"),
            InstrumentClass::Delivery,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            side,
            Decimal::from(qty),
            Decimal::from_str_canonical(price).unwrap(),
            FeeInputs::new(Decimal::zero(), Decimal::from(brokerage)),
        )
    }

    #[test]
    fn test_empty_bucket_keeps_incoming_open() {
        let incoming = leg(Side::Buy, 100, "10", 0);
        let id = incoming.id;
        let outcome = match_execution(None, incoming).unwrap();

        assert!(outcome.completed.is_empty());
        assert_eq!(outcome.new_open.as_ref().map(|l| l.id), Some(id));
        assert!(outcome.updated_open.is_none());
        assert!(outcome.deleted_open.is_none());
    }

    #[test]
    fn test_same_side_vwap_merge() {
        let open = leg(Side::Buy, 100, "10", 20);
        let open_id = open.id;
        let incoming = leg(Side::Buy, 50, "13", 10);
        let outcome = match_execution(Some(open), incoming).unwrap();

        assert!(outcome.completed.is_empty());
        let merged = outcome.updated_open.expect("merged leg");
        assert_eq!(merged.id, open_id, "merge keeps the existing leg's id");
        assert_eq!(merged.quantity, Decimal::from(150));
        // (100*10 + 50*13) / 150 = 11
        assert_eq!(merged.entry_price, Some(Decimal::from(11)));
        assert_eq!(merged.fees.brokerage, Decimal::from(30));
    }

    #[test]
    fn test_exact_match_produces_single_completed_leg() {
        let open = leg(Side::Buy, 100, "10", 0);
        let open_id = open.id;
        let incoming = leg(Side::Sell, 100, "12", 0);
        let outcome = match_execution(Some(open), incoming).unwrap();

        assert_eq!(outcome.completed.len(), 1);
        let completed = &outcome.completed[0].leg;
        assert_eq!(completed.side, LegSide::Completed);
        assert_eq!(completed.quantity, Decimal::from(100));
        assert_eq!(completed.entry_price, Some(Decimal::from(10)));
        assert_eq!(completed.exit_price, Some(Decimal::from(12)));
        assert_eq!(completed.counterparty_ref, Some(open_id));
        assert!(!completed.is_open);

        assert_eq!(outcome.deleted_open, Some(open_id));
        assert!(outcome.updated_open.is_none());
        assert!(outcome.new_open.is_none());
    }

    #[test]
    fn test_partial_fill_leaves_residual_open_buy() {
        let open = leg(Side::Buy, 150, "10", 0);
        let incoming = leg(Side::Sell, 100, "12", 0);
        let outcome = match_execution(Some(open), incoming).unwrap();

        assert_eq!(outcome.completed[0].leg.quantity, Decimal::from(100));
        let residual = outcome.updated_open.expect("residual open buy");
        assert_eq!(residual.side, LegSide::Buy);
        assert_eq!(residual.quantity, Decimal::from(50));
        assert_eq!(residual.entry_price, Some(Decimal::from(10)));
        assert!(outcome.new_open.is_none());
        assert!(outcome.deleted_open.is_none());
    }

    #[test]
    fn test_oversized_incoming_becomes_new_open() {
        let open = leg(Side::Buy, 100, "10", 0);
        let open_id = open.id;
        let incoming = leg(Side::Sell, 160, "12", 0);
        let outcome = match_execution(Some(open), incoming).unwrap();

        assert_eq!(outcome.completed[0].leg.quantity, Decimal::from(100));
        assert_eq!(outcome.deleted_open, Some(open_id));
        let residual = outcome.new_open.expect("residual open sell");
        assert_eq!(residual.side, LegSide::Sell);
        assert_eq!(residual.quantity, Decimal::from(60));
        assert_eq!(residual.exit_price, Some(Decimal::from(12)));
    }

    #[test]
    fn test_sell_first_then_buy_orients_prices() {
        let open = leg(Side::Sell, 100, "12", 0);
        let incoming = leg(Side::Buy, 100, "10", 0);
        let outcome = match_execution(Some(open), incoming).unwrap();

        let completed = &outcome.completed[0].leg;
        assert_eq!(completed.entry_price, Some(Decimal::from(10)));
        assert_eq!(completed.exit_price, Some(Decimal::from(12)));
    }

    #[test]
    fn test_fee_allocation_across_two_fills() {
        // Open buy qty=100 brokerage=30, matched 60 then 40: shares 18 and 12.
        let open = leg(Side::Buy, 100, "10", 30);
        let first = leg(Side::Sell, 60, "12", 0);
        let outcome = match_execution(Some(open), first).unwrap();

        assert_eq!(outcome.completed[0].buy_fees.brokerage, Decimal::from(18));
        let residual = outcome.updated_open.expect("residual after first fill");
        assert_eq!(residual.fees.brokerage, Decimal::from(12));

        let second = leg(Side::Sell, 40, "12", 0);
        let outcome = match_execution(Some(residual), second).unwrap();
        assert_eq!(outcome.completed[0].buy_fees.brokerage, Decimal::from(12));
        assert!(outcome.updated_open.is_none());
    }

    #[test]
    fn test_completed_leg_sums_both_sides_fees() {
        let open = leg(Side::Buy, 100, "10", 30);
        let incoming = leg(Side::Sell, 100, "12", 20);
        let outcome = match_execution(Some(open), incoming).unwrap();

        let m = &outcome.completed[0];
        assert_eq!(m.buy_fees.brokerage, Decimal::from(30));
        assert_eq!(m.sell_fees.brokerage, Decimal::from(20));
        assert_eq!(m.leg.fees.brokerage, Decimal::from(50));
    }

    #[test]
    fn test_quantity_conservation() {
        // Across a sequence of submissions, open + completed quantities
        // track submitted quantities exactly.
        let submissions = vec![
            leg(Side::Buy, 150, "10", 0),
            leg(Side::Sell, 100, "12", 0),
            leg(Side::Sell, 80, "11", 0),
            leg(Side::Buy, 30, "9", 0),
        ];

        let mut buys = Decimal::zero();
        let mut sells = Decimal::zero();
        let mut completed_total = Decimal::zero();
        let mut open: Option<ExecutionLeg> = None;

        for submission in submissions {
            match submission.side {
                LegSide::Buy => buys = buys + submission.quantity,
                LegSide::Sell => sells = sells + submission.quantity,
                LegSide::Completed => unreachable!(),
            }
            let outcome = match_execution(open.take(), submission).unwrap();
            for m in &outcome.completed {
                completed_total = completed_total + m.leg.quantity;
            }
            open = outcome.resulting_open().cloned();
        }

        // Each completed unit consumes one buy and one sell unit.
        let open_qty = open.map(|l| l.quantity).unwrap_or_else(Decimal::zero);
        assert_eq!(
            completed_total + completed_total + open_qty,
            buys + sells,
            "matched and open quantities must account for every submission"
        );
    }

    #[test]
    fn test_rejects_non_open_target() {
        let mut open = leg(Side::Buy, 100, "10", 0);
        open.is_open = false;
        let incoming = leg(Side::Sell, 100, "12", 0);
        assert!(matches!(
            match_execution(Some(open), incoming),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_rejects_cross_bucket_match() {
        let open = leg(Side::Buy, 100, "10", 0);
        let mut incoming = leg(Side::Sell, 100, "12", 0);
        incoming.instrument = InstrumentId::new("TCS");
        assert!(matches!(
            match_execution(Some(open), incoming),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_no_zero_quantity_legs_emitted() {
        let open = leg(Side::Buy, 100, "10", 0);
        let incoming = leg(Side::Sell, 100, "12", 0);
        let outcome = match_execution(Some(open), incoming).unwrap();

        for m in &outcome.completed {
            assert!(m.leg.quantity.is_positive());
        }
        assert!(outcome.updated_open.is_none());
        assert!(outcome.new_open.is_none());
    }

    #[test]
    fn test_fractional_quantities_match_exactly() {
        let mut open = leg(Side::Buy, 1, "10", 0);
        open.quantity = Decimal::from_str_canonical("1.5").unwrap();
        let mut incoming = leg(Side::Sell, 1, "12", 0);
        incoming.quantity = Decimal::from_str_canonical("0.9").unwrap();

        let outcome = match_execution(Some(open), incoming).unwrap();
        assert_eq!(
            outcome.completed[0].leg.quantity,
            Decimal::from_str_canonical("0.9").unwrap()
        );
        assert_eq!(
            outcome.updated_open.unwrap().quantity,
            Decimal::from_str_canonical("0.6").unwrap()
        );
    }
}
