//! Realized P&L and the pre-persist finalization step for completed
//! legs.

use crate::domain::{ChargeRateTable, Decimal, ExecutionLeg, Side};

use super::{charges::compute_charges, CompletedMatch};

/// Gross realized P&L: (exit − entry) × quantity when both prices are
/// present, zero otherwise. Open legs always yield zero.
pub fn gross_pnl(leg: &ExecutionLeg) -> Decimal {
    match (leg.entry_price, leg.exit_price) {
        (Some(entry), Some(exit)) => (exit - entry) * leg.quantity,
        _ => Decimal::zero(),
    }
}

/// Stamp charges and realized P&L onto a completed match.
///
/// This is the explicit calculation step the service invokes
/// immediately before persisting a completed leg: each side is charged
/// at its own price with its own proportional brokerage share, and
/// net P&L is gross minus the combined total.
pub fn finalize_completed(matched: &mut CompletedMatch, rates: &ChargeRateTable) {
    let leg = &mut matched.leg;
    let entry = leg.entry_price.expect("completed leg carries entry price");
    let exit = leg.exit_price.expect("completed leg carries exit price");

    let buy_side = compute_charges(
        leg.class,
        Side::Buy,
        entry,
        leg.quantity,
        matched.buy_fees.brokerage,
        rates,
    );
    let sell_side = compute_charges(
        leg.class,
        Side::Sell,
        exit,
        leg.quantity,
        matched.sell_fees.brokerage,
        rates,
    );

    leg.total_charges = buy_side.total + sell_side.total;
    leg.gross_pnl = (exit - entry) * leg.quantity;
    leg.net_pnl = leg.gross_pnl - leg.total_charges;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountId, FeeInputs, InstrumentClass, InstrumentId, LegSide,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn completed(entry: i64, exit: i64, qty: i64) -> CompletedMatch {
        CompletedMatch {
            leg: ExecutionLeg {
                id: Uuid::new_v4(),
                account: AccountId::new("acct-1"),
                instrument: InstrumentId::new("NIFTY24APRFUT"),
                class: InstrumentClass::Futures,
                trade_day: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                side: LegSide::Completed,
                quantity: Decimal::from(qty),
                entry_price: Some(Decimal::from(entry)),
                exit_price: Some(Decimal::from(exit)),
                fees: FeeInputs::zero(),
                is_open: false,
                gross_pnl: Decimal::zero(),
                net_pnl: Decimal::zero(),
                total_charges: Decimal::zero(),
                counterparty_ref: None,
            },
            buy_fees: FeeInputs::zero(),
            sell_fees: FeeInputs::zero(),
        }
    }

    #[test]
    fn test_gross_pnl_requires_both_prices() {
        let m = completed(10, 12, 100);
        assert_eq!(gross_pnl(&m.leg), Decimal::from(200));

        let mut open = m.leg.clone();
        open.exit_price = None;
        assert!(gross_pnl(&open).is_zero());
    }

    #[test]
    fn test_gross_pnl_can_be_negative() {
        let m = completed(12, 10, 50);
        assert_eq!(gross_pnl(&m.leg), Decimal::from(-100));
    }

    #[test]
    fn test_finalize_stamps_charges_and_pnl() {
        let mut m = completed(10, 12, 100);
        m.buy_fees.brokerage = Decimal::from(15);
        m.sell_fees.brokerage = Decimal::from(15);
        let rates = ChargeRateTable::default();

        finalize_completed(&mut m, &rates);

        assert_eq!(m.leg.gross_pnl, Decimal::from(200));
        assert!(m.leg.total_charges.is_positive());
        assert_eq!(m.leg.net_pnl, m.leg.gross_pnl - m.leg.total_charges);

        // Cross-check against the calculator directly.
        let buy = compute_charges(
            InstrumentClass::Futures,
            Side::Buy,
            Decimal::from(10),
            Decimal::from(100),
            Decimal::from(15),
            &rates,
        );
        let sell = compute_charges(
            InstrumentClass::Futures,
            Side::Sell,
            Decimal::from(12),
            Decimal::from(100),
            Decimal::from(15),
            &rates,
        );
        assert_eq!(m.leg.total_charges, buy.total + sell.total);
    }

    #[test]
    fn test_finalize_is_deterministic() {
        let rates = ChargeRateTable::default();
        let mut a = completed(10, 12, 100);
        let mut b = a.clone();
        finalize_completed(&mut a, &rates);
        finalize_completed(&mut b, &rates);
        assert_eq!(a.leg.net_pnl, b.leg.net_pnl);
        assert_eq!(a.leg.total_charges, b.leg.total_charges);
    }
}
