//! Charge calculator: itemized regulatory and brokerage charges for
//! one side of a trade.
//!
//! Referentially transparent: the same inputs against the same rate
//! table version always produce bit-identical output. No clock, no
//! hidden state.

use serde::{Deserialize, Serialize};

use crate::domain::{ChargeRateTable, Decimal, InstrumentClass, Side};

/// Itemized charges for one side of a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub transaction_tax: Decimal,
    pub transaction_fee: Decimal,
    pub turnover_fee: Decimal,
    pub stamp_duty: Decimal,
    pub fee_tax: Decimal,
    pub depository_fee: Decimal,
    pub brokerage: Decimal,
    /// Sum of every component above, brokerage included.
    pub total: Decimal,
}

/// Compute the charge breakdown for one side of a trade.
pub fn compute_charges(
    class: InstrumentClass,
    side: Side,
    price: Decimal,
    quantity: Decimal,
    brokerage: Decimal,
    rates: &ChargeRateTable,
) -> ChargeBreakdown {
    let notional = price * quantity;

    let transaction_tax = rates.transaction_tax_rate(class, side) * notional;
    let transaction_fee = rates.transaction_fee_rate(class) * notional;
    let turnover_fee = rates.turnover_fee * notional;
    let stamp_duty = rates.stamp_rate(class, side) * notional;
    let fee_tax = rates.fee_tax * (brokerage + transaction_fee + turnover_fee);
    let depository_fee = if class == InstrumentClass::Delivery && side == Side::Sell {
        rates.depository_fee
    } else {
        Decimal::zero()
    };

    let total = transaction_tax
        + transaction_fee
        + turnover_fee
        + stamp_duty
        + fee_tax
        + depository_fee
        + brokerage;

    ChargeBreakdown {
        transaction_tax,
        transaction_fee,
        turnover_fee,
        stamp_duty,
        fee_tax,
        depository_fee,
        brokerage,
        total,
    }
}
