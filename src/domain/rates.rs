//! Versioned charge rate table.
//!
//! Exactly one currently-effective version exists at any time. The
//! matcher never mutates it; rates are read at calculation time through
//! an injected accessor and new versions apply only to subsequent
//! calculations.

use serde::{Deserialize, Serialize};

use crate::domain::{Decimal, InstrumentClass, Side};

/// Named fee coefficients for charge calculation.
///
/// Rates are fractions of notional (price × quantity) unless noted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRateTable {
    pub version: i64,
    /// Transaction tax on delivery trades, both sides.
    pub transaction_tax_delivery: Decimal,
    /// Transaction tax on intraday sells.
    pub transaction_tax_intraday_sell: Decimal,
    /// Transaction tax on futures sells.
    pub transaction_tax_futures_sell: Decimal,
    /// Transaction tax on options sells.
    pub transaction_tax_options_sell: Decimal,
    /// Exchange transaction fee for cash equity (delivery and intraday).
    pub transaction_fee_equity: Decimal,
    pub transaction_fee_futures: Decimal,
    pub transaction_fee_options: Decimal,
    /// Regulator turnover fee, all classes and sides.
    pub turnover_fee: Decimal,
    /// Stamp duty rates, buy side only.
    pub stamp_delivery_buy: Decimal,
    pub stamp_intraday_buy: Decimal,
    pub stamp_futures_buy: Decimal,
    pub stamp_options_buy: Decimal,
    /// Proportional tax on (brokerage + transaction fee + turnover fee).
    pub fee_tax: Decimal,
    /// Flat depository fee, delivery sells only. An amount, not a rate.
    pub depository_fee: Decimal,
}

impl ChargeRateTable {
    /// Transaction-tax rate for a (class, side) pair.
    pub fn transaction_tax_rate(&self, class: InstrumentClass, side: Side) -> Decimal {
        match (class, side) {
            (InstrumentClass::Delivery, _) => self.transaction_tax_delivery,
            (InstrumentClass::Intraday, Side::Sell) => self.transaction_tax_intraday_sell,
            (InstrumentClass::Futures, Side::Sell) => self.transaction_tax_futures_sell,
            (InstrumentClass::Options, Side::Sell) => self.transaction_tax_options_sell,
            _ => Decimal::zero(),
        }
    }

    /// Exchange transaction-fee rate for a class.
    pub fn transaction_fee_rate(&self, class: InstrumentClass) -> Decimal {
        match class {
            InstrumentClass::Delivery | InstrumentClass::Intraday => self.transaction_fee_equity,
            InstrumentClass::Futures => self.transaction_fee_futures,
            InstrumentClass::Options => self.transaction_fee_options,
        }
    }

    /// Stamp-duty rate; zero on the sell side.
    pub fn stamp_rate(&self, class: InstrumentClass, side: Side) -> Decimal {
        if side != Side::Buy {
            return Decimal::zero();
        }
        match class {
            InstrumentClass::Delivery => self.stamp_delivery_buy,
            InstrumentClass::Intraday => self.stamp_intraday_buy,
            InstrumentClass::Futures => self.stamp_futures_buy,
            InstrumentClass::Options => self.stamp_options_buy,
        }
    }
}

fn rate(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).expect("default rate literal is valid")
}

impl Default for ChargeRateTable {
    /// Documented default coefficients used by the one-time bootstrap.
    fn default() -> Self {
        ChargeRateTable {
            version: 1,
            transaction_tax_delivery: rate("0.001"),
            transaction_tax_intraday_sell: rate("0.00025"),
            transaction_tax_futures_sell: rate("0.0001"),
            transaction_tax_options_sell: rate("0.0005"),
            transaction_fee_equity: rate("0.0000345"),
            transaction_fee_futures: rate("0.00002"),
            transaction_fee_options: rate("0.00035"),
            turnover_fee: rate("0.000001"),
            stamp_delivery_buy: rate("0.00015"),
            stamp_intraday_buy: rate("0.00003"),
            stamp_futures_buy: rate("0.00002"),
            stamp_options_buy: rate("0.00003"),
            fee_tax: rate("0.18"),
            depository_fee: rate("13.5"),
        }
    }
}
