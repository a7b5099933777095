//! Execution leg: one matched or unmatched slice of trading activity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, Decimal, InstrumentClass, InstrumentId, LegSide, Side};

/// Caller-supplied fee inputs attached to a leg.
///
/// Both components split proportionally to quantity when a leg is
/// partially matched, and sum when legs merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInputs {
    /// Exchange-levied fee as reported by the caller. Recorded and
    /// split like brokerage, but not part of computed total charges.
    pub exchange_fee: Decimal,
    /// Brokerage paid to the broker; enters total charges directly.
    pub brokerage: Decimal,
}

impl FeeInputs {
    pub fn new(exchange_fee: Decimal, brokerage: Decimal) -> Self {
        Self {
            exchange_fee,
            brokerage,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// The share of these inputs attributable to `part` out of `whole`.
    ///
    /// Callers computing a residual should subtract the share from the
    /// original rather than re-scaling, so the two parts reconcile to
    /// the undivided amount exactly.
    pub fn share(&self, part: Decimal, whole: Decimal) -> FeeInputs {
        FeeInputs {
            exchange_fee: self.exchange_fee * part / whole,
            brokerage: self.brokerage * part / whole,
        }
    }

    pub fn minus(&self, other: FeeInputs) -> FeeInputs {
        FeeInputs {
            exchange_fee: self.exchange_fee - other.exchange_fee,
            brokerage: self.brokerage - other.brokerage,
        }
    }

    pub fn plus(&self, other: FeeInputs) -> FeeInputs {
        FeeInputs {
            exchange_fee: self.exchange_fee + other.exchange_fee,
            brokerage: self.brokerage + other.brokerage,
        }
    }
}

/// Grouping key within which matching occurs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub account: AccountId,
    pub trade_day: NaiveDate,
    pub instrument: InstrumentId,
    pub class: InstrumentClass,
}

/// One execution or matched position record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLeg {
    pub id: Uuid,
    pub account: AccountId,
    pub instrument: InstrumentId,
    pub class: InstrumentClass,
    /// Calendar day at the configured fixed timezone boundary.
    pub trade_day: NaiveDate,
    pub side: LegSide,
    /// Positive quantity; enforced at creation and after every split.
    pub quantity: Decimal,
    /// Present when side is Buy or Completed.
    pub entry_price: Option<Decimal>,
    /// Present when side is Sell or Completed.
    pub exit_price: Option<Decimal>,
    pub fees: FeeInputs,
    /// True until the leg is fully consumed by matching or deleted.
    pub is_open: bool,
    /// Zero unless side is Completed.
    pub gross_pnl: Decimal,
    /// Zero unless side is Completed.
    pub net_pnl: Decimal,
    /// Itemized charge total behind `net_pnl`; zero unless Completed.
    pub total_charges: Decimal,
    /// Open leg this completion consumed, for lookup only.
    pub counterparty_ref: Option<Uuid>,
}

impl ExecutionLeg {
    /// Create a fresh open leg for a validated submission.
    pub fn open(
        account: AccountId,
        instrument: InstrumentId,
        class: InstrumentClass,
        trade_day: NaiveDate,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        fees: FeeInputs,
    ) -> Self {
        let (entry_price, exit_price) = match side {
            Side::Buy => (Some(price), None),
            Side::Sell => (None, Some(price)),
        };
        ExecutionLeg {
            id: Uuid::new_v4(),
            account,
            instrument,
            class,
            trade_day,
            side: side.into(),
            quantity,
            entry_price,
            exit_price,
            fees,
            is_open: true,
            gross_pnl: Decimal::zero(),
            net_pnl: Decimal::zero(),
            total_charges: Decimal::zero(),
            counterparty_ref: None,
        }
    }

    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            account: self.account.clone(),
            trade_day: self.trade_day,
            instrument: self.instrument.clone(),
            class: self.class,
        }
    }

    /// The price on an open leg's supplied side.
    ///
    /// # Panics
    /// Panics if called on a completed leg; open legs always carry
    /// exactly one price.
    pub fn open_price(&self) -> Decimal {
        match self.side {
            LegSide::Buy => self.entry_price.expect("buy leg carries an entry price"),
            LegSide::Sell => self.exit_price.expect("sell leg carries an exit price"),
            LegSide::Completed => panic!("completed leg has no single open price"),
        }
    }
}
