//! Execution intake: validates and normalizes raw submissions before
//! they reach the matcher.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountId, Decimal, ExecutionLeg, FeeInputs, InstrumentClass, InstrumentId, Side,
};
use crate::error::{CoreError, CoreResult};

/// Raw caller input for one execution.
///
/// The side is not stated explicitly: supplying `entry_price` makes it
/// a buy, supplying `exit_price` makes it a sell. Supplying both or
/// neither is a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExecution {
    pub instrument: String,
    pub class: InstrumentClass,
    pub quantity: Decimal,
    pub executed_at: DateTime<Utc>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub exchange_fee: Decimal,
    #[serde(default)]
    pub brokerage: Decimal,
}

/// Calendar day of `at` under the fixed bucketing offset.
pub fn trade_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Validate a raw submission and produce a fresh open leg.
///
/// Pure: no persistence, no clock reads; monetary values pass through
/// unaltered.
///
/// # Errors
/// `CoreError::Validation` on any malformed field; nothing is partially
/// applied.
pub fn normalize(
    account: &AccountId,
    raw: &RawExecution,
    offset: FixedOffset,
) -> CoreResult<ExecutionLeg> {
    let instrument = raw.instrument.trim();
    if instrument.is_empty() {
        return Err(CoreError::Validation(
            "instrument identifier must be non-empty".to_string(),
        ));
    }

    if !raw.quantity.is_positive() {
        return Err(CoreError::Validation(format!(
            "quantity must be positive, got {}",
            raw.quantity
        )));
    }

    let (side, price) = match (raw.entry_price, raw.exit_price) {
        (Some(entry), None) => (Side::Buy, entry),
        (None, Some(exit)) => (Side::Sell, exit),
        (Some(_), Some(_)) => {
            return Err(CoreError::Validation(
                "supply exactly one of entry_price and exit_price, got both".to_string(),
            ))
        }
        (None, None) => {
            return Err(CoreError::Validation(
                "supply exactly one of entry_price and exit_price, got neither".to_string(),
            ))
        }
    };

    if !price.is_positive() {
        return Err(CoreError::Validation(format!(
            "price must be positive, got {}",
            price
        )));
    }

    if raw.exchange_fee.is_negative() || raw.brokerage.is_negative() {
        return Err(CoreError::Validation(
            "fee inputs must not be negative".to_string(),
        ));
    }

    Ok(ExecutionLeg::open(
        account.clone(),
        InstrumentId::new(instrument),
        raw.class,
        trade_day(raw.executed_at, offset),
        side,
        raw.quantity,
        price,
        FeeInputs::new(raw.exchange_fee, raw.brokerage),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LegSide;
    use chrono::TimeZone;

    fn offset_ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn raw_buy() -> RawExecution {
        RawExecution {
            instrument: "RELIANCE".to_string(),
            class: InstrumentClass::Delivery,
            quantity: Decimal::from(100),
            executed_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
            entry_price: Some(Decimal::from(10)),
            exit_price: None,
            exchange_fee: Decimal::zero(),
            brokerage: Decimal::from(30),
        }
    }

    #[test]
    fn test_normalize_buy() {
        let leg = normalize(&AccountId::new("acct-1"), &raw_buy(), offset_ist()).unwrap();
        assert_eq!(leg.side, LegSide::Buy);
        assert_eq!(leg.entry_price, Some(Decimal::from(10)));
        assert_eq!(leg.exit_price, None);
        assert_eq!(leg.quantity, Decimal::from(100));
        assert_eq!(leg.fees.brokerage, Decimal::from(30));
        assert!(leg.is_open);
    }

    #[test]
    fn test_normalize_sell_infers_side() {
        let mut raw = raw_buy();
        raw.entry_price = None;
        raw.exit_price = Some(Decimal::from(12));
        let leg = normalize(&AccountId::new("acct-1"), &raw, offset_ist()).unwrap();
        assert_eq!(leg.side, LegSide::Sell);
        assert_eq!(leg.exit_price, Some(Decimal::from(12)));
    }

    #[test]
    fn test_trade_day_uses_fixed_offset() {
        // 22:00 UTC is already the next calendar day at UTC+05:30.
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 22, 0, 0).unwrap();
        assert_eq!(
            trade_day(at, offset_ist()),
            NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
        );
        assert_eq!(
            trade_day(at, FixedOffset::east_opt(0).unwrap()),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_rejects_empty_instrument() {
        let mut raw = raw_buy();
        raw.instrument = "   ".to_string();
        let err = normalize(&AccountId::new("acct-1"), &raw, offset_ist()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut raw = raw_buy();
        raw.quantity = Decimal::zero();
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));

        raw.quantity = Decimal::from(-5);
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_both_prices() {
        let mut raw = raw_buy();
        raw.exit_price = Some(Decimal::from(12));
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_neither_price() {
        let mut raw = raw_buy();
        raw.entry_price = None;
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let mut raw = raw_buy();
        raw.entry_price = Some(Decimal::zero());
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_negative_fee_inputs() {
        let mut raw = raw_buy();
        raw.brokerage = Decimal::from(-1);
        assert!(matches!(
            normalize(&AccountId::new("acct-1"), &raw, offset_ist()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_instrument_is_trimmed() {
        let mut raw = raw_buy();
        raw.instrument = "  RELIANCE  ".to_string();
        let leg = normalize(&AccountId::new("acct-1"), &raw, offset_ist()).unwrap();
        assert_eq!(leg.instrument.as_str(), "RELIANCE");
    }
}
