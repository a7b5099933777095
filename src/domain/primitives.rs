//! Domain primitives: AccountId, InstrumentId, Side, LegSide, InstrumentClass.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Owning account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument identifier (e.g. a ticker symbol or contract code).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    pub fn new(id: impl Into<String>) -> Self {
        InstrumentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade side of an execution: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of an execution leg.
///
/// Submissions enter as `Buy` or `Sell`; `Completed` legs exist only as
/// the product of matching an open leg against an opposite-side
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegSide {
    Buy,
    Sell,
    Completed,
}

impl LegSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegSide::Buy => "buy",
            LegSide::Sell => "sell",
            LegSide::Completed => "completed",
        }
    }

    /// The trade side of an open leg; None for completed legs.
    pub fn trade_side(&self) -> Option<Side> {
        match self {
            LegSide::Buy => Some(Side::Buy),
            LegSide::Sell => Some(Side::Sell),
            LegSide::Completed => None,
        }
    }
}

impl From<Side> for LegSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => LegSide::Buy,
            Side::Sell => LegSide::Sell,
        }
    }
}

impl FromStr for LegSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(LegSide::Buy),
            "sell" => Ok(LegSide::Sell),
            "completed" => Ok(LegSide::Completed),
            other => Err(format!("unknown leg side: {other}")),
        }
    }
}

impl std::fmt::Display for LegSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instrument class; drives which charge coefficients apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    /// Cash equity held overnight.
    Delivery,
    /// Cash equity opened and closed the same day.
    Intraday,
    Futures,
    Options,
}

impl InstrumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentClass::Delivery => "delivery",
            InstrumentClass::Intraday => "intraday",
            InstrumentClass::Futures => "futures",
            InstrumentClass::Options => "options",
        }
    }
}

impl FromStr for InstrumentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(InstrumentClass::Delivery),
            "intraday" => Ok(InstrumentClass::Intraday),
            "futures" => Ok(InstrumentClass::Futures),
            "options" => Ok(InstrumentClass::Options),
            other => Err(format!("unknown instrument class: {other}")),
        }
    }
}

impl std::fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
