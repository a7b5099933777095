//! Domain types shared by the matching engine, the charge/PnL
//! calculators and the persistence layer.

pub mod decimal;
pub mod ledger;
pub mod leg;
pub mod primitives;
pub mod rates;

pub use decimal::Decimal;
pub use ledger::LedgerEntry;
pub use leg::{BucketKey, ExecutionLeg, FeeInputs};
pub use primitives::{AccountId, InstrumentClass, InstrumentId, LegSide, Side};
pub use rates::ChargeRateTable;
