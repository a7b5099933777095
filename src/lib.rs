pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod service;

pub use config::Config;
pub use db::{init_db, RateProvider, Repository};
pub use domain::{
    AccountId, BucketKey, ChargeRateTable, Decimal, ExecutionLeg, FeeInputs, InstrumentClass,
    InstrumentId, LedgerEntry, LegSide, Side,
};
pub use engine::{ChargeBreakdown, RawExecution};
pub use error::{CoreError, CoreResult};
pub use service::{ExecutionPatch, SubmitOutcome, TradeService};
