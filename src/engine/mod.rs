//! Pure computation engines: intake normalization, position matching,
//! charge calculation and realized P&L.
//!
//! Nothing in this module touches storage or the clock; the service
//! layer feeds state in and persists the results inside one
//! transaction.

use uuid::Uuid;

use crate::domain::{ExecutionLeg, FeeInputs};

pub mod charges;
pub mod intake;
pub mod matcher;
pub mod pnl;

pub use charges::{compute_charges, ChargeBreakdown};
pub use intake::{normalize, RawExecution};
pub use matcher::match_execution;
pub use pnl::finalize_completed;

/// A realized round-trip produced by the matcher.
///
/// Carries the per-side fee-input shares alongside the completed leg so
/// the charge step can price each side with its own brokerage share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMatch {
    pub leg: ExecutionLeg,
    pub buy_fees: FeeInputs,
    pub sell_fees: FeeInputs,
}

/// The full effect of consuming one incoming execution in a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Realized legs, not yet charged/priced (see [`finalize_completed`]).
    pub completed: Vec<CompletedMatch>,
    /// Prior open leg fully consumed by the match.
    pub deleted_open: Option<Uuid>,
    /// Prior open leg after a merge or partial consumption.
    pub updated_open: Option<ExecutionLeg>,
    /// Residual of the incoming execution left open in the bucket.
    pub new_open: Option<ExecutionLeg>,
}

impl MatchOutcome {
    /// The open leg the bucket ends up with, if any.
    pub fn resulting_open(&self) -> Option<&ExecutionLeg> {
        self.new_open.as_ref().or(self.updated_open.as_ref())
    }
}
