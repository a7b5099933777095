//! Capital ledger entry: one immutable record of an account's balance
//! after applying an operation's aggregate delta.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Decimal};

/// Append-only ledger record.
///
/// `id` is the insertion order; entries are not globally ordered by
/// `associated_date` (several entries may share a date, and reversals
/// are appended under the original leg's date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub account: AccountId,
    pub associated_date: NaiveDate,
    /// Signed amount this operation applied.
    pub delta: Decimal,
    /// Account's total capital immediately after this entry.
    pub resulting_balance: Decimal,
}
