//! TradeService: the operations exposed to calling collaborators.
//!
//! Every mutating operation is one bucket-level unit of work: acquire
//! the account's lock and the write lock, open a transaction, read
//! the bucket's open-leg state, run the matcher, stamp charges and P&L
//! on completions, write legs, append one aggregate capital delta,
//! commit. Any error aborts the whole transaction; callers never
//! observe a half-applied match.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{RateProvider, Repository};
use crate::domain::{
    AccountId, ChargeRateTable, Decimal, ExecutionLeg, InstrumentClass, LedgerEntry, LegSide,
};
use crate::engine::{self, RawExecution};
use crate::error::{CoreError, CoreResult};

/// Result of a submit or update: the realized legs and whatever leg is
/// left open in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub completed: Vec<ExecutionLeg>,
    pub open: Option<ExecutionLeg>,
}

/// Partial update for an open leg.
///
/// Omitted fields are inherited from the stored leg, with one rule for
/// prices: if either price is supplied the pair is taken wholly from
/// the patch, which is how a caller flips a leg's side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPatch {
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub class: Option<InstrumentClass>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub exchange_fee: Option<Decimal>,
    #[serde(default)]
    pub brokerage: Option<Decimal>,
}

/// Matching-and-ledger engine facade.
pub struct TradeService {
    repo: Arc<Repository>,
    day_offset: FixedOffset,
    account_locks: Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>,
    /// SQLite admits one writer at a time, and a transaction that reads
    /// before writing fails with SQLITE_BUSY instead of waiting when
    /// another writer slipped in between. Mutating transactions hold
    /// this for their whole begin/commit span.
    write_lock: AsyncMutex<()>,
}

impl TradeService {
    pub fn new(repo: Arc<Repository>, config: &Config) -> CoreResult<Self> {
        let day_offset = FixedOffset::east_opt(config.trade_day_offset_minutes * 60)
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "invalid trade day offset: {} minutes",
                    config.trade_day_offset_minutes
                ))
            })?;

        Ok(TradeService {
            repo,
            day_offset,
            account_locks: Mutex::new(HashMap::new()),
            write_lock: AsyncMutex::new(()),
        })
    }

    /// Validate and submit one execution, matching it against the
    /// bucket's open state.
    pub async fn submit_execution(
        &self,
        account: &AccountId,
        raw: &RawExecution,
    ) -> CoreResult<SubmitOutcome> {
        let leg = engine::normalize(account, raw, self.day_offset)?;
        let rates = self.repo.current_rates().await?;

        let lock = self.account_lock(account);
        let _guard = lock.lock().await;
        let _write = self.write_lock.lock().await;

        let mut tx = self.repo.begin().await?;
        let outcome = Self::apply_to_bucket(&mut *tx, account, leg, &rates).await?;
        tx.commit().await?;

        info!(
            account = %account,
            completed = outcome.completed.len(),
            open = outcome.open.is_some(),
            "execution submitted"
        );
        Ok(outcome)
    }

    /// Edit an open leg. The stored leg is atomically removed,
    /// re-normalized with the patch applied and re-matched; the result
    /// keeps the original leg id if it stays open.
    pub async fn update_execution(
        &self,
        account: &AccountId,
        leg_id: Uuid,
        patch: &ExecutionPatch,
    ) -> CoreResult<SubmitOutcome> {
        let rates = self.repo.current_rates().await?;

        let lock = self.account_lock(account);
        let _guard = lock.lock().await;
        let _write = self.write_lock.lock().await;

        let mut tx = self.repo.begin().await?;
        let existing = Self::owned_leg(&mut *tx, account, leg_id).await?;
        if !existing.is_open {
            return Err(CoreError::Conflict(format!(
                "leg {} is not open; completed legs are immutable",
                leg_id
            )));
        }

        let raw = patched_raw(&existing, patch, self.day_offset);
        let mut leg = engine::normalize(account, &raw, self.day_offset)?;
        leg.id = existing.id;

        Repository::delete_leg(&mut *tx, existing.id).await?;
        let outcome = Self::apply_to_bucket(&mut *tx, account, leg, &rates).await?;
        tx.commit().await?;

        info!(
            account = %account,
            leg = %leg_id,
            completed = outcome.completed.len(),
            "execution updated"
        );
        Ok(outcome)
    }

    /// Delete a leg. A completed leg's prior net-P&L contribution is
    /// reversed from the capital ledger; open legs never contributed,
    /// so nothing is reversed.
    ///
    /// Returns the reversed amount (zero for open legs).
    pub async fn delete_execution(&self, account: &AccountId, leg_id: Uuid) -> CoreResult<Decimal> {
        let lock = self.account_lock(account);
        let _guard = lock.lock().await;
        let _write = self.write_lock.lock().await;

        let mut tx = self.repo.begin().await?;
        let existing = Self::owned_leg(&mut *tx, account, leg_id).await?;

        Repository::delete_leg(&mut *tx, existing.id).await?;
        let reversed = if existing.side == LegSide::Completed {
            Repository::append_ledger_delta(
                &mut *tx,
                account,
                -existing.net_pnl,
                existing.trade_day,
            )
            .await?;
            existing.net_pnl
        } else {
            Decimal::zero()
        };
        tx.commit().await?;

        info!(account = %account, leg = %leg_id, reversed = %reversed, "execution deleted");
        Ok(reversed)
    }

    /// An account's legs, oldest first. With a date filter: that day's
    /// legs plus any still-open leg regardless of date.
    pub async fn list_executions(
        &self,
        account: &AccountId,
        day: Option<NaiveDate>,
    ) -> CoreResult<Vec<ExecutionLeg>> {
        Ok(self.repo.list_legs(account, day).await?)
    }

    pub async fn current_balance(&self, account: &AccountId) -> CoreResult<Decimal> {
        Ok(self.repo.current_balance(account).await?)
    }

    pub async fn balance_history(&self, account: &AccountId) -> CoreResult<Vec<LedgerEntry>> {
        Ok(self.repo.balance_history(account).await?)
    }

    pub async fn balance_as_of(
        &self,
        account: &AccountId,
        date: NaiveDate,
    ) -> CoreResult<Decimal> {
        Ok(self.repo.balance_as_of(account, date).await?)
    }

    /// The currently-effective rate table (bootstrapped on first use).
    pub async fn current_rates(&self) -> CoreResult<ChargeRateTable> {
        self.repo.current_rates().await
    }

    /// Match one normalized leg into its bucket and persist the full
    /// effect, including the operation's single aggregate ledger delta.
    async fn apply_to_bucket(
        conn: &mut SqliteConnection,
        account: &AccountId,
        leg: ExecutionLeg,
        rates: &ChargeRateTable,
    ) -> CoreResult<SubmitOutcome> {
        let bucket = leg.bucket_key();
        let associated_date = bucket.trade_day;

        let mut open_legs = Repository::find_open_legs(&mut *conn, &bucket).await?;
        if open_legs.len() > 1 {
            return Err(CoreError::Conflict(format!(
                "bucket holds {} open legs; expected at most one",
                open_legs.len()
            )));
        }

        let outcome = engine::match_execution(open_legs.pop(), leg)?;

        let mut completed = Vec::with_capacity(outcome.completed.len());
        let mut delta = Decimal::zero();
        for mut matched in outcome.completed {
            engine::finalize_completed(&mut matched, rates);
            delta = delta + matched.leg.net_pnl;
            Repository::insert_leg(&mut *conn, &matched.leg).await?;
            completed.push(matched.leg);
        }

        if let Some(id) = outcome.deleted_open {
            Repository::delete_leg(&mut *conn, id).await?;
        }
        if let Some(ref updated) = outcome.updated_open {
            if !Repository::update_open_leg(&mut *conn, updated).await? {
                return Err(CoreError::Conflict(format!(
                    "open leg {} vanished mid-operation",
                    updated.id
                )));
            }
        }
        if let Some(ref new_open) = outcome.new_open {
            Repository::insert_leg(&mut *conn, new_open).await?;
        }

        if !completed.is_empty() {
            Repository::append_ledger_delta(&mut *conn, account, delta, associated_date).await?;
        }

        let open = outcome.new_open.or(outcome.updated_open);
        Ok(SubmitOutcome { completed, open })
    }

    /// Fetch a leg and enforce account ownership.
    async fn owned_leg(
        conn: &mut SqliteConnection,
        account: &AccountId,
        leg_id: Uuid,
    ) -> CoreResult<ExecutionLeg> {
        let leg = Repository::get_leg(&mut *conn, leg_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("leg {} does not exist", leg_id)))?;
        if leg.account != *account {
            // Foreign legs look identical to missing ones.
            return Err(CoreError::NotFound(format!("leg {} does not exist", leg_id)));
        }
        Ok(leg)
    }

    fn account_lock(&self, account: &AccountId) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .account_locks
            .lock()
            .expect("account lock registry poisoned");
        locks.entry(account.clone()).or_default().clone()
    }
}

/// Merge a patch over a stored open leg into a raw submission.
fn patched_raw(leg: &ExecutionLeg, patch: &ExecutionPatch, day_offset: FixedOffset) -> RawExecution {
    let (entry_price, exit_price) = if patch.entry_price.is_some() || patch.exit_price.is_some() {
        (patch.entry_price, patch.exit_price)
    } else {
        (leg.entry_price, leg.exit_price)
    };

    // Without an explicit timestamp the leg stays in its trade day;
    // noon under the bucketing offset maps back to the same date.
    let executed_at = patch.executed_at.unwrap_or_else(|| {
        leg.trade_day
            .and_hms_opt(12, 0, 0)
            .expect("noon is a valid time")
            .and_local_timezone(day_offset)
            .single()
            .expect("fixed offset has no ambiguous local times")
            .with_timezone(&Utc)
    });

    RawExecution {
        instrument: patch
            .instrument
            .clone()
            .unwrap_or_else(|| leg.instrument.as_str().to_string()),
        class: patch.class.unwrap_or(leg.class),
        quantity: patch.quantity.unwrap_or(leg.quantity),
        executed_at,
        entry_price,
        exit_price,
        exchange_fee: patch.exchange_fee.unwrap_or(leg.fees.exchange_fee),
        brokerage: patch.brokerage.unwrap_or(leg.fees.brokerage),
    }
}
