//! Capital ledger persistence: append-only balance history.

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use crate::domain::{AccountId, Decimal, LedgerEntry};

use super::{parse_date, parse_decimal, Repository};

fn decode_entry(row: &SqliteRow) -> Result<LedgerEntry, sqlx::Error> {
    let id: i64 = row.get("id");
    let account: String = row.get("account");
    let associated_date: String = row.get("associated_date");
    let delta: String = row.get("delta");
    let resulting_balance: String = row.get("resulting_balance");

    Ok(LedgerEntry {
        id,
        account: AccountId::new(account),
        associated_date: parse_date(&associated_date, "associated_date")?,
        delta: parse_decimal(&delta, "delta")?,
        resulting_balance: parse_decimal(&resulting_balance, "resulting_balance")?,
    })
}

impl Repository {
    /// Atomically add `delta` to the account's current balance and
    /// append the resulting entry. Runs inside the caller's
    /// transaction; reversal is this with the negated prior delta.
    ///
    /// Returns the resulting balance.
    pub async fn append_ledger_delta(
        conn: &mut SqliteConnection,
        account: &AccountId,
        delta: Decimal,
        associated_date: NaiveDate,
    ) -> Result<Decimal, sqlx::Error> {
        let current = Self::latest_balance(&mut *conn, account).await?;
        let resulting = current + delta;

        sqlx::query(
            r#"
            INSERT INTO capital_ledger (account, associated_date, delta, resulting_balance)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(account.as_str())
        .bind(associated_date.to_string())
        .bind(delta.to_canonical_string())
        .bind(resulting.to_canonical_string())
        .execute(conn)
        .await?;

        Ok(resulting)
    }

    /// Balance after the latest entry in insertion order; zero for an
    /// account with no history.
    async fn latest_balance(
        conn: &mut SqliteConnection,
        account: &AccountId,
    ) -> Result<Decimal, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT resulting_balance FROM capital_ledger
            WHERE account = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(account.as_str())
        .fetch_optional(conn)
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("resulting_balance");
                parse_decimal(&raw, "resulting_balance")
            }
            None => Ok(Decimal::zero()),
        }
    }

    /// Current balance for an account.
    pub async fn current_balance(&self, account: &AccountId) -> Result<Decimal, sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        Self::latest_balance(&mut conn, account).await
    }

    /// Balance as of a date: the entry with the greatest
    /// `associated_date <= date` among entries inserted so far, ties
    /// broken by latest insertion. Zero if no entry qualifies.
    pub async fn balance_as_of(
        &self,
        account: &AccountId,
        date: NaiveDate,
    ) -> Result<Decimal, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT resulting_balance FROM capital_ledger
            WHERE account = ? AND associated_date <= ?
            ORDER BY associated_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(account.as_str())
        .bind(date.to_string())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("resulting_balance");
                parse_decimal(&raw, "resulting_balance")
            }
            None => Ok(Decimal::zero()),
        }
    }

    /// Full ledger history for an account in insertion order.
    pub async fn balance_history(
        &self,
        account: &AccountId,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, account, associated_date, delta, resulting_balance
            FROM capital_ledger
            WHERE account = ?
            ORDER BY id ASC
            "#,
        )
        .bind(account.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(decode_entry).collect()
    }
}
