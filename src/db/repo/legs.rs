//! Execution leg persistence.

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    AccountId, BucketKey, ExecutionLeg, FeeInputs, InstrumentClass, InstrumentId, LegSide,
};

use super::{parse_date, parse_decimal, parse_uuid, Repository};

fn decode_leg(row: &SqliteRow) -> Result<ExecutionLeg, sqlx::Error> {
    let id: String = row.get("id");
    let account: String = row.get("account");
    let instrument: String = row.get("instrument");
    let class: String = row.get("instrument_class");
    let trade_day: String = row.get("trade_day");
    let side: String = row.get("side");
    let quantity: String = row.get("quantity");
    let entry_price: Option<String> = row.get("entry_price");
    let exit_price: Option<String> = row.get("exit_price");
    let exchange_fee: String = row.get("exchange_fee");
    let brokerage: String = row.get("brokerage");
    let is_open: i64 = row.get("is_open");
    let gross_pnl: String = row.get("gross_pnl");
    let net_pnl: String = row.get("net_pnl");
    let total_charges: String = row.get("total_charges");
    let counterparty_ref: Option<String> = row.get("counterparty_ref");

    Ok(ExecutionLeg {
        id: parse_uuid(&id, "id")?,
        account: AccountId::new(account),
        instrument: InstrumentId::new(instrument),
        class: InstrumentClass::from_str(&class)
            .map_err(|e| sqlx::Error::Decode(format!("column instrument_class: {e}").into()))?,
        trade_day: parse_date(&trade_day, "trade_day")?,
        side: LegSide::from_str(&side)
            .map_err(|e| sqlx::Error::Decode(format!("column side: {e}").into()))?,
        quantity: parse_decimal(&quantity, "quantity")?,
        entry_price: entry_price
            .map(|p| parse_decimal(&p, "entry_price"))
            .transpose()?,
        exit_price: exit_price
            .map(|p| parse_decimal(&p, "exit_price"))
            .transpose()?,
        fees: FeeInputs::new(
            parse_decimal(&exchange_fee, "exchange_fee")?,
            parse_decimal(&brokerage, "brokerage")?,
        ),
        is_open: is_open != 0,
        gross_pnl: parse_decimal(&gross_pnl, "gross_pnl")?,
        net_pnl: parse_decimal(&net_pnl, "net_pnl")?,
        total_charges: parse_decimal(&total_charges, "total_charges")?,
        counterparty_ref: counterparty_ref
            .map(|r| parse_uuid(&r, "counterparty_ref"))
            .transpose()?,
    })
}

impl Repository {
    /// Insert a leg (open or completed) inside the caller's transaction.
    pub async fn insert_leg(
        conn: &mut SqliteConnection,
        leg: &ExecutionLeg,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO execution_legs (
                id, account, instrument, instrument_class, trade_day, side,
                quantity, entry_price, exit_price, exchange_fee, brokerage,
                is_open, gross_pnl, net_pnl, total_charges, counterparty_ref,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leg.id.to_string())
        .bind(leg.account.as_str())
        .bind(leg.instrument.as_str())
        .bind(leg.class.as_str())
        .bind(leg.trade_day.to_string())
        .bind(leg.side.as_str())
        .bind(leg.quantity.to_canonical_string())
        .bind(leg.entry_price.map(|p| p.to_canonical_string()))
        .bind(leg.exit_price.map(|p| p.to_canonical_string()))
        .bind(leg.fees.exchange_fee.to_canonical_string())
        .bind(leg.fees.brokerage.to_canonical_string())
        .bind(if leg.is_open { 1 } else { 0 })
        .bind(leg.gross_pnl.to_canonical_string())
        .bind(leg.net_pnl.to_canonical_string())
        .bind(leg.total_charges.to_canonical_string())
        .bind(leg.counterparty_ref.map(|r| r.to_string()))
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrite the mutable fields of an open leg after a merge or
    /// partial consumption. Returns false if no open leg matched.
    pub async fn update_open_leg(
        conn: &mut SqliteConnection,
        leg: &ExecutionLeg,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE execution_legs
            SET quantity = ?, entry_price = ?, exit_price = ?,
                exchange_fee = ?, brokerage = ?
            WHERE id = ? AND is_open = 1
            "#,
        )
        .bind(leg.quantity.to_canonical_string())
        .bind(leg.entry_price.map(|p| p.to_canonical_string()))
        .bind(leg.exit_price.map(|p| p.to_canonical_string()))
        .bind(leg.fees.exchange_fee.to_canonical_string())
        .bind(leg.fees.brokerage.to_canonical_string())
        .bind(leg.id.to_string())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a leg by id. Returns false if it did not exist.
    pub async fn delete_leg(conn: &mut SqliteConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM execution_legs WHERE id = ?")
            .bind(id.to_string())
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch one leg by id inside the caller's transaction.
    pub async fn get_leg(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<ExecutionLeg>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM execution_legs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(conn)
            .await?;

        row.as_ref().map(decode_leg).transpose()
    }

    /// Open legs for a bucket. The matcher invariant keeps this at one
    /// entry at most; the service treats more as corruption.
    pub async fn find_open_legs(
        conn: &mut SqliteConnection,
        bucket: &BucketKey,
    ) -> Result<Vec<ExecutionLeg>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM execution_legs
            WHERE account = ? AND trade_day = ? AND instrument = ?
              AND instrument_class = ? AND is_open = 1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(bucket.account.as_str())
        .bind(bucket.trade_day.to_string())
        .bind(bucket.instrument.as_str())
        .bind(bucket.class.as_str())
        .fetch_all(conn)
        .await?;

        rows.iter().map(decode_leg).collect()
    }

    /// List an account's legs, oldest first.
    ///
    /// With a date filter: legs dated that day plus any still-open leg
    /// regardless of date.
    pub async fn list_legs(
        &self,
        account: &AccountId,
        day: Option<NaiveDate>,
    ) -> Result<Vec<ExecutionLeg>, sqlx::Error> {
        let rows = match day {
            Some(day) => {
                sqlx::query(
                    r#"
                    SELECT * FROM execution_legs
                    WHERE account = ? AND (trade_day = ? OR is_open = 1)
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(account.as_str())
                .bind(day.to_string())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM execution_legs
                    WHERE account = ?
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(account.as_str())
                .fetch_all(self.pool())
                .await?
            }
        };

        rows.iter().map(decode_leg).collect()
    }
}
