//! Charge rate table bootstrap and reads.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use crate::domain::{ChargeRateTable, Decimal};
use crate::error::{CoreError, CoreResult};

use super::{parse_decimal, Repository};

/// Injected accessor for the currently-effective rate table.
///
/// Rates are fetched at calculation time; a new version applies only
/// to calculations that start after it lands.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn current_rates(&self) -> CoreResult<ChargeRateTable>;
}

fn decode_rates(row: &SqliteRow) -> Result<ChargeRateTable, sqlx::Error> {
    let col = |name: &str| -> Result<Decimal, sqlx::Error> {
        let raw: String = row.get(name);
        parse_decimal(&raw, name)
    };

    Ok(ChargeRateTable {
        version: row.get("version"),
        transaction_tax_delivery: col("transaction_tax_delivery")?,
        transaction_tax_intraday_sell: col("transaction_tax_intraday_sell")?,
        transaction_tax_futures_sell: col("transaction_tax_futures_sell")?,
        transaction_tax_options_sell: col("transaction_tax_options_sell")?,
        transaction_fee_equity: col("transaction_fee_equity")?,
        transaction_fee_futures: col("transaction_fee_futures")?,
        transaction_fee_options: col("transaction_fee_options")?,
        turnover_fee: col("turnover_fee")?,
        stamp_delivery_buy: col("stamp_delivery_buy")?,
        stamp_intraday_buy: col("stamp_intraday_buy")?,
        stamp_futures_buy: col("stamp_futures_buy")?,
        stamp_options_buy: col("stamp_options_buy")?,
        fee_tax: col("fee_tax")?,
        depository_fee: col("depository_fee")?,
    })
}

impl Repository {
    /// Read the singleton rate table, bootstrapping the documented
    /// defaults exactly once if the row is absent.
    ///
    /// `INSERT OR IGNORE` makes repeated bootstrap attempts no-ops, so
    /// concurrent first calls cannot create duplicates.
    pub async fn get_or_bootstrap_rates(&self) -> CoreResult<ChargeRateTable> {
        if let Some(rates) = self.read_rates().await? {
            return Ok(rates);
        }

        let defaults = ChargeRateTable::default();
        info!(version = defaults.version, "bootstrapping charge rate table with defaults");

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO charge_rates (
                id, version,
                transaction_tax_delivery, transaction_tax_intraday_sell,
                transaction_tax_futures_sell, transaction_tax_options_sell,
                transaction_fee_equity, transaction_fee_futures, transaction_fee_options,
                turnover_fee,
                stamp_delivery_buy, stamp_intraday_buy, stamp_futures_buy, stamp_options_buy,
                fee_tax, depository_fee
            ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(defaults.version)
        .bind(defaults.transaction_tax_delivery.to_canonical_string())
        .bind(defaults.transaction_tax_intraday_sell.to_canonical_string())
        .bind(defaults.transaction_tax_futures_sell.to_canonical_string())
        .bind(defaults.transaction_tax_options_sell.to_canonical_string())
        .bind(defaults.transaction_fee_equity.to_canonical_string())
        .bind(defaults.transaction_fee_futures.to_canonical_string())
        .bind(defaults.transaction_fee_options.to_canonical_string())
        .bind(defaults.turnover_fee.to_canonical_string())
        .bind(defaults.stamp_delivery_buy.to_canonical_string())
        .bind(defaults.stamp_intraday_buy.to_canonical_string())
        .bind(defaults.stamp_futures_buy.to_canonical_string())
        .bind(defaults.stamp_options_buy.to_canonical_string())
        .bind(defaults.fee_tax.to_canonical_string())
        .bind(defaults.depository_fee.to_canonical_string())
        .execute(self.pool())
        .await?;

        self.read_rates().await?.ok_or_else(|| {
            CoreError::Config("rate table missing and bootstrap failed".to_string())
        })
    }

    async fn read_rates(&self) -> Result<Option<ChargeRateTable>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM charge_rates WHERE id = 1")
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(decode_rates).transpose()
    }
}

#[async_trait]
impl RateProvider for Repository {
    async fn current_rates(&self) -> CoreResult<ChargeRateTable> {
        self.get_or_bootstrap_rates().await
    }
}
