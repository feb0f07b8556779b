//! # Daily Inventory Service
//!
//! Rolls each business day's transactions into per-product and
//! per-customer summaries, and owns the day's open/closed lifecycle.
//!
//! ## Lifecycle
//! ```text
//!                 close(date, user)
//!   ┌──────────┐ ─────────────────────► ┌──────────┐
//!   │  Active  │                        │  Closed  │
//!   └──────────┘ ◄───────────────────── └──────────┘
//!                 reopen(date, user)
//!
//!   Active: process_transaction folds new entries in
//!   Closed: process_transaction is a no-op, corrections set
//!           pending_reconciliation instead of touching totals
//!   Both:   recalculate rebuilds from the ledger
//! ```
//!
//! ## Incremental vs. Rebuild
//! ```text
//! process_transaction(tx)              recalculate(date)
//! ───────────────────────              ─────────────────
//! lock(date)                           lock(date)
//! BEGIN                                BEGIN
//!   snapshot row (skip if present)       delete child rows
//!   product summary += tx                replay ledger [date, date+1)
//!   customer summary += tx               write snapshots + summaries
//!   totals = Σ child rows                totals = Σ child rows
//! COMMIT                                 version += 1, pending = false
//!                                      COMMIT
//! ```
//!
//! Both paths go through the same per-transaction rules in
//! `dukan_core::daily`, so a rebuild reproduces what incremental updates
//! produced.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{Datelike, Local, NaiveDate, Utc};
use dukan_core::daily::{
    aggregate, annual_summary, apply_to_customer, apply_to_product, empty_customer_summary,
    empty_product_summary, snapshot, year_bounds, AnnualSummary,
};
use dukan_core::{
    CoreError, CustomerTransaction, DailyCustomerSummary, DailyInventory, DailyProductSummary,
    DailySaleTransaction, DailyStatus, ValidationError,
};
use dukan_db::repository::{customer, daily, product, transaction};
use dukan_db::DbError;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use crate::error::{EngineError, EngineResult};
use crate::Engine;

/// What happened to a transaction handed to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProcessOutcome {
    /// Folded into the day's summaries.
    Applied,
    /// Already part of the day; nothing changed.
    AlreadyProcessed,
    /// The day is closed; nothing changed.
    DayClosed,
}

/// How a day's figures were brought up to date after a change.
///
/// Ordered from best to worst, so several outcomes combine with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RefreshOutcome {
    /// New entries folded in incrementally.
    Applied,
    /// Day rebuilt from the ledger.
    Rebuilt,
    /// Day is closed; flagged for a later replay.
    Deferred,
    /// Update failed; flagged for a later replay.
    Failed,
}

/// One product line of a daily export.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductExportRow {
    pub product_name: String,
    pub summary: DailyProductSummary,
}

/// One customer line of a daily export.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerExportRow {
    pub customer_name: String,
    pub phone: Option<String>,
    pub summary: DailyCustomerSummary,
}

/// Day totals with their product and customer breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyExport {
    pub store_name: String,
    pub currency_symbol: String,
    pub day: DailyInventory,
    pub products: Vec<ProductExportRow>,
    pub customers: Vec<CustomerExportRow>,
}

/// [`DailyExport`] plus every aggregated transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DetailedDailyExport {
    pub summary: DailyExport,
    pub transactions: Vec<DailySaleTransaction>,
}

/// Daily aggregation and lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct DailyInventoryService<'a> {
    engine: &'a Engine,
}

impl<'a> DailyInventoryService<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        DailyInventoryService { engine }
    }

    /// Returns the day row, creating an active one if needed.
    pub async fn get_or_create(&self, date: NaiveDate) -> EngineResult<DailyInventory> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(daily::get_or_create(&mut conn, date).await?)
    }

    pub async fn get_by_date(&self, date: NaiveDate) -> EngineResult<Option<DailyInventory>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(daily::get_by_date(&mut conn, date).await?)
    }

    /// A day that was never opened is not closed.
    pub async fn is_day_closed(&self, date: NaiveDate) -> EngineResult<bool> {
        Ok(self
            .get_by_date(date)
            .await?
            .map(|day| day.is_closed())
            .unwrap_or(false))
    }

    /// Folds one transaction into its business day.
    pub async fn process_transaction(&self, tx: &CustomerTransaction) -> EngineResult<ProcessOutcome> {
        self.process_batch(tx.business_date(), std::slice::from_ref(tx))
            .await
    }

    /// Folds several transactions of the same business day in one unit of
    /// work.
    pub(crate) async fn process_batch(
        &self,
        date: NaiveDate,
        txs: &[CustomerTransaction],
    ) -> EngineResult<ProcessOutcome> {
        let _guard = self.engine.lock_day(date).await;

        let mut db_tx = self.engine.db().begin().await?;
        let day = daily::get_or_create(&mut db_tx, date).await?;

        if day.is_closed() {
            warn!(date = %date, count = txs.len(), "Day is closed, skipping aggregation");
            return Ok(ProcessOutcome::DayClosed);
        }

        let mut applied = 0;
        for tx in txs {
            if apply_one(&mut db_tx, &day.id, tx).await? {
                applied += 1;
            } else {
                debug!(transaction_id = %tx.id, date = %date, "Transaction already aggregated");
            }
        }

        if applied == 0 {
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        let totals = daily::compute_totals(&mut db_tx, &day.id).await?;
        daily::update_totals(&mut db_tx, &day.id, &totals, false).await?;
        db_tx.commit().await?;

        debug!(
            date = %date,
            applied,
            total_sales = totals.total_sales_cents,
            "Daily inventory updated"
        );
        Ok(ProcessOutcome::Applied)
    }

    /// Rebuilds a day from the ledger.
    ///
    /// Works on closed days too, and clears `pending_reconciliation`.
    ///
    /// ## Errors
    /// * `CoreError::InventoryRecalculationFailed` - the rebuild was rolled
    ///   back; the previous figures are untouched
    pub async fn recalculate(&self, date: NaiveDate) -> EngineResult<DailyInventory> {
        let day = {
            let _guard = self.engine.lock_day(date).await;
            self.recalculate_locked(date).await?
        };

        self.engine
            .activity()
            .log(
                "daily_recalculated",
                "daily_inventory",
                Some(&date.to_string()),
                Some(serde_json::json!({ "version": day.aggregation_version })),
                None,
            )
            .await;

        Ok(day)
    }

    async fn recalculate_locked(&self, date: NaiveDate) -> EngineResult<DailyInventory> {
        self.rebuild(date).await.map_err(|e| match e {
            EngineError::Core(CoreError::DatabaseConflict(_)) => e,
            other => {
                error!(date = %date, error = %other, "Daily recalculation failed");
                CoreError::InventoryRecalculationFailed {
                    date: date.to_string(),
                    reason: other.to_string(),
                }
                .into()
            }
        })
    }

    async fn rebuild(&self, date: NaiveDate) -> EngineResult<DailyInventory> {
        let mut db_tx = self.engine.db().begin().await?;
        let day = daily::get_or_create(&mut db_tx, date).await?;

        daily::delete_children(&mut db_tx, &day.id).await?;

        let entries = transaction::list_for_date(&mut db_tx, date).await?;
        let rebuilt = aggregate(&day.id, &entries);

        for row in &rebuilt.snapshots {
            daily::insert_snapshot(&mut db_tx, row).await?;
        }
        for row in &rebuilt.products {
            daily::upsert_product_summary(&mut db_tx, row).await?;
        }
        for row in &rebuilt.customers {
            daily::upsert_customer_summary(&mut db_tx, row).await?;
        }

        let totals = rebuilt.totals();
        daily::update_totals(&mut db_tx, &day.id, &totals, true).await?;

        let day = daily::get_by_date(&mut db_tx, date)
            .await?
            .ok_or_else(|| DbError::not_found("DailyInventory", date.to_string()))?;
        db_tx.commit().await?;

        info!(
            date = %date,
            transactions = entries.len(),
            version = day.aggregation_version,
            net_profit = totals.net_profit_cents,
            "Daily inventory rebuilt"
        );
        Ok(day)
    }

    /// Closes a day. A failed final recalculation is logged and does not
    /// block the close.
    pub async fn close(&self, date: NaiveDate, user: &str) -> EngineResult<DailyInventory> {
        let day = {
            let _guard = self.engine.lock_day(date).await;

            let current = self.get_or_create(date).await?;
            if current.is_closed() {
                return Err(invalid_status(date, &current, "close"));
            }

            if let Err(e) = self.recalculate_locked(date).await {
                warn!(date = %date, error = %e, "Closing day without a fresh recalculation");
            }

            let mut conn = self.engine.db().acquire().await?;
            daily::set_status(&mut conn, &current.id, DailyStatus::Closed, Some(Utc::now()), Some(user))
                .await?;
            daily::get_by_date(&mut conn, date)
                .await?
                .ok_or_else(|| DbError::not_found("DailyInventory", date.to_string()))?
        };

        info!(date = %date, user = %user, "Day closed");
        self.engine
            .activity()
            .log("day_closed", "daily_inventory", Some(&date.to_string()), None, Some(user))
            .await;

        Ok(day)
    }

    pub async fn reopen(&self, date: NaiveDate, user: &str) -> EngineResult<DailyInventory> {
        let day = {
            let _guard = self.engine.lock_day(date).await;
            let mut conn = self.engine.db().acquire().await?;

            let current = daily::get_or_create(&mut conn, date).await?;
            if !current.is_closed() {
                return Err(invalid_status(date, &current, "reopen"));
            }

            daily::set_status(&mut conn, &current.id, DailyStatus::Active, None, None).await?;
            daily::get_by_date(&mut conn, date)
                .await?
                .ok_or_else(|| DbError::not_found("DailyInventory", date.to_string()))?
        };

        info!(date = %date, user = %user, "Day reopened");
        self.engine
            .activity()
            .log("day_reopened", "daily_inventory", Some(&date.to_string()), None, Some(user))
            .await;

        Ok(day)
    }

    /// Folds freshly committed transactions into their days.
    ///
    /// Never fails: a closed day or a failed update flags the day
    /// `pending_reconciliation` instead.
    pub(crate) async fn absorb(&self, txs: &[CustomerTransaction]) -> RefreshOutcome {
        let mut by_date: BTreeMap<NaiveDate, Vec<CustomerTransaction>> = BTreeMap::new();
        for tx in txs {
            by_date.entry(tx.business_date()).or_default().push(tx.clone());
        }

        let mut outcome = RefreshOutcome::Applied;
        for (date, batch) in by_date {
            let step = match self.process_batch(date, &batch).await {
                Ok(ProcessOutcome::Applied) | Ok(ProcessOutcome::AlreadyProcessed) => {
                    RefreshOutcome::Applied
                }
                Ok(ProcessOutcome::DayClosed) => {
                    self.mark_pending(date).await;
                    RefreshOutcome::Deferred
                }
                Err(e) => {
                    error!(date = %date, error = %e, "Aggregation failed");
                    self.mark_pending(date).await;
                    RefreshOutcome::Failed
                }
            };
            outcome = outcome.max(step);
        }
        outcome
    }

    /// Brings a day up to date after an entry on it was edited or deleted.
    ///
    /// Never fails: closed days and failed rebuilds are flagged
    /// `pending_reconciliation` instead.
    pub(crate) async fn refresh(&self, date: NaiveDate) -> RefreshOutcome {
        match self.is_day_closed(date).await {
            Ok(true) => {
                warn!(date = %date, "Day is closed, deferring recalculation");
                self.mark_pending(date).await;
                RefreshOutcome::Deferred
            }
            Ok(false) => match self.recalculate(date).await {
                Ok(_) => RefreshOutcome::Rebuilt,
                Err(e) => {
                    error!(date = %date, error = %e, "Recalculation after change failed");
                    self.mark_pending(date).await;
                    RefreshOutcome::Failed
                }
            },
            Err(e) => {
                error!(date = %date, error = %e, "Could not read day status");
                self.mark_pending(date).await;
                RefreshOutcome::Failed
            }
        }
    }

    /// Flags a day for replay. Best effort.
    pub(crate) async fn mark_pending(&self, date: NaiveDate) {
        let result: EngineResult<()> = async {
            let mut conn = self.engine.db().acquire().await?;
            let day = daily::get_or_create(&mut conn, date).await?;
            daily::set_pending(&mut conn, &day.id, true).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => warn!(date = %date, "Day flagged for reconciliation"),
            Err(e) => error!(date = %date, error = %e, "Failed to flag day for reconciliation"),
        }
    }

    // =========================================================================
    // Exports
    // =========================================================================

    /// Day totals with product and customer rows.
    pub async fn export_rows(&self, date: NaiveDate) -> EngineResult<DailyExport> {
        self.with_export_timeout(date, self.build_export(date)).await
    }

    /// [`export_rows`](Self::export_rows) plus every aggregated
    /// transaction.
    pub async fn export_detailed_rows(&self, date: NaiveDate) -> EngineResult<DetailedDailyExport> {
        self.with_export_timeout(date, async {
            let summary = self.build_export(date).await?;
            let mut conn = self.engine.db().acquire().await?;
            let transactions = daily::list_snapshots(&mut conn, &summary.day.id).await?;
            Ok(DetailedDailyExport {
                summary,
                transactions,
            })
        })
        .await
    }

    async fn with_export_timeout<T>(
        &self,
        date: NaiveDate,
        export: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        let limit = self.engine.config().export_timeout();
        match tokio::time::timeout(limit, export).await {
            Ok(result) => result,
            Err(_) => {
                warn!(date = %date, seconds = limit.as_secs(), "Daily export timed out");
                Err(EngineError::ExportTimedOut {
                    date,
                    seconds: limit.as_secs(),
                })
            }
        }
    }

    async fn build_export(&self, date: NaiveDate) -> EngineResult<DailyExport> {
        let mut conn = self.engine.db().acquire().await?;
        let day = daily::get_by_date(&mut conn, date)
            .await?
            .ok_or_else(|| DbError::not_found("DailyInventory", date.to_string()))?;

        let mut products = Vec::new();
        for summary in daily::list_product_summaries(&mut conn, &day.id).await? {
            let product_name = product::get_by_id(&mut conn, &summary.product_id)
                .await?
                .map(|p| p.name)
                .unwrap_or_else(|| summary.product_id.clone());
            products.push(ProductExportRow {
                product_name,
                summary,
            });
        }

        let mut customers = Vec::new();
        for summary in daily::list_customer_summaries(&mut conn, &day.id).await? {
            let owner = customer::get_by_id(&mut conn, &summary.customer_id).await?;
            customers.push(CustomerExportRow {
                customer_name: owner
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| summary.customer_id.clone()),
                phone: owner.map(|c| c.phone),
                summary,
            });
        }

        let config = self.engine.config();
        Ok(DailyExport {
            store_name: config.store_name.clone(),
            currency_symbol: config.currency_symbol.clone(),
            day,
            products,
            customers,
        })
    }

    /// Per-month sums of the stored daily totals.
    pub async fn annual_summary(&self, year: i32) -> EngineResult<AnnualSummary> {
        let (start, end) = year_bounds(year).ok_or_else(|| ValidationError::OutOfRange {
            field: "year".to_string(),
            min: i64::from(NaiveDate::MIN.year()),
            max: i64::from(NaiveDate::MAX.year()) - 1,
        })?;

        let mut conn = self.engine.db().acquire().await?;
        let days = daily::list_between(&mut conn, start, end).await?;
        Ok(annual_summary(year, &days))
    }
}

/// Shop-local calendar date right now.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Snapshot plus summary updates for one transaction.
///
/// Returns `false` when the transaction was already part of the day.
async fn apply_one(
    conn: &mut SqliteConnection,
    day_id: &str,
    tx: &CustomerTransaction,
) -> EngineResult<bool> {
    if !daily::insert_snapshot(conn, &snapshot(day_id, tx)).await? {
        return Ok(false);
    }

    if let Some(product_id) = &tx.product_id {
        let mut summary = daily::get_product_summary(conn, day_id, product_id)
            .await?
            .unwrap_or_else(|| empty_product_summary(day_id, product_id));
        apply_to_product(&mut summary, tx);
        daily::upsert_product_summary(conn, &summary).await?;
    }

    let mut summary = daily::get_customer_summary(conn, day_id, &tx.customer_id)
        .await?
        .unwrap_or_else(|| empty_customer_summary(day_id, &tx.customer_id));
    apply_to_customer(&mut summary, tx);
    daily::upsert_customer_summary(conn, &summary).await?;

    Ok(true)
}

fn invalid_status(date: NaiveDate, day: &DailyInventory, action: &str) -> EngineError {
    CoreError::InvalidDayStatus {
        date: date.to_string(),
        status: day.status.as_str().to_string(),
        action: action.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use dukan_core::daily::DayTotals;

    #[tokio::test]
    async fn test_process_transaction_updates_summaries() {
        let engine = engine().await;
        let item = costed_product(&engine, "Abaya Black M", 10, 10_000, 6000).await;
        let buyer = customer(&engine, "Fatima", "03001234567").await;
        let when = at(2026, 10, 19, 10);

        engine
            .cashier()
            .checkout(&cart_on(&buyer, vec![line(&item, 3, 1000)], 10_000, when), "sara")
            .await
            .unwrap();

        let day = engine.daily().get_by_date(when.date()).await.unwrap().unwrap();
        assert_eq!(day.total_sales_cents, 27_000);
        assert_eq!(day.total_cost_cents, 18_000);
        assert_eq!(day.total_discounts_cents, 3000);
        assert_eq!(day.net_profit_cents, (10_000 - 6000) * 3);
        assert_eq!(day.total_payments_cents, 10_000);
        assert_eq!(day.total_debts_cents, 17_000);
        assert_eq!(day.transactions_count, 1);
        assert_eq!(day.customers_count, 1);
        assert_eq!(day.products_sold_count, 1);
        assert_eq!(day.total_quantity_sold, 3);
    }

    #[tokio::test]
    async fn test_same_transaction_is_aggregated_once() {
        let engine = engine().await;
        let item = product(&engine, "Hijab Navy", 10, 2500).await;
        let buyer = customer(&engine, "Aisha", "03211234567").await;
        let when = at(2026, 10, 19, 11);

        let receipt = engine
            .cashier()
            .checkout(&cart_on(&buyer, vec![line(&item, 2, 0)], 0, when), "sara")
            .await
            .unwrap();

        let outcome = engine
            .daily()
            .process_transaction(&receipt.transactions[0])
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::AlreadyProcessed);

        let day = engine.daily().get_by_date(when.date()).await.unwrap().unwrap();
        assert_eq!(day.transactions_count, 1);
        assert_eq!(day.total_quantity_sold, 2);
    }

    #[tokio::test]
    async fn test_closed_day_ignores_new_transactions() {
        let engine = engine().await;
        let item = product(&engine, "Scarf Olive", 10, 1500).await;
        let buyer = customer(&engine, "Maryam", "03331234567").await;
        let when = at(2026, 10, 18, 9);

        engine.daily().close(when.date(), "sara").await.unwrap();
        assert!(engine.daily().is_day_closed(when.date()).await.unwrap());

        let receipt = engine
            .cashier()
            .checkout(&cart_on(&buyer, vec![line(&item, 1, 0)], 0, when), "sara")
            .await
            .unwrap();

        let outcome = engine
            .daily()
            .process_transaction(&receipt.transactions[0])
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::DayClosed);

        let day = engine.daily().get_by_date(when.date()).await.unwrap().unwrap();
        assert_eq!(day.transactions_count, 0);
        assert_eq!(day.total_sales_cents, 0);
        // the ledger still moved
        assert_eq!(stock_of(&engine, &item.id).await, 9);
    }

    #[tokio::test]
    async fn test_recalculate_is_idempotent() {
        let engine = engine().await;
        let a = costed_product(&engine, "Abaya Black M", 10, 10_000, 6000).await;
        let b = product(&engine, "Hijab Navy", 10, 2500).await;
        let buyer = customer(&engine, "Fatima", "03001234567").await;
        let when = at(2026, 10, 19, 12);

        engine
            .cashier()
            .checkout(
                &cart_on(&buyer, vec![line(&a, 2, 500), line(&b, 3, 0)], 5000, when),
                "sara",
            )
            .await
            .unwrap();

        let incremental = engine.daily().get_by_date(when.date()).await.unwrap().unwrap();
        let first = engine.daily().recalculate(when.date()).await.unwrap();
        let second = engine.daily().recalculate(when.date()).await.unwrap();

        assert_eq!(DayTotals::from_day(&first), DayTotals::from_day(&second));
        assert_eq!(DayTotals::from_day(&incremental), DayTotals::from_day(&first));
        assert_eq!(second.aggregation_version, first.aggregation_version + 1);

        // b has no cost basis: no cost and no profit for it
        assert_eq!(first.total_cost_cents, 12_000);
        assert_eq!(first.net_profit_cents, (10_000 - 6000) * 2);
        assert_eq!(first.total_sales_cents, 19_000 + 7500);
    }

    #[tokio::test]
    async fn test_close_and_reopen_lifecycle() {
        let engine = engine().await;
        let date = date(2026, 10, 19);
        let daily = engine.daily();

        let closed = daily.close(date, "sara").await.unwrap();
        assert_eq!(closed.status, DailyStatus::Closed);
        assert_eq!(closed.closed_by.as_deref(), Some("sara"));
        assert!(closed.closed_at.is_some());

        let err = daily.close(date, "sara").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidDayStatus { .. })));

        let reopened = daily.reopen(date, "omar").await.unwrap();
        assert_eq!(reopened.status, DailyStatus::Active);
        assert!(reopened.closed_at.is_none());

        let err = daily.reopen(date, "omar").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidDayStatus { .. })));
    }

    #[tokio::test]
    async fn test_recalculate_allowed_on_closed_day() {
        let engine = engine().await;
        let item = product(&engine, "Niqab Black", 5, 1800).await;
        let buyer = customer(&engine, "Zainab", "03451234567").await;
        let when = at(2026, 10, 17, 15);

        engine.daily().close(when.date(), "sara").await.unwrap();
        engine
            .cashier()
            .checkout(&cart_on(&buyer, vec![line(&item, 2, 0)], 0, when), "sara")
            .await
            .unwrap();

        let rebuilt = engine.daily().recalculate(when.date()).await.unwrap();
        assert!(rebuilt.is_closed());
        assert_eq!(rebuilt.total_sales_cents, 3600);
        assert!(!rebuilt.pending_reconciliation);
    }

    #[tokio::test]
    async fn test_export_rows_name_products_and_customers() {
        let engine = engine().await;
        let item = product(&engine, "Kaftan Beige L", 5, 12_000).await;
        let buyer = customer(&engine, "Fatima", "03001234567").await;
        let when = at(2026, 10, 19, 16);

        engine
            .cashier()
            .checkout(&cart_on(&buyer, vec![line(&item, 1, 0)], 12_000, when), "sara")
            .await
            .unwrap();

        let export = engine.daily().export_rows(when.date()).await.unwrap();
        assert_eq!(export.products.len(), 1);
        assert_eq!(export.products[0].product_name, "Kaftan Beige L");
        assert_eq!(export.customers[0].customer_name, "Fatima");
        assert_eq!(export.customers[0].summary.debt_amount_cents, 0);

        let detailed = engine.daily().export_detailed_rows(when.date()).await.unwrap();
        assert_eq!(detailed.transactions.len(), 1);
        assert_eq!(detailed.summary.day.id, export.day.id);
    }

    #[tokio::test]
    async fn test_export_of_unknown_day_is_not_found() {
        let engine = engine().await;
        let err = engine.daily().export_rows(date(2020, 1, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Db(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_export_times_out() {
        let config = crate::EngineConfig {
            export_timeout_secs: 0,
            ..crate::EngineConfig::in_memory()
        };
        let engine = Engine::open(config).await.unwrap();

        // an export still running when the limit passes
        let slow = async {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok::<(), EngineError>(())
        };
        let err = engine
            .daily()
            .with_export_timeout(date(2026, 10, 19), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExportTimedOut { seconds: 0, .. }));

        // a finished export is returned as is
        let rows = engine
            .daily()
            .with_export_timeout(date(2026, 10, 19), async { Ok::<u32, EngineError>(7) })
            .await;
        assert_eq!(rows.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_annual_summary_groups_by_month() {
        let engine = engine().await;
        let item = product(&engine, "Abaya Navy S", 20, 10_000).await;
        let buyer = customer(&engine, "Fatima", "03001234567").await;

        for when in [at(2026, 1, 5, 10), at(2026, 1, 20, 10), at(2026, 3, 2, 10)] {
            engine
                .cashier()
                .checkout(&cart_on(&buyer, vec![line(&item, 1, 0)], 0, when), "sara")
                .await
                .unwrap();
        }

        let summary = engine.daily().annual_summary(2026).await.unwrap();
        assert_eq!(summary.months.len(), 12);
        assert_eq!(summary.months[0].days_count, 2);
        assert_eq!(summary.months[0].totals.total_sales_cents, 20_000);
        assert_eq!(summary.months[2].totals.total_sales_cents, 10_000);
        assert_eq!(summary.year_totals.total_sales_cents, 30_000);
        assert_eq!(summary.days_count, 3);
    }
}
