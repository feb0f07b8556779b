//! # Daily Aggregation Rules
//!
//! Pure accumulators that roll ledger entries into a day's summaries.
//! The same rules serve both the incremental path (one transaction at a
//! time) and the full rebuild, so the two can never drift apart.
//!
//! ## Aggregation Flow
//! ```text
//! CustomerTransaction
//!        │
//!        ├──► DailySaleTransaction   (snapshot, one per tx per day)
//!        │
//!        ├──► DailyProductSummary    (skipped for payments)
//!        │      qty_sold   += qty            if qty > 0
//!        │      sales      += price × qty
//!        │      cost       += cost × qty     if cost > 0
//!        │      discounts  += disc × qty     if qty > 0
//!        │      net_sales  += total
//!        │      profit     += total - cost × qty   if cost > 0
//!        │
//!        └──► DailyCustomerSummary
//!               count     += 1
//!               purchases += total
//!               payments  += paid            if shipping == 0 and paid > 0
//!               debt       = purchases - payments
//!
//! children ──► DayTotals (pure sums) ──► DailyInventory columns
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use uuid::Uuid;

use crate::pricing::{line_cost_cents, line_profit_cents};
use crate::types::{
    CustomerTransaction, DailyCustomerSummary, DailyInventory, DailyProductSummary,
    DailySaleTransaction, TransactionKind,
};

// =============================================================================
// Per-Transaction Accumulators
// =============================================================================

/// Builds the snapshot row recorded when a transaction is aggregated.
pub fn snapshot(daily_inventory_id: &str, tx: &CustomerTransaction) -> DailySaleTransaction {
    DailySaleTransaction {
        id: Uuid::new_v4().to_string(),
        daily_inventory_id: daily_inventory_id.to_string(),
        transaction_id: tx.id.clone(),
        customer_id: tx.customer_id.clone(),
        product_id: tx.product_id.clone(),
        kind: tx.kind,
        quantity: tx.quantity,
        price_cents: tx.price_cents,
        discount_cents: tx.discount_cents,
        total_price_cents: tx.total_price_cents,
        unit_cost_cents: tx.unit_cost_cents,
        amount_paid_cents: tx.amount_paid_cents,
        shipping_cents: tx.shipping_cents,
        transaction_date: tx.transaction_date,
    }
}

/// Folds one transaction into a product summary.
pub fn apply_to_product(summary: &mut DailyProductSummary, tx: &CustomerTransaction) {
    let qty = tx.quantity;

    if qty > 0 {
        summary.total_quantity_sold += qty;
        summary.total_discounts_cents += tx.discount_cents * qty;
    }
    summary.total_sales_value_cents += tx.price_cents * qty;
    summary.total_cost_value_cents += line_cost_cents(tx.unit_cost_cents, qty);
    summary.net_sales_value_cents += tx.total_price_cents;
    summary.net_profit_cents += line_profit_cents(tx.price_cents, tx.unit_cost_cents, qty);
    summary.transactions_count += 1;
}

/// Folds one transaction into a customer summary.
pub fn apply_to_customer(summary: &mut DailyCustomerSummary, tx: &CustomerTransaction) {
    summary.transactions_count += 1;
    summary.total_purchases_cents += tx.total_price_cents;
    if tx.shipping_cents == 0 && tx.amount_paid_cents > 0 {
        summary.total_payments_cents += tx.amount_paid_cents;
    }
    summary.debt_amount_cents = summary.total_purchases_cents - summary.total_payments_cents;
}

pub fn empty_product_summary(daily_inventory_id: &str, product_id: &str) -> DailyProductSummary {
    DailyProductSummary {
        daily_inventory_id: daily_inventory_id.to_string(),
        product_id: product_id.to_string(),
        ..Default::default()
    }
}

pub fn empty_customer_summary(daily_inventory_id: &str, customer_id: &str) -> DailyCustomerSummary {
    DailyCustomerSummary {
        daily_inventory_id: daily_inventory_id.to_string(),
        customer_id: customer_id.to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Full Rebuild
// =============================================================================

/// Everything a day owns below its `DailyInventory` row.
#[derive(Debug, Clone, Default)]
pub struct DayAggregate {
    pub snapshots: Vec<DailySaleTransaction>,
    pub products: Vec<DailyProductSummary>,
    pub customers: Vec<DailyCustomerSummary>,
}

impl DayAggregate {
    /// Totals for the parent row.
    pub fn totals(&self) -> DayTotals {
        DayTotals::compute(&self.products, &self.customers, &self.snapshots)
    }
}

/// Replays a day's transactions from scratch.
///
/// Duplicate transaction ids are aggregated once.
pub fn aggregate(daily_inventory_id: &str, transactions: &[CustomerTransaction]) -> DayAggregate {
    let mut seen = std::collections::HashSet::new();
    let mut snapshots = Vec::with_capacity(transactions.len());
    let mut products: BTreeMap<String, DailyProductSummary> = BTreeMap::new();
    let mut customers: BTreeMap<String, DailyCustomerSummary> = BTreeMap::new();

    for tx in transactions {
        if !seen.insert(tx.id.as_str()) {
            continue;
        }

        snapshots.push(snapshot(daily_inventory_id, tx));

        if let Some(product_id) = &tx.product_id {
            let summary = products
                .entry(product_id.clone())
                .or_insert_with(|| empty_product_summary(daily_inventory_id, product_id));
            apply_to_product(summary, tx);
        }

        let summary = customers
            .entry(tx.customer_id.clone())
            .or_insert_with(|| empty_customer_summary(daily_inventory_id, &tx.customer_id));
        apply_to_customer(summary, tx);
    }

    DayAggregate {
        snapshots,
        products: products.into_values().collect(),
        customers: customers.into_values().collect(),
    }
}

// =============================================================================
// Day Totals
// =============================================================================

/// Parent-row totals, always derived from child rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DayTotals {
    pub total_sales_cents: i64,
    pub total_cost_cents: i64,
    pub total_discounts_cents: i64,
    pub net_profit_cents: i64,
    pub total_payments_cents: i64,
    pub total_debts_cents: i64,
    pub transactions_count: i64,
    pub customers_count: i64,
    pub products_sold_count: i64,
    pub total_quantity_sold: i64,
    pub returns_count: i64,
    pub exchanges_count: i64,
}

impl DayTotals {
    pub fn compute(
        products: &[DailyProductSummary],
        customers: &[DailyCustomerSummary],
        snapshots: &[DailySaleTransaction],
    ) -> Self {
        let mut totals = DayTotals::default();

        for p in products {
            totals.total_sales_cents += p.net_sales_value_cents;
            totals.total_cost_cents += p.total_cost_value_cents;
            totals.total_discounts_cents += p.total_discounts_cents;
            totals.net_profit_cents += p.net_profit_cents;
            totals.total_quantity_sold += p.total_quantity_sold;
            if p.total_quantity_sold > 0 {
                totals.products_sold_count += 1;
            }
        }

        for c in customers {
            totals.total_payments_cents += c.total_payments_cents;
            if c.debt_amount_cents > 0 {
                totals.total_debts_cents += c.debt_amount_cents;
            }
        }
        totals.customers_count = customers.len() as i64;

        totals.transactions_count = snapshots.len() as i64;
        totals.returns_count = snapshots
            .iter()
            .filter(|s| s.kind == TransactionKind::Return)
            .count() as i64;
        // an exchange writes two legs; only the returned leg counts
        totals.exchanges_count = snapshots
            .iter()
            .filter(|s| s.kind == TransactionKind::Exchange && s.quantity < 0)
            .count() as i64;

        totals
    }

    /// Copies the totals onto a day row.
    pub fn apply_to(&self, day: &mut DailyInventory) {
        day.total_sales_cents = self.total_sales_cents;
        day.total_cost_cents = self.total_cost_cents;
        day.total_discounts_cents = self.total_discounts_cents;
        day.net_profit_cents = self.net_profit_cents;
        day.total_payments_cents = self.total_payments_cents;
        day.total_debts_cents = self.total_debts_cents;
        day.transactions_count = self.transactions_count;
        day.customers_count = self.customers_count;
        day.products_sold_count = self.products_sold_count;
        day.total_quantity_sold = self.total_quantity_sold;
        day.returns_count = self.returns_count;
        day.exchanges_count = self.exchanges_count;
    }

    /// Reads the totals back off a day row.
    pub fn from_day(day: &DailyInventory) -> Self {
        DayTotals {
            total_sales_cents: day.total_sales_cents,
            total_cost_cents: day.total_cost_cents,
            total_discounts_cents: day.total_discounts_cents,
            net_profit_cents: day.net_profit_cents,
            total_payments_cents: day.total_payments_cents,
            total_debts_cents: day.total_debts_cents,
            transactions_count: day.transactions_count,
            customers_count: day.customers_count,
            products_sold_count: day.products_sold_count,
            total_quantity_sold: day.total_quantity_sold,
            returns_count: day.returns_count,
            exchanges_count: day.exchanges_count,
        }
    }

    fn accumulate(&mut self, other: &DayTotals) {
        self.total_sales_cents += other.total_sales_cents;
        self.total_cost_cents += other.total_cost_cents;
        self.total_discounts_cents += other.total_discounts_cents;
        self.net_profit_cents += other.net_profit_cents;
        self.total_payments_cents += other.total_payments_cents;
        self.total_debts_cents += other.total_debts_cents;
        self.transactions_count += other.transactions_count;
        self.customers_count += other.customers_count;
        self.products_sold_count += other.products_sold_count;
        self.total_quantity_sold += other.total_quantity_sold;
        self.returns_count += other.returns_count;
        self.exchanges_count += other.exchanges_count;
    }
}

// =============================================================================
// Annual Projection
// =============================================================================

/// Sums of the daily totals inside one calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthSummary {
    pub month: u32,
    pub days_count: i64,
    pub totals: DayTotals,
}

/// Per-month breakdown of a year plus the year total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnnualSummary {
    pub year: i32,
    /// Always twelve entries, January first.
    pub months: Vec<MonthSummary>,
    pub year_totals: DayTotals,
    pub days_count: i64,
}

/// Folds the days of `year` into monthly sums. Days of other years are
/// ignored.
pub fn annual_summary(year: i32, days: &[DailyInventory]) -> AnnualSummary {
    let mut months: Vec<MonthSummary> = (1..=12)
        .map(|month| MonthSummary {
            month,
            ..Default::default()
        })
        .collect();
    let mut year_totals = DayTotals::default();
    let mut days_count = 0;

    for day in days.iter().filter(|d| d.business_date.year() == year) {
        let totals = DayTotals::from_day(day);
        let month = &mut months[day.business_date.month0() as usize];
        month.days_count += 1;
        month.totals.accumulate(&totals);
        year_totals.accumulate(&totals);
        days_count += 1;
    }

    AnnualSummary {
        year,
        months,
        year_totals,
        days_count,
    }
}

/// First day and first day of the following year, for range queries.
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    Some((start, end))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyStatus;
    use chrono::{NaiveDateTime, Utc};

    fn at(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn tx(
        id: &str,
        kind: TransactionKind,
        product: Option<&str>,
        qty: i64,
        price: i64,
        discount: i64,
        cost: Option<i64>,
    ) -> CustomerTransaction {
        CustomerTransaction {
            id: id.to_string(),
            customer_id: "c-1".to_string(),
            product_id: product.map(str::to_string),
            kind,
            quantity: qty,
            price_cents: price,
            discount_cents: discount,
            total_price_cents: (price - discount) * qty,
            unit_cost_cents: cost,
            shipping_cents: 0,
            amount_paid_cents: 0,
            transaction_date: at("2026-10-19"),
            invoice_number: None,
            notes: None,
            color: None,
            size: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sale_and_return_product_summary() {
        let sale = tx("t1", TransactionKind::Sale, Some("p"), 3, 10_000, 1000, Some(6000));
        let refund = tx("t2", TransactionKind::Return, Some("p"), -1, 9000, 0, Some(6000));

        let agg = aggregate("d", &[sale, refund]);
        let p = &agg.products[0];
        assert_eq!(p.total_quantity_sold, 3);
        assert_eq!(p.total_sales_value_cents, 30_000 - 9000);
        assert_eq!(p.total_cost_value_cents, 18_000 - 6000);
        assert_eq!(p.total_discounts_cents, 3000);
        assert_eq!(p.net_sales_value_cents, 27_000 - 9000);
        assert_eq!(p.net_profit_cents, 12_000 - 3000);
        assert_eq!(p.transactions_count, 2);
    }

    #[test]
    fn test_no_cost_basis_no_profit() {
        let sale = tx("t1", TransactionKind::Sale, Some("p"), 2, 5000, 0, None);
        let agg = aggregate("d", &[sale]);
        assert_eq!(agg.products[0].net_profit_cents, 0);
        assert_eq!(agg.products[0].total_cost_value_cents, 0);
        assert_eq!(agg.totals().net_profit_cents, 0);
    }

    #[test]
    fn test_customer_payments_skip_shipping_rows() {
        let mut paid = tx("t1", TransactionKind::Sale, Some("p"), 1, 10_000, 0, None);
        paid.amount_paid_cents = 4000;
        let mut shipped = tx("t2", TransactionKind::Sale, Some("q"), 1, 5000, 0, None);
        shipped.amount_paid_cents = 2000;
        shipped.shipping_cents = 500;

        let agg = aggregate("d", &[paid, shipped]);
        let c = &agg.customers[0];
        assert_eq!(c.transactions_count, 2);
        assert_eq!(c.total_purchases_cents, 15_000);
        assert_eq!(c.total_payments_cents, 4000);
        assert_eq!(c.debt_amount_cents, 11_000);
    }

    #[test]
    fn test_payment_entry_reduces_debt_without_product_row() {
        let sale = tx("t1", TransactionKind::Sale, Some("p"), 1, 10_000, 0, None);
        let mut payment = tx("t2", TransactionKind::Payment, None, 0, 0, 0, None);
        payment.amount_paid_cents = 10_000;

        let agg = aggregate("d", &[sale, payment]);
        assert_eq!(agg.products.len(), 1);
        assert_eq!(agg.customers[0].debt_amount_cents, 0);
        assert_eq!(agg.totals().total_debts_cents, 0);
        assert_eq!(agg.totals().transactions_count, 2);
    }

    #[test]
    fn test_totals_count_returns_and_exchanges() {
        let txs = vec![
            tx("t1", TransactionKind::Sale, Some("a"), 2, 5000, 0, None),
            tx("t2", TransactionKind::Return, Some("a"), -1, 5000, 0, None),
            tx("t3", TransactionKind::Exchange, Some("a"), -1, 5000, 0, None),
            tx("t4", TransactionKind::Exchange, Some("b"), 1, 7000, 0, None),
        ];
        let totals = aggregate("d", &txs).totals();
        assert_eq!(totals.returns_count, 1);
        assert_eq!(totals.exchanges_count, 1);
        assert_eq!(totals.transactions_count, 4);
        assert_eq!(totals.products_sold_count, 2);
        assert_eq!(totals.total_quantity_sold, 3);
        assert_eq!(totals.total_sales_cents, 10_000 - 5000 - 5000 + 7000);
    }

    #[test]
    fn test_total_debts_ignore_credit_balances() {
        let mut refund = tx("t1", TransactionKind::Return, Some("a"), -1, 5000, 0, None);
        refund.customer_id = "c-2".to_string();
        let sale = tx("t2", TransactionKind::Sale, Some("a"), 1, 3000, 0, None);

        let totals = aggregate("d", &[refund, sale]).totals();
        assert_eq!(totals.total_debts_cents, 3000);
        assert_eq!(totals.customers_count, 2);
    }

    #[test]
    fn test_rebuild_is_idempotent_and_dedupes() {
        let sale = tx("t1", TransactionKind::Sale, Some("p"), 3, 10_000, 1000, Some(6000));
        let first = aggregate("d", &[sale.clone(), sale.clone()]).totals();
        let second = aggregate("d", &[sale]).totals();
        assert_eq!(first, second);
        assert_eq!(first.transactions_count, 1);
    }

    #[test]
    fn test_incremental_matches_rebuild() {
        let txs = vec![
            tx("t1", TransactionKind::Sale, Some("p"), 3, 10_000, 1000, Some(6000)),
            tx("t2", TransactionKind::Return, Some("p"), -1, 9000, 0, Some(6000)),
        ];
        let mut product = empty_product_summary("d", "p");
        let mut customer = empty_customer_summary("d", "c-1");
        for t in &txs {
            apply_to_product(&mut product, t);
            apply_to_customer(&mut customer, t);
        }
        let rebuilt = aggregate("d", &txs);
        assert_eq!(rebuilt.products, vec![product]);
        assert_eq!(rebuilt.customers, vec![customer]);
    }

    #[test]
    fn test_annual_summary_groups_by_month() {
        let day = |date: &str, sales: i64| {
            let now = Utc::now();
            let mut d = DailyInventory {
                id: date.to_string(),
                business_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                status: DailyStatus::Active,
                total_sales_cents: 0,
                total_cost_cents: 0,
                total_discounts_cents: 0,
                net_profit_cents: 0,
                total_payments_cents: 0,
                total_debts_cents: 0,
                transactions_count: 1,
                customers_count: 0,
                products_sold_count: 0,
                total_quantity_sold: 0,
                returns_count: 0,
                exchanges_count: 0,
                pending_reconciliation: false,
                aggregation_version: 1,
                notes: None,
                closed_at: None,
                closed_by: None,
                created_at: now,
                updated_at: now,
            };
            d.total_sales_cents = sales;
            d
        };

        let days = vec![
            day("2026-01-05", 1000),
            day("2026-01-06", 2000),
            day("2026-03-01", 500),
            day("2025-12-31", 9999),
        ];
        let summary = annual_summary(2026, &days);
        assert_eq!(summary.months.len(), 12);
        assert_eq!(summary.months[0].totals.total_sales_cents, 3000);
        assert_eq!(summary.months[0].days_count, 2);
        assert_eq!(summary.months[1].days_count, 0);
        assert_eq!(summary.months[2].totals.total_sales_cents, 500);
        assert_eq!(summary.year_totals.total_sales_cents, 3500);
        assert_eq!(summary.year_totals.transactions_count, 3);
        assert_eq!(summary.days_count, 3);
    }

    #[test]
    fn test_year_bounds() {
        let (start, end) = year_bounds(2026).unwrap();
        assert_eq!(start.to_string(), "2026-01-01");
        assert_eq!(end.to_string(), "2027-01-01");
    }
}
