//! # Return / Exchange Tracker
//!
//! Side-channel returns and exchanges against an existing invoice.
//!
//! ## Quantity Cap
//! ```text
//! Invoice 0007, product A, sold 3
//!
//!   returned   Σ ReturnTracking.returned_quantity     (0007, A)
//! + exchanged  Σ ExchangeTracking.exchanged_quantity  (0007, A)
//! ─────────────────────────────────────────────────────────────
//!   used ≤ 3   otherwise QuantityExceedsAvailable, nothing written
//! ```
//!
//! ## Exchange Legs
//! ```text
//! old product  qty -n  at the price actually paid (discount reversed once)
//! new product  qty +n  at its current price, stock CAS like a sale
//!
//! price_difference = new × n − paid_old × n   (> 0: customer owes)
//! ```
//!
//! Everything up to the tracking row commits as one unit; the day figures
//! are reconciled afterwards and never fail the operation.

use chrono::{Local, Utc};
use dukan_core::ledger::StockMovement;
use dukan_core::pricing::{exchange_price_difference, paid_unit_price, price_line, return_line, LinePrice};
use dukan_core::returns::{check_against_invoice, ReturnAvailability};
use dukan_core::{
    CoreError, Customer, CustomerTransaction, ExchangeTracking, Invoice, InvoiceItem, InvoiceType,
    Product, ReturnTracking, TransactionKind,
};
use dukan_db::repository::{customer, invoice, product, tracking, transaction};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::cashier::move_stock;
use crate::error::EngineResult;
use crate::invoicing::{log_invoice, write_invoice, InvoiceOptions};
use crate::reconciliation::DayReconciliation;
use crate::Engine;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnRequest {
    pub original_invoice_number: String,
    pub product_id: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExchangeRequest {
    pub original_invoice_number: String,
    pub old_product_id: String,
    pub new_product_id: String,
    pub quantity: i64,
    /// Paid now towards a positive price difference.
    #[serde(default)]
    pub amount_paid_cents: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnReceipt {
    pub tracking: ReturnTracking,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub transactions: Vec<CustomerTransaction>,
    pub reconciliation: Vec<DayReconciliation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExchangeReceipt {
    pub tracking: ExchangeTracking,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub transactions: Vec<CustomerTransaction>,
    pub reconciliation: Vec<DayReconciliation>,
}

/// Everything already returned or exchanged against one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnHistory {
    pub invoice_number: String,
    pub returns: Vec<ReturnTracking>,
    pub exchanges: Vec<ExchangeTracking>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReturnTracker<'a> {
    engine: &'a Engine,
}

impl<'a> ReturnTracker<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        ReturnTracker { engine }
    }

    /// Units of a product still returnable on an invoice.
    ///
    /// ## Errors
    /// * `CoreError::OriginalInvoiceNotFound`
    /// * `CoreError::ProductNotInOriginalInvoice`
    pub async fn available_quantity(
        &self,
        invoice_number: &str,
        product_id: &str,
    ) -> EngineResult<ReturnAvailability> {
        let mut conn = self.engine.db().acquire().await?;
        let line = load_line(&mut conn, invoice_number, product_id).await?;
        Ok(line.availability)
    }

    pub async fn history(&self, invoice_number: &str) -> EngineResult<ReturnHistory> {
        let mut conn = self.engine.db().acquire().await?;
        if invoice::get_by_number(&mut conn, invoice_number).await?.is_none() {
            return Err(CoreError::OriginalInvoiceNotFound(invoice_number.to_string()).into());
        }

        Ok(ReturnHistory {
            invoice_number: invoice_number.to_string(),
            returns: tracking::returns_for_invoice(&mut conn, invoice_number).await?,
            exchanges: tracking::exchanges_for_invoice(&mut conn, invoice_number).await?,
        })
    }

    /// Returns units of an invoiced product.
    ///
    /// Writes a Return invoice with one mirror entry at the price the
    /// customer actually paid, puts the units back on the shelf and records
    /// the tracking row.
    pub async fn save_return_tracking(&self, request: &ReturnRequest, cashier: &str) -> EngineResult<ReturnReceipt> {
        let mut db_tx = self.engine.db().begin().await?;

        let line = load_line(&mut db_tx, &request.original_invoice_number, &request.product_id).await?;
        check_against_invoice(&request.product_id, line.availability, request.quantity)?;

        let buyer = invoice_customer(&mut db_tx, &line.invoice).await?;
        let item = existing_product(&mut db_tx, &request.product_id).await?;

        let priced = return_line(line.sold.unit_price_cents, line.sold.discount_cents, request.quantity)?;
        let unit_cost = original_cost(&mut db_tx, &line.sold, &item).await?;
        let entry = leg(&buyer, &item, TransactionKind::Return, &priced, unit_cost, request.reason.clone());

        move_stock(&mut db_tx, &item.id, StockMovement::Increase(request.quantity)).await?;
        transaction::insert(&mut db_tx, &entry).await?;

        let options = InvoiceOptions {
            invoice_type: InvoiceType::Return,
            amount_paid_cents: 0,
            shipping_cents: 0,
            original_invoice_number: Some(request.original_invoice_number.clone()),
            notes: request.reason.clone(),
        };
        let receipt = write_invoice(&mut db_tx, &buyer, vec![entry], &options, cashier).await?;

        let row = ReturnTracking {
            id: Uuid::new_v4().to_string(),
            original_invoice_number: request.original_invoice_number.clone(),
            return_invoice_number: receipt.invoice.invoice_number.clone(),
            product_id: item.id.clone(),
            returned_quantity: request.quantity,
            reason: request.reason.clone(),
            created_at: Utc::now(),
            created_by: cashier.to_string(),
        };
        tracking::insert_return(&mut db_tx, &row).await?;

        db_tx.commit().await?;

        info!(
            original = %row.original_invoice_number,
            invoice_number = %row.return_invoice_number,
            product_id = %row.product_id,
            quantity = row.returned_quantity,
            "Return recorded"
        );
        log_invoice(self.engine, &receipt, cashier).await;

        let reconciliation = self.engine.reconciliation().reconcile(&receipt.transactions).await;

        self.engine
            .activity()
            .log(
                "return_recorded",
                "invoice",
                Some(&row.original_invoice_number),
                Some(serde_json::json!({
                    "returnInvoice": row.return_invoice_number,
                    "productId": row.product_id,
                    "quantity": row.returned_quantity,
                })),
                Some(cashier),
            )
            .await;

        Ok(ReturnReceipt {
            tracking: row,
            invoice: receipt.invoice,
            items: receipt.items,
            transactions: receipt.transactions,
            reconciliation,
        })
    }

    /// Swaps invoiced units of one product for another.
    pub async fn save_exchange_tracking(
        &self,
        request: &ExchangeRequest,
        cashier: &str,
    ) -> EngineResult<ExchangeReceipt> {
        let mut db_tx = self.engine.db().begin().await?;

        let line = load_line(&mut db_tx, &request.original_invoice_number, &request.old_product_id).await?;
        check_against_invoice(&request.old_product_id, line.availability, request.quantity)?;

        let buyer = invoice_customer(&mut db_tx, &line.invoice).await?;
        let old_item = existing_product(&mut db_tx, &request.old_product_id).await?;
        let new_item = existing_product(&mut db_tx, &request.new_product_id).await?;
        if !new_item.is_active {
            return Err(CoreError::ProductNotFound(new_item.id).into());
        }

        let returned = return_line(line.sold.unit_price_cents, line.sold.discount_cents, request.quantity)?;
        let old_cost = original_cost(&mut db_tx, &line.sold, &old_item).await?;
        let old_leg = leg(&buyer, &old_item, TransactionKind::Exchange, &returned, old_cost, request.reason.clone());

        let taken = price_line(request.quantity, new_item.price_cents, 0)?;
        let new_leg = leg(
            &buyer,
            &new_item,
            TransactionKind::Exchange,
            &taken,
            new_item.cost_basis(),
            request.reason.clone(),
        );

        move_stock(&mut db_tx, &old_item.id, StockMovement::Increase(request.quantity)).await?;
        move_stock(&mut db_tx, &new_item.id, StockMovement::Decrease(request.quantity)).await?;
        transaction::insert(&mut db_tx, &old_leg).await?;
        transaction::insert(&mut db_tx, &new_leg).await?;

        let price_difference = exchange_price_difference(
            new_item.price_cents,
            paid_unit_price(line.sold.unit_price_cents, line.sold.discount_cents),
            request.quantity,
        );

        let options = InvoiceOptions {
            invoice_type: InvoiceType::Exchange,
            amount_paid_cents: request.amount_paid_cents,
            shipping_cents: 0,
            original_invoice_number: Some(request.original_invoice_number.clone()),
            notes: request.reason.clone(),
        };
        let receipt = write_invoice(&mut db_tx, &buyer, vec![old_leg, new_leg], &options, cashier).await?;

        let row = ExchangeTracking {
            id: Uuid::new_v4().to_string(),
            original_invoice_number: request.original_invoice_number.clone(),
            exchange_invoice_number: receipt.invoice.invoice_number.clone(),
            old_product_id: old_item.id.clone(),
            new_product_id: new_item.id.clone(),
            exchanged_quantity: request.quantity,
            price_difference_cents: price_difference,
            reason: request.reason.clone(),
            created_at: Utc::now(),
            created_by: cashier.to_string(),
        };
        tracking::insert_exchange(&mut db_tx, &row).await?;

        db_tx.commit().await?;

        info!(
            original = %row.original_invoice_number,
            invoice_number = %row.exchange_invoice_number,
            old_product_id = %row.old_product_id,
            new_product_id = %row.new_product_id,
            quantity = row.exchanged_quantity,
            price_difference = row.price_difference_cents,
            "Exchange recorded"
        );
        log_invoice(self.engine, &receipt, cashier).await;

        let reconciliation = self.engine.reconciliation().reconcile(&receipt.transactions).await;

        self.engine
            .activity()
            .log(
                "exchange_recorded",
                "invoice",
                Some(&row.original_invoice_number),
                Some(serde_json::json!({
                    "exchangeInvoice": row.exchange_invoice_number,
                    "oldProductId": row.old_product_id,
                    "newProductId": row.new_product_id,
                    "quantity": row.exchanged_quantity,
                    "priceDifference": row.price_difference_cents,
                })),
                Some(cashier),
            )
            .await;

        Ok(ExchangeReceipt {
            tracking: row,
            invoice: receipt.invoice,
            items: receipt.items,
            transactions: receipt.transactions,
            reconciliation,
        })
    }
}

/// An invoice line as seen by a return or exchange.
struct SoldLine {
    invoice: Invoice,
    /// First sold line of the product; its price is the refund basis.
    sold: InvoiceItem,
    availability: ReturnAvailability,
}

async fn load_line(
    conn: &mut SqliteConnection,
    invoice_number: &str,
    product_id: &str,
) -> EngineResult<SoldLine> {
    let original = invoice::get_by_number(conn, invoice_number)
        .await?
        .ok_or_else(|| CoreError::OriginalInvoiceNotFound(invoice_number.to_string()))?;

    let sold = invoice::sold_items(conn, invoice_number, product_id).await?;
    let original_quantity: i64 = sold.iter().map(|i| i.quantity).sum();
    let Some(first) = sold.into_iter().next() else {
        return Err(CoreError::ProductNotInOriginalInvoice {
            invoice_number: invoice_number.to_string(),
            product_id: product_id.to_string(),
        }
        .into());
    };

    let availability = tracking::availability(conn, invoice_number, product_id, original_quantity).await?;

    Ok(SoldLine {
        invoice: original,
        sold: first,
        availability,
    })
}

async fn invoice_customer(conn: &mut SqliteConnection, original: &Invoice) -> EngineResult<Customer> {
    customer::get_by_id(conn, &original.customer_id).await?.ok_or_else(|| {
        CoreError::CustomerValidationFailed(format!(
            "customer {} of invoice {} no longer exists",
            original.customer_id, original.invoice_number
        ))
        .into()
    })
}

/// Soft-deleted products still resolve; they can be returned.
async fn existing_product(conn: &mut SqliteConnection, id: &str) -> EngineResult<Product> {
    product::get_by_id(conn, id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

/// Cost basis captured on the original sale, else the product's current one.
async fn original_cost(conn: &mut SqliteConnection, sold: &InvoiceItem, item: &Product) -> EngineResult<Option<i64>> {
    let captured = transaction::get_by_id(conn, &sold.transaction_id)
        .await?
        .and_then(|t| t.unit_cost_cents);
    Ok(captured.or_else(|| item.cost_basis()))
}

fn leg(
    buyer: &Customer,
    item: &Product,
    kind: TransactionKind,
    priced: &LinePrice,
    unit_cost_cents: Option<i64>,
    notes: Option<String>,
) -> CustomerTransaction {
    CustomerTransaction {
        id: transaction::generate_transaction_id(),
        customer_id: buyer.id.clone(),
        product_id: Some(item.id.clone()),
        kind,
        quantity: priced.quantity,
        price_cents: priced.unit_price_cents,
        discount_cents: priced.discount_cents,
        total_price_cents: priced.total_price_cents,
        unit_cost_cents,
        shipping_cents: 0,
        amount_paid_cents: 0,
        transaction_date: Local::now().naive_local(),
        invoice_number: None,
        notes,
        color: item.color.clone(),
        size: item.size.clone(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::EngineError;
    use dukan_core::InvoiceStatus;

    async fn sold(engine: &Engine, item: &Product, quantity: i64, discount: i64) -> (Customer, String) {
        let buyer = customer(engine, "Hafsa", "03121234567").await;
        let receipt = engine
            .cashier()
            .checkout(&cart(&buyer, vec![line(item, quantity, discount)], 0), "sara")
            .await
            .unwrap();
        (buyer, receipt.invoice.invoice_number)
    }

    fn return_of(number: &str, item: &Product, quantity: i64) -> ReturnRequest {
        ReturnRequest {
            original_invoice_number: number.to_string(),
            product_id: item.id.clone(),
            quantity,
            reason: Some("wrong size".to_string()),
        }
    }

    #[tokio::test]
    async fn test_return_refunds_paid_price() {
        let engine = engine().await;
        let item = costed_product(&engine, "Abaya Black M", 10, 10_000, 6000).await;
        let (buyer, number) = sold(&engine, &item, 3, 1000).await;

        let receipt = engine
            .returns()
            .save_return_tracking(&return_of(&number, &item, 2), "sara")
            .await
            .unwrap();

        let entry = &receipt.transactions[0];
        assert_eq!(entry.kind, TransactionKind::Return);
        assert_eq!(entry.quantity, -2);
        assert_eq!(entry.price_cents, 9000);
        assert_eq!(entry.discount_cents, 0);
        assert_eq!(entry.total_price_cents, -18_000);
        assert_eq!(entry.unit_cost_cents, Some(6000));
        assert_eq!(entry.customer_id, buyer.id);

        assert_eq!(receipt.invoice.invoice_type, InvoiceType::Return);
        assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);
        assert_eq!(receipt.invoice.original_invoice_number.as_deref(), Some(number.as_str()));
        assert_eq!(receipt.tracking.return_invoice_number, receipt.invoice.invoice_number);
        assert_eq!(stock_of(&engine, &item.id).await, 9);

        let left = engine.returns().available_quantity(&number, &item.id).await.unwrap();
        assert_eq!(left.available(), 1);
        assert_eq!(left.already_used(), 2);
    }

    #[tokio::test]
    async fn test_exchange_charges_difference() {
        let engine = engine().await;
        let a = product(&engine, "Hijab Grey", 5, 5000).await;
        let b = product(&engine, "Hijab Silk Grey", 5, 7000).await;
        let (_, number) = sold(&engine, &a, 1, 0).await;
        assert_eq!(stock_of(&engine, &a.id).await, 4);

        let request = ExchangeRequest {
            original_invoice_number: number.clone(),
            old_product_id: a.id.clone(),
            new_product_id: b.id.clone(),
            quantity: 1,
            amount_paid_cents: 0,
            reason: None,
        };
        let receipt = engine
            .returns()
            .save_exchange_tracking(&request, "sara")
            .await
            .unwrap();

        assert_eq!(receipt.tracking.price_difference_cents, 2000);
        assert_eq!(receipt.invoice.invoice_type, InvoiceType::Exchange);
        assert_eq!(receipt.invoice.total_amount_cents, 2000);
        assert_eq!(receipt.invoice.status, InvoiceStatus::Unpaid);
        assert!(receipt.transactions.iter().all(|t| t.kind == TransactionKind::Exchange));
        assert_eq!(stock_of(&engine, &a.id).await, 5);
        assert_eq!(stock_of(&engine, &b.id).await, 4);

        // the exchanged unit is no longer returnable
        let err = engine
            .returns()
            .save_return_tracking(&return_of(&number, &a, 1), "sara")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::QuantityExceedsAvailable { available: 0, requested: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_cap_exceeded_has_no_side_effects() {
        let engine = engine().await;
        let item = product(&engine, "Kaftan Beige L", 10, 12_000).await;
        let (_, number) = sold(&engine, &item, 2, 0).await;

        engine
            .returns()
            .save_return_tracking(&return_of(&number, &item, 1), "sara")
            .await
            .unwrap();
        assert_eq!(stock_of(&engine, &item.id).await, 9);

        let err = engine
            .returns()
            .save_return_tracking(&return_of(&number, &item, 2), "sara")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::QuantityExceedsAvailable { available: 1, requested: 2, .. })
        ));

        assert_eq!(stock_of(&engine, &item.id).await, 9);
        let history = engine.returns().history(&number).await.unwrap();
        assert_eq!(history.returns.len(), 1);
        assert!(history.exchanges.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_invoice_and_foreign_product() {
        let engine = engine().await;
        let item = product(&engine, "Kaftan Beige L", 10, 12_000).await;
        let other = product(&engine, "Scarf Olive", 10, 1500).await;
        let (_, number) = sold(&engine, &item, 2, 0).await;
        let tracker = engine.returns();

        let err = tracker
            .save_return_tracking(&return_of("9999", &item, 1), "sara")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::OriginalInvoiceNotFound(_))));

        let err = tracker
            .save_return_tracking(&return_of(&number, &other, 1), "sara")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ProductNotInOriginalInvoice { .. })));

        let err = tracker
            .save_return_tracking(&return_of(&number, &item, 0), "sara")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_exchange_into_short_stock_rolls_back() {
        let engine = engine().await;
        let a = product(&engine, "Hijab Grey", 5, 5000).await;
        let b = product(&engine, "Hijab Silk Grey", 0, 7000).await;
        let (_, number) = sold(&engine, &a, 1, 0).await;

        let request = ExchangeRequest {
            original_invoice_number: number.clone(),
            old_product_id: a.id.clone(),
            new_product_id: b.id.clone(),
            quantity: 1,
            amount_paid_cents: 0,
            reason: None,
        };
        let err = engine
            .returns()
            .save_exchange_tracking(&request, "sara")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InsufficientStock { .. })));

        assert_eq!(stock_of(&engine, &a.id).await, 4);
        let left = engine.returns().available_quantity(&number, &a.id).await.unwrap();
        assert_eq!(left.available(), 1);
    }
}
