//! # Invoice Builder
//!
//! Freezes already-recorded transactions into an invoice. Nothing here
//! moves stock.
//!
//! ## Settlement
//! ```text
//! lines:     +100.00   +50.00   +30.00      subtotal = total = 180.00
//! paid:       54.00                          remaining = 126.00
//!                                            status    = PartiallyPaid
//!
//! proration (weighted by line total, last positive line absorbs
//! the rounding residual):
//!
//!             30.00    15.00     9.00   = 54.00
//!
//! shipping is shown on the invoice and stored on the first line only
//! ```
//!
//! A negative subtotal (a refund) is settled in full: paid = subtotal,
//! status = Paid, and no line receives a payment share.

use chrono::{Local, Utc};
use dukan_core::invoice::{compute_totals, format_number};
use dukan_core::proration::prorate;
use dukan_core::validation::validate_non_negative;
use dukan_core::{
    CoreError, Customer, CustomerTransaction, Invoice, InvoiceItem, InvoiceType, Money,
    ValidationError,
};
use dukan_db::repository::{invoice, product, sequence, transaction};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::Engine;

/// Settlement details supplied with an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceOptions {
    pub invoice_type: InvoiceType,
    /// Amount the customer pays now.
    pub amount_paid_cents: i64,
    /// Display only.
    pub shipping_cents: i64,
    pub original_invoice_number: Option<String>,
    pub notes: Option<String>,
}

impl InvoiceOptions {
    pub fn sale(amount_paid_cents: i64, shipping_cents: i64) -> Self {
        InvoiceOptions {
            invoice_type: InvoiceType::Sale,
            amount_paid_cents,
            shipping_cents,
            original_invoice_number: None,
            notes: None,
        }
    }
}

/// A written invoice with its lines and the transactions it settled.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceReceipt {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    /// The invoiced transactions with their payment share and invoice
    /// number filled in.
    pub transactions: Vec<CustomerTransaction>,
}

/// Builds and reads invoices.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceBuilder<'a> {
    engine: &'a Engine,
}

impl<'a> InvoiceBuilder<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        InvoiceBuilder { engine }
    }

    /// Invoices persisted transactions in one unit of work.
    pub async fn create_invoice(
        &self,
        customer: &Customer,
        transactions: &[CustomerTransaction],
        options: &InvoiceOptions,
        cashier: &str,
    ) -> EngineResult<InvoiceReceipt> {
        let mut db_tx = self.engine.db().begin().await?;
        let receipt = write_invoice(&mut db_tx, customer, transactions.to_vec(), options, cashier).await?;
        db_tx.commit().await?;

        log_invoice(self.engine, &receipt, cashier).await;
        Ok(receipt)
    }

    /// Allocates the next invoice number.
    ///
    /// The number is consumed even if no invoice ends up using it.
    pub async fn next_invoice_number(&self) -> EngineResult<String> {
        let mut conn = self.engine.db().acquire().await?;
        next_invoice_number(&mut conn).await
    }

    /// Allocates the next order number.
    pub async fn next_order_number(&self) -> EngineResult<String> {
        let mut conn = self.engine.db().acquire().await?;
        next_order_number(&mut conn).await
    }

    pub async fn get_invoice(&self, invoice_number: &str) -> EngineResult<Option<(Invoice, Vec<InvoiceItem>)>> {
        let mut conn = self.engine.db().acquire().await?;
        let Some(found) = invoice::get_by_number(&mut conn, invoice_number).await? else {
            return Ok(None);
        };
        let items = invoice::get_items(&mut conn, &found.id).await?;
        Ok(Some((found, items)))
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> EngineResult<Vec<Invoice>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(invoice::list_for_customer(&mut conn, customer_id).await?)
    }
}

/// Writes the invoice, its items and the payment shares inside the
/// caller's transaction.
pub(crate) async fn write_invoice(
    conn: &mut SqliteConnection,
    customer: &Customer,
    mut transactions: Vec<CustomerTransaction>,
    options: &InvoiceOptions,
    cashier: &str,
) -> EngineResult<InvoiceReceipt> {
    if transactions.is_empty() {
        return Err(ValidationError::Required {
            field: "transactions".to_string(),
        }
        .into());
    }
    validate_non_negative("amount paid", options.amount_paid_cents)?;
    validate_non_negative("shipping", options.shipping_cents)?;
    if let Some(stray) = transactions.iter().find(|t| t.customer_id != customer.id) {
        return Err(CoreError::CustomerValidationFailed(format!(
            "transaction {} belongs to another customer",
            stray.id
        ))
        .into());
    }

    let totals = compute_totals(&transactions, options.amount_paid_cents, options.shipping_cents);
    let line_totals: Vec<Money> = transactions.iter().map(|t| t.total()).collect();
    let shares = prorate(Money::from_cents(totals.amount_paid_cents.max(0)), &line_totals);

    let invoice_number = next_invoice_number(conn).await?;
    let order_number = next_order_number(conn).await?;

    let record = Invoice {
        id: invoice::generate_invoice_id(),
        invoice_number: invoice_number.clone(),
        order_number,
        customer_id: customer.id.clone(),
        invoice_type: options.invoice_type,
        status: totals.status,
        subtotal_cents: totals.subtotal_cents,
        discount_cents: totals.discount_cents,
        shipping_cents: totals.shipping_cents,
        total_amount_cents: totals.total_amount_cents,
        amount_paid_cents: totals.amount_paid_cents,
        remaining_amount_cents: totals.remaining_amount_cents,
        original_invoice_number: options.original_invoice_number.clone(),
        cashier_name: cashier.to_string(),
        notes: options.notes.clone(),
        issued_at: Local::now().naive_local(),
        created_at: Utc::now(),
    };
    invoice::insert(conn, &record).await?;

    let mut items = Vec::with_capacity(transactions.len());
    for (index, (tx, share)) in transactions.iter_mut().zip(shares).enumerate() {
        let shipping = if index == 0 { options.shipping_cents } else { 0 };
        transaction::link_invoice(conn, &tx.id, &invoice_number, share.cents(), shipping).await?;
        tx.invoice_number = Some(invoice_number.clone());
        tx.amount_paid_cents = share.cents();
        tx.shipping_cents = shipping;

        let Some(product_id) = tx.product_id.clone() else {
            continue;
        };
        let product_name = product::get_by_id(conn, &product_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| product_id.clone());

        let item = InvoiceItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: record.id.clone(),
            transaction_id: tx.id.clone(),
            product_id,
            product_name,
            quantity: tx.quantity,
            unit_price_cents: tx.price_cents,
            discount_cents: tx.discount_cents,
            total_price_cents: tx.total_price_cents,
        };
        invoice::insert_item(conn, &item).await?;
        items.push(item);
    }

    debug!(
        invoice_number = %record.invoice_number,
        lines = items.len(),
        total = record.total_amount_cents,
        paid = record.amount_paid_cents,
        "Invoice written"
    );

    Ok(InvoiceReceipt {
        invoice: record,
        items,
        transactions,
    })
}

pub(crate) async fn log_invoice(engine: &Engine, receipt: &InvoiceReceipt, cashier: &str) {
    let invoice = &receipt.invoice;
    info!(
        invoice_number = %invoice.invoice_number,
        invoice_type = ?invoice.invoice_type,
        status = ?invoice.status,
        total = invoice.total_amount_cents,
        paid = invoice.amount_paid_cents,
        "Invoice created"
    );
    engine
        .activity()
        .log(
            "invoice_created",
            "invoice",
            Some(&invoice.invoice_number),
            Some(serde_json::json!({
                "type": invoice.invoice_type,
                "total": invoice.total_amount_cents,
                "paid": invoice.amount_paid_cents,
            })),
            Some(cashier),
        )
        .await;
}

pub(crate) async fn next_invoice_number(conn: &mut SqliteConnection) -> EngineResult<String> {
    let floor = match sequence::current(conn, sequence::INVOICE_NUMBER).await? {
        Some(_) => 0,
        None => invoice::max_invoice_number(conn).await?.unwrap_or(0),
    };
    let value = sequence::next_value(conn, sequence::INVOICE_NUMBER, floor).await?;
    Ok(format_number(value))
}

pub(crate) async fn next_order_number(conn: &mut SqliteConnection) -> EngineResult<String> {
    let floor = match sequence::current(conn, sequence::ORDER_NUMBER).await? {
        Some(_) => 0,
        None => invoice::max_order_number(conn).await?.unwrap_or(0),
    };
    let value = sequence::next_value(conn, sequence::ORDER_NUMBER, floor).await?;
    Ok(format_number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::EngineError;
    use dukan_core::InvoiceStatus;

    #[tokio::test]
    async fn test_payment_is_prorated_with_exact_sum() {
        let engine = engine().await;
        let a = product(&engine, "Kaftan Black L", 5, 10_000).await;
        let b = product(&engine, "Abaya Navy S", 5, 5000).await;
        let c = product(&engine, "Hijab Beige", 5, 3000).await;
        let buyer = customer(&engine, "Fatima", "03001234567").await;

        let recorded = engine
            .cashier()
            .process_transaction_items(
                &cart(&buyer, vec![line(&a, 1, 0), line(&b, 1, 0), line(&c, 1, 0)], 0),
                &buyer,
            )
            .await
            .unwrap();

        let receipt = engine
            .invoices()
            .create_invoice(&buyer, &recorded, &InvoiceOptions::sale(5400, 500), "sara")
            .await
            .unwrap();

        let shares: Vec<i64> = receipt.transactions.iter().map(|t| t.amount_paid_cents).collect();
        assert_eq!(shares, vec![3000, 1500, 900]);
        assert_eq!(shares.iter().sum::<i64>(), 5400);

        let invoice = &receipt.invoice;
        assert_eq!(invoice.subtotal_cents, 18_000);
        assert_eq!(invoice.total_amount_cents, 18_000);
        assert_eq!(invoice.shipping_cents, 500);
        assert_eq!(invoice.remaining_amount_cents, 12_600);
        assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid);

        // shipping lands on the first line only
        assert_eq!(receipt.transactions[0].shipping_cents, 500);
        assert_eq!(receipt.transactions[1].shipping_cents, 0);
        assert!(receipt
            .transactions
            .iter()
            .all(|t| t.invoice_number.as_deref() == Some(invoice.invoice_number.as_str())));

        // the shares were persisted
        let mut conn = engine.db().acquire().await.unwrap();
        let stored = transaction::list_by_invoice(&mut conn, &invoice.invoice_number)
            .await
            .unwrap();
        assert_eq!(stored.iter().map(|t| t.amount_paid_cents).sum::<i64>(), 5400);
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_and_padded() {
        let engine = engine().await;
        let builder = engine.invoices();

        assert_eq!(builder.next_invoice_number().await.unwrap(), "0001");
        assert_eq!(builder.next_invoice_number().await.unwrap(), "0002");
        assert_eq!(builder.next_order_number().await.unwrap(), "0001");
    }

    #[tokio::test]
    async fn test_unpaid_and_paid_status() {
        let engine = engine().await;
        let item = product(&engine, "Scarf Olive", 10, 1500).await;
        let buyer = customer(&engine, "Aisha", "03211234567").await;
        let cashier = engine.cashier();

        let first = cashier
            .process_transaction_items(&cart(&buyer, vec![line(&item, 2, 0)], 0), &buyer)
            .await
            .unwrap();
        let unpaid = engine
            .invoices()
            .create_invoice(&buyer, &first, &InvoiceOptions::sale(0, 0), "sara")
            .await
            .unwrap();
        assert_eq!(unpaid.invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(unpaid.invoice.remaining_amount_cents, 3000);

        let second = cashier
            .process_transaction_items(&cart(&buyer, vec![line(&item, 1, 0)], 0), &buyer)
            .await
            .unwrap();
        let paid = engine
            .invoices()
            .create_invoice(&buyer, &second, &InvoiceOptions::sale(1500, 0), "sara")
            .await
            .unwrap();
        assert_eq!(paid.invoice.status, InvoiceStatus::Paid);
        assert_eq!(paid.invoice.invoice_number, "0002");

        let (stored, items) = engine
            .invoices()
            .get_invoice("0002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, paid.invoice.id);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_name, "Scarf Olive");
    }

    #[tokio::test]
    async fn test_rejects_foreign_transactions() {
        let engine = engine().await;
        let item = product(&engine, "Scarf Olive", 10, 1500).await;
        let a = customer(&engine, "Aisha", "03211234567").await;
        let b = customer(&engine, "Maryam", "03331234567").await;

        let recorded = engine
            .cashier()
            .process_transaction_items(&cart(&a, vec![line(&item, 1, 0)], 0), &a)
            .await
            .unwrap();

        let err = engine
            .invoices()
            .create_invoice(&b, &recorded, &InvoiceOptions::sale(0, 0), "sara")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::CustomerValidationFailed(_))));
    }
}
