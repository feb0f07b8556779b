//! # Cashier Service
//!
//! Entry point for the point-of-sale counter.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ checkout(cart, cashier)                                                 │
//! │                                                                         │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐   │
//! │  1. customer lookup or insert      (phone reuse, name/phone rules)  │   │
//! │  2. return lines checked           (invoice cap or net purchases)   │   │
//! │  3. per line:                                                       │   │
//! │       resolve product (id, then exact name)                         │   │
//! │       stock CAS  qty > 0: UPDATE .. WHERE quantity >= qty           │   │
//! │                  qty < 0: quantity += |qty|                         │   │
//! │       insert CustomerTransaction (cost basis snapshot)              │   │
//! │  4. invoice + proration + numbering                                 │   │
//! │  5. return tracking rows (when an original invoice is given)        │   │
//! │  COMMIT ────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  6. daily aggregation              (non-fatal, flags pending)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure before COMMIT rolls the whole cart back: no stock moves, no
//! transaction rows, no invoice number consumed.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime, Utc};
use dukan_core::ledger::{movement_for_delete, movement_for_edit, movement_for_line, StockMovement};
use dukan_core::pricing::{paid_unit_price, price_line};
use dukan_core::returns::{check_against_invoice, check_against_purchases};
use dukan_core::validation::{
    validate_cart_size, validate_customer_name, validate_non_negative, validate_payment_amount,
    validate_phone,
};
use dukan_core::{
    CoreError, Customer, CustomerTransaction, Invoice, InvoiceItem, InvoiceType, Product,
    ReturnTracking, TransactionKind, ValidationError,
};
use dukan_db::repository::{customer, invoice, product, tracking, transaction};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::catalog::phone_conflict;
use crate::daily::RefreshOutcome;
use crate::error::{EngineError, EngineResult};
use crate::invoicing::{log_invoice, write_invoice, InvoiceOptions};
use crate::Engine;

// =============================================================================
// Requests / Responses
// =============================================================================

/// Identifies the buyer: an existing id, or name + phone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerRequest {
    pub customer_id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One cart line. Negative quantity = return.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: Option<String>,
    /// Exact product name, used when no id is given or the id is unknown.
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Defaults to the product's current price.
    pub unit_price_cents: Option<i64>,
    /// Per unit; ignored on return lines.
    #[serde(default)]
    pub discount_cents: i64,
    pub color: Option<String>,
    pub size: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    pub customer: CustomerRequest,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub amount_paid_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    /// Invoice the return lines refer to.
    pub original_invoice_number: Option<String>,
    pub notes: Option<String>,
    /// Business timestamp; defaults to now.
    #[ts(as = "Option<String>")]
    pub transaction_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutReceipt {
    pub customer: Customer,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub transactions: Vec<CustomerTransaction>,
    pub aggregation: RefreshOutcome,
}

/// Corrections to a recorded entry. `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionUpdate {
    pub quantity: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub amount_paid_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub transaction_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Cashier<'a> {
    engine: &'a Engine,
}

impl<'a> Cashier<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Cashier { engine }
    }

    /// Resolves the buyer, creating a customer on first visit.
    ///
    /// A known phone number reuses the existing customer.
    ///
    /// ## Errors
    /// * `CoreError::CustomerValidationFailed` - unknown id, or name/phone
    ///   rejected
    pub async fn validate_or_create_customer(
        &self,
        request: &CustomerRequest,
        actor: &str,
    ) -> EngineResult<Customer> {
        let mut db_tx = self.engine.db().begin().await?;
        let (buyer, created) = resolve_customer(&mut db_tx, request).await?;
        db_tx.commit().await?;

        if created {
            log_customer_created(self.engine, &buyer, actor).await;
        }
        Ok(buyer)
    }

    /// Checks every return line of a cart before anything is recorded.
    ///
    /// With an original invoice number the per-invoice cap applies;
    /// without one the customer's net purchases of the product must cover
    /// the return.
    pub async fn validate_return_request(
        &self,
        customer: &Customer,
        request: &CheckoutRequest,
    ) -> EngineResult<()> {
        let mut conn = self.engine.db().acquire().await?;
        check_returns(&mut conn, customer, request).await?;
        Ok(())
    }

    /// Records cart lines and moves stock in one unit of work.
    ///
    /// The returned transactions are not invoiced yet: `amount_paid` is 0.
    pub async fn process_transaction_items(
        &self,
        request: &CheckoutRequest,
        customer: &Customer,
    ) -> EngineResult<Vec<CustomerTransaction>> {
        let mut db_tx = self.engine.db().begin().await?;
        let recorded = record_lines(&mut db_tx, request, customer).await?;
        db_tx.commit().await?;

        info!(customer_id = %customer.id, lines = recorded.len(), "Transactions recorded");
        Ok(recorded)
    }

    /// Validates, records, invoices and aggregates a cart.
    pub async fn checkout(&self, request: &CheckoutRequest, cashier: &str) -> EngineResult<CheckoutReceipt> {
        let mut db_tx = self.engine.db().begin().await?;

        let (buyer, created) = resolve_customer(&mut db_tx, &request.customer).await?;
        let returns = check_returns(&mut db_tx, &buyer, request).await?;
        let recorded = record_lines(&mut db_tx, request, &buyer).await?;

        let invoice_type = if recorded.iter().all(|t| t.quantity < 0) {
            InvoiceType::Return
        } else {
            InvoiceType::Sale
        };
        let options = InvoiceOptions {
            invoice_type,
            amount_paid_cents: request.amount_paid_cents,
            shipping_cents: request.shipping_cents,
            original_invoice_number: request.original_invoice_number.clone(),
            notes: request.notes.clone(),
        };
        let receipt = write_invoice(&mut db_tx, &buyer, recorded, &options, cashier).await?;

        if let Some(original) = &request.original_invoice_number {
            for (product_id, quantity) in &returns {
                let row = ReturnTracking {
                    id: Uuid::new_v4().to_string(),
                    original_invoice_number: original.clone(),
                    return_invoice_number: receipt.invoice.invoice_number.clone(),
                    product_id: product_id.clone(),
                    returned_quantity: *quantity,
                    reason: request.notes.clone(),
                    created_at: Utc::now(),
                    created_by: cashier.to_string(),
                };
                tracking::insert_return(&mut db_tx, &row).await?;
            }
        }

        db_tx.commit().await?;

        if created {
            log_customer_created(self.engine, &buyer, cashier).await;
        }
        info!(
            invoice_number = %receipt.invoice.invoice_number,
            customer_id = %buyer.id,
            lines = receipt.transactions.len(),
            total = receipt.invoice.total_amount_cents,
            "Checkout complete"
        );
        log_invoice(self.engine, &receipt, cashier).await;

        let aggregation = self.engine.daily().absorb(&receipt.transactions).await;

        Ok(CheckoutReceipt {
            customer: buyer,
            invoice: receipt.invoice,
            items: receipt.items,
            transactions: receipt.transactions,
            aggregation,
        })
    }

    /// Corrects a recorded entry and moves stock by the difference.
    ///
    /// The affected day(s) are recalculated afterwards; a closed day is
    /// flagged for replay instead.
    pub async fn update_transaction(
        &self,
        id: &str,
        changes: &TransactionUpdate,
        actor: &str,
    ) -> EngineResult<CustomerTransaction> {
        let mut db_tx = self.engine.db().begin().await?;
        let mut entry = transaction::get_by_id(&mut db_tx, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        let old_date = entry.business_date();
        let old_quantity = entry.quantity;

        match entry.product_id.clone() {
            None => {
                if changes.quantity.is_some()
                    || changes.unit_price_cents.is_some()
                    || changes.discount_cents.is_some()
                {
                    return Err(ValidationError::InvalidFormat {
                        field: "quantity".to_string(),
                        reason: "payments carry no items".to_string(),
                    }
                    .into());
                }
                if let Some(amount) = changes.amount_paid_cents {
                    validate_payment_amount(amount)?;
                    entry.amount_paid_cents = amount;
                }
            }
            Some(product_id) => {
                let quantity = changes.quantity.unwrap_or(entry.quantity);
                let unit_price = changes.unit_price_cents.unwrap_or(entry.price_cents);
                let discount = changes.discount_cents.unwrap_or(entry.discount_cents);
                let priced = price_line(quantity, unit_price, discount)?;

                move_stock(&mut db_tx, &product_id, movement_for_edit(entry.quantity, quantity)).await?;

                if entry.kind != TransactionKind::Exchange {
                    entry.kind = TransactionKind::for_quantity(quantity);
                }
                entry.quantity = priced.quantity;
                entry.price_cents = priced.unit_price_cents;
                entry.discount_cents = priced.discount_cents;
                entry.total_price_cents = priced.total_price_cents;

                if let Some(amount) = changes.amount_paid_cents {
                    validate_non_negative("amount paid", amount)?;
                    entry.amount_paid_cents = amount;
                }
            }
        }

        if let Some(when) = changes.transaction_date {
            entry.transaction_date = when;
        }
        if changes.notes.is_some() {
            entry.notes = changes.notes.clone();
        }

        transaction::update(&mut db_tx, &entry).await?;
        db_tx.commit().await?;

        info!(id = %id, old_quantity, quantity = entry.quantity, "Transaction updated");

        let daily = self.engine.daily();
        daily.refresh(old_date).await;
        if entry.business_date() != old_date {
            daily.refresh(entry.business_date()).await;
        }

        self.engine
            .activity()
            .log(
                "transaction_updated",
                "customer_transaction",
                Some(id),
                Some(serde_json::json!({ "from": old_quantity, "to": entry.quantity })),
                Some(actor),
            )
            .await;

        Ok(entry)
    }

    /// Deletes an entry and reverses its stock movement exactly.
    pub async fn delete_transaction(&self, id: &str, actor: &str) -> EngineResult<()> {
        let mut db_tx = self.engine.db().begin().await?;
        let entry = transaction::get_by_id(&mut db_tx, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;

        if let Some(product_id) = &entry.product_id {
            move_stock(&mut db_tx, product_id, movement_for_delete(entry.quantity)).await?;
        }
        transaction::delete(&mut db_tx, id).await?;
        db_tx.commit().await?;

        info!(id = %id, quantity = entry.quantity, "Transaction deleted");
        self.engine.daily().refresh(entry.business_date()).await;

        self.engine
            .activity()
            .log(
                "transaction_deleted",
                "customer_transaction",
                Some(id),
                Some(serde_json::json!({ "quantity": entry.quantity, "kind": entry.kind })),
                Some(actor),
            )
            .await;

        Ok(())
    }

    /// Records a payment against the customer's balance.
    pub async fn record_payment(
        &self,
        customer_id: &str,
        amount_cents: i64,
        notes: Option<String>,
        actor: &str,
    ) -> EngineResult<CustomerTransaction> {
        validate_payment_amount(amount_cents)?;

        let entry = {
            let mut conn = self.engine.db().acquire().await?;
            if customer::get_by_id(&mut conn, customer_id).await?.is_none() {
                return Err(CoreError::CustomerValidationFailed(format!(
                    "customer {} does not exist",
                    customer_id
                ))
                .into());
            }

            let entry = CustomerTransaction {
                id: transaction::generate_transaction_id(),
                customer_id: customer_id.to_string(),
                product_id: None,
                kind: TransactionKind::Payment,
                quantity: 0,
                price_cents: 0,
                discount_cents: 0,
                total_price_cents: 0,
                unit_cost_cents: None,
                shipping_cents: 0,
                amount_paid_cents: amount_cents,
                transaction_date: Local::now().naive_local(),
                invoice_number: None,
                notes,
                color: None,
                size: None,
                created_at: Utc::now(),
            };
            transaction::insert(&mut conn, &entry).await?;
            entry
        };

        info!(customer_id = %customer_id, amount = amount_cents, "Payment recorded");
        self.engine.daily().absorb(std::slice::from_ref(&entry)).await;

        self.engine
            .activity()
            .log(
                "payment_recorded",
                "customer",
                Some(customer_id),
                Some(serde_json::json!({ "amount": amount_cents })),
                Some(actor),
            )
            .await;

        Ok(entry)
    }

    /// A customer's entries, oldest first.
    pub async fn history(&self, customer_id: &str) -> EngineResult<Vec<CustomerTransaction>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(transaction::list_for_customer(&mut conn, customer_id).await?)
    }
}

// =============================================================================
// Units of work
// =============================================================================

/// Looks up or registers the buyer. The flag is set for a new customer.
async fn resolve_customer(
    conn: &mut SqliteConnection,
    request: &CustomerRequest,
) -> EngineResult<(Customer, bool)> {
    if let Some(id) = &request.customer_id {
        let found = customer::get_by_id(conn, id).await?.ok_or_else(|| {
            CoreError::CustomerValidationFailed(format!("customer {} does not exist", id))
        })?;
        return Ok((found, false));
    }

    let name = request.name.as_deref().unwrap_or_default().trim();
    validate_customer_name(name).map_err(customer_rejected)?;
    let phone = validate_phone(request.phone.as_deref().unwrap_or_default())
        .map_err(customer_rejected)?;

    if let Some(existing) = customer::get_by_phone(conn, &phone).await? {
        debug!(id = %existing.id, "Reusing customer with matching phone");
        return Ok((existing, false));
    }

    let now = Utc::now();
    let row = Customer {
        id: customer::generate_customer_id(),
        name: name.to_string(),
        phone,
        address: request.address.clone(),
        notes: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = customer::insert(conn, &row).await {
        // a concurrent checkout registered the same phone first
        if let EngineError::Core(CoreError::DuplicatePhoneNumber(_)) = phone_conflict(e, &row.phone) {
            if let Some(existing) = customer::get_by_phone(conn, &row.phone).await? {
                return Ok((existing, false));
            }
        }
        return Err(CoreError::CustomerValidationFailed(format!(
            "could not register customer {}",
            row.phone
        ))
        .into());
    }

    Ok((row, true))
}

async fn log_customer_created(engine: &Engine, buyer: &Customer, actor: &str) {
    info!(id = %buyer.id, "Customer registered at checkout");
    engine
        .activity()
        .log("customer_created", "customer", Some(&buyer.id), None, Some(actor))
        .await;
}

/// Validates return lines and returns the requested quantity per product.
async fn check_returns(
    conn: &mut SqliteConnection,
    buyer: &Customer,
    request: &CheckoutRequest,
) -> EngineResult<BTreeMap<String, i64>> {
    let mut requested: BTreeMap<String, i64> = BTreeMap::new();
    for line in request.items.iter().filter(|l| l.quantity < 0) {
        let item = resolve_product(conn, line).await?;
        *requested.entry(item.id).or_default() += -line.quantity;
    }

    if requested.is_empty() {
        return Ok(requested);
    }

    match &request.original_invoice_number {
        Some(number) => {
            let original = invoice::get_by_number(conn, number)
                .await?
                .ok_or_else(|| CoreError::OriginalInvoiceNotFound(number.clone()))?;
            if original.customer_id != buyer.id {
                return Err(CoreError::CustomerValidationFailed(format!(
                    "invoice {} belongs to another customer",
                    number
                ))
                .into());
            }

            for (product_id, quantity) in &requested {
                let sold = invoice::sold_items(conn, number, product_id).await?;
                if sold.is_empty() {
                    return Err(CoreError::ProductNotInOriginalInvoice {
                        invoice_number: number.clone(),
                        product_id: product_id.clone(),
                    }
                    .into());
                }
                let original_quantity = sold.iter().map(|i| i.quantity).sum();
                let availability =
                    tracking::availability(conn, number, product_id, original_quantity).await?;
                check_against_invoice(product_id, availability, *quantity)?;
            }
        }
        None => {
            for (product_id, quantity) in &requested {
                let net = customer::net_purchased_quantity(conn, &buyer.id, product_id).await?;
                check_against_purchases(product_id, net, *quantity)?;
            }
        }
    }

    Ok(requested)
}

/// Records each line with its stock movement.
async fn record_lines(
    conn: &mut SqliteConnection,
    request: &CheckoutRequest,
    buyer: &Customer,
) -> EngineResult<Vec<CustomerTransaction>> {
    validate_cart_size(request.items.len())?;
    let when = request
        .transaction_date
        .unwrap_or_else(|| Local::now().naive_local());

    let mut recorded = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let item = resolve_product(conn, line).await?;
        if line.quantity > 0 && !item.is_active {
            return Err(CoreError::ProductNotFound(item.id).into());
        }

        let unit_price = match line.unit_price_cents {
            Some(price) => price,
            None if line.quantity < 0 => refund_price(conn, request, buyer, &item).await?,
            None => item.price_cents,
        };
        let priced = price_line(line.quantity, unit_price, line.discount_cents)?;

        move_stock(conn, &item.id, movement_for_line(priced.quantity)).await?;

        let entry = CustomerTransaction {
            id: transaction::generate_transaction_id(),
            customer_id: buyer.id.clone(),
            product_id: Some(item.id.clone()),
            kind: TransactionKind::for_quantity(priced.quantity),
            quantity: priced.quantity,
            price_cents: priced.unit_price_cents,
            discount_cents: priced.discount_cents,
            total_price_cents: priced.total_price_cents,
            unit_cost_cents: item.cost_basis(),
            shipping_cents: 0,
            amount_paid_cents: 0,
            transaction_date: when,
            invoice_number: None,
            notes: line.notes.clone().or_else(|| request.notes.clone()),
            color: line.color.clone().or_else(|| item.color.clone()),
            size: line.size.clone().or_else(|| item.size.clone()),
            created_at: Utc::now(),
        };
        transaction::insert(conn, &entry).await?;

        debug!(
            product_id = %item.id,
            quantity = entry.quantity,
            total = entry.total_price_cents,
            "Line recorded"
        );
        recorded.push(entry);
    }

    Ok(recorded)
}

/// Unit price refunded for a return line without an explicit price.
///
/// The paid price on the original invoice wins, then the customer's last
/// paid price for the product, then the current list price.
async fn refund_price(
    conn: &mut SqliteConnection,
    request: &CheckoutRequest,
    buyer: &Customer,
    item: &Product,
) -> EngineResult<i64> {
    if let Some(number) = &request.original_invoice_number {
        let sold = invoice::sold_items(conn, number, &item.id).await?;
        if let Some(first) = sold.first() {
            return Ok(paid_unit_price(first.unit_price_cents, first.discount_cents).max(0));
        }
    }

    let price = match transaction::last_sale(conn, &buyer.id, &item.id).await? {
        Some(sale) => paid_unit_price(sale.price_cents, sale.discount_cents).max(0),
        None => item.price_cents,
    };
    Ok(price)
}

/// Finds a line's product by id, falling back to the exact active name.
pub(crate) async fn resolve_product(conn: &mut SqliteConnection, line: &CartLine) -> EngineResult<Product> {
    if let Some(id) = &line.product_id {
        if let Some(found) = product::get_by_id(conn, id).await? {
            return Ok(found);
        }
    }

    if let Some(name) = &line.product_name {
        if let Some(found) = product::get_active_by_name(conn, name.trim()).await? {
            return Ok(found);
        }
    }

    let key = line
        .product_id
        .clone()
        .or_else(|| line.product_name.clone())
        .unwrap_or_default();
    Err(CoreError::ProductNotFound(key).into())
}

/// Executes a stock movement, turning a failed CAS into
/// `InsufficientStock`.
pub(crate) async fn move_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement: StockMovement,
) -> EngineResult<()> {
    if product::apply_movement(conn, product_id, movement).await? {
        return Ok(());
    }

    let current = product::get_by_id(conn, product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    warn!(product = %current.name, available = current.quantity, ?movement, "Insufficient stock");

    Err(CoreError::InsufficientStock {
        product: current.name,
        available: current.quantity,
        requested: -movement.signed_delta(),
    }
    .into())
}

fn customer_rejected(err: ValidationError) -> EngineError {
    CoreError::CustomerValidationFailed(err.to_string()).into()
}
