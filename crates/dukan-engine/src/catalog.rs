//! # Catalog Service
//!
//! Product and customer maintenance.
//!
//! Stock only enters the system here (creation and restock). Sales,
//! returns and edits move it through the cashier and return tracker.
//!
//! ## Cost Basis
//! ```text
//! create  (carton 60.00, qty 10)  → unit_cost 6.00
//! restock (carton 35.00, +5)      → unit_cost 7.00  (new batch cost)
//! update  (carton changed)        → unit_cost = carton / on-hand qty
//!
//! Recorded transactions keep the unit cost they captured.
//! ```

use chrono::Utc;
use dukan_core::pricing::unit_cost_from_carton;
use dukan_core::validation::{
    validate_customer_name, validate_non_negative, validate_phone, validate_positive_quantity,
    validate_price_cents, validate_product_name,
};
use dukan_core::{CoreError, Customer, Product};
use dukan_db::repository::{customer, product};
use dukan_db::DbError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

use crate::error::{EngineError, EngineResult};
use crate::Engine;

const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// New product as entered by staff.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub quantity: i64,
    pub price_cents: i64,
    /// Cost of the received batch; the unit cost is derived from it.
    pub carton_price_cents: Option<i64>,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Editable product fields. Quantity is not editable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub carton_price_cents: Option<i64>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Product and customer maintenance.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    engine: &'a Engine,
}

impl<'a> Catalog<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Catalog { engine }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, input: &NewProduct, actor: &str) -> EngineResult<Product> {
        validate_product_name(&input.name)?;
        validate_price_cents(input.price_cents)?;
        validate_non_negative("quantity", input.quantity)?;
        if let Some(carton) = input.carton_price_cents {
            validate_non_negative("carton price", carton)?;
        }

        let now = Utc::now();
        let item = Product {
            id: product::generate_product_id(),
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            price_cents: input.price_cents,
            carton_price_cents: input.carton_price_cents,
            unit_cost_cents: unit_cost_from_carton(input.carton_price_cents, input.quantity),
            color: input.color.clone(),
            size: input.size.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        {
            let mut conn = self.engine.db().acquire().await?;
            product::insert(&mut conn, &item).await?;
        }

        info!(id = %item.id, name = %item.name, quantity = item.quantity, "Product created");
        self.engine
            .activity()
            .log("product_created", "product", Some(&item.id), None, Some(actor))
            .await;

        Ok(item)
    }

    pub async fn update_product(
        &self,
        id: &str,
        changes: &ProductUpdate,
        actor: &str,
    ) -> EngineResult<Product> {
        let mut conn = self.engine.db().acquire().await?;
        let mut item = product::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if let Some(name) = &changes.name {
            validate_product_name(name)?;
            item.name = name.trim().to_string();
        }
        if let Some(price) = changes.price_cents {
            validate_price_cents(price)?;
            item.price_cents = price;
        }
        if let Some(carton) = changes.carton_price_cents {
            validate_non_negative("carton price", carton)?;
            item.carton_price_cents = Some(carton);
            item.unit_cost_cents = unit_cost_from_carton(Some(carton), item.quantity);
        }
        if changes.color.is_some() {
            item.color = changes.color.clone();
        }
        if changes.size.is_some() {
            item.size = changes.size.clone();
        }

        product::update(&mut conn, &item).await?;
        drop(conn);

        info!(id = %item.id, "Product updated");
        self.engine
            .activity()
            .log("product_updated", "product", Some(&item.id), None, Some(actor))
            .await;

        Ok(item)
    }

    /// Adds received units. A carton price prices the new batch.
    pub async fn restock_product(
        &self,
        id: &str,
        added_quantity: i64,
        carton_price_cents: Option<i64>,
        actor: &str,
    ) -> EngineResult<Product> {
        validate_positive_quantity(added_quantity)?;
        if let Some(carton) = carton_price_cents {
            validate_non_negative("carton price", carton)?;
        }

        let unit_cost = unit_cost_from_carton(carton_price_cents, added_quantity);

        let mut conn = self.engine.db().acquire().await?;
        product::restock(&mut conn, id, added_quantity, carton_price_cents, unit_cost).await?;
        let item = product::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
        drop(conn);

        info!(id = %id, added_quantity, quantity = item.quantity, "Product restocked");
        self.engine
            .activity()
            .log(
                "product_restocked",
                "product",
                Some(id),
                Some(serde_json::json!({ "added": added_quantity })),
                Some(actor),
            )
            .await;

        Ok(item)
    }

    /// Hides a product from sale; its history stays intact.
    pub async fn delete_product(&self, id: &str, actor: &str) -> EngineResult<()> {
        {
            let mut conn = self.engine.db().acquire().await?;
            product::soft_delete(&mut conn, id).await.map_err(|e| match e {
                DbError::NotFound { .. } => EngineError::from(CoreError::ProductNotFound(id.to_string())),
                other => other.into(),
            })?;
        }

        info!(id = %id, "Product deactivated");
        self.engine
            .activity()
            .log("product_deleted", "product", Some(id), None, Some(actor))
            .await;
        Ok(())
    }

    pub async fn get_product(&self, id: &str) -> EngineResult<Option<Product>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(product::get_by_id(&mut conn, id).await?)
    }

    pub async fn search_products(&self, query: &str) -> EngineResult<Vec<Product>> {
        debug!(query = %query, "Searching products");
        let mut conn = self.engine.db().acquire().await?;
        Ok(product::search(&mut conn, query, DEFAULT_SEARCH_LIMIT).await?)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Registers a customer.
    ///
    /// ## Errors
    /// * `CoreError::DuplicatePhoneNumber` - phone already registered
    pub async fn create_customer(&self, input: &NewCustomer, actor: &str) -> EngineResult<Customer> {
        validate_customer_name(&input.name)?;
        let phone = validate_phone(&input.phone)?;

        let now = Utc::now();
        let row = Customer {
            id: customer::generate_customer_id(),
            name: input.name.trim().to_string(),
            phone,
            address: input.address.clone(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        {
            let mut conn = self.engine.db().acquire().await?;
            if customer::get_by_phone(&mut conn, &row.phone).await?.is_some() {
                return Err(CoreError::DuplicatePhoneNumber(row.phone).into());
            }
            customer::insert(&mut conn, &row)
                .await
                .map_err(|e| phone_conflict(e, &row.phone))?;
        }

        info!(id = %row.id, "Customer created");
        self.engine
            .activity()
            .log("customer_created", "customer", Some(&row.id), None, Some(actor))
            .await;

        Ok(row)
    }

    pub async fn update_customer(
        &self,
        id: &str,
        changes: &CustomerUpdate,
        actor: &str,
    ) -> EngineResult<Customer> {
        let mut conn = self.engine.db().acquire().await?;
        let mut row = customer::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        if let Some(name) = &changes.name {
            validate_customer_name(name)?;
            row.name = name.trim().to_string();
        }
        if let Some(phone) = &changes.phone {
            let phone = validate_phone(phone)?;
            if phone != row.phone {
                if let Some(owner) = customer::get_by_phone(&mut conn, &phone).await? {
                    if owner.id != row.id {
                        return Err(CoreError::DuplicatePhoneNumber(phone).into());
                    }
                }
            }
            row.phone = phone;
        }
        if changes.address.is_some() {
            row.address = changes.address.clone();
        }
        if changes.notes.is_some() {
            row.notes = changes.notes.clone();
        }

        customer::update(&mut conn, &row)
            .await
            .map_err(|e| phone_conflict(e, &row.phone))?;
        drop(conn);

        info!(id = %row.id, "Customer updated");
        self.engine
            .activity()
            .log("customer_updated", "customer", Some(&row.id), None, Some(actor))
            .await;

        Ok(row)
    }

    /// Deletes a customer without history.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - the customer still owns
    ///   transactions or invoices
    pub async fn delete_customer(&self, id: &str, actor: &str) -> EngineResult<()> {
        {
            let mut conn = self.engine.db().acquire().await?;
            customer::delete(&mut conn, id).await?;
        }

        info!(id = %id, "Customer deleted");
        self.engine
            .activity()
            .log("customer_deleted", "customer", Some(id), None, Some(actor))
            .await;
        Ok(())
    }

    pub async fn get_customer(&self, id: &str) -> EngineResult<Option<Customer>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(customer::get_by_id(&mut conn, id).await?)
    }

    pub async fn search_customers(&self, query: &str) -> EngineResult<Vec<Customer>> {
        let mut conn = self.engine.db().acquire().await?;
        Ok(customer::search(&mut conn, query, DEFAULT_SEARCH_LIMIT).await?)
    }
}

/// A lost race on the phone index reads as a duplicate phone.
pub(crate) fn phone_conflict(err: DbError, phone: &str) -> EngineError {
    if err.is_unique_violation_on("phone") {
        CoreError::DuplicatePhoneNumber(phone.to_string()).into()
    } else {
        err.into()
    }
}
