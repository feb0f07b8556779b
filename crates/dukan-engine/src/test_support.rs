//! Fixtures shared by the service tests.

use chrono::{NaiveDate, NaiveDateTime};
use dukan_core::{Customer, Product};

use crate::cashier::{CartLine, CheckoutRequest, CustomerRequest};
use crate::catalog::{NewCustomer, NewProduct};
use crate::{Engine, EngineConfig};

pub async fn engine() -> Engine {
    Engine::open(EngineConfig::in_memory()).await.unwrap()
}

pub fn new_product(name: &str, quantity: i64, price_cents: i64, carton: Option<i64>) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        quantity,
        price_cents,
        carton_price_cents: carton,
        color: None,
        size: None,
    }
}

pub async fn product(engine: &Engine, name: &str, quantity: i64, price_cents: i64) -> Product {
    engine
        .catalog()
        .create_product(&new_product(name, quantity, price_cents, None), "test")
        .await
        .unwrap()
}

/// A product with a cost basis of `unit_cost` per unit.
pub async fn costed_product(
    engine: &Engine,
    name: &str,
    quantity: i64,
    price_cents: i64,
    unit_cost: i64,
) -> Product {
    engine
        .catalog()
        .create_product(
            &new_product(name, quantity, price_cents, Some(unit_cost * quantity)),
            "test",
        )
        .await
        .unwrap()
}

pub async fn customer(engine: &Engine, name: &str, phone: &str) -> Customer {
    engine
        .catalog()
        .create_customer(
            &NewCustomer {
                name: name.to_string(),
                phone: phone.to_string(),
                address: None,
                notes: None,
            },
            "test",
        )
        .await
        .unwrap()
}

pub async fn stock_of(engine: &Engine, product_id: &str) -> i64 {
    engine
        .catalog()
        .get_product(product_id)
        .await
        .unwrap()
        .unwrap()
        .quantity
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hour, 0, 0).unwrap()
}

pub fn line(product: &Product, quantity: i64, discount_cents: i64) -> CartLine {
    CartLine {
        product_id: Some(product.id.clone()),
        product_name: None,
        quantity,
        unit_price_cents: None,
        discount_cents,
        color: None,
        size: None,
        notes: None,
    }
}

pub fn existing_customer(customer: &Customer) -> CustomerRequest {
    CustomerRequest {
        customer_id: Some(customer.id.clone()),
        name: None,
        phone: None,
        address: None,
    }
}

pub fn cart(customer: &Customer, items: Vec<CartLine>, paid: i64) -> CheckoutRequest {
    CheckoutRequest {
        customer: existing_customer(customer),
        items,
        amount_paid_cents: paid,
        shipping_cents: 0,
        original_invoice_number: None,
        notes: None,
        transaction_date: None,
    }
}

pub fn cart_on(customer: &Customer, items: Vec<CartLine>, paid: i64, when: NaiveDateTime) -> CheckoutRequest {
    CheckoutRequest {
        transaction_date: Some(when),
        ..cart(customer, items, paid)
    }
}
