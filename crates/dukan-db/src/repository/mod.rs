//! # Repository Module
//!
//! Database repository functions for Dukan POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories as Free Functions                       │
//! │                                                                         │
//! │  Engine service (unit of work)                                         │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  product::apply_movement(&mut tx, id, movement)                │
//! │       │  transaction::insert(&mut tx, &entry)                          │
//! │       │  tx.commit()                                                   │
//! │       ▼                                                                 │
//! │  repository::<table>::<operation>(&mut SqliteConnection, ...)          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every function borrows a connection instead of owning the pool, so   │
//! │  several repositories can share one transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product`] - Product CRUD and compare-and-swap stock movements
//! - [`customer`] - Customer CRUD and purchase history sums
//! - [`transaction`] - The customer transaction ledger
//! - [`invoice`] - Invoice headers and frozen items
//! - [`tracking`] - Return and exchange tracking rows
//! - [`sequence`] - Invoice and order number counters
//! - [`daily`] - Daily inventory aggregates
//! - [`activity`] - Audit trail

pub mod activity;
pub mod customer;
pub mod daily;
pub mod invoice;
pub mod product;
pub mod sequence;
pub mod tracking;
pub mod transaction;
