//! # Seed Data Generator
//!
//! Populates the database with demo products and customers.
//!
//! ## Usage
//! ```bash
//! # Generate the full demo catalog
//! cargo run -p dukan-db --bin seed
//!
//! # Limit the number of products
//! cargo run -p dukan-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p dukan-db --bin seed -- --db ./data/dukan.db
//! ```
//!
//! ## Generated Data
//! - Products: `{style} {color} {size}`, with a carton price so every
//!   product has a cost basis
//! - Customers: a handful of walk-in customers with unique phone numbers

use chrono::Utc;
use dukan_core::pricing::unit_cost_from_carton;
use dukan_core::{Customer, Product};
use dukan_db::repository::{customer, product};
use dukan_db::{Database, DbConfig};
use std::env;

/// Product styles with base price and carton cost (cents, per 10 units).
const STYLES: &[(&str, i64, i64)] = &[
    ("Abaya", 10_000, 60_000),
    ("Hijab", 2_500, 12_000),
    ("Jilbab", 8_000, 48_000),
    ("Niqab", 1_800, 9_000),
    ("Scarf", 1_500, 7_000),
    ("Kaftan", 12_000, 75_000),
];

const COLORS: &[&str] = &["Black", "Navy", "Beige", "Maroon", "Olive"];

/// Size variants with a price addon in cents.
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 500), ("XL", 1000)];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Walk-in", "0000000000"),
    ("Fatima Khan", "03001234567"),
    ("Aisha Siddiqui", "03211234567"),
    ("Maryam Ali", "03331234567"),
    ("Zainab Hussain", "03451234567"),
];

const CARTON_UNITS: i64 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = STYLES.len() * COLORS.len() * SIZES.len();
    let mut db_path = String::from("./dukan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dukan POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: full catalog)");
                println!("  -d, --db <PATH>    Database file path (default: ./dukan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Dukan POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.acquire().await?;

    let existing = product::count(&mut conn).await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (style_idx, (style, base_price, carton)) in STYLES.iter().enumerate() {
        for (color_idx, color) in COLORS.iter().enumerate() {
            for (size, addon) in SIZES.iter() {
                if generated >= count {
                    break 'outer;
                }

                let seed = style_idx * 100 + color_idx * 10 + generated;
                let item = generate_product(style, color, size, base_price + addon, *carton, seed);

                if let Err(e) = product::insert(&mut conn, &item).await {
                    eprintln!("Failed to insert {}: {}", item.name, e);
                    continue;
                }

                generated += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    println!("Generating customers...");
    for (name, phone) in CUSTOMERS {
        let now = Utc::now();
        let row = Customer {
            id: customer::generate_customer_id(),
            name: name.to_string(),
            phone: phone.to_string(),
            address: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = customer::insert(&mut conn, &row).await {
            eprintln!("Failed to insert {}: {}", row.name, e);
        }
    }
    println!("✓ Generated {} customers", CUSTOMERS.len());

    println!();
    let found = product::search(&mut conn, "abaya", 10).await?;
    println!("  Search 'abaya': {} results", found.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with a cost basis.
fn generate_product(
    style: &str,
    color: &str,
    size: &str,
    price_cents: i64,
    carton_price_cents: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();
    let quantity = 5 + (seed % 26) as i64;

    Product {
        id: product::generate_product_id(),
        name: format!("{} {} {}", style, color, size),
        quantity,
        price_cents,
        carton_price_cents: Some(carton_price_cents),
        unit_cost_cents: unit_cost_from_carton(Some(carton_price_cents), CARTON_UNITS),
        color: Some(color.to_string()),
        size: Some(size.to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
