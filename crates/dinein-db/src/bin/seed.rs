//! # Seed Data Generator
//!
//! Populates the database with a demo menu and dining tables.
//!
//! ## Usage
//! ```bash
//! # Seed 12 tables (default)
//! cargo run -p dinein-db --bin seed
//!
//! # Custom table count
//! cargo run -p dinein-db --bin seed -- --tables 30
//! ```
//!
//! Connection settings come from the same `DB_*` variables the API server
//! reads (a `.env` file is honoured).
//!
//! ## Generated Data
//! - Categories: Mains, Noodles, Drinks, Desserts
//! - Menu items with prices in baht
//! - Tables 1..N, seating 2/4/6 in rotation, each with a random QR token

use std::env;

use anyhow::{bail, Context};
use dinein_core::{Money, UuidQrTokens};
use dinein_db::{migrations, DbConfig, PgStore};

/// (category, [(item, price in baht)])
const MENU: &[(&str, &[(&str, &str)])] = &[
    (
        "Mains",
        &[
            ("Pad Kra Pao", "120.00"),
            ("Green Curry", "150.00"),
            ("Massaman Curry", "165.00"),
            ("Khao Man Gai", "95.00"),
            ("Som Tam", "80.00"),
        ],
    ),
    (
        "Noodles",
        &[
            ("Pad Thai", "120.00"),
            ("Pad See Ew", "110.00"),
            ("Khao Soi", "135.00"),
            ("Boat Noodles", "70.00"),
        ],
    ),
    (
        "Drinks",
        &[
            ("Thai Iced Tea", "55.50"),
            ("Lemongrass Juice", "45.00"),
            ("Coconut Water", "60.00"),
            ("Singha", "90.00"),
        ],
    ),
    (
        "Desserts",
        &[
            ("Mango Sticky Rice", "110.00"),
            ("Coconut Ice Cream", "65.00"),
        ],
    ),
];

const SEATING: [i32; 3] = [2, 4, 6];

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn db_config() -> anyhow::Result<DbConfig> {
    let port: u16 = env_or("DB_PORT", "5432")
        .parse()
        .context("DB_PORT must be a port number")?;

    let mut config = DbConfig::new(
        env_or("DB_HOST", "localhost"),
        env_or("DB_USER", "dinein"),
        env_or("DB_NAME", "dinein"),
    )
    .port(port)
    .ssl_mode(env_or("DB_SSLMODE", "prefer"))
    .max_connections(2);

    if let Ok(password) = env::var("DB_PASS") {
        config = config.password(password);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut tables: i32 = 12;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tables" | "-t" => {
                i += 1;
                tables = args
                    .get(i)
                    .context("--tables needs a value")?
                    .parse()
                    .context("--tables must be a number")?;
            }
            "--help" | "-h" => {
                println!("Dine-in POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tables <N>   Number of dining tables (default: 12)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let config = db_config()?;
    println!("🌱 Dine-in POS Seed Data Generator");
    println!("==================================");
    println!("Database: {}@{}:{}/{}", config.user, config.host, config.port, config.database);
    println!("Tables:   {}", tables);
    println!();

    let store = PgStore::connect(config).await?;
    let (total, applied) = migrations::migration_status(store.pool()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied ({applied}/{total})");

    let catalog = store.catalog();
    let existing = catalog.count_tables().await?;
    if existing > 0 {
        println!("⚠ Database already has {} tables", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut items = 0;
    for (sort_order, (category, menu)) in MENU.iter().enumerate() {
        let category_id = catalog.upsert_category(category, sort_order as i32).await?;
        for (name, price) in menu.iter() {
            let price: Money = price.parse()?;
            catalog
                .insert_menu_item(category_id, name, "", price)
                .await?;
            items += 1;
        }
    }
    println!("✓ Inserted {} menu items in {} categories", items, MENU.len());

    let tokens = UuidQrTokens;
    for number in 1..=tables {
        let seating = SEATING[(number as usize - 1) % SEATING.len()];
        let table = catalog.insert_table(number, seating, &tokens).await?;
        println!("  Table {:>3}  seats {}  qr {}", table.number, table.seating, table.qr_token);
    }

    println!();
    println!("✓ Seed complete!");
    store.close().await;
    Ok(())
}
