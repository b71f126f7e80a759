//! # Seed Data Generator
//!
//! Populates a demo shop: a catalog of goods sold both singly and by the
//! pack, an opening balance, one stock purchase and a few checkouts so the
//! reports have something to show.
//!
//! ## Usage
//! ```bash
//! cargo run -p duka-db --bin seed
//! cargo run -p duka-db --bin seed -- --db ./data/duka.db --shop shop-demo
//! ```

use chrono::{FixedOffset, Utc};
use std::env;
use tracing_subscriber::EnvFilter;

use duka_core::aggregation::{local_date, product_profitability};
use duka_core::checkout::{settle, CheckoutContext};
use duka_core::{Cart, Money, NewProduct, NewPurchase, PaymentMethod, Product, Seller, UnitType};
use duka_db::{Database, DbConfig, SaleFilter};

/// `(name, sku, category, buy, sell, stock, pack label, units per pack, pack price)`
type CatalogEntry = (&'static str, &'static str, &'static str, i64, i64, i64, &'static str, i64, i64);

const CATALOG: &[CatalogEntry] = &[
    ("Soda 500ml", "SODA-500", "Drinks", 1_000, 1_500, 96, "Crate", 24, 30_000),
    ("Water 1L", "WATER-1L", "Drinks", 600, 1_000, 48, "Carton", 12, 10_800),
    ("Juice 300ml", "JUICE-300", "Drinks", 800, 1_200, 36, "Dozen", 12, 13_200),
    ("Bread Loaf", "BREAD-400", "Bakery", 2_000, 2_500, 20, "Dozen", 12, 28_000),
    ("Eggs", "EGG-1", "Dairy", 350, 500, 90, "Tray", 30, 13_500),
    ("Milk 500ml", "MILK-500", "Dairy", 1_100, 1_400, 40, "Crate", 20, 26_000),
    ("Sugar 1kg", "SUGAR-1KG", "Groceries", 3_000, 3_600, 25, "Bale", 10, 34_000),
    ("Rice 2kg", "RICE-2KG", "Groceries", 5_200, 6_000, 15, "Bale", 5, 28_500),
    ("Soap Bar", "SOAP-BAR", "Household", 900, 1_300, 60, "Carton", 24, 28_800),
    ("Matches", "MATCH-BOX", "Household", 50, 100, 200, "Packet", 10, 900),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./duka_dev.db");
    let mut shop_id = String::from("shop-demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--shop" | "-s" if i + 1 < args.len() => {
                shop_id = args[i + 1].clone();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Duka POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./duka_dev.db)");
                println!("  -s, --shop <ID>    Shop id to seed (default: shop-demo)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Duka POS Seed Data Generator");
    println!("============================");
    println!("Database: {db_path}");
    println!("Shop:     {shop_id}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count(&shop_id).await?;
    if existing > 0 {
        println!("⚠ Shop already has {existing} products, skipping.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let now = Utc::now();
    let mut products: Vec<Product> = Vec::with_capacity(CATALOG.len());
    for (name, sku, category, buy, sell, stock, ..) in CATALOG {
        let product = NewProduct {
            name: name.to_string(),
            sku: sku.to_string(),
            category: category.to_string(),
            buy_price: Money::from_minor(*buy),
            sell_price: Money::from_minor(*sell),
            quantity: *stock,
            min_threshold: (*stock / 10).max(2),
            discount_bps: (*sku == "BREAD-400").then_some(1_000),
        }
        .into_product(&shop_id, now);
        products.push(db.products().insert(&product).await?);
    }
    println!("✓ {} products", products.len());

    // Ledger
    let offset = FixedOffset::east_opt(3 * 3600).ok_or("invalid offset")?;
    let today = local_date(now, offset);
    db.daily_records()
        .upsert_opening_balance(&shop_id, today, Money::from_minor(200_000))
        .await?;

    let sugar = &products[6];
    let purchase = NewPurchase {
        date: today,
        product_id: Some(sugar.id.clone()),
        product_name: sugar.name.clone(),
        quantity: 10,
        unit_price: sugar.buy_price,
        amount_paid: Some(Money::from_minor(20_000)),
        description: String::new(),
    }
    .into_expense(&shop_id, now);
    db.expenses().insert(&purchase).await?;
    println!("✓ Opening balance and one purchase");

    // Checkouts: singles from the first half of the catalog, one pack each
    // from the rest.
    let seller = Seller::new("seller-demo", "Demo Seller");
    let mut receipts = 0;
    for (round, method) in [PaymentMethod::Cash, PaymentMethod::MobileMoney, PaymentMethod::Card]
        .into_iter()
        .enumerate()
    {
        let catalog = db.products().list(&shop_id).await?;
        let mut cart = Cart::new();

        for product in catalog.iter().skip(round).step_by(3) {
            let Some((.., label, units, price)) =
                CATALOG.iter().find(|entry| entry.1 == product.sku)
            else {
                continue;
            };
            if product.quantity >= *units * 2 {
                cart.add_pack(product, UnitType::new(label), *units, Money::from_minor(*price), 1)?;
            } else {
                cart.add_single_unit(product)?;
            }
        }

        let ctx = CheckoutContext {
            shop_id: shop_id.clone(),
            shop_name: "Demo Duka".to_string(),
            seller: seller.clone(),
            payment_method: method,
            now: Utc::now(),
            offset,
        };
        if let Some(settlement) = settle(&cart, &ctx) {
            db.settlements().commit(&shop_id, &settlement).await?;
            receipts += 1;
        }
    }
    println!("✓ {receipts} checkouts");

    let sales = db.sales().list(&shop_id, &SaleFilter::default()).await?;
    println!();
    println!("Top products by profit:");
    for row in product_profitability(&sales).iter().take(3) {
        println!("  {:<14} {:>8}", row.product_name, row.profit.minor());
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
