//! # Seed Data Generator
//!
//! Populates a ledger with demo master data, purchase batches and a few
//! invoices for development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database
//! cargo run -p kirana-ledger --bin seed
//!
//! # Specify database path
//! cargo run -p kirana-ledger --bin seed -- --db ./kirana_dev.db
//!
//! # Use an explicit config file
//! cargo run -p kirana-ledger --bin seed -- --config ./kirana.toml
//! ```
//!
//! ## Generated Data
//! - GST slabs: 0%, 5%, 12%, 18%, 28% + 12% cess
//! - Products across staples, dairy, snacks and personal care
//! - Two purchase batches per product (older one cheaper), perishables
//!   with expiry dates
//! - A walk-in customer, a local registered customer and an out-of-state one
//! - Sample invoices, one of them voided

use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;
use tracing::info;

use kirana_core::Jurisdiction;
use kirana_ledger::{
    init_tracing, LedgerConfig, LedgerService, LineRequest, NewCustomer, NewProduct, NewSupplier,
    NewTaxSlab, ReceiveBatch,
};

/// GST slabs: (name, cgst bps, sgst bps, cess bps)
const SLABS: &[(&str, u32, u32, u32)] = &[
    ("GST 0%", 0, 0, 0),
    ("GST 5%", 250, 250, 0),
    ("GST 12%", 600, 600, 0),
    ("GST 18%", 900, 900, 0),
    ("GST 28% + Cess 12%", 1400, 1400, 1200),
];

/// Demo products: (name, brand, unit, sale price paise, slab index, shelf life days)
const PRODUCTS: &[(&str, &str, &str, i64, usize, Option<i64>)] = &[
    ("Basmati Rice 5kg", "India Gate", "pcs", 62_500, 1, None),
    ("Whole Wheat Atta 10kg", "Aashirvaad", "pcs", 48_000, 1, None),
    ("Toor Dal 1kg", "Tata Sampann", "pcs", 16_500, 0, None),
    ("Iodised Salt 1kg", "Tata", "pcs", 2_800, 0, None),
    ("Sugar 1kg", "Madhur", "pcs", 4_800, 1, None),
    ("Toned Milk 500ml", "Amul", "pcs", 2_700, 0, Some(2)),
    ("Paneer 200g", "Amul", "pcs", 9_000, 1, Some(7)),
    ("Butter 100g", "Amul", "pcs", 5_800, 2, Some(60)),
    ("Curd 400g", "Mother Dairy", "pcs", 3_500, 1, Some(5)),
    ("Potato Chips 52g", "Lays", "pcs", 2_000, 3, Some(90)),
    ("Marie Biscuits 250g", "Britannia", "pcs", 3_000, 3, Some(180)),
    ("Instant Noodles 280g", "Maggi", "pcs", 5_600, 3, Some(270)),
    ("Bath Soap 4x100g", "Lifebuoy", "pcs", 14_000, 3, None),
    ("Toothpaste 150g", "Colgate", "pcs", 11_000, 3, None),
    ("Cola 750ml", "Thums Up", "pcs", 4_000, 4, Some(150)),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kirana Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: from config)");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => LedgerConfig::load_from(path)?,
        None => LedgerConfig::load()?,
    };
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }

    println!("Kirana Ledger Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database_path().display());
    println!();

    let ledger = LedgerService::open(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = ledger.products().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Master data
    let mut slab_ids = Vec::with_capacity(SLABS.len());
    for (name, cgst, sgst, cess) in SLABS {
        let slab = ledger
            .add_tax_slab(NewTaxSlab {
                name: name.to_string(),
                cgst_bps: *cgst,
                sgst_bps: *sgst,
                cess_bps: *cess,
            })
            .await?;
        slab_ids.push(slab.id);
    }
    println!("✓ {} tax slabs", slab_ids.len());

    let supplier = ledger
        .add_supplier(NewSupplier {
            name: "Shree Ganesh Distributors".to_string(),
            gstin: Some(format!("{}AABCS1234F1Z5", config.invoicing.seller_state_code)),
            contact: Some("022-2345-6789".to_string()),
        })
        .await?;

    let walk_in = ledger
        .add_customer(NewCustomer {
            name: "Walk-in Customer".to_string(),
            gstin: None,
            jurisdiction: None,
            address: None,
            contact: None,
        })
        .await?;
    let local = ledger
        .add_customer(NewCustomer {
            name: "Sharma General Stores".to_string(),
            gstin: Some(format!("{}AAPFU0939F1ZV", config.invoicing.seller_state_code)),
            jurisdiction: None,
            address: Some("Shop 4, Station Road".to_string()),
            contact: None,
        })
        .await?;
    let remote = ledger
        .add_customer(NewCustomer {
            name: "Karnataka Traders".to_string(),
            gstin: None,
            jurisdiction: Some(Jurisdiction::InterState),
            address: Some("Bengaluru".to_string()),
            contact: None,
        })
        .await?;
    println!("✓ 1 supplier, 3 customers");

    // Products and stock
    let today = Utc::now().date_naive();
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (index, (name, brand, unit, price, slab, shelf_life)) in PRODUCTS.iter().enumerate() {
        let product = ledger
            .add_product(NewProduct {
                name: name.to_string(),
                brand: Some(brand.to_string()),
                unit: Some(unit.to_string()),
                sale_price_paise: *price,
                reorder_threshold: None,
                tax_slab_id: slab_ids[*slab].clone(),
            })
            .await?;

        // Older, cheaper batch first; cost is 70% and 75% of the sale price
        let older = Utc::now() - Duration::days(10);
        for (received_at, cost_pct, qty) in [(older, 70, 12 + index as i64), (Utc::now(), 75, 24)] {
            let mut request = ReceiveBatch::new(&product.id, qty, price * cost_pct / 100)
                .received_at(received_at)
                .from_supplier(&supplier.id, Some(format!("SGD/{:04}", index + 1)));
            if let Some(days) = shelf_life {
                request = request.expiring(today + Duration::days(*days));
            }
            ledger.receive_purchase(request).await?;
        }
        product_ids.push(product.id);
    }
    println!("✓ {} products, {} batches", product_ids.len(), product_ids.len() * 2);

    // Sample invoices
    let first = ledger
        .post_invoice(
            &walk_in.id,
            &[LineRequest::new(&product_ids[0], 2), LineRequest::new(&product_ids[5], 4)],
        )
        .await?;
    let second = ledger
        .post_invoice(&local.id, &[LineRequest::new(&product_ids[9], 20)])
        .await?;
    let third = ledger
        .post_invoice(
            &remote.id,
            &[LineRequest::new(&product_ids[14], 6), LineRequest::new(&product_ids[12], 3)],
        )
        .await?;
    ledger.void_invoice(&second.id).await?;
    println!(
        "✓ Invoices {}, {}, {} ({} voided)",
        first.display_number, second.display_number, third.display_number, second.display_number
    );

    let value: i64 = ledger.stock_valuation().await?.iter().map(|r| r.value_paise).sum();
    let low = ledger.low_stock_report().await?.len();

    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "Seed complete");
    println!();
    println!("✓ Stock value: ₹{}.{:02}", value / 100, value % 100);
    println!("  Low-stock products: {}", low);
    println!("✓ Seed complete in {:?}", elapsed);

    ledger.close().await;
    Ok(())
}
