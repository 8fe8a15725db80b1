//! # Seed Data Generator
//!
//! Populates a database with demo products, rings up one split-payment sale
//! and one credit sale, and prints the day's cash ledger.
//!
//! ## Usage
//! ```bash
//! # Uses TILL_DB_PATH (default ./till.db)
//! cargo run -p till-db --bin seed
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/demo.db
//! ```

use std::env;
use till_core::{DraftSale, Money, PaymentMethod, Product, Ticket, Unit};
use till_db::{telemetry, AppConfig, Database};
use tracing::info;

/// (name, price per major unit in cents, cost in cents, stock, unit, barcode)
const PRODUCTS: &[(&str, i64, i64, f64, Unit, &str)] = &[
    ("Queso Cremoso", 10000, 6000, 5.0, Unit::Kilogram, "7790000000011"),
    ("Jamón Cocido", 14000, 9000, 3.0, Unit::Kilogram, "7790000000028"),
    ("Aceitunas", 4500, 2500, 2000.0, Unit::Gram, "7790000000035"),
    ("Aceite de Oliva", 9000, 6000, 12.0, Unit::Liter, "7790000000042"),
    ("Leche Suelta", 1200, 700, 20000.0, Unit::Milliliter, "7790000000059"),
    ("Gaseosa 1.5L", 250, 100, 24.0, Unit::Unit, "7790000000066"),
    ("Pan Francés", 3000, 1500, 8.0, Unit::Kilogram, "7790000000073"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let mut config = AppConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = path.into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $TILL_DB_PATH or ./till.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products, skipping seed.", existing);
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (name, price, cost, stock, unit, barcode) in PRODUCTS {
        let product = Product::new(*name, Money::from_cents(*price), Money::from_cents(*cost), *stock, *unit)
            .with_barcode(*barcode);
        products.push(db.products().insert(&product).await?);
    }
    info!(count = products.len(), "Demo products inserted");
    println!("✓ Inserted {} products", products.len());

    // Split-payment sale: 750 gr of cheese, 2 sodas, 500 ml of olive oil.
    let mut draft = DraftSale::new();
    draft.add_product(&products[0], 750.0, Unit::Gram)?;
    draft.scan_product(&products[5])?;
    draft.scan_product(&products[5])?;
    draft.add_product(&products[3], 500.0, Unit::Milliliter)?;
    draft.add_payment()?;
    draft.set_payment_method(1, PaymentMethod::Card)?;
    draft.set_payment_amount(0, Money::from_cents(5000))?;

    let cash_sale = db.checkout().commit(&mut draft).await?;
    println!("✓ Sale {} for {}", cash_sale.sale.id, cash_sale.sale.total);

    let ticket = Ticket::new(&cash_sale.sale, config.business());
    println!();
    println!("  {}", ticket.business.name);
    for line in &ticket.lines {
        println!("  {:<20} {:>8.3} {:<5} {:>10}", line.name, line.quantity, line.unit, line.amount);
    }
    for payment in &ticket.payments {
        println!("  {:<20} {:>25}", payment.method, payment.amount);
    }
    println!("  {:<20} {:>25}", "TOTAL", ticket.total);
    println!();

    // Credit sale for a new customer.
    let mut draft = DraftSale::new();
    draft.add_product(&products[1], 1.25, Unit::Kilogram)?;
    draft.set_credit(true)?;
    draft.set_customer("Ana Pérez", "555-0101")?;

    let credit_sale = db.checkout().commit(&mut draft).await?;
    if let Some(customer) = &credit_sale.created_customer {
        println!("✓ Credit sale {} for {} ({})", credit_sale.sale.id, credit_sale.sale.total, customer.id);
    }

    if let Some(ledger) = cash_sale.ledger {
        let ledger = db.daily_cash().reconcile(ledger.date).await?;
        println!();
        println!("Daily cash {}", ledger.date);
        for movement in &ledger.movements {
            println!(
                "  {:<8} {:>10}  profit {:>10}  {}",
                movement.movement_type.as_str(),
                movement.amount,
                movement.profit,
                movement.description
            );
        }
        println!("  income   {:>10}", ledger.total_income);
        println!("  expense  {:>10}", ledger.total_expense);
        println!("  profit   {:>10}", ledger.total_profit);
        println!("  expected {:>10}", ledger.expected_cash());
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
