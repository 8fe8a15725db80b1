//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  PaymentSplit   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  method         │       │
//! │  │  price / Kg     │──►│  items[]        │   │  amount         │       │
//! │  │  cost_price     │   │  payment_splits │◄──│                 │       │
//! │  │  stock + unit   │   │  credit / paid  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │          │ snapshot            ▲                                        │
//! │          ▼                     │                                        │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SaleLineItem   │───┘ Customer        │   │ BusinessProfile │       │
//! │  │  name, price,   │   │  (credit sales) │   │  (ticket data)  │       │
//! │  │  cost frozen    │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger types (`DailyCash`, `DailyCashMovement`) live in [`crate::ledger`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing;
use crate::units::Unit;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `price` and `cost_price` are quoted per major unit of the product's
/// family: per Kg for mass, per L for volume, per item for discrete units.
/// `stock` is expressed in `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on the ticket.
    pub name: String,

    /// Selling price per major unit.
    pub price: Money,

    /// Purchase cost per major unit (for profit).
    pub cost_price: Money,

    /// Quantity on hand, in `unit`. Never negative after a commit.
    pub stock: f64,

    pub unit: Unit,

    pub barcode: Option<String>,

    /// Free-form category tags.
    pub categories: Vec<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a new product with a fresh id and timestamps.
    pub fn new(name: impl Into<String>, price: Money, cost_price: Money, stock: f64, unit: Unit) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            price,
            cost_price,
            stock,
            unit,
            barcode: None,
            categories: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0.0
    }
}

// =============================================================================
// Sale Line Item
// =============================================================================

/// A line on a sale.
///
/// Uses the snapshot pattern: name, price and cost are frozen when the
/// product is added, so later product edits never rewrite history. Only
/// `quantity` and `unit` change while the sale is a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    /// Price per major unit at time of sale (frozen).
    pub unit_price: Money,
    /// Cost per major unit at time of sale (frozen).
    pub unit_cost: Money,
    pub quantity: f64,
    pub unit: Unit,
    /// Promotion discount, shown on the ticket only.
    pub discount_pct: Option<f64>,
}

impl SaleLineItem {
    /// Snapshots `product` into a new line item.
    pub fn from_product(product: &Product, quantity: f64, unit: Unit) -> Self {
        SaleLineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            unit_cost: product.cost_price,
            quantity,
            unit,
            discount_pct: None,
        }
    }

    pub fn with_discount(mut self, discount_pct: f64) -> Self {
        self.discount_pct = Some(discount_pct);
        self
    }

    /// Line total (price × quantity in major units).
    #[inline]
    pub fn line_total(&self) -> Money {
        pricing::line_total(self.unit_price, self.quantity, self.unit)
    }

    #[inline]
    pub fn line_cost(&self) -> Money {
        pricing::line_total(self.unit_cost, self.quantity, self.unit)
    }

    #[inline]
    pub fn line_profit(&self) -> Money {
        pricing::line_profit(self.unit_price, self.unit_cost, self.quantity, self.unit)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Bank transfer.
    Transfer,
    /// Card on an external terminal.
    Card,
}

impl PaymentMethod {
    /// Every method, in the order new splits pick them.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Card,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Transfer => "Transfer",
            PaymentMethod::Card => "Card",
        };
        f.write_str(label)
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "card" => Ok(PaymentMethod::Card),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("unknown method '{}'", other),
            }),
        }
    }
}

/// Amount paid with one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSplit {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl PaymentSplit {
    pub const fn new(method: PaymentMethod, amount: Money) -> Self {
        PaymentSplit { method, amount }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale.
///
/// Created once by the checkout; deletable, never edited.
///
/// ## Invariants
/// - Non-credit: `payment_splits` add up exactly to `total`, `paid == true`
/// - Credit: `payment_splits` is empty, `paid == false`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub items: Vec<SaleLineItem>,
    pub payment_splits: Vec<PaymentSplit>,
    pub total: Money,
    /// Non-product charge included in `total`.
    pub manual_amount: Option<Money>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub credit: bool,
    pub paid: bool,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub barcode: Option<String>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer holding an account for credit sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    /// Canonical upper-case name.
    pub name: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with a name-derived id.
    ///
    /// ## Id Format
    /// ```text
    /// "  Ana  María " ──► name "ANA  MARÍA" ──► id "ANA-MARA-" + last 5 digits of epoch ms
    /// ```
    pub fn new(name: &str, phone: &str, now: DateTime<Utc>) -> Self {
        let name = normalize_customer_name(name);
        Customer {
            id: customer_id_for(&name, now),
            name,
            phone: phone.trim().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Canonical form of a customer name: trimmed and upper-cased.
pub fn normalize_customer_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Builds a customer id from a normalized name and a timestamp.
pub fn customer_id_for(normalized_name: &str, now: DateTime<Utc>) -> String {
    let slug: String = normalized_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let millis = now.timestamp_millis().rem_euclid(100_000);
    format!("{}-{:05}", slug, millis)
}

// =============================================================================
// Business Profile
// =============================================================================

/// Store data printed on tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub phone: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        BusinessProfile {
            name: "Till Store".to_string(),
            address: String::new(),
            tax_id: String::new(),
            phone: String::new(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cheese() -> Product {
        Product::new(
            "Queso",
            Money::from_cents(10000),
            Money::from_cents(6000),
            5.0,
            Unit::Kilogram,
        )
    }

    #[test]
    fn test_line_item_snapshots_product() {
        let mut product = cheese();
        let item = SaleLineItem::from_product(&product, 2000.0, Unit::Gram);

        product.price = Money::from_cents(99999);
        product.name = "Renamed".to_string();

        assert_eq!(item.name, "Queso");
        assert_eq!(item.unit_price.cents(), 10000);
        assert_eq!(item.line_total().cents(), 20000);
        assert_eq!(item.line_profit().cents(), 8000);
        assert_eq!(item.line_cost().cents(), 12000);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("Cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Transfer.as_str(), "transfer");
    }

    #[test]
    fn test_customer_id_format() {
        let now = Utc.timestamp_millis_opt(1_700_000_012_345).unwrap();
        let customer = Customer::new("  ana  maria ", "555-1234", now);

        assert_eq!(customer.name, "ANA  MARIA");
        assert_eq!(customer.id, "ANA-MARIA-12345");
        assert_eq!(customer.phone, "555-1234");
    }

    #[test]
    fn test_customer_id_pads_suffix() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_042).unwrap();
        assert_eq!(customer_id_for("JOSE", now), "JOSE-00042");
    }
}
