//! # Stock Ledger
//!
//! Decides whether a sale can take stock from a product and what the new
//! stock level is. Pure: the caller persists the result.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product.stock (Kg)       requested (gr)                                │
//! │        │                        │                                       │
//! │        ▼                        ▼                                       │
//! │   to_canonical (g)         to_canonical (g)                             │
//! │        │                        │                                       │
//! │        └──────────┬─────────────┘                                       │
//! │                   ▼                                                     │
//! │         requested > stock ?  ──yes──► InsufficientStock                 │
//! │                   │ no                                                  │
//! │                   ▼                                                     │
//! │   from_canonical(stock - requested, product.unit) ──► StockReservation  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Product, SaleLineItem};
use crate::units::{self, Unit};

/// Decimal places kept on stock levels written back to a product.
const STOCK_DECIMALS: i32 = 6;

/// Outcome of a successful stock check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReservation {
    pub product_id: String,
    pub previous_stock: f64,
    /// Stock after the sale, in `unit`.
    pub new_stock: f64,
    /// The product's own unit.
    pub unit: Unit,
}

/// Checks that `product` can supply `requested_qty` of `requested_unit`.
///
/// ## Errors
/// - `Validation` for a non-positive quantity or a unit of another family
/// - `InsufficientStock` when the request exceeds what is on hand
pub fn check_availability(product: &Product, requested_qty: f64, requested_unit: Unit) -> CoreResult<()> {
    validate_and_reserve(product, requested_qty, requested_unit).map(|_| ())
}

/// Computes the stock left after selling `requested_qty` of `requested_unit`.
///
/// Does not mutate the product.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::stock::validate_and_reserve;
/// use till_core::types::Product;
/// use till_core::units::Unit;
///
/// let cheese = Product::new("Queso", Money::from_cents(10000), Money::from_cents(6000), 5.0, Unit::Kilogram);
/// let reservation = validate_and_reserve(&cheese, 2000.0, Unit::Gram).unwrap();
/// assert_eq!(reservation.new_stock, 3.0);
/// ```
pub fn validate_and_reserve(product: &Product, requested_qty: f64, requested_unit: Unit) -> CoreResult<StockReservation> {
    if !requested_qty.is_finite() || requested_qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    if !requested_unit.is_compatible_with(product.unit) {
        return Err(ValidationError::IncompatibleUnit {
            field: "quantity".to_string(),
            from: requested_unit,
            to: product.unit,
        }
        .into());
    }

    let available = units::canonical_rounded(product.stock, product.unit);
    let requested = units::canonical_rounded(requested_qty, requested_unit);

    if requested > available {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            unit: product.unit,
            requested: requested_qty,
            requested_unit,
        });
    }

    let remaining = units::round_to(available - requested, STOCK_DECIMALS);
    Ok(StockReservation {
        product_id: product.id.clone(),
        previous_stock: product.stock,
        new_stock: units::from_canonical(remaining, product.unit),
        unit: product.unit,
    })
}

/// Reserves stock for every line of a sale.
///
/// Lines for the same product draw from the same running balance, so two
/// lines of 3 Kg against 5 Kg fail on the second. Returns one reservation
/// per distinct product, in first-seen order, holding the final stock.
///
/// ## Errors
/// `ProductNotFound` when a line's product is missing from `products`, plus
/// everything [`validate_and_reserve`] returns.
pub fn reserve_for_sale(items: &[SaleLineItem], products: &HashMap<String, Product>) -> CoreResult<Vec<StockReservation>> {
    let mut working: HashMap<&str, Product> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut reservations: HashMap<&str, StockReservation> = HashMap::new();

    for item in items {
        let key = item.product_id.as_str();
        if !working.contains_key(key) {
            let product = products
                .get(key)
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            working.insert(key, product.clone());
            order.push(key);
        }

        let Some(product) = working.get_mut(key) else {
            return Err(CoreError::ProductNotFound(item.product_id.clone()));
        };
        let step = validate_and_reserve(product, item.quantity, item.unit)?;
        product.stock = step.new_stock;

        reservations
            .entry(key)
            .and_modify(|r| r.new_stock = step.new_stock)
            .or_insert(step);
    }

    Ok(order
        .into_iter()
        .filter_map(|key| reservations.remove(key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

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
    fn test_reserve_across_units() {
        let reservation = validate_and_reserve(&cheese(), 2000.0, Unit::Gram).unwrap();
        assert_eq!(reservation.previous_stock, 5.0);
        assert_eq!(reservation.new_stock, 3.0);
        assert_eq!(reservation.unit, Unit::Kilogram);
    }

    #[test]
    fn test_exact_stock_empties_product() {
        let reservation = validate_and_reserve(&cheese(), 5.0, Unit::Kilogram).unwrap();
        assert_eq!(reservation.new_stock, 0.0);
    }

    #[test]
    fn test_insufficient_stock_reports_availability() {
        let err = validate_and_reserve(&cheese(), 6000.0, Unit::Gram).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                unit,
                requested,
                requested_unit,
                ..
            } => {
                assert_eq!(available, 5.0);
                assert_eq!(unit, Unit::Kilogram);
                assert_eq!(requested, 6000.0);
                assert_eq!(requested_unit, Unit::Gram);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_float_noise_is_not_a_shortfall() {
        let mut product = cheese();
        product.stock = 0.1 + 0.2;
        assert!(check_availability(&product, 300.0, Unit::Gram).is_ok());
    }

    #[test]
    fn test_rejects_bad_requests() {
        let err = validate_and_reserve(&cheese(), 1.0, Unit::Liter).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::IncompatibleUnit { .. })
        ));

        let err = validate_and_reserve(&cheese(), 0.0, Unit::Kilogram).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_reserve_for_sale_is_cumulative() {
        let product = cheese();
        let products = HashMap::from([(product.id.clone(), product.clone())]);

        let items = vec![
            SaleLineItem::from_product(&product, 2.0, Unit::Kilogram),
            SaleLineItem::from_product(&product, 1500.0, Unit::Gram),
        ];
        let reservations = reserve_for_sale(&items, &products).unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].previous_stock, 5.0);
        assert_eq!(reservations[0].new_stock, 1.5);

        let items = vec![
            SaleLineItem::from_product(&product, 3.0, Unit::Kilogram),
            SaleLineItem::from_product(&product, 3.0, Unit::Kilogram),
        ];
        let err = reserve_for_sale(&items, &products).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available, .. } if available == 2.0));
    }

    #[test]
    fn test_reserve_for_sale_missing_product() {
        let product = cheese();
        let items = vec![SaleLineItem::from_product(&product, 1.0, Unit::Kilogram)];
        let err = reserve_for_sale(&items, &HashMap::new()).unwrap_err();
        assert_eq!(err, CoreError::ProductNotFound(product.id));
    }
}
