//! # Pricing Calculator
//!
//! Line totals and profit for products priced per major unit.
//!
//! ```text
//! price $100.00 / Kg, line 250 gr
//!      │
//!      ▼
//! 250 gr ──► 250 g canonical ──► 0.25 Kg
//!      │
//!      ▼
//! $100.00 × 0.25 = $25.00
//! ```
//!
//! Discrete units skip the conversion: `price × quantity`.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::SaleLineItem;
use crate::units::{self, Unit};

/// Quantity expressed in the major unit of its family (Kg, L, Unid.).
pub fn major_quantity(quantity: f64, unit: Unit) -> f64 {
    units::from_canonical(units::to_canonical(quantity, unit), unit.major())
}

/// Total for `quantity` of something priced `price` per major unit.
///
/// Zero, negative or non-finite quantities price at zero.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::pricing::line_total;
/// use till_core::units::Unit;
///
/// let per_kg = Money::from_cents(10000);
/// assert_eq!(line_total(per_kg, 2000.0, Unit::Gram).cents(), 20000);
/// assert_eq!(line_total(per_kg, 0.0, Unit::Gram).cents(), 0);
/// ```
pub fn line_total(price: Money, quantity: f64, unit: Unit) -> Money {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Money::zero();
    }
    price.scale(major_quantity(quantity, unit))
}

/// Profit for a line: the same normalization applied to `price - cost`.
pub fn line_profit(price: Money, cost: Money, quantity: f64, unit: Unit) -> Money {
    line_total(price - cost, quantity, unit)
}

/// Line total after a percentage discount.
///
/// Only the ticket uses this; sale totals and payment balancing ignore
/// discounts.
pub fn discounted_line_total(price: Money, quantity: f64, unit: Unit, discount_pct: Option<f64>) -> Money {
    let total = line_total(price, quantity, unit);
    match discount_pct {
        Some(pct) => total.apply_percentage_discount(pct),
        None => total,
    }
}

/// Sum of line totals plus the manual charge.
pub fn sale_total(items: &[SaleLineItem], manual_amount: Option<Money>) -> Money {
    let products: Money = items.iter().map(SaleLineItem::line_total).sum();
    products + manual_amount.unwrap_or_default()
}

/// Re-expresses a quantity in another unit of the same family.
///
/// The physical amount is kept and the result rounded to 3 decimals, so
/// switching 1.5 Kg to gr yields 1500.
pub fn change_unit(quantity: f64, from: Unit, to: Unit) -> Result<f64, ValidationError> {
    units::convert(quantity, from, to).map(units::round_quantity)
}

/// Cost, sell and profit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaleFigures {
    pub cost: Money,
    pub sell: Money,
    pub profit: Money,
}

impl SaleFigures {
    pub fn of(items: &[SaleLineItem]) -> Self {
        items.iter().fold(SaleFigures::default(), |acc, item| SaleFigures {
            cost: acc.cost + item.line_cost(),
            sell: acc.sell + item.line_total(),
            profit: acc.profit + item.line_profit(),
        })
    }
}
