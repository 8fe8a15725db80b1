//! # Unit Converter
//!
//! Maps `(quantity, unit)` pairs onto a canonical smallest unit so that
//! quantities stated in different units can be compared and subtracted.
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────┬──────────────┐
//! │ Family       │ Units        │ Canonical  │ Major (price)│
//! ├──────────────┼──────────────┼────────────┼──────────────┤
//! │ Mass         │ Kg ×1000, gr │ gram       │ Kg           │
//! │ Volume       │ L  ×1000, ml │ milliliter │ L            │
//! │ Count        │ Unid.        │ unit       │ Unid.        │
//! └──────────────┴──────────────┴────────────┴──────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Decimal places kept when a quantity is converted for display or editing.
pub const QUANTITY_DECIMALS: i32 = 3;

/// Decimal places kept on canonical values before they are compared.
const CANONICAL_DECIMALS: i32 = 6;

/// Unit a product is stocked in, or a line item is sold in.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Discrete items.
    #[default]
    Unit,
    Kilogram,
    Gram,
    Liter,
    Milliliter,
}

/// Measurement family. Only quantities of the same family are convertible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Count,
    Mass,
    Volume,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Unit,
        Unit::Kilogram,
        Unit::Gram,
        Unit::Liter,
        Unit::Milliliter,
    ];

    /// Multiplier from this unit to the canonical unit of its family.
    #[inline]
    pub const fn factor(&self) -> f64 {
        match self {
            Unit::Kilogram | Unit::Liter => 1000.0,
            Unit::Gram | Unit::Milliliter | Unit::Unit => 1.0,
        }
    }

    pub const fn family(&self) -> UnitFamily {
        match self {
            Unit::Unit => UnitFamily::Count,
            Unit::Kilogram | Unit::Gram => UnitFamily::Mass,
            Unit::Liter | Unit::Milliliter => UnitFamily::Volume,
        }
    }

    /// The unit prices are quoted in for this unit's family.
    pub const fn major(&self) -> Unit {
        match self.family() {
            UnitFamily::Count => Unit::Unit,
            UnitFamily::Mass => Unit::Kilogram,
            UnitFamily::Volume => Unit::Liter,
        }
    }

    pub const fn is_discrete(&self) -> bool {
        matches!(self, Unit::Unit)
    }

    pub fn is_compatible_with(&self, other: Unit) -> bool {
        self.family() == other.family()
    }

    /// Short label shown next to quantities (`Kg`, `gr`, `Unid.`).
    pub const fn label(&self) -> &'static str {
        match self {
            Unit::Unit => "Unid.",
            Unit::Kilogram => "Kg",
            Unit::Gram => "gr",
            Unit::Liter => "L",
            Unit::Milliliter => "ml",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Unit {
    type Err = ValidationError;

    /// Accepts the display labels and the snake-case names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unid." | "unid" | "unit" | "u" => Ok(Unit::Unit),
            "kg" | "kilogram" => Ok(Unit::Kilogram),
            "gr" | "g" | "gram" => Ok(Unit::Gram),
            "l" | "liter" => Ok(Unit::Liter),
            "ml" | "milliliter" => Ok(Unit::Milliliter),
            other => Err(ValidationError::InvalidFormat {
                field: "unit".to_string(),
                reason: format!("unknown unit '{}'", other),
            }),
        }
    }
}

/// Converts a quantity into the canonical unit of its family.
///
/// ## Example
/// ```rust
/// use till_core::units::{to_canonical, Unit};
///
/// assert_eq!(to_canonical(2.5, Unit::Kilogram), 2500.0);
/// assert_eq!(to_canonical(750.0, Unit::Milliliter), 750.0);
/// assert_eq!(to_canonical(3.0, Unit::Unit), 3.0);
/// ```
#[inline]
pub fn to_canonical(qty: f64, unit: Unit) -> f64 {
    qty * unit.factor()
}

/// Converts a canonical quantity back into `unit`.
#[inline]
pub fn from_canonical(canonical: f64, unit: Unit) -> f64 {
    canonical / unit.factor()
}

/// Converts a quantity between two units of the same family.
///
/// The physical amount is preserved: 1.5 Kg becomes 1500 gr, never 1.5 gr.
///
/// ## Errors
/// `IncompatibleUnit` when the families differ (Kg → L).
pub fn convert(qty: f64, from: Unit, to: Unit) -> Result<f64, ValidationError> {
    if !from.is_compatible_with(to) {
        return Err(ValidationError::IncompatibleUnit {
            field: "quantity".to_string(),
            from,
            to,
        });
    }
    Ok(from_canonical(to_canonical(qty, from), to))
}

/// Rounds a value to the given number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Canonical value rounded so float noise never decides a stock comparison.
pub fn canonical_rounded(qty: f64, unit: Unit) -> f64 {
    round_to(to_canonical(qty, unit), CANONICAL_DECIMALS)
}

/// Rounds a user-facing quantity to [`QUANTITY_DECIMALS`].
pub fn round_quantity(qty: f64) -> f64 {
    round_to(qty, QUANTITY_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_scaling() {
        assert_eq!(to_canonical(5.0, Unit::Kilogram), 5000.0);
        assert_eq!(to_canonical(2000.0, Unit::Gram), 2000.0);
        assert_eq!(to_canonical(1.5, Unit::Liter), 1500.0);
        assert_eq!(to_canonical(330.0, Unit::Milliliter), 330.0);
        assert_eq!(to_canonical(7.0, Unit::Unit), 7.0);
    }

    #[test]
    fn test_round_trip_every_unit() {
        let quantities = [0.0, 0.001, 0.25, 1.0, 3.333, 12.5, 999.999];
        for unit in Unit::ALL {
            for q in quantities {
                let back = from_canonical(to_canonical(q, unit), unit);
                assert!((back - q).abs() < 1e-9, "{} {} came back as {}", q, unit, back);
            }
        }
    }

    #[test]
    fn test_convert_preserves_physical_amount() {
        assert_eq!(convert(1.5, Unit::Kilogram, Unit::Gram).unwrap(), 1500.0);
        assert_eq!(convert(250.0, Unit::Milliliter, Unit::Liter).unwrap(), 0.25);
        assert_eq!(convert(4.0, Unit::Unit, Unit::Unit).unwrap(), 4.0);
    }

    #[test]
    fn test_convert_rejects_other_family() {
        let err = convert(1.0, Unit::Kilogram, Unit::Liter).unwrap_err();
        assert!(matches!(err, ValidationError::IncompatibleUnit { .. }));
        assert!(convert(1.0, Unit::Unit, Unit::Gram).is_err());
    }

    #[test]
    fn test_major_units() {
        assert_eq!(Unit::Gram.major(), Unit::Kilogram);
        assert_eq!(Unit::Milliliter.major(), Unit::Liter);
        assert_eq!(Unit::Unit.major(), Unit::Unit);
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("Kg".parse::<Unit>().unwrap(), Unit::Kilogram);
        assert_eq!("gr".parse::<Unit>().unwrap(), Unit::Gram);
        assert_eq!("Unid.".parse::<Unit>().unwrap(), Unit::Unit);
        assert_eq!("milliliter".parse::<Unit>().unwrap(), Unit::Milliliter);
        assert!("oz".parse::<Unit>().is_err());
    }

    #[test]
    fn test_canonical_rounding_hides_float_noise() {
        // 0.1 + 0.2 Kg is 300 g, not 300.00000000000006 g
        assert_eq!(canonical_rounded(0.1 + 0.2, Unit::Kilogram), 300.0);
        assert_eq!(round_quantity(0.12345), 0.123);
    }
}
