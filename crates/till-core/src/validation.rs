//! # Validation Module
//!
//! Input checks run before any business rule touches the data.
//!
//! ```text
//! DraftSale mutation ──► validate_quantity / validate_line_count
//! Credit checkout    ──► validate_customer_name
//! Product insert     ──► validate_product_name / validate_price / validate_stock
//! Product search     ──► validate_search_query
//! ```
//!
//! SQLite adds NOT NULL / UNIQUE / FOREIGN KEY constraints behind these.

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_LINE_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CUSTOMER_NAME_LEN: usize = 100;
const MAX_PRODUCT_NAME_LEN: usize = 200;
const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name for a credit sale.
///
/// ## Rules
/// - Must not be blank
/// - At most 100 characters after trimming
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Ana").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a product name: not blank, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Trims a search query. Empty is allowed and means "everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Finite and greater than zero
///
/// There is no upper bound; the stock check at commit is the limit.
///
/// ```text
/// 2.5 Kg   ✅     0 gr     ❌ must be positive
/// 750 ml   ✅     NaN      ❌ must be positive
/// ```
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price, cost or charge. Zero is allowed.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level: finite and not negative.
pub fn validate_stock(stock: f64) -> ValidationResult<()> {
    if !stock.is_finite() || stock < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in a draft of `current_lines`.
pub fn validate_line_count(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "sale lines".to_string(),
            min: 0,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_customer_name() {
        assert!(validate_customer_name("Ana").is_ok());
        assert!(validate_customer_name("  José Pérez ").is_ok());

        assert_eq!(
            validate_customer_name(""),
            Err(ValidationError::Required {
                field: "customer name".to_string()
            })
        );
        assert!(validate_customer_name(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Queso Cremoso").is_ok());
        assert!(validate_product_name(" ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0.25).is_ok());
        assert!(validate_quantity(1500.0).is_ok());

        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-1.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(150_000.0).is_ok());
    }

    #[test]
    fn test_validate_stock() {
        assert!(validate_stock(0.0).is_ok());
        assert!(validate_stock(12.5).is_ok());
        assert!(validate_stock(-0.001).is_err());
        assert!(validate_stock(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(0).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS - 1).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  queso ").unwrap(), "queso");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }
}
