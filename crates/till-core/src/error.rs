//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Sale / stock / payment / ledger rule failures  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, amounts, units)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to an [`ErrorKind`] the caller can branch on

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;
use crate::units::Unit;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These are returned as typed results from the checkout boundary; none of
/// them should ever surface as a panic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A line item references a product that no longer exists.
    ///
    /// ## When This Occurs
    /// - Product was deleted after being added to the draft sale
    ///
    /// Aborts the whole commit. No stock is touched.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Draft line: 6000 gr of "Queso"
    ///      │
    ///      ▼
    /// Check stock: 5 Kg = 5000 g canonical
    ///      │
    ///      ▼
    /// InsufficientStock { available: 5, unit: Kg, requested: 6000, .. }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 Kg of Queso in stock"
    /// ```
    #[error(
        "Insufficient stock for {product}: available {available} {unit}, requested {requested} {requested_unit}"
    )]
    InsufficientStock {
        product: String,
        available: f64,
        unit: Unit,
        requested: f64,
        requested_unit: Unit,
    },

    /// The payment splits do not add up to the sale total.
    #[error("Payments ({paid}) do not match the sale total ({total}), difference {difference}")]
    PaymentMismatch {
        total: Money,
        paid: Money,
        difference: Money,
    },

    /// A credit sale names a customer that already exists but was not selected.
    #[error("Customer '{name}' already exists, select it from the list")]
    DuplicateCustomer { name: String },

    /// The daily cash ledger for the date has been closed.
    #[error("Daily cash for {date} is closed")]
    LedgerClosed { date: String },

    /// Aggregates no longer equal the sum of the movements.
    #[error("Daily cash for {date} is out of balance: {field} is {recorded}, movements add up to {computed}")]
    LedgerOutOfBalance {
        date: String,
        field: String,
        recorded: Money,
        computed: Money,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing a draft that has already been committed
    /// - Committing a draft twice
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Machine-readable classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    InsufficientStock,
    PaymentMismatch,
    DuplicateCustomer,
    ProductNotFound,
    LedgerClosed,
    LedgerOutOfBalance,
    NotFound,
    InvalidState,
}

impl CoreError {
    /// Returns the error category for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::PaymentMismatch { .. } => ErrorKind::PaymentMismatch,
            CoreError::DuplicateCustomer { .. } => ErrorKind::DuplicateCustomer,
            CoreError::LedgerClosed { .. } => ErrorKind::LedgerClosed,
            CoreError::LedgerOutOfBalance { .. } => ErrorKind::LedgerOutOfBalance,
            CoreError::SaleNotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidSaleStatus { .. } => ErrorKind::InvalidState,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether the user can fix the input and resubmit.
    ///
    /// `ProductNotFound` and `LedgerClosed` need an external state change
    /// (restoring the product, reopening the register) before a retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::InsufficientStock
                | ErrorKind::PaymentMismatch
                | ErrorKind::DuplicateCustomer
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., unknown unit label, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Quantities of different measurement families cannot be mixed.
    #[error("{field}: cannot convert {from} to {to}")]
    IncompatibleUnit { field: String, from: Unit, to: Unit },

    /// Duplicate value (e.g., same payment method twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
