//! # till-core: Pure Sale Logic for Till POS
//!
//! Everything that decides whether a sale balances, how much stock it takes
//! and what lands in the day's cash ledger. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Sale screen (external)                       │   │
//! │  │    Scan ──► Lines ──► Payment methods ──► Confirm ──► Ticket   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ DraftSale mutations                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   units ──► pricing ──► draft ◄── payment                      │   │
//! │  │                │          │                                     │   │
//! │  │              stock     checkout ──► ledger, ticket              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        till-db: SQLite repositories + atomic checkout           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Canonical mass / volume / count conversion
//! - [`money`] - Integer-cent money
//! - [`pricing`] - Line totals and profit per major unit
//! - [`stock`] - Stock reservation and insufficiency detection
//! - [`payment`] - Payment split allocation
//! - [`draft`] - The in-progress sale
//! - [`checkout`] - Pre-commit rules and record building
//! - [`ledger`] - Daily cash ledger and its aggregates
//! - [`ticket`] - Read-only ticket view
//! - [`types`] - Product, Sale, Customer and friends
//! - [`error`] / [`validation`] - Typed errors and input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{DraftSale, Money, Product, Unit};
//!
//! let cheese = Product::new("Queso", Money::from_cents(10000), Money::from_cents(6000), 5.0, Unit::Kilogram);
//!
//! let mut draft = DraftSale::new();
//! draft.add_product(&cheese, 250.0, Unit::Gram).unwrap();
//!
//! // $100.00/Kg × 0.25 Kg
//! assert_eq!(draft.total().cents(), 2500);
//! assert_eq!(draft.payments().total_paid().cents(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod draft;
pub mod error;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod pricing;
pub mod stock;
pub mod ticket;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{DraftSale, DraftStatus};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::{DailyCash, DailyCashMovement, MovementItem, MovementType};
pub use money::Money;
pub use payment::PaymentSplits;
pub use ticket::Ticket;
pub use types::*;
pub use units::Unit;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Customer name recorded on non-credit sales.
pub const WALK_IN_CUSTOMER: &str = "CLIENTE OCASIONAL";

/// Payment method tag on sale movements, whose breakdown lives in the splits.
pub const MIXED_PAYMENT_TAG: &str = "Mixed";

/// Maximum lines on one sale.
pub const MAX_LINE_ITEMS: usize = 100;
