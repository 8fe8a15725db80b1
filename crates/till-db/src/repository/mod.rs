//! # Repository Module
//!
//! Database repository implementations for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                 │
//! │       │  db.products().search("queso", 20)                             │
//! │       ▼                                                                 │
//! │  ProductRepository / CustomerRepository / SaleRepository /             │
//! │  DailyCashRepository                                                   │
//! │       │                                                                 │
//! │       │  pool methods: acquire a connection, call a helper             │
//! │       │  checkout:     hold a transaction, call the same helpers       │
//! │       ▼                                                                 │
//! │  pub(crate) fn helper(conn: &mut SqliteConnection, ...)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD, search, stock
//! - [`CustomerRepository`](customer::CustomerRepository) - Credit customers
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads and deletion
//! - [`DailyCashRepository`](daily_cash::DailyCashRepository) - Per-day cash ledger

pub mod customer;
pub mod daily_cash;
pub mod product;
pub mod sale;
