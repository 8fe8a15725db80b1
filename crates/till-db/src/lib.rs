//! # till-db: Database Layer for Till POS
//!
//! SQLite storage for products, customers, sales and the daily cash ledger,
//! plus the transactional checkout that ties them together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  Sale screen: DraftSale mutations (till-core)                          │
//! │       │ confirm                                                         │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo  │    │ 001_initial  │  │   │
//! │  │   │ write lock    │    │ SaleRepo      │    │  _schema.sql │  │   │
//! │  │   │               │    │ DailyCashRepo │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────▼──────────────────────────────┐                     │   │
//! │  │   │ CheckoutService: one transaction     │                     │   │
//! │  │   │ stock → customer → sale → ledger     │                     │   │
//! │  │   └──────────────────────────────────────┘                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (TILL_DB_PATH, default ./till.db)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and write lock
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`checkout`] - Atomic sale commit and credit settlement
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{AppConfig, Database};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let outcome = db.checkout().commit(&mut draft).await?;
//! let ticket = till_core::Ticket::new(&outcome.sale, config.business());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutOutcome, CheckoutService};
pub use config::AppConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::daily_cash::DailyCashRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
