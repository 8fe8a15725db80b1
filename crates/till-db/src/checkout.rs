//! # Checkout Service
//!
//! Commits a draft sale: stock, customer, sale record and cash ledger in
//! one SQLite transaction.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  draft.begin_validation()                                              │
//! │       │                                                                 │
//! │  write lock ──► BEGIN                                                  │
//! │       │                                                                 │
//! │       ├── customer lookup (credit) ──► validate_draft()                │
//! │       │                                   │ PaymentMismatch,           │
//! │       │                                   │ DuplicateCustomer, ...     │
//! │       ├── load products ──► reserve_for_sale()                         │
//! │       │                        │ InsufficientStock, ProductNotFound    │
//! │       ├── UPDATE products.stock (absolute)                             │
//! │       ├── INSERT customer (credit, new name)                           │
//! │       ├── INSERT sale + items + payments                               │
//! │       ├── post_movement(today) (non-credit)    LedgerClosed            │
//! │       ▼                                                                 │
//! │  COMMIT ──► draft Committed                                            │
//! │                                                                         │
//! │  Any error: transaction dropped (rollback), draft Rejected             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::WriteLock;
use crate::repository::{customer, daily_cash, product, sale};
use till_core::checkout::{self as rules, CustomerChoice};
use till_core::stock::{self, StockReservation};
use till_core::{CoreError, Customer, DailyCash, DailyCashMovement, DraftSale, PaymentMethod, PaymentSplit, Sale};

/// Description on the income movement that settles a credit sale.
pub const CREDIT_PAYMENT_DESCRIPTION: &str = "Credit payment";

/// Everything a successful commit wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    pub sale: Sale,
    /// One per distinct product, holding the stock after the sale.
    pub reservations: Vec<StockReservation>,
    /// Customer created by this commit, if any.
    pub created_customer: Option<Customer>,
    /// Income movement posted for a non-credit sale.
    pub movement: Option<DailyCashMovement>,
    /// The day's ledger after posting.
    pub ledger: Option<DailyCash>,
}

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        CheckoutService { pool, write_lock }
    }

    /// Commits `draft` now.
    ///
    /// ## Errors
    /// * `Domain(InvalidSaleStatus)` - the draft was already committed
    /// * `Domain(Validation | PaymentMismatch | DuplicateCustomer)` - draft rules
    /// * `Domain(InsufficientStock | ProductNotFound)` - stock
    /// * `Domain(LedgerClosed)` - today's register is closed
    ///
    /// Nothing is written on error.
    pub async fn commit(&self, draft: &mut DraftSale) -> DbResult<CheckoutOutcome> {
        self.commit_at(draft, Utc::now()).await
    }

    /// Commits `draft` with an explicit timestamp. The ledger day is the UTC
    /// date of `now`.
    pub async fn commit_at(&self, draft: &mut DraftSale, now: DateTime<Utc>) -> DbResult<CheckoutOutcome> {
        draft.begin_validation()?;

        match self.run(draft, now).await {
            Ok(outcome) => {
                draft.mark_committed()?;
                info!(
                    sale_id = %outcome.sale.id,
                    total = %outcome.sale.total,
                    lines = outcome.sale.items.len(),
                    credit = outcome.sale.credit,
                    "Sale committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                draft.mark_rejected();
                warn!(sale_id = %draft.id, error = %err, "Checkout rejected");
                Err(err)
            }
        }
    }

    async fn run(&self, draft: &mut DraftSale, now: DateTime<Utc>) -> DbResult<CheckoutOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = if draft.is_credit() {
            customer::find_by_name(&mut tx, draft.customer_name()).await?
        } else {
            None
        };
        let validated = rules::validate_draft(draft, existing.as_ref())?;
        draft.begin_commit()?;

        // Stock
        let mut products = HashMap::new();
        for item in &validated.items {
            if products.contains_key(&item.product_id) {
                continue;
            }
            let found = product::fetch_product(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            products.insert(found.id.clone(), found);
        }
        let reservations = stock::reserve_for_sale(&validated.items, &products)?;
        for reservation in &reservations {
            debug!(
                product_id = %reservation.product_id,
                from = reservation.previous_stock,
                to = reservation.new_stock,
                "Reserving stock"
            );
            product::set_stock(&mut tx, &reservation.product_id, reservation.new_stock, now).await?;
        }

        // Customer
        let created_customer = rules::new_customer(&validated.customer, now);
        if let Some(new) = &created_customer {
            customer::insert_customer(&mut tx, new).await?;
        }
        let customer_id = match &validated.customer {
            CustomerChoice::WalkIn => None,
            CustomerChoice::Existing { id, .. } => Some(id.clone()),
            CustomerChoice::New { .. } => created_customer.as_ref().map(|c| c.id.clone()),
        };

        // Sale
        let sale = rules::build_sale(&validated, customer_id, now);
        sale::insert_sale(&mut tx, &sale).await?;

        // Ledger
        let (movement, ledger) = if sale.credit {
            (None, None)
        } else {
            let day = ledger_day(now);
            let movement = DailyCashMovement::for_sale(&sale, now);
            daily_cash::post_movement(&mut tx, day, &movement).await?;
            let ledger = daily_cash::require_ledger(&mut tx, day).await?;
            (Some(movement), Some(ledger))
        };

        tx.commit().await?;

        Ok(CheckoutOutcome {
            sale,
            reservations,
            created_customer,
            movement,
            ledger,
        })
    }

    /// Records payment of an open credit sale: marks it paid and posts the
    /// income to today's ledger, flagged as a credit settlement.
    pub async fn settle_credit(&self, sale_id: &str, method: PaymentMethod) -> DbResult<(Sale, DailyCash)> {
        self.settle_credit_at(sale_id, method, Utc::now()).await
    }

    pub async fn settle_credit_at(
        &self,
        sale_id: &str,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> DbResult<(Sale, DailyCash)> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut settled = sale::fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if !settled.credit || settled.paid {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: if settled.credit { "paid" } else { "not_credit" }.to_string(),
            }
            .into());
        }

        sale::mark_paid(&mut tx, sale_id).await?;
        settled.paid = true;

        let mut movement = DailyCashMovement::for_sale(&settled, now).with_credit_payment(sale_id);
        movement.description = CREDIT_PAYMENT_DESCRIPTION.to_string();
        movement.payment_method = method.as_str().to_string();
        movement.payment_splits = vec![PaymentSplit::new(method, settled.total)];

        let day = ledger_day(now);
        daily_cash::post_movement(&mut tx, day, &movement).await?;
        let ledger = daily_cash::require_ledger(&mut tx, day).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, amount = %settled.total, method = method.as_str(), "Credit sale settled");
        Ok((settled, ledger))
    }
}

fn ledger_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use till_core::{DraftStatus, ErrorKind, Money, Product, Unit, MIXED_PAYMENT_TAG, WALK_IN_CUSTOMER};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cheese = Product::new("Queso", Money::from_cents(10000), Money::from_cents(6000), 5.0, Unit::Kilogram);
        let cheese = db.products().insert(&cheese).await.unwrap();
        (db, cheese)
    }

    async fn stock_of(db: &Database, id: &str) -> f64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_sale_by_grams_deducts_kilograms() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 2000.0, Unit::Gram).unwrap();

        let outcome = db.checkout().commit_at(&mut draft, at(10)).await.unwrap();

        assert_eq!(draft.status(), DraftStatus::Committed);
        assert_eq!(outcome.sale.total.cents(), 20000);
        assert_eq!(outcome.reservations[0].new_stock, 3.0);
        assert_eq!(stock_of(&db, &cheese.id).await, 3.0);

        let movement = outcome.movement.unwrap();
        assert_eq!(movement.profit.cents(), 8000);
        assert_eq!(movement.payment_method, MIXED_PAYMENT_TAG);

        let stored = db.sales().get_by_id(&outcome.sale.id).await.unwrap().unwrap();
        assert_eq!(stored, outcome.sale);
        assert_eq!(stored.customer_name, WALK_IN_CUSTOMER);
        assert!(stored.paid);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 6000.0, Unit::Gram).unwrap();

        let err = db.checkout().commit_at(&mut draft, at(10)).await.unwrap_err();
        match err.domain() {
            Some(CoreError::InsufficientStock { available, unit, .. }) => {
                assert_eq!(*available, 5.0);
                assert_eq!(*unit, Unit::Kilogram);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        assert_eq!(draft.status(), DraftStatus::Rejected);
        assert_eq!(stock_of(&db, &cheese.id).await, 5.0);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert!(db.daily_cash().get_by_date(day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_split_payment_commits() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.5, Unit::Kilogram).unwrap();
        draft.add_payment().unwrap();
        draft.set_payment_method(1, PaymentMethod::Transfer).unwrap();
        draft.set_payment_amount(0, Money::from_cents(10000)).unwrap();

        let outcome = db.checkout().commit_at(&mut draft, at(11)).await.unwrap();
        assert_eq!(
            outcome.sale.payment_splits,
            vec![
                PaymentSplit::new(PaymentMethod::Cash, Money::from_cents(10000)),
                PaymentSplit::new(PaymentMethod::Transfer, Money::from_cents(5000)),
            ]
        );
        let ledger = outcome.ledger.unwrap();
        assert_eq!(ledger.movements[0].payment_splits.len(), 2);
        assert_eq!(ledger.total_income.cents(), 15000);
    }

    #[tokio::test]
    async fn test_unbalanced_payment_rejected_then_fixed() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.5, Unit::Kilogram).unwrap();
        draft.add_payment().unwrap();
        draft.add_payment().unwrap();
        draft.set_payment_amount(2, Money::from_cents(14000)).unwrap();

        let err = db.checkout().commit_at(&mut draft, at(12)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PaymentMismatch));
        assert_eq!(draft.status(), DraftStatus::Rejected);

        draft.set_payment_amount(0, Money::from_cents(1000)).unwrap();
        assert_eq!(draft.status(), DraftStatus::Editing);
        db.checkout().commit_at(&mut draft, at(12)).await.unwrap();
        assert_eq!(stock_of(&db, &cheese.id).await, 3.5);
    }

    #[tokio::test]
    async fn test_duplicate_customer_writes_nothing() {
        let (db, cheese) = setup().await;
        let ana = db.customers().insert(&Customer::new("ANA", "555", at(8))).await.unwrap();

        let ham = Product::new("Jamón", Money::from_cents(8000), Money::from_cents(5000), 4.0, Unit::Kilogram);
        let ham = db.products().insert(&ham).await.unwrap();
        let oil = Product::new("Aceite", Money::from_cents(8000), Money::from_cents(6000), 6.0, Unit::Liter);
        let oil = db.products().insert(&oil).await.unwrap();

        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.0, Unit::Kilogram).unwrap();
        draft.add_product(&ham, 1500.0, Unit::Gram).unwrap();
        draft.add_product(&oil, 1000.0, Unit::Milliliter).unwrap();
        draft.set_credit(true).unwrap();
        draft.set_customer("Ana", "").unwrap();
        assert_eq!(draft.total().cents(), 30000);

        let err = db.checkout().commit_at(&mut draft, at(10)).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::DuplicateCustomer));
        assert_eq!(stock_of(&db, &cheese.id).await, 5.0);
        assert_eq!(stock_of(&db, &ham.id).await, 4.0);
        assert_eq!(stock_of(&db, &oil.id).await, 6.0);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.customers().list("", 10).await.unwrap().len(), 1);

        draft.select_customer(&ana).unwrap();
        let outcome = db.checkout().commit_at(&mut draft, at(10)).await.unwrap();
        assert_eq!(outcome.sale.customer_id.as_deref(), Some(ana.id.as_str()));
        assert_eq!(outcome.sale.total.cents(), 30000);
        assert_eq!(stock_of(&db, &ham.id).await, 2.5);
        assert!(outcome.created_customer.is_none());
    }

    /// Eight terminals ring up the last three sodas at once.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commits_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("till.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();
        let soda = Product::new("Soda", Money::from_cents(250), Money::from_cents(100), 3.0, Unit::Unit);
        let soda = db.products().insert(&soda).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let soda = soda.clone();
            handles.push(tokio::spawn(async move {
                let mut draft = DraftSale::new();
                draft.add_product(&soda, 1.0, Unit::Unit).unwrap();
                db.checkout().commit_at(&mut draft, at(12)).await
            }));
        }

        let mut sold = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(err) => {
                    assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));
                    rejected += 1;
                }
            }
        }
        assert_eq!(sold, 3);
        assert_eq!(rejected, 5);
        assert_eq!(stock_of(&db, &soda.id).await, 0.0);
        assert_eq!(db.sales().count().await.unwrap(), 3);

        let ledger = db.daily_cash().reconcile(day()).await.unwrap();
        assert_eq!(ledger.movements.len(), 3);
        assert_eq!(ledger.total_income.cents(), 750);
    }

    #[tokio::test]
    async fn test_credit_sale_skips_ledger() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 500.0, Unit::Gram).unwrap();
        draft.set_credit(true).unwrap();
        draft.set_customer("juan perez", "555-0101").unwrap();

        let outcome = db.checkout().commit_at(&mut draft, at(9)).await.unwrap();
        let created = outcome.created_customer.clone().unwrap();
        assert_eq!(created.name, "JUAN PEREZ");
        assert!(created.id.starts_with("JUAN-PEREZ-"));

        let sale = db.sales().get_by_id(&outcome.sale.id).await.unwrap().unwrap();
        assert!(sale.credit);
        assert!(!sale.paid);
        assert!(sale.payment_splits.is_empty());
        assert_eq!(sale.customer_id, Some(created.id.clone()));
        assert!(outcome.movement.is_none());
        assert!(db.daily_cash().get_by_date(day()).await.unwrap().is_none());
        assert_eq!(stock_of(&db, &cheese.id).await, 4.5);

        let (settled, ledger) = db
            .checkout()
            .settle_credit_at(&sale.id, PaymentMethod::Cash, at(17))
            .await
            .unwrap();
        assert!(settled.paid);
        assert_eq!(ledger.total_income.cents(), 5000);
        assert!(ledger.movements[0].is_credit_payment);
        assert_eq!(ledger.movements[0].sale_id.as_deref(), Some(sale.id.as_str()));

        let again = db.checkout().settle_credit_at(&sale.id, PaymentMethod::Cash, at(18)).await;
        assert_eq!(again.unwrap_err().kind(), Some(ErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn test_two_sales_share_one_ledger() {
        let (db, _) = setup().await;
        let item = Product::new("Combo", Money::from_cents(10000), Money::from_cents(7000), 10.0, Unit::Unit);
        let item = db.products().insert(&item).await.unwrap();

        for hour in [10, 15] {
            let mut draft = DraftSale::new();
            draft.add_product(&item, 1.0, Unit::Unit).unwrap();
            db.checkout().commit_at(&mut draft, at(hour)).await.unwrap();
        }

        let ledger = db.daily_cash().reconcile(day()).await.unwrap();
        assert_eq!(ledger.movements.len(), 2);
        assert_eq!(ledger.total_income.cents(), 20000);
        assert_eq!(ledger.total_profit.cents(), 6000);
        assert_eq!(stock_of(&db, &item.id).await, 8.0);
    }

    #[tokio::test]
    async fn test_closed_register_rolls_back_stock() {
        let (db, cheese) = setup().await;
        db.daily_cash().open_ledger(day(), Money::zero()).await.unwrap();
        db.daily_cash().close_ledger(day()).await.unwrap();

        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.0, Unit::Kilogram).unwrap();
        let err = db.checkout().commit_at(&mut draft, at(20)).await.unwrap_err();

        assert!(matches!(err.domain(), Some(CoreError::LedgerClosed { .. })));
        assert_eq!(stock_of(&db, &cheese.id).await, 5.0);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_product_aborts() {
        let (db, cheese) = setup().await;
        let ghost = Product::new("Ghost", Money::from_cents(100), Money::zero(), 1.0, Unit::Unit);

        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.0, Unit::Kilogram).unwrap();
        draft.add_product(&ghost, 1.0, Unit::Unit).unwrap();

        let err = db.checkout().commit_at(&mut draft, at(10)).await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::ProductNotFound(id)) if *id == ghost.id));
        assert_eq!(stock_of(&db, &cheese.id).await, 5.0);
    }

    #[tokio::test]
    async fn test_committed_draft_is_frozen() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 1.0, Unit::Kilogram).unwrap();
        db.checkout().commit_at(&mut draft, at(10)).await.unwrap();

        assert!(draft.add_product(&cheese, 1.0, Unit::Kilogram).is_err());
        let err = db.checkout().commit_at(&mut draft, at(10)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidSaleStatus { .. })));
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(stock_of(&db, &cheese.id).await, 4.0);
    }

    #[tokio::test]
    async fn test_delete_keeps_stock_and_ledger() {
        let (db, cheese) = setup().await;
        let mut draft = DraftSale::new();
        draft.add_product(&cheese, 2.0, Unit::Kilogram).unwrap();
        let outcome = db.checkout().commit_at(&mut draft, at(10)).await.unwrap();

        db.sales().delete(&outcome.sale.id).await.unwrap();

        assert!(db.sales().get_by_id(&outcome.sale.id).await.unwrap().is_none());
        assert_eq!(stock_of(&db, &cheese.id).await, 3.0);
        let ledger = db.daily_cash().get_by_date(day()).await.unwrap().unwrap();
        assert_eq!(ledger.movements.len(), 1);
        assert_eq!(ledger.total_income.cents(), 20000);
    }
}
