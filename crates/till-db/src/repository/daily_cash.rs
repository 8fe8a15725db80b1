//! # Daily Cash Repository
//!
//! Persistence for the per-day cash ledger.
//!
//! ## Posting Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write lock ──► BEGIN                                                  │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │   get_or_create_ledger(date)                                           │
//! │     INSERT ... ON CONFLICT(date) DO NOTHING                            │
//! │     SELECT header (totals, closed)                                     │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │   DailyCash::post()  ◄── closed? negative? (till-core rules)           │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │   INSERT movement, UPDATE daily_cash totals ──► COMMIT                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UNIQUE index on `daily_cash.date` keeps one ledger per day even if
//! two writers race on a fresh day.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::WriteLock;
use till_core::{CoreError, DailyCash, DailyCashMovement, Money, MovementType, ValidationError};

#[derive(Debug, sqlx::FromRow)]
struct DailyCashRow {
    id: String,
    date: NaiveDate,
    initial_amount_cents: i64,
    closed: bool,
    total_income_cents: i64,
    total_expense_cents: i64,
    total_profit_cents: i64,
}

impl From<DailyCashRow> for DailyCash {
    fn from(row: DailyCashRow) -> Self {
        DailyCash {
            id: row.id,
            date: row.date,
            initial_amount: Money::from_cents(row.initial_amount_cents),
            movements: Vec::new(),
            closed: row.closed,
            total_income: Money::from_cents(row.total_income_cents),
            total_expense: Money::from_cents(row.total_expense_cents),
            total_profit: Money::from_cents(row.total_profit_cents),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    movement_type: MovementType,
    amount_cents: i64,
    description: String,
    items_json: String,
    cost_total_cents: i64,
    sell_total_cents: i64,
    profit_cents: i64,
    payment_method: String,
    payment_splits_json: String,
    sale_id: Option<String>,
    is_credit_payment: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<MovementRow> for DailyCashMovement {
    type Error = DbError;

    fn try_from(row: MovementRow) -> DbResult<Self> {
        Ok(DailyCashMovement {
            id: row.id,
            movement_type: row.movement_type,
            amount: Money::from_cents(row.amount_cents),
            description: row.description,
            items: serde_json::from_str(&row.items_json)
                .map_err(|e| DbError::serialization("daily_cash_movements.items_json", e))?,
            cost_total: Money::from_cents(row.cost_total_cents),
            sell_total: Money::from_cents(row.sell_total_cents),
            profit: Money::from_cents(row.profit_cents),
            payment_method: row.payment_method,
            payment_splits: serde_json::from_str(&row.payment_splits_json)
                .map_err(|e| DbError::serialization("daily_cash_movements.payment_splits_json", e))?,
            sale_id: row.sale_id,
            is_credit_payment: row.is_credit_payment,
            created_at: row.created_at,
        })
    }
}

/// Repository for the daily cash ledger.
///
/// Every write takes the database write lock, so postings here never
/// interleave with a checkout commit.
#[derive(Debug, Clone)]
pub struct DailyCashRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl DailyCashRepository {
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        DailyCashRepository { pool, write_lock }
    }

    /// The ledger for `date` with all its movements, if the day was opened.
    pub async fn get_by_date(&self, date: NaiveDate) -> DbResult<Option<DailyCash>> {
        let mut conn = self.pool.acquire().await?;
        fetch_ledger(&mut conn, date).await
    }

    /// The ledger for `date`, created empty if absent.
    pub async fn get_or_create(&self, date: NaiveDate) -> DbResult<DailyCash> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await?;
        get_or_create_ledger(&mut conn, date).await?;
        require_ledger(&mut conn, date).await
    }

    /// Opens the register for `date` with a starting float.
    ///
    /// Opening a day that already has a ledger replaces its initial amount.
    ///
    /// ## Errors
    /// * `Domain(LedgerClosed)` - the day was already closed
    pub async fn open_ledger(&self, date: NaiveDate, initial_amount: Money) -> DbResult<DailyCash> {
        if initial_amount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "initial_amount".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let ledger = get_or_create_ledger(&mut tx, date).await?;
        if ledger.closed {
            return Err(CoreError::LedgerClosed { date: date.to_string() }.into());
        }

        sqlx::query("UPDATE daily_cash SET initial_amount_cents = ?2 WHERE id = ?1")
            .bind(&ledger.id)
            .bind(initial_amount.cents())
            .execute(&mut *tx)
            .await?;

        let ledger = require_ledger(&mut tx, date).await?;
        tx.commit().await?;

        info!(date = %date, initial = %initial_amount, "Register opened");
        Ok(ledger)
    }

    /// Posts an income movement, creating the day's ledger if needed.
    pub async fn post_income(&self, date: NaiveDate, movement: DailyCashMovement) -> DbResult<DailyCash> {
        self.post(date, movement, MovementType::Income).await
    }

    /// Posts an expense movement, creating the day's ledger if needed.
    pub async fn post_expense(&self, date: NaiveDate, movement: DailyCashMovement) -> DbResult<DailyCash> {
        self.post(date, movement, MovementType::Expense).await
    }

    async fn post(&self, date: NaiveDate, movement: DailyCashMovement, expected: MovementType) -> DbResult<DailyCash> {
        if movement.movement_type != expected {
            return Err(ValidationError::InvalidFormat {
                field: "movement_type".to_string(),
                reason: format!("expected {}, got {}", expected.as_str(), movement.movement_type.as_str()),
            }
            .into());
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        post_movement(&mut tx, date, &movement).await?;
        let ledger = require_ledger(&mut tx, date).await?;
        tx.commit().await?;
        Ok(ledger)
    }

    /// Closes the register for `date`. Idempotent.
    ///
    /// ## Errors
    /// * `NotFound` - nothing was ever posted or opened that day
    pub async fn close_ledger(&self, date: NaiveDate) -> DbResult<DailyCash> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("UPDATE daily_cash SET closed = 1 WHERE date = ?1")
            .bind(date)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DailyCash", date.to_string()));
        }

        let ledger = require_ledger(&mut conn, date).await?;
        info!(
            date = %date,
            income = %ledger.total_income,
            expense = %ledger.total_expense,
            expected_cash = %ledger.expected_cash(),
            "Register closed"
        );
        Ok(ledger)
    }

    /// Recomputes the day's aggregates from its movements.
    ///
    /// ## Errors
    /// * `Domain(LedgerOutOfBalance)` - stored totals drifted
    /// * `NotFound` - no ledger for `date`
    pub async fn reconcile(&self, date: NaiveDate) -> DbResult<DailyCash> {
        let mut conn = self.pool.acquire().await?;
        let ledger = require_ledger(&mut conn, date).await?;
        ledger.reconcile()?;
        Ok(ledger)
    }

    /// Cash that should be in the drawer for `date`; zero for a day with no
    /// ledger.
    pub async fn expected_cash(&self, date: NaiveDate) -> DbResult<Money> {
        Ok(self
            .get_by_date(date)
            .await?
            .map(|ledger| ledger.expected_cash())
            .unwrap_or_default())
    }
}

// =============================================================================
// Connection-scoped helpers
// =============================================================================

async fn fetch_header(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Option<DailyCash>> {
    let row: Option<DailyCashRow> = sqlx::query_as(
        r#"
        SELECT id, date, initial_amount_cents, closed,
               total_income_cents, total_expense_cents, total_profit_cents
        FROM daily_cash
        WHERE date = ?1
        "#,
    )
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(DailyCash::from))
}

/// The ledger for `date` with every movement, oldest first.
pub(crate) async fn fetch_ledger(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Option<DailyCash>> {
    let Some(mut ledger) = fetch_header(conn, date).await? else {
        return Ok(None);
    };

    let rows: Vec<MovementRow> = sqlx::query_as(
        r#"
        SELECT id, movement_type, amount_cents, description, items_json,
               cost_total_cents, sell_total_cents, profit_cents,
               payment_method, payment_splits_json, sale_id, is_credit_payment, created_at
        FROM daily_cash_movements
        WHERE daily_cash_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(&ledger.id)
    .fetch_all(&mut *conn)
    .await?;

    ledger.movements = rows
        .into_iter()
        .map(DailyCashMovement::try_from)
        .collect::<DbResult<_>>()?;
    Ok(Some(ledger))
}

pub(crate) async fn require_ledger(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<DailyCash> {
    fetch_ledger(conn, date)
        .await?
        .ok_or_else(|| DbError::not_found("DailyCash", date.to_string()))
}

/// Resolves the ledger header for `date`, creating an open, empty one with a
/// zero float if the day has none. Movements are not loaded.
pub(crate) async fn get_or_create_ledger(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<DailyCash> {
    let fresh = DailyCash::open(date, Money::zero());

    let inserted = sqlx::query(
        r#"
        INSERT INTO daily_cash (
            id, date, initial_amount_cents, closed,
            total_income_cents, total_expense_cents, total_profit_cents
        ) VALUES (?1, ?2, 0, 0, 0, 0, 0)
        ON CONFLICT(date) DO NOTHING
        "#,
    )
    .bind(&fresh.id)
    .bind(date)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        debug!(date = %date, id = %fresh.id, "Created daily cash ledger");
    }

    fetch_header(conn, date)
        .await?
        .ok_or_else(|| DbError::not_found("DailyCash", date.to_string()))
}

/// Appends `movement` to the ledger of `date` and writes the new aggregates.
pub(crate) async fn post_movement(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    movement: &DailyCashMovement,
) -> DbResult<()> {
    let mut ledger = get_or_create_ledger(conn, date).await?;
    ledger.post(movement.clone())?;

    let items_json = serde_json::to_string(&movement.items)
        .map_err(|e| DbError::serialization("daily_cash_movements.items_json", e))?;
    let splits_json = serde_json::to_string(&movement.payment_splits)
        .map_err(|e| DbError::serialization("daily_cash_movements.payment_splits_json", e))?;

    sqlx::query(
        r#"
        INSERT INTO daily_cash_movements (
            id, daily_cash_id, movement_type, amount_cents, description, items_json,
            cost_total_cents, sell_total_cents, profit_cents,
            payment_method, payment_splits_json, sale_id, is_credit_payment, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&movement.id)
    .bind(&ledger.id)
    .bind(movement.movement_type)
    .bind(movement.amount.cents())
    .bind(&movement.description)
    .bind(&items_json)
    .bind(movement.cost_total.cents())
    .bind(movement.sell_total.cents())
    .bind(movement.profit.cents())
    .bind(&movement.payment_method)
    .bind(&splits_json)
    .bind(&movement.sale_id)
    .bind(movement.is_credit_payment)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        UPDATE daily_cash SET
            total_income_cents = ?2,
            total_expense_cents = ?3,
            total_profit_cents = ?4
        WHERE id = ?1
        "#,
    )
    .bind(&ledger.id)
    .bind(ledger.total_income.cents())
    .bind(ledger.total_expense.cents())
    .bind(ledger.total_profit.cents())
    .execute(&mut *conn)
    .await?;

    debug!(
        date = %date,
        movement_type = movement.movement_type.as_str(),
        amount = movement.amount.cents(),
        total_income = ledger.total_income.cents(),
        "Movement posted"
    );
    Ok(())
}
