//! # Sale Repository
//!
//! Reads and deletes committed sales. Sales are written only by
//! [`crate::checkout::CheckoutService`].
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales ─────────┬──► sale_items     (position-ordered line snapshots)  │
//! │                 └──► sale_payments  (position-ordered splits)          │
//! │                                                                         │
//! │  Deleting a sale cascades to its items and payments.                   │
//! │  Stock and the daily cash movement are left as they are.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::WriteLock;
use till_core::{CoreError, Money, PaymentMethod, PaymentSplit, Sale, SaleLineItem, Unit};

const SALE_COLUMNS: &str = "id, total_cents, manual_amount_cents, date, credit, paid, customer_id, \
                            customer_name, customer_phone, barcode";

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    total_cents: i64,
    manual_amount_cents: Option<i64>,
    date: DateTime<Utc>,
    credit: bool,
    paid: bool,
    customer_id: Option<String>,
    customer_name: String,
    customer_phone: String,
    barcode: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    product_id: String,
    name: String,
    unit_price_cents: i64,
    unit_cost_cents: i64,
    quantity: f64,
    unit: Unit,
    discount_pct: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct SalePaymentRow {
    method: PaymentMethod,
    amount_cents: i64,
}

impl From<SaleItemRow> for SaleLineItem {
    fn from(row: SaleItemRow) -> Self {
        SaleLineItem {
            product_id: row.product_id,
            name: row.name,
            unit_price: Money::from_cents(row.unit_price_cents),
            unit_cost: Money::from_cents(row.unit_cost_cents),
            quantity: row.quantity,
            unit: row.unit,
            discount_pct: row.discount_pct,
        }
    }
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleLineItem>, payment_splits: Vec<PaymentSplit>) -> Sale {
        Sale {
            id: self.id,
            items,
            payment_splits,
            total: Money::from_cents(self.total_cents),
            manual_amount: self.manual_amount_cents.map(Money::from_cents),
            date: self.date,
            credit: self.credit,
            paid: self.paid,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            barcode: self.barcode,
        }
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        SaleRepository { pool, write_lock }
    }

    /// Gets a sale with its items and payment splits.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Sales recorded on `day` (UTC), oldest first.
    pub async fn list_by_date(&self, day: NaiveDate) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE substr(date, 1, 10) = ?1 ORDER BY date, rowid",
            SALE_COLUMNS
        );
        self.load_all(&sql, day.to_string(), None).await
    }

    /// Latest sales, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {} FROM sales ORDER BY date DESC, rowid DESC LIMIT ?1", SALE_COLUMNS);
        self.load_all(&sql, String::new(), Some(limit)).await
    }

    /// Unpaid credit sales of a customer.
    pub async fn list_open_credit(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM sales WHERE customer_id = ?1 AND credit = 1 AND paid = 0 ORDER BY date, rowid",
            SALE_COLUMNS
        );
        self.load_all(&sql, customer_id.to_string(), None).await
    }

    async fn load_all(&self, sql: &str, key: String, limit: Option<u32>) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let query = sqlx::query_as::<_, SaleRow>(sql);
        let query = match limit {
            Some(limit) => query.bind(i64::from(limit)),
            None => query.bind(key),
        };
        let rows = query.fetch_all(&mut *conn).await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            sales.push(load_children(&mut conn, row).await?);
        }
        Ok(sales)
    }

    /// Deletes a sale with its items and payment splits.
    ///
    /// Stock is not restocked and the day's cash movement stays in the
    /// ledger.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::SaleNotFound(id.to_string()).into());
        }

        tx.commit().await?;
        info!(sale_id = %id, "Sale deleted");
        Ok(())
    }

    /// Marks a credit sale as settled.
    pub async fn mark_paid(&self, id: &str) -> DbResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut conn = self.pool.acquire().await?;
        mark_paid(&mut conn, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn load_children(conn: &mut SqliteConnection, row: SaleRow) -> DbResult<Sale> {
    let items: Vec<SaleItemRow> = sqlx::query_as(
        r#"
        SELECT product_id, name, unit_price_cents, unit_cost_cents, quantity, unit, discount_pct
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY position
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let payments: Vec<SalePaymentRow> =
        sqlx::query_as("SELECT method, amount_cents FROM sale_payments WHERE sale_id = ?1 ORDER BY position")
            .bind(&row.id)
            .fetch_all(&mut *conn)
            .await?;

    let items = items.into_iter().map(SaleLineItem::from).collect();
    let splits = payments
        .into_iter()
        .map(|p| PaymentSplit::new(p.method, Money::from_cents(p.amount_cents)))
        .collect();
    Ok(row.into_sale(items, splits))
}

// =============================================================================
// Connection-scoped helpers
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);
    let row: Option<SaleRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;

    match row {
        Some(row) => Ok(Some(load_children(conn, row).await?)),
        None => Ok(None),
    }
}

/// Writes the sale, its line snapshots and its splits.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(
        sale_id = %sale.id,
        total = sale.total.cents(),
        lines = sale.items.len(),
        credit = sale.credit,
        "Inserting sale"
    );

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, total_cents, manual_amount_cents, date, credit, paid,
            customer_id, customer_name, customer_phone, barcode
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.total.cents())
    .bind(sale.manual_amount.map(|m| m.cents()))
    .bind(sale.date)
    .bind(sale.credit)
    .bind(sale.paid)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(&sale.barcode)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("sale id", sale.id.clone()),
        other => other,
    })?;

    for (position, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, position, product_id, name, unit_price_cents, unit_cost_cents,
                quantity, unit, discount_pct, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.unit_price.cents())
        .bind(item.unit_cost.cents())
        .bind(item.quantity)
        .bind(item.unit)
        .bind(item.discount_pct)
        .bind(item.line_total().cents())
        .execute(&mut *conn)
        .await?;
    }

    for (position, split) in sale.payment_splits.iter().enumerate() {
        sqlx::query("INSERT INTO sale_payments (sale_id, position, method, amount_cents) VALUES (?1, ?2, ?3, ?4)")
            .bind(&sale.id)
            .bind(position as i64)
            .bind(split.method)
            .bind(split.amount.cents())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub(crate) async fn mark_paid(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE sales SET paid = 1 WHERE id = ?1 AND credit = 1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::SaleNotFound(id.to_string()).into());
    }
    Ok(())
}
