//! # Customer Repository
//!
//! Credit-account customers. Names are stored upper-case and unique without
//! regard to case (`UNIQUE ... COLLATE NOCASE`).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::validation::validate_customer_name;
use till_core::{normalize_customer_name, Customer};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer.
    ///
    /// ## Errors
    /// * `UniqueViolation` - a customer with the same name (any case) exists
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        insert_customer(&mut conn, customer).await?;
        Ok(customer.clone())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as("SELECT id, name, phone, created_at, updated_at FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Customer::from))
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        find_by_name(&mut conn, name).await
    }

    /// Customers whose name contains `fragment`, for the credit picker.
    pub async fn list(&self, fragment: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", normalize_customer_name(fragment));
        let rows: Vec<CustomerRow> = sqlx::query_as(
            "SELECT id, name, phone, created_at, updated_at FROM customers \
             WHERE name LIKE ?1 ORDER BY name LIMIT ?2",
        )
        .bind(&pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }
}

// =============================================================================
// Connection-scoped helpers
// =============================================================================

pub(crate) async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<Customer>> {
    let name = normalize_customer_name(name);
    if name.is_empty() {
        return Ok(None);
    }
    let row: Option<CustomerRow> = sqlx::query_as(
        "SELECT id, name, phone, created_at, updated_at FROM customers WHERE name = ?1 COLLATE NOCASE",
    )
    .bind(&name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(Customer::from))
}

pub(crate) async fn insert_customer(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    validate_customer_name(&customer.name)?;
    debug!(id = %customer.id, name = %customer.name, "Inserting customer");

    sqlx::query("INSERT INTO customers (id, name, phone, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(&customer.id)
        .bind(normalize_customer_name(&customer.name))
        .bind(&customer.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("name") => {
                DbError::duplicate("customer name", customer.name.clone())
            }
            other => other,
        })?;

    Ok(())
}
