//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Name / barcode search for the sale screen
//! - CRUD operations
//! - Absolute stock writes from checkout
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout computes the new level in till-core (canonical units,        │
//! │  rounded) and writes it back as an absolute value:                     │
//! │                                                                         │
//! │     UPDATE products SET stock = 3.0 WHERE id = ?                       │
//! │                                                                         │
//! │  Safe because the read and the write happen inside one transaction    │
//! │  under the database write lock; no other commit can land between.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::validation::{validate_price, validate_product_name, validate_search_query, validate_stock};
use till_core::{Money, Product, Unit};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, cost_price_cents, stock, unit, barcode, \
                               categories, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price_cents: i64,
    cost_price_cents: i64,
    stock: f64,
    unit: Unit,
    barcode: Option<String>,
    categories: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let categories =
            serde_json::from_str(&row.categories).map_err(|e| DbError::serialization("products.categories", e))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            cost_price: Money::from_cents(row.cost_price_cents),
            stock: row.stock,
            unit: row.unit,
            barcode: row.barcode,
            categories,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search("queso", 20).await?;
/// let product = repo.get_by_barcode("7791234000012").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by name fragment or exact barcode.
    ///
    /// An empty query lists products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit).await;
        }

        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {} FROM products WHERE name LIKE ?1 OR barcode = ?2 ORDER BY name LIMIT ?3",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        into_products(rows)
    }

    /// Lists products sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name LIMIT ?1", PRODUCT_COLUMNS);
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its barcode (scanner input).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE barcode = ?1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `Domain(Validation)` - blank name, negative price or stock
    /// * `UniqueViolation` - barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_product(product)?;
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let categories =
            serde_json::to_string(&product.categories).map_err(|e| DbError::serialization("products.categories", e))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, cost_price_cents, stock, unit,
                barcode, categories, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(product.name.trim())
        .bind(product.price.cents())
        .bind(product.cost_price.cents())
        .bind(product.stock)
        .bind(product.unit)
        .bind(&product.barcode)
        .bind(&categories)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e, product))?;

        Ok(product.clone())
    }

    /// Updates an existing product.
    ///
    /// Sales already recorded keep their own snapshot of name and prices.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, "Updating product");

        let categories =
            serde_json::to_string(&product.categories).map_err(|e| DbError::serialization("products.categories", e))?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                price_cents = ?3,
                cost_price_cents = ?4,
                stock = ?5,
                unit = ?6,
                barcode = ?7,
                categories = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.name.trim())
        .bind(product.price.cents())
        .bind(product.cost_price.cents())
        .bind(product.stock)
        .bind(product.unit)
        .bind(&product.barcode)
        .bind(&categories)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e, product))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Sets the stock level (restocking, manual count).
    pub async fn update_stock(&self, id: &str, stock: f64) -> DbResult<()> {
        validate_stock(stock)?;
        let mut conn = self.pool.acquire().await?;
        set_stock(&mut conn, id, stock, Utc::now()).await
    }

    /// Deletes a product. Recorded sales keep their line snapshots.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn validate_product(product: &Product) -> DbResult<()> {
    validate_product_name(&product.name)?;
    validate_price(product.price)?;
    validate_price(product.cost_price)?;
    validate_stock(product.stock)?;
    Ok(())
}

fn barcode_conflict(err: sqlx::Error, product: &Product) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("barcode") => {
            DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default())
        }
        other => other,
    }
}

// =============================================================================
// Connection-scoped helpers (used inside checkout transactions)
// =============================================================================

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let row: Option<ProductRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;
    row.map(Product::try_from).transpose()
}

pub(crate) async fn set_stock(conn: &mut SqliteConnection, id: &str, stock: f64, now: DateTime<Utc>) -> DbResult<()> {
    debug!(id = %id, stock = stock, "Writing stock level");

    let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(stock)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    fn cheese() -> Product {
        Product::new("Queso Cremoso", Money::from_cents(10000), Money::from_cents(6000), 5.0, Unit::Kilogram)
            .with_barcode("7790001")
            .with_categories(vec!["lácteos".to_string()])
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_db, repo) = setup().await;
        let product = repo.insert(&cheese()).await.unwrap();

        let found = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Queso Cremoso");
        assert_eq!(found.price.cents(), 10000);
        assert_eq!(found.unit, Unit::Kilogram);
        assert_eq!(found.categories, vec!["lácteos".to_string()]);

        let by_code = repo.get_by_barcode("7790001").await.unwrap().unwrap();
        assert_eq!(by_code.id, product.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_by_name_and_barcode() {
        let (_db, repo) = setup().await;
        repo.insert(&cheese()).await.unwrap();
        repo.insert(&Product::new("Soda", Money::from_cents(250), Money::from_cents(100), 24.0, Unit::Unit))
            .await
            .unwrap();

        assert_eq!(repo.search("queso", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("7790001", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("  ", 10).await.unwrap().len(), 2);
        assert!(repo.search("yerba", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let (_db, repo) = setup().await;
        repo.insert(&cheese()).await.unwrap();

        let err = repo.insert(&cheese()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, ref value } if field == "barcode" && value == "7790001"));
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let (_db, repo) = setup().await;
        let mut product = cheese();
        product.name = "   ".to_string();
        assert!(repo.insert(&product).await.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_stock() {
        let (_db, repo) = setup().await;
        let mut product = repo.insert(&cheese()).await.unwrap();

        product.price = Money::from_cents(12000);
        repo.update(&product).await.unwrap();
        repo.update_stock(&product.id, 2.5).await.unwrap();

        let found = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.price.cents(), 12000);
        assert_eq!(found.stock, 2.5);

        assert!(repo.update_stock(&product.id, -1.0).await.is_err());
        assert!(matches!(
            repo.update_stock("missing", 1.0).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_db, repo) = setup().await;
        let product = repo.insert(&cheese()).await.unwrap();

        repo.delete(&product.id).await.unwrap();
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
        assert!(repo.delete(&product.id).await.is_err());
    }
}
