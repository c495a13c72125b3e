//! # Product Repository
//!
//! Database operations for products, including the stock ledger.
//!
//! ## Stock Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: check-then-write (lost-update race)                         │
//! │     if product.stock >= qty { UPDATE products SET stock = stock - qty } │
//! │     Two concurrent completions can both pass the check.                 │
//! │                                                                         │
//! │  ✅ CORRECT: single conditional UPDATE                                 │
//! │     UPDATE products SET stock_quantity = stock_quantity - ?             │
//! │     WHERE id = ? AND active = 1 AND stock_quantity >= ?                 │
//! │                                                                         │
//! │  rows_affected = 0 means the decrement was refused; nothing changed.   │
//! │  The CHECK (stock_quantity >= 0) constraint is the last line of        │
//! │  defense behind this.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hive_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, sku, name, description, category, price,
                stock_quantity, low_stock_threshold, active,
                created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU (case-insensitive, SKUs are stored uppercase).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, sku, name, description, category, price,
                stock_quantity, low_stock_threshold, active,
                created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, sku, name, description, category, price,
                stock_quantity, low_stock_threshold, active,
                created_at, updated_at
            FROM products
            WHERE active = 1
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category, price,
                stock_quantity, low_stock_threshold, active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(product.low_stock_threshold)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product's catalog fields.
    ///
    /// Stock is deliberately NOT written here; all stock movement goes
    /// through [`decrease_stock`](Self::decrease_stock) /
    /// [`increase_stock`](Self::increase_stock).
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                category = ?5,
                price = ?6,
                low_stock_threshold = ?7,
                active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.low_stock_threshold)
        .bind(product.active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Decrements stock if, and only if, the product is active and holds
    /// enough stock. Returns `false` (and mutates nothing) otherwise.
    ///
    /// This is the single-statement form described in the module docs;
    /// concurrent callers serialize on the row, so two completions can never
    /// both succeed past the same last unit.
    pub async fn decrease_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Decreasing stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?2,
                updated_at = ?3
            WHERE id = ?1 AND active = 1 AND stock_quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Adds stock back unconditionally (refund/cancellation reversal,
    /// restocking).
    pub async fn increase_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Increasing stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting active = false.
    ///
    /// Historical sales still reference the row, so it is never hard-deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(sku: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            category: "Pantry".to_string(),
            price: 9.99,
            stock_quantity: stock,
            low_stock_threshold: 5,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_product() {
        let db = test_db().await;
        let p = product("HONEY500", 10);

        db.products().insert(&p).await.unwrap();

        let fetched = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(fetched.sku, "HONEY500");
        assert_eq!(fetched.stock_quantity, 10);
        assert!(fetched.active);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        db.products().insert(&product("WAX100", 1)).await.unwrap();

        let err = db.products().insert(&product("WAX100", 2)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_decrease_stock_refuses_overdraw() {
        let db = test_db().await;
        let p = product("CANDLE1", 2);
        db.products().insert(&p).await.unwrap();

        // Asking for more than available: refused, nothing changes
        assert!(!db.products().decrease_stock(&p.id, 3).await.unwrap());
        let unchanged = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock_quantity, 2);

        // Exact amount: allowed, down to zero
        assert!(db.products().decrease_stock(&p.id, 2).await.unwrap());
        let drained = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(drained.stock_quantity, 0);

        // Nothing left
        assert!(!db.products().decrease_stock(&p.id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_decrease_stock_refuses_inactive_product() {
        let db = test_db().await;
        let p = product("RETIRED1", 10);
        db.products().insert(&p).await.unwrap();
        db.products().soft_delete(&p.id).await.unwrap();

        assert!(!db.products().decrease_stock(&p.id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_sku_lookup_and_active_listing() {
        let db = test_db().await;
        db.products().insert(&product("HONEY500", 10)).await.unwrap();
        let retired = product("RETIRED1", 10);
        db.products().insert(&retired).await.unwrap();
        db.products().soft_delete(&retired.id).await.unwrap();

        let found = db.products().get_by_sku("honey500").await.unwrap();
        assert!(found.is_some());

        let active = db.products().list_active(10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = test_db().await;
        let mut p = product("HONEY500", 10);
        db.products().insert(&p).await.unwrap();

        p.price = 12.49;
        p.stock_quantity = 999; // ignored: stock only moves through the ledger
        db.products().update(&p).await.unwrap();

        let fetched = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(fetched.price, 12.49);
        assert_eq!(fetched.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_increase_stock_restores() {
        let db = test_db().await;
        let p = product("SOAP200", 5);
        db.products().insert(&p).await.unwrap();

        db.products().decrease_stock(&p.id, 4).await.unwrap();
        db.products().increase_stock(&p.id, 4).await.unwrap();

        let restored = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(restored.stock_quantity, 5);
    }
}
