//! # Sale Repository
//!
//! Database operations for sales and sale items, including the transactional
//! state transitions.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create_with_items() → Sale { status: pending } + items         │
//! │         (one transaction; decrements stock when created completed)     │
//! │                                                                         │
//! │  2. ADJUST ITEMS (while pending)                                       │
//! │     └── insert_item / update_item / delete_item / replace_items        │
//! │     └── update_totals() → recompute subtotal, discount, tax, total     │
//! │                                                                         │
//! │  3. TRANSITION                                                         │
//! │     ├── complete_sale() → stock decrement per item + status flip       │
//! │     ├── cancel_sale()   → status flip only                             │
//! │     └── refund_sale()   → stock restore per item + status flip         │
//! │                                                                         │
//! │  Each transition is ONE transaction: a refused stock decrement rolls   │
//! │  the whole transition back, leaving stock and status untouched.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status guards are expressed in the UPDATE's WHERE clause
//! (`AND status = 'pending'`), so a concurrent transition loses cleanly
//! instead of double-applying side effects.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hive_core::{AppliedOffer, PaymentMethod, Sale, SaleItem, SaleStatus, SaleTotals};

const SALE_COLUMNS: &str = r#"
    id, user_id, customer_id, status, payment_method,
    subtotal, discount_amount, tax_amount, total_amount,
    notes, created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw sale_items row; `applied_offers` is stored as a JSON TEXT column.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_id: String,
    quantity: i64,
    unit_price: f64,
    discount_amount: f64,
    line_total: f64,
    applied_offers: String,
    created_at: DateTime<Utc>,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        let applied_offers: Vec<AppliedOffer> =
            serde_json::from_str(&row.applied_offers).unwrap_or_default();

        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            discount_amount: row.discount_amount,
            line_total: row.line_total,
            applied_offers,
            created_at: row.created_at,
        }
    }
}

fn offers_json(offers: &[AppliedOffer]) -> String {
    serde_json::to_string(offers).unwrap_or_else(|_| "[]".to_string())
}

// =============================================================================
// Filters
// =============================================================================

/// Listing filter for sales.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Persists a sale and its line items in one transaction.
    ///
    /// When `decrement_stock` is set (sale created directly as completed),
    /// each item's stock is consumed inside the same transaction; any refused
    /// decrement aborts the whole creation.
    pub async fn create_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        decrement_stock: bool,
    ) -> DbResult<()> {
        debug!(id = %sale.id, items = items.len(), "Creating sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, user_id, customer_id, status, payment_method,
                subtotal, discount_amount, tax_amount, total_amount,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.user_id)
        .bind(&sale.customer_id)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(sale.subtotal)
        .bind(sale.discount_amount)
        .bind(sale.tax_amount)
        .bind(sale.total_amount)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            insert_item_stmt(&mut *tx, item).await?;
        }

        if decrement_stock {
            for item in items {
                decrement_stock_stmt(&mut *tx, &item.product_id, item.quantity).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Updates a sale's header fields and cached totals. Status is not
    /// written here; it only moves through the transition methods below.
    pub async fn update_sale(&self, sale: &Sale) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                payment_method = ?3,
                subtotal = ?4,
                discount_amount = ?5,
                tax_amount = ?6,
                total_amount = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(sale.payment_method)
        .bind(sale.subtotal)
        .bind(sale.discount_amount)
        .bind(sale.tax_amount)
        .bind(sale.total_amount)
        .bind(&sale.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        Ok(())
    }

    /// Writes recomputed totals after an item mutation.
    pub async fn update_totals(&self, sale_id: &str, totals: &SaleTotals) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                subtotal = ?2,
                discount_amount = ?3,
                tax_amount = ?4,
                total_amount = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(totals.subtotal)
        .bind(totals.discount_amount)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    // =========================================================================
    // State Transitions
    // =========================================================================

    /// Completes a pending sale: consumes stock for every line item and flips
    /// the status, all in one transaction.
    ///
    /// A refused decrement (concurrent sale drained the stock) returns
    /// `DbError::InsufficientStock` and rolls everything back.
    pub async fn complete_sale(&self, sale_id: &str) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Completing sale");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let items = fetch_items_stmt(&mut *tx, sale_id).await?;

        for item in &items {
            decrement_stock_stmt(&mut *tx, &item.product_id, item.quantity).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'completed', updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (pending)", sale_id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cancels a pending sale. No stock movement.
    pub async fn cancel_sale(&self, sale_id: &str) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'cancelled', updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (pending)", sale_id));
        }

        Ok(())
    }

    /// Refunds a completed sale: restores stock for every line item and flips
    /// the status, all in one transaction.
    ///
    /// The refund-window guard lives in the service layer; this method only
    /// guards against double application via the status predicate.
    pub async fn refund_sale(&self, sale_id: &str) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Refunding sale");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let items = fetch_items_stmt(&mut *tx, sale_id).await?;

        for item in &items {
            sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + ?2, updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'refunded', updated_at = ?2
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (completed)", sale_id));
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Gets all items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = fetch_items_stmt(&self.pool, sale_id).await?;
        Ok(items)
    }

    /// Gets one item of a sale.
    pub async fn get_item(&self, sale_id: &str, item_id: &str) -> DbResult<Option<SaleItem>> {
        let row = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price,
                   discount_amount, line_total, applied_offers, created_at
            FROM sale_items
            WHERE sale_id = ?1 AND id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SaleItem::from))
    }

    /// Finds the line for a given product within a sale, if any.
    ///
    /// Adding the same product again merges into this line instead of
    /// creating a second one.
    pub async fn find_item_by_product(
        &self,
        sale_id: &str,
        product_id: &str,
    ) -> DbResult<Option<SaleItem>> {
        let row = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price,
                   discount_amount, line_total, applied_offers, created_at
            FROM sale_items
            WHERE sale_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SaleItem::from))
    }

    /// Adds a single item to a sale.
    pub async fn insert_item(&self, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");
        insert_item_stmt(&self.pool, item).await
    }

    /// Rewrites an item's quantity, pricing and offers.
    pub async fn update_item(&self, item: &SaleItem) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sale_items SET
                quantity = ?2,
                unit_price = ?3,
                discount_amount = ?4,
                line_total = ?5,
                applied_offers = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount_amount)
        .bind(item.line_total)
        .bind(offers_json(&item.applied_offers))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", &item.id));
        }

        Ok(())
    }

    /// Removes one item from a sale.
    pub async fn delete_item(&self, sale_id: &str, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1 AND id = ?2")
            .bind(sale_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale item", item_id));
        }

        Ok(())
    }

    /// Replaces a sale's entire line item set in one transaction.
    ///
    /// Used by sale PATCH: the submitted set wins, there is no partial merge.
    pub async fn replace_items(&self, sale_id: &str, items: &[SaleItem]) -> DbResult<()> {
        debug!(sale_id = %sale_id, items = items.len(), "Replacing sale items");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            insert_item_stmt(&mut *tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Listing & Revenue
    // =========================================================================

    /// Lists sales newest-first, with optional filters.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"
        ));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(method) = filter.payment_method {
            builder.push(" AND payment_method = ").push_bind(method);
        }
        if let Some(ref user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(ref customer_id) = filter.customer_id {
            builder
                .push(" AND customer_id = ")
                .push_bind(customer_id.clone());
        }

        builder.push(" ORDER BY created_at DESC");
        builder
            .push(" LIMIT ")
            .push_bind(filter.limit.unwrap_or(20));
        builder
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0));

        let sales = builder
            .build_query_as::<Sale>()
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Total completed revenue in a period.
    pub async fn revenue_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<f64> {
        let total: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(total_amount) FROM sales
            WHERE status = 'completed' AND created_at >= ?1 AND created_at <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0.0))
    }

    /// Number of completed sales in a period.
    pub async fn completed_count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE status = 'completed' AND created_at >= ?1 AND created_at <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Average completed sale amount in a period; 0 when there were none.
    pub async fn average_sale_amount(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<f64> {
        let avg: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(total_amount) FROM sales
            WHERE status = 'completed' AND created_at >= ?1 AND created_at <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg.unwrap_or(0.0))
    }
}

// =============================================================================
// Shared Statements
// =============================================================================
// These run against either the pool or an open transaction, so the
// transition methods can reuse them inside their transaction boundary.

async fn insert_item_stmt<'e, E>(executor: E, item: &SaleItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, quantity, unit_price,
            discount_amount, line_total, applied_offers, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.discount_amount)
    .bind(item.line_total)
    .bind(offers_json(&item.applied_offers))
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn fetch_items_stmt<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<SaleItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT id, sale_id, product_id, quantity, unit_price,
               discount_amount, line_total, applied_offers, created_at
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(SaleItem::from).collect())
}

/// The stock ledger's conditional decrement, transaction-scoped.
///
/// Zero rows affected means the product is missing, inactive, or short on
/// stock; the caller's transaction rolls back untouched.
async fn decrement_stock_stmt<'e, E>(executor: E, product_id: &str, quantity: i64) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND active = 1 AND stock_quantity >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: quantity,
        });
    }

    Ok(())
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use crate::repository::user::generate_user_id;
    use hive_core::{Product, User, UserRole};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_user(db: &Database) -> User {
        let now = Utc::now();
        let user = User {
            id: generate_user_id(),
            email: "clerk@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Avery".to_string(),
            last_name: "Quinn".to_string(),
            role: UserRole::Employee,
            active: true,
            confirmed_at: Some(now),
            failed_attempts: 0,
            locked_at: None,
            unlock_token: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            two_factor_backup_codes: None,
            sms_verification_enabled: false,
            phone_number: None,
            phone_verified_at: None,
            sms_verification_code: None,
            sms_code_expires_at: None,
            session_token: None,
            password_changed_at: None,
            must_change_password: false,
            sign_in_count: 0,
            current_sign_in_at: None,
            last_sign_in_at: None,
            created_at: now,
            updated_at: now,
        };
        db.users().insert(&user).await.unwrap();
        user
    }

    async fn seed_product(db: &Database, sku: &str, price: f64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            description: None,
            category: "Pantry".to_string(),
            price,
            stock_quantity: stock,
            low_stock_threshold: 5,
            active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product
    }

    fn sale(user_id: &str, status: SaleStatus) -> Sale {
        let now = Utc::now();
        Sale {
            id: generate_sale_id(),
            user_id: user_id.to_string(),
            customer_id: None,
            status,
            payment_method: PaymentMethod::Cash,
            subtotal: 0.0,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total_amount: 0.0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(sale_id: &str, product: &Product, quantity: i64) -> SaleItem {
        SaleItem {
            id: generate_sale_item_id(),
            sale_id: sale_id.to_string(),
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            discount_amount: 0.0,
            line_total: quantity as f64 * product.price,
            applied_offers: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_complete_then_refund_restores_stock_exactly() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;
        let wax = seed_product(&db, "WAX100", 20.0, 3).await;

        let s = sale(&user.id, SaleStatus::Pending);
        let items = vec![item(&s.id, &honey, 3), item(&s.id, &wax, 1)];
        db.sales().create_with_items(&s, &items, false).await.unwrap();

        db.sales().complete_sale(&s.id).await.unwrap();
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            5
        );
        assert_eq!(
            db.products().get_by_id(&wax.id).await.unwrap().unwrap().stock_quantity,
            2
        );

        db.sales().refund_sale(&s.id).await.unwrap();
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            8
        );
        assert_eq!(
            db.products().get_by_id(&wax.id).await.unwrap().unwrap().stock_quantity,
            3
        );

        let refunded = db.sales().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(refunded.status, SaleStatus::Refunded);
    }

    #[tokio::test]
    async fn test_complete_rolls_back_on_insufficient_stock() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let plenty = seed_product(&db, "PLENTY1", 5.0, 100).await;
        let scarce = seed_product(&db, "SCARCE1", 5.0, 1).await;

        let s = sale(&user.id, SaleStatus::Pending);
        let items = vec![item(&s.id, &plenty, 10), item(&s.id, &scarce, 2)];
        db.sales().create_with_items(&s, &items, false).await.unwrap();

        let err = db.sales().complete_sale(&s.id).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { .. }));

        // The first item's decrement must have rolled back too
        assert_eq!(
            db.products().get_by_id(&plenty.id).await.unwrap().unwrap().stock_quantity,
            100
        );
        let unchanged = db.sales().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, SaleStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_completed_decrements_at_creation() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let s = sale(&user.id, SaleStatus::Completed);
        let items = vec![item(&s.id, &honey, 2)];
        db.sales().create_with_items(&s, &items, true).await.unwrap();

        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            6
        );
    }

    #[tokio::test]
    async fn test_cancel_guard_refuses_non_pending() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let s = sale(&user.id, SaleStatus::Pending);
        let items = vec![item(&s.id, &honey, 1)];
        db.sales().create_with_items(&s, &items, false).await.unwrap();

        db.sales().cancel_sale(&s.id).await.unwrap();
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            8
        );

        // Cancelling again is a refused no-op, state stays cancelled
        assert!(db.sales().cancel_sale(&s.id).await.is_err());
        let still = db.sales().get_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(still.status, SaleStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cascade_delete_of_items() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let s = sale(&user.id, SaleStatus::Pending);
        db.sales()
            .create_with_items(&s, &[item(&s.id, &honey, 1)], false)
            .await
            .unwrap();

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(&s.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.sales().get_items(&s.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_items_rebuilds_set() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;
        let wax = seed_product(&db, "WAX100", 20.0, 3).await;

        let s = sale(&user.id, SaleStatus::Pending);
        db.sales()
            .create_with_items(&s, &[item(&s.id, &honey, 2)], false)
            .await
            .unwrap();

        db.sales()
            .replace_items(&s.id, &[item(&s.id, &wax, 1)])
            .await
            .unwrap();

        let items = db.sales().get_items(&s.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, wax.id);
    }

    #[tokio::test]
    async fn test_applied_offers_round_trip() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let s = sale(&user.id, SaleStatus::Pending);
        let mut it = item(&s.id, &honey, 2);
        it.discount_amount = 2.0;
        it.line_total = 18.0;
        it.applied_offers = vec![AppliedOffer {
            id: "d1".to_string(),
            name: "Opening week".to_string(),
            amount: 2.0,
        }];
        db.sales().create_with_items(&s, &[it], false).await.unwrap();

        let items = db.sales().get_items(&s.id).await.unwrap();
        assert_eq!(items[0].applied_offers.len(), 1);
        assert_eq!(items[0].applied_offers[0].name, "Opening week");
        assert!(items[0].line_total_reconciles());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let pending = sale(&user.id, SaleStatus::Pending);
        db.sales()
            .create_with_items(&pending, &[item(&pending.id, &honey, 1)], false)
            .await
            .unwrap();

        let done = sale(&user.id, SaleStatus::Completed);
        db.sales()
            .create_with_items(&done, &[item(&done.id, &honey, 1)], true)
            .await
            .unwrap();

        let filter = SaleFilter {
            status: Some(SaleStatus::Completed),
            ..Default::default()
        };
        let sales = db.sales().list(&filter).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, done.id);
    }

    #[tokio::test]
    async fn test_revenue_rollups() {
        let db = test_db().await;
        let user = seed_user(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let mut s = sale(&user.id, SaleStatus::Completed);
        s.subtotal = 20.0;
        s.tax_amount = 1.6;
        s.total_amount = 21.6;
        db.sales()
            .create_with_items(&s, &[item(&s.id, &honey, 2)], true)
            .await
            .unwrap();

        let start = Utc::now() - chrono::Duration::days(1);
        let end = Utc::now() + chrono::Duration::days(1);
        assert!((db.sales().revenue_between(start, end).await.unwrap() - 21.6).abs() < 0.01);
        assert_eq!(db.sales().completed_count_between(start, end).await.unwrap(), 1);
    }
}
