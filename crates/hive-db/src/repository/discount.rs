//! # Discount Repository
//!
//! Database operations for discount rules.
//!
//! The SQL narrows candidates (active, date window open, minimum met) and
//! the pure selection logic in `hive_core::discount` picks the winner, so
//! the savings math stays in one testable place.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hive_core::Discount;

const DISCOUNT_COLUMNS: &str = r#"
    id, name, description, discount_type, value, minimum_amount,
    active, starts_at, ends_at, created_at, updated_at
"#;

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Gets a discount by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = ?1");
        let discount = sqlx::query_as::<_, Discount>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(discount)
    }

    /// Inserts a new discount.
    pub async fn insert(&self, discount: &Discount) -> DbResult<()> {
        debug!(name = %discount.name, "Inserting discount");

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, name, description, discount_type, value, minimum_amount,
                active, starts_at, ends_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.description)
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.minimum_amount)
        .bind(discount.active)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.created_at)
        .bind(discount.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing discount.
    pub async fn update(&self, discount: &Discount) -> DbResult<()> {
        debug!(id = %discount.id, "Updating discount");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE discounts SET
                name = ?2,
                description = ?3,
                discount_type = ?4,
                value = ?5,
                minimum_amount = ?6,
                active = ?7,
                starts_at = ?8,
                ends_at = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.description)
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.minimum_amount)
        .bind(discount.active)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount", &discount.id));
        }

        Ok(())
    }

    /// Discounts currently applicable to a sale amount: active, inside their
    /// date window, and with their minimum met.
    ///
    /// Ordered by creation so the selector's first-found tie-break is stable.
    pub async fn current_for_amount(
        &self,
        amount: f64,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Discount>> {
        let sql = format!(
            r#"
            SELECT {DISCOUNT_COLUMNS}
            FROM discounts
            WHERE active = 1
              AND (starts_at IS NULL OR starts_at <= ?1)
              AND (ends_at IS NULL OR ends_at >= ?1)
              AND minimum_amount <= ?2
            ORDER BY created_at
            "#
        );

        let discounts = sqlx::query_as::<_, Discount>(&sql)
            .bind(now)
            .bind(amount)
            .fetch_all(&self.pool)
            .await?;

        Ok(discounts)
    }

    /// Lists all discounts, active first, newest within each group.
    pub async fn list(&self) -> DbResult<Vec<Discount>> {
        let sql = format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts ORDER BY active DESC, created_at DESC"
        );
        let discounts = sqlx::query_as::<_, Discount>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(discounts)
    }
}

/// Helper to generate a new discount ID.
pub fn generate_discount_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
