//! # Customer Repository
//!
//! Database operations for customer records.
//!
//! Purchase aggregates (total spend, order count) are derived from completed
//! sales on demand; nothing is denormalized onto the customer row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use hive_core::{Customer, CustomerTier};

/// Spend and order aggregates for one customer, over completed sales only.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseSummary {
    pub total_spend: f64,
    pub order_count: i64,
}

impl PurchaseSummary {
    pub fn tier(&self) -> CustomerTier {
        CustomerTier::classify(self.total_spend, self.order_count)
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, first_name, last_name, email, phone, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, first_name, last_name, email, phone, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a customer's contact details.
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                first_name = ?2, last_name = ?3, email = ?4, phone = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Derives a customer's spend/order aggregates from completed sales.
    pub async fn purchase_summary(&self, customer_id: &str) -> DbResult<PurchaseSummary> {
        let row: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT SUM(total_amount), COUNT(*)
            FROM sales
            WHERE customer_id = ?1 AND status = 'completed'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PurchaseSummary {
            total_spend: row.0.unwrap_or(0.0),
            order_count: row.1,
        })
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
