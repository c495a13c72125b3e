//! Sale lifecycle service.
//!
//! Orchestrates line item construction, pricing, status transitions and the
//! stock ledger. Guards run here against a fresh read; the repository's
//! conditional updates enforce them again inside the transaction, so a
//! concurrent mutation loses cleanly rather than double-applying.
//!
//! ## Transitions
//! ```text
//! create ──► pending ──complete──► completed ──refund (≤30 days)──► refunded
//!               │
//!               └──cancel──► cancelled
//!
//! create(status=completed) consumes stock in the creation transaction.
//! complete consumes stock per line; refund restores it; cancel touches none.
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::error::{ApiError, ApiResult};
use hive_core::validation::{validate_non_negative, validate_price, validate_quantity};
use hive_core::{
    pricing, AppliedOffer, CoreError, PaymentMethod, Product, Sale, SaleItem, SaleStatus,
    REFUND_WINDOW_DAYS,
};
use hive_db::repository::sale::SaleFilter;
use hive_db::Database;

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    pub product_id: String,
    pub quantity: i64,
    /// Omitted means "current product price".
    pub unit_price: Option<f64>,
    /// Per-line discount; the caller computes the one effective amount.
    pub discount_amount: Option<f64>,
    /// Offer records for audit display, stored as given.
    #[serde(default)]
    pub applied_offers: Vec<AppliedOffer>,
}

/// Request to create a sale.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    /// `pending` (default) or `completed`; a completed creation consumes
    /// stock immediately.
    pub status: Option<SaleStatus>,
    /// Explicit sale-level discount override (> 0 to take effect).
    pub discount_amount: Option<f64>,
    /// Explicit tax override (> 0 to take effect).
    pub tax_amount: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<SaleItemInput>,
}

/// Request to update a sale. Submitted items REPLACE the whole line set;
/// there is no partial merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSaleInput {
    pub customer_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<SaleStatus>,
    pub discount_amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub notes: Option<String>,
    pub items: Option<Vec<SaleItemInput>>,
}

/// Request to adjust one line item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSaleItemInput {
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub discount_amount: Option<f64>,
    pub applied_offers: Option<Vec<AppliedOffer>>,
}

/// A sale with its line items, the unit every handler returns.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Service
// =============================================================================

/// Sale lifecycle service.
pub struct SaleService {
    db: Database,
}

impl SaleService {
    /// Create a new sale service.
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    // =========================================================================
    // Create / Read / Update
    // =========================================================================

    /// Creates a sale owned by the authenticated caller.
    pub async fn create_sale(
        &self,
        ctx: &AuthContext,
        input: CreateSaleInput,
    ) -> ApiResult<SaleWithItems> {
        let actor = ctx.require()?;

        let status = input.status.unwrap_or(SaleStatus::Pending);
        if !matches!(status, SaleStatus::Pending | SaleStatus::Completed) {
            return Err(ApiError::Validation(
                "Sales can only be created as pending or completed".to_string(),
            ));
        }

        if let Some(ref customer_id) = input.customer_id {
            self.db
                .customers()
                .get_by_id(customer_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Customer"))?;
        }

        let sale_id = Uuid::new_v4().to_string();
        let items = self.build_line_items(&sale_id, &input.items).await?;

        if status == SaleStatus::Completed && items.is_empty() {
            return Err(CoreError::EmptySale(sale_id).into());
        }

        let totals = pricing::compute_totals(&items, input.discount_amount, input.tax_amount);
        ensure_non_negative_totals(&totals)?;

        let now = Utc::now();
        let sale = Sale {
            id: sale_id.clone(),
            user_id: actor.id.clone(),
            customer_id: input.customer_id,
            status,
            payment_method: input.payment_method,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        let decrement = status == SaleStatus::Completed;
        self.db
            .sales()
            .create_with_items(&sale, &items, decrement)
            .await?;

        info!(
            sale_id = %sale.id,
            user_id = %sale.user_id,
            total = sale.total_amount,
            items = items.len(),
            "Sale created"
        );

        self.get_sale(&sale.id).await
    }

    /// Loads a sale with its items.
    pub async fn get_sale(&self, sale_id: &str) -> ApiResult<SaleWithItems> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale"))?;
        let items = self.db.sales().get_items(sale_id).await?;

        Ok(SaleWithItems { sale, items })
    }

    /// Lists sales, newest first.
    pub async fn list_sales(&self, filter: &SaleFilter) -> ApiResult<Vec<Sale>> {
        Ok(self.db.sales().list(filter).await?)
    }

    /// Updates a sale's header fields and, when items are submitted,
    /// rebuilds the whole line set from them.
    ///
    /// A submitted `status` different from the current one is dispatched
    /// through the regular transition guards after the rebuild.
    pub async fn update_sale(
        &self,
        ctx: &AuthContext,
        sale_id: &str,
        input: UpdateSaleInput,
    ) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let mut sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale"))?;

        if let Some(ref lines) = input.items {
            if !sale.pending() {
                return Err(self.status_conflict(&sale, "modify items"));
            }
            let items = self.build_line_items(sale_id, lines).await?;
            self.db.sales().replace_items(sale_id, &items).await?;
        }

        if let Some(ref customer_id) = input.customer_id {
            self.db
                .customers()
                .get_by_id(customer_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Customer"))?;
            sale.customer_id = Some(customer_id.clone());
        }
        if let Some(payment_method) = input.payment_method {
            sale.payment_method = payment_method;
        }
        if let Some(notes) = input.notes {
            sale.notes = Some(notes);
        }

        // An explicit override in this request wins; otherwise a previously
        // stored positive discount/tax stays sticky, and zero falls back to
        // the default tier / rate
        let items = self.db.sales().get_items(sale_id).await?;
        let totals = pricing::compute_totals(
            &items,
            input.discount_amount.or(Some(sale.discount_amount)),
            input.tax_amount.or(Some(sale.tax_amount)),
        );
        ensure_non_negative_totals(&totals)?;
        sale.subtotal = totals.subtotal;
        sale.discount_amount = totals.discount_amount;
        sale.tax_amount = totals.tax_amount;
        sale.total_amount = totals.total_amount;

        self.db.sales().update_sale(&sale).await?;

        if let Some(target) = input.status {
            if target != sale.status {
                return self.transition(ctx, sale_id, target).await;
            }
        }

        self.get_sale(sale_id).await
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Completes a pending sale, consuming stock for every line item.
    pub async fn complete_sale(&self, ctx: &AuthContext, sale_id: &str) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let current = self.get_sale(sale_id).await?;
        if !current.sale.pending() {
            return Err(self.status_conflict(&current.sale, "complete"));
        }
        if current.items.is_empty() {
            return Err(CoreError::EmptySale(sale_id.to_string()).into());
        }

        self.db.sales().complete_sale(sale_id).await?;

        info!(sale_id = %sale_id, "Sale completed");
        self.get_sale(sale_id).await
    }

    /// Cancels a pending sale. No stock movement.
    pub async fn cancel_sale(&self, ctx: &AuthContext, sale_id: &str) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale"))?;
        if !sale.can_be_cancelled() {
            return Err(self.status_conflict(&sale, "cancel"));
        }

        self.db.sales().cancel_sale(sale_id).await?;

        info!(sale_id = %sale_id, "Sale cancelled");
        self.get_sale(sale_id).await
    }

    /// Refunds a completed sale within the 30-day window, restoring stock.
    pub async fn refund_sale(&self, ctx: &AuthContext, sale_id: &str) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale"))?;

        if !sale.completed() {
            return Err(self.status_conflict(&sale, "refund"));
        }
        let now = Utc::now();
        if !sale.can_be_refunded(now) {
            return Err(CoreError::RefundWindowExpired {
                sale_id: sale_id.to_string(),
                window_days: REFUND_WINDOW_DAYS,
            }
            .into());
        }

        self.db.sales().refund_sale(sale_id).await?;

        info!(sale_id = %sale_id, "Sale refunded");
        self.get_sale(sale_id).await
    }

    async fn transition(
        &self,
        ctx: &AuthContext,
        sale_id: &str,
        target: SaleStatus,
    ) -> ApiResult<SaleWithItems> {
        match target {
            SaleStatus::Completed => self.complete_sale(ctx, sale_id).await,
            SaleStatus::Cancelled => self.cancel_sale(ctx, sale_id).await,
            SaleStatus::Refunded => self.refund_sale(ctx, sale_id).await,
            SaleStatus::Pending => Err(ApiError::Conflict(
                "A sale cannot move back to pending".to_string(),
            )),
        }
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Adds a line to a pending sale. Adding a product already on the sale
    /// merges into the existing line instead of duplicating it.
    pub async fn add_item(
        &self,
        ctx: &AuthContext,
        sale_id: &str,
        line: SaleItemInput,
    ) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let sale = self.pending_sale(sale_id).await?;
        let product = self.product_for_line(&line.product_id).await?;

        validate_quantity(line.quantity)?;
        let unit_price = line.unit_price.unwrap_or(product.price);
        validate_price("unit_price", unit_price)?;
        let discount_amount = line.discount_amount.unwrap_or(0.0);
        validate_non_negative("discount_amount", discount_amount)?;

        match self
            .db
            .sales()
            .find_item_by_product(sale_id, &product.id)
            .await?
        {
            Some(mut existing) => {
                let merged_quantity = existing.quantity + line.quantity;
                ensure_sellable(&product, merged_quantity)?;

                existing.quantity = merged_quantity;
                existing.line_total = pricing::line_total(
                    merged_quantity,
                    existing.unit_price,
                    existing.discount_amount,
                );
                self.db.sales().update_item(&existing).await?;
            }
            None => {
                ensure_sellable(&product, line.quantity)?;

                let item = SaleItem {
                    id: Uuid::new_v4().to_string(),
                    sale_id: sale_id.to_string(),
                    product_id: product.id.clone(),
                    quantity: line.quantity,
                    unit_price,
                    discount_amount,
                    line_total: pricing::line_total(line.quantity, unit_price, discount_amount),
                    applied_offers: line.applied_offers,
                    created_at: Utc::now(),
                };
                self.db.sales().insert_item(&item).await?;
            }
        }

        self.reprice(&sale).await?;
        self.get_sale(sale_id).await
    }

    /// Adjusts one line of a pending sale and reprices it.
    pub async fn update_item(
        &self,
        ctx: &AuthContext,
        sale_id: &str,
        item_id: &str,
        changes: UpdateSaleItemInput,
    ) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let sale = self.pending_sale(sale_id).await?;
        let mut item = self
            .db
            .sales()
            .get_item(sale_id, item_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale item"))?;

        if let Some(quantity) = changes.quantity {
            validate_quantity(quantity)?;
            let product = self.product_for_line(&item.product_id).await?;
            ensure_sellable(&product, quantity)?;
            item.quantity = quantity;
        }
        if let Some(unit_price) = changes.unit_price {
            validate_price("unit_price", unit_price)?;
            item.unit_price = unit_price;
        }
        if let Some(discount_amount) = changes.discount_amount {
            validate_non_negative("discount_amount", discount_amount)?;
            item.discount_amount = discount_amount;
        }
        if let Some(applied_offers) = changes.applied_offers {
            item.applied_offers = applied_offers;
        }

        item.line_total = pricing::line_total(item.quantity, item.unit_price, item.discount_amount);
        self.db.sales().update_item(&item).await?;

        self.reprice(&sale).await?;
        self.get_sale(sale_id).await
    }

    /// Removes one line from a pending sale and reprices it.
    pub async fn remove_item(
        &self,
        ctx: &AuthContext,
        sale_id: &str,
        item_id: &str,
    ) -> ApiResult<SaleWithItems> {
        ctx.require()?;

        let sale = self.pending_sale(sale_id).await?;
        self.db.sales().delete_item(sale_id, item_id).await?;

        self.reprice(&sale).await?;
        self.get_sale(sale_id).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Builds validated, priced line items from request lines.
    async fn build_line_items(
        &self,
        sale_id: &str,
        lines: &[SaleItemInput],
    ) -> ApiResult<Vec<SaleItem>> {
        let now = Utc::now();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let product = self.product_for_line(&line.product_id).await?;

            validate_quantity(line.quantity)?;
            let unit_price = line.unit_price.unwrap_or(product.price);
            validate_price("unit_price", unit_price)?;
            let discount_amount = line.discount_amount.unwrap_or(0.0);
            validate_non_negative("discount_amount", discount_amount)?;

            ensure_sellable(&product, line.quantity)?;

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                product_id: product.id.clone(),
                quantity: line.quantity,
                unit_price,
                discount_amount,
                line_total: pricing::line_total(line.quantity, unit_price, discount_amount),
                applied_offers: line.applied_offers.clone(),
                created_at: now,
            });
        }

        Ok(items)
    }

    /// Recomputes and stores a sale's cached totals from its current items.
    ///
    /// The stored discount/tax are passed back as overrides, so a positive
    /// value stays sticky across item changes and zero keeps falling through
    /// to the defaults.
    async fn reprice(&self, sale: &Sale) -> ApiResult<()> {
        let items = self.db.sales().get_items(&sale.id).await?;
        let totals = pricing::compute_totals(
            &items,
            Some(sale.discount_amount),
            Some(sale.tax_amount),
        );
        ensure_non_negative_totals(&totals)?;
        self.db.sales().update_totals(&sale.id, &totals).await?;
        Ok(())
    }

    async fn pending_sale(&self, sale_id: &str) -> ApiResult<Sale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale"))?;

        if !sale.pending() {
            return Err(self.status_conflict(&sale, "modify items"));
        }
        Ok(sale)
    }

    async fn product_for_line(&self, product_id: &str) -> ApiResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    fn status_conflict(&self, sale: &Sale, operation: &str) -> ApiError {
        CoreError::InvalidSaleStatus {
            sale_id: sale.id.clone(),
            current_status: format!("{:?}", sale.status).to_lowercase(),
            operation: operation.to_string(),
        }
        .into()
    }
}

/// A discount larger than the sale itself is refused up front; the CHECK
/// constraints on the sales table are only the backstop.
fn ensure_non_negative_totals(totals: &pricing::SaleTotals) -> ApiResult<()> {
    if totals.total_amount < 0.0 {
        return Err(ApiError::Validation(
            "discount_amount cannot exceed the sale total".to_string(),
        ));
    }
    Ok(())
}

/// Stock guard for a requested quantity, with the message the cashier sees.
fn ensure_sellable(product: &Product, quantity: i64) -> ApiResult<()> {
    if product.can_sell(quantity) {
        return Ok(());
    }
    Err(CoreError::InsufficientStock {
        sku: product.sku.clone(),
        available: product.stock_quantity,
        requested: quantity,
    }
    .into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_product;
    use chrono::Duration;
    use hive_db::DbConfig;

    async fn setup() -> (SaleService, Database, AuthContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = SaleService::new(db.clone());
        let user = crate::testing::seed_user(&db, "clerk@example.com", "Str0ng!pass").await;

        (service, db, AuthContext::Authenticated(user))
    }

    fn line(product: &Product, quantity: i64) -> SaleItemInput {
        SaleItemInput {
            product_id: product.id.clone(),
            quantity,
            unit_price: None,
            discount_amount: None,
            applied_offers: vec![],
        }
    }

    fn create_input(items: Vec<SaleItemInput>) -> CreateSaleInput {
        CreateSaleInput {
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            status: None,
            discount_amount: None,
            tax_amount: None,
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn test_fifty_dollar_scenario_end_to_end() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;
        let gift = seed_product(&db, "GIFTBOX", 20.0, 10).await;

        // qty 3 @ $10 + qty 1 @ $20: subtotal $50, tier 5% = $2.50,
        // tax 8% of $47.50 = $3.80, total $51.30
        let result = service
            .create_sale(&ctx, create_input(vec![line(&honey, 3), line(&gift, 1)]))
            .await
            .unwrap();

        assert_eq!(result.sale.subtotal, 50.0);
        assert_eq!(result.sale.discount_amount, 2.5);
        assert_eq!(result.sale.tax_amount, 3.8);
        assert_eq!(result.sale.total_amount, 51.3);
        assert!(result.sale.totals_reconcile());
        assert_eq!(result.sale.status, SaleStatus::Pending);

        // Creation alone never touches stock
        let p = db.products().get_by_id(&honey.id).await.unwrap().unwrap();
        assert_eq!(p.stock_quantity, 20);
    }

    #[tokio::test]
    async fn test_unit_price_is_snapshotted() {
        let (service, db, ctx) = setup().await;
        let mut honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let result = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();

        // Raising the product price later leaves the recorded line alone
        honey.price = 99.0;
        db.products().update(&honey).await.unwrap();

        let reloaded = service.get_sale(&result.sale.id).await.unwrap();
        assert_eq!(reloaded.items[0].unit_price, 10.0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_names_available_quantity() {
        let (service, db, ctx) = setup().await;
        let scarce = seed_product(&db, "SCARCE1", 5.0, 2).await;

        let err = service
            .create_sale(&ctx, create_input(vec![line(&scarce, 3)]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("2 available"));
    }

    #[tokio::test]
    async fn test_complete_and_refund_round_trip_stock() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 3)]))
            .await
            .unwrap();

        let completed = service.complete_sale(&ctx, &created.sale.id).await.unwrap();
        assert_eq!(completed.sale.status, SaleStatus::Completed);
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            5
        );

        let refunded = service.refund_sale(&ctx, &created.sale.id).await.unwrap();
        assert_eq!(refunded.sale.status, SaleStatus::Refunded);
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            8
        );
    }

    #[tokio::test]
    async fn test_create_completed_consumes_stock_immediately() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 8).await;

        let mut input = create_input(vec![line(&honey, 2)]);
        input.status = Some(SaleStatus::Completed);
        let result = service.create_sale(&ctx, input).await.unwrap();

        assert_eq!(result.sale.status, SaleStatus::Completed);
        assert_eq!(
            db.products().get_by_id(&honey.id).await.unwrap().unwrap().stock_quantity,
            6
        );
    }

    #[tokio::test]
    async fn test_transition_guards() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();
        let sale_id = created.sale.id.clone();

        service.cancel_sale(&ctx, &sale_id).await.unwrap();

        // Cancelling again: refused, state unchanged
        let err = service.cancel_sale(&ctx, &sale_id).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
        let still = service.get_sale(&sale_id).await.unwrap();
        assert_eq!(still.sale.status, SaleStatus::Cancelled);

        // Completing a cancelled sale: refused
        let err = service.complete_sale(&ctx, &sale_id).await.unwrap_err();
        assert!(err.to_string().contains("cannot complete"));

        // Refunding a never-completed sale: refused
        let err = service.refund_sale(&ctx, &sale_id).await.unwrap_err();
        assert!(err.to_string().contains("cannot refund"));
    }

    #[tokio::test]
    async fn test_complete_requires_items() {
        let (service, _db, ctx) = setup().await;

        let created = service.create_sale(&ctx, create_input(vec![])).await.unwrap();
        let err = service.complete_sale(&ctx, &created.sale.id).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_refund_window_expires() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();
        service.complete_sale(&ctx, &created.sale.id).await.unwrap();

        // Backdate the sale past the refund window
        let old = Utc::now() - Duration::days(31);
        sqlx::query("UPDATE sales SET created_at = ?2 WHERE id = ?1")
            .bind(&created.sale.id)
            .bind(old)
            .execute(db.pool())
            .await
            .unwrap();

        let err = service.refund_sale(&ctx, &created.sale.id).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("refund window"));
    }

    #[tokio::test]
    async fn test_add_item_merges_existing_line() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 2)]))
            .await
            .unwrap();

        let result = service
            .add_item(&ctx, &created.sale.id, line(&honey, 3))
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].quantity, 5);
        assert_eq!(result.items[0].line_total, 50.0);
        // $50 subtotal hits the 5% tier
        assert_eq!(result.sale.discount_amount, 2.5);
    }

    #[tokio::test]
    async fn test_add_item_merge_respects_stock() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 4).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 3)]))
            .await
            .unwrap();

        // 3 already on the sale; 2 more would need 5 of 4 in stock
        let err = service
            .add_item(&ctx, &created.sale.id, line(&honey, 2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("4 available"));
    }

    #[tokio::test]
    async fn test_update_item_reprices_sale() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();
        let item_id = created.items[0].id.clone();

        let result = service
            .update_item(
                &ctx,
                &created.sale.id,
                &item_id,
                UpdateSaleItemInput {
                    quantity: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.items[0].quantity, 10);
        assert_eq!(result.sale.subtotal, 100.0);
        // $100 subtotal hits the 10% tier
        assert_eq!(result.sale.discount_amount, 10.0);
        assert!(result.sale.totals_reconcile());
    }

    #[tokio::test]
    async fn test_remove_item_reprices_sale() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;
        let gift = seed_product(&db, "GIFTBOX", 20.0, 10).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 3), line(&gift, 1)]))
            .await
            .unwrap();
        let gift_item = created
            .items
            .iter()
            .find(|i| i.product_id == gift.id)
            .unwrap();

        let result = service
            .remove_item(&ctx, &created.sale.id, &gift_item.id)
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.sale.subtotal, 30.0);
    }

    #[tokio::test]
    async fn test_update_sale_rebuilds_item_set() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;
        let gift = seed_product(&db, "GIFTBOX", 20.0, 10).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 3)]))
            .await
            .unwrap();

        let result = service
            .update_sale(
                &ctx,
                &created.sale.id,
                UpdateSaleInput {
                    items: Some(vec![line(&gift, 2)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].product_id, gift.id);
        assert_eq!(result.sale.subtotal, 40.0);
    }

    #[tokio::test]
    async fn test_item_mutations_refused_after_completion() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let created = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();
        service.complete_sale(&ctx, &created.sale.id).await.unwrap();

        let err = service
            .add_item(&ctx, &created.sale.id, line(&honey, 1))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_explicit_discount_sticks_through_repricing() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let mut input = create_input(vec![line(&honey, 3)]);
        input.discount_amount = Some(4.0);
        let created = service.create_sale(&ctx, input).await.unwrap();
        assert_eq!(created.sale.discount_amount, 4.0);

        // Adding an item reprices, but the explicit discount survives
        let result = service
            .add_item(&ctx, &created.sale.id, line(&honey, 1))
            .await
            .unwrap();
        assert_eq!(result.sale.discount_amount, 4.0);
        assert_eq!(result.sale.subtotal, 40.0);
        assert!(result.sale.totals_reconcile());
    }

    #[tokio::test]
    async fn test_oversized_discount_is_refused() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let mut input = create_input(vec![line(&honey, 1)]);
        input.discount_amount = Some(100.0);
        let err = service.create_sale(&ctx, input).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_refused() {
        let (service, db, _ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let err = service
            .create_sale(&AuthContext::Anonymous, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_walk_in_sale_has_no_customer() {
        let (service, db, ctx) = setup().await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let result = service
            .create_sale(&ctx, create_input(vec![line(&honey, 1)]))
            .await
            .unwrap();
        assert!(result.sale.customer_id.is_none());

        // Referencing a missing customer is a 404
        let mut input = create_input(vec![line(&honey, 1)]);
        input.customer_id = Some("no-such-customer".to_string());
        let err = service.create_sale(&ctx, input).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
