//! Sale handlers: create/read/list/update plus the three lifecycle
//! transitions, and the dashboard roll-up.
//!
//! Every mutation returns the full repriced sale so the front end never has
//! to re-derive totals.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::context::AuthContext;
use crate::error::ApiResult;
use crate::services::sale_service::{CreateSaleInput, SaleWithItems, UpdateSaleInput};
use crate::AppState;
use hive_core::{PaymentMethod, Sale, SaleItem, SaleStatus};
use hive_db::repository::sale::SaleFilter;

// =============================================================================
// DTOs
// =============================================================================

/// A sale as returned to clients: the record, its derived receipt number,
/// and its line items.
#[derive(Debug, Serialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub receipt_number: String,
    pub items: Vec<SaleItem>,
}

impl From<SaleWithItems> for SaleView {
    fn from(value: SaleWithItems) -> Self {
        let receipt_number = value.sale.receipt_number();
        SaleView {
            sale: value.sale,
            receipt_number,
            items: value.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub success: bool,
    pub sale: SaleView,
}

impl From<SaleWithItems> for SaleResponse {
    fn from(value: SaleWithItems) -> Self {
        SaleResponse {
            success: true,
            sale: value.into(),
        }
    }
}

/// Query parameters for the sale listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListSalesQuery {
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SaleListResponse {
    pub sales: Vec<SaleView>,
    pub page: i64,
    pub per_page: i64,
}

/// Revenue roll-up for the dashboard landing page.
#[derive(Debug, Serialize)]
pub struct SaleStatsResponse {
    pub today: PeriodStats,
    pub this_month: PeriodStats,
    pub average_sale: f64,
}

#[derive(Debug, Serialize)]
pub struct PeriodStats {
    pub sales_count: i64,
    pub revenue: f64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /v1/sales
pub async fn create_sale(
    state: &AppState,
    ctx: &AuthContext,
    req: CreateSaleInput,
) -> ApiResult<SaleResponse> {
    let result = state.sales.create_sale(ctx, req).await?;
    Ok(result.into())
}

/// GET /v1/sales/:id
pub async fn get_sale(state: &AppState, sale_id: &str) -> ApiResult<SaleView> {
    let result = state.sales.get_sale(sale_id).await?;
    Ok(result.into())
}

/// GET /v1/sales
pub async fn list_sales(state: &AppState, query: ListSalesQuery) -> ApiResult<SaleListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let filter = SaleFilter {
        status: query.status,
        payment_method: query.payment_method,
        user_id: query.user_id,
        customer_id: query.customer_id,
        limit: Some(per_page),
        offset: Some((page - 1) * per_page),
    };

    let sales = state.sales.list_sales(&filter).await?;

    let mut views = Vec::with_capacity(sales.len());
    for sale in sales {
        let with_items = state.sales.get_sale(&sale.id).await?;
        views.push(with_items.into());
    }

    Ok(SaleListResponse {
        sales: views,
        page,
        per_page,
    })
}

/// PATCH /v1/sales/:id
///
/// Submitted items replace the whole line set (no partial merge); a
/// submitted status is routed through the regular transition guards.
pub async fn update_sale(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
    req: UpdateSaleInput,
) -> ApiResult<SaleResponse> {
    let result = state.sales.update_sale(ctx, sale_id, req).await?;
    Ok(result.into())
}

/// PATCH /v1/sales/:id/complete
pub async fn complete_sale(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
) -> ApiResult<SaleResponse> {
    let result = state.sales.complete_sale(ctx, sale_id).await?;
    Ok(result.into())
}

/// PATCH /v1/sales/:id/cancel
pub async fn cancel_sale(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
) -> ApiResult<SaleResponse> {
    let result = state.sales.cancel_sale(ctx, sale_id).await?;
    Ok(result.into())
}

/// PATCH /v1/sales/:id/refund
pub async fn refund_sale(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
) -> ApiResult<SaleResponse> {
    let result = state.sales.refund_sale(ctx, sale_id).await?;
    Ok(result.into())
}

/// GET /v1/sales/stats
pub async fn sale_stats(state: &AppState) -> ApiResult<SaleStatsResponse> {
    let now = Utc::now();
    let day_start = now - Duration::hours(24);
    let month_start = now - Duration::days(30);

    let sales = state.db.sales();

    Ok(SaleStatsResponse {
        today: PeriodStats {
            sales_count: sales.completed_count_between(day_start, now).await?,
            revenue: sales.revenue_between(day_start, now).await?,
        },
        this_month: PeriodStats {
            sales_count: sales.completed_count_between(month_start, now).await?,
            revenue: sales.revenue_between(month_start, now).await?,
        },
        average_sale: sales.average_sale_amount(month_start, now).await?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sale_service::SaleItemInput;
    use crate::testing::{seed_product, seed_user, test_state};

    async fn authed(db: &hive_db::Database) -> AuthContext {
        let user = seed_user(db, "clerk@example.com", "Str0ng!pass").await;
        AuthContext::Authenticated(user)
    }

    fn input(lines: Vec<SaleItemInput>) -> CreateSaleInput {
        CreateSaleInput {
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            status: None,
            discount_amount: None,
            tax_amount: None,
            notes: None,
            items: lines,
        }
    }

    #[tokio::test]
    async fn test_create_and_stats_flow() {
        let (state, db) = test_state().await;
        let ctx = authed(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 20).await;

        let resp = create_sale(
            &state,
            &ctx,
            input(vec![SaleItemInput {
                product_id: honey.id.clone(),
                quantity: 3,
                unit_price: None,
                discount_amount: None,
                applied_offers: vec![],
            }]),
        )
        .await
        .unwrap();
        assert!(resp.success);
        assert!(resp.sale.receipt_number.starts_with("HV"));

        complete_sale(&state, &ctx, &resp.sale.sale.id).await.unwrap();

        let stats = sale_stats(&state).await.unwrap();
        assert_eq!(stats.today.sales_count, 1);
        assert!(stats.today.revenue > 0.0);
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (state, db) = test_state().await;
        let ctx = authed(&db).await;
        let honey = seed_product(&db, "HONEY500", 10.0, 50).await;

        for _ in 0..3 {
            create_sale(
                &state,
                &ctx,
                input(vec![SaleItemInput {
                    product_id: honey.id.clone(),
                    quantity: 1,
                    unit_price: None,
                    discount_amount: None,
                    applied_offers: vec![],
                }]),
            )
            .await
            .unwrap();
        }

        let resp = list_sales(
            &state,
            ListSalesQuery {
                status: Some(SaleStatus::Pending),
                per_page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(resp.sales.len(), 2);
        assert_eq!(resp.per_page, 2);

        let page2 = list_sales(
            &state,
            ListSalesQuery {
                status: Some(SaleStatus::Pending),
                page: Some(2),
                per_page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page2.sales.len(), 1);
    }

    #[tokio::test]
    async fn test_get_sale_missing_is_404() {
        let (state, _db) = test_state().await;
        let err = get_sale(&state, "no-such-sale").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
