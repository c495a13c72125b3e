//! Sale item handlers: manual per-line adjustment of a pending sale.
//!
//! Each mutation recomputes the line's total and reprices the whole sale;
//! the response carries the refreshed sale so the register stays in sync.

use crate::context::AuthContext;
use crate::error::ApiResult;
use crate::handlers::sales::SaleResponse;
use crate::services::sale_service::{SaleItemInput, UpdateSaleItemInput};
use crate::AppState;

/// POST /v1/sales/:sale_id/sale_items
pub async fn add_sale_item(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
    req: SaleItemInput,
) -> ApiResult<SaleResponse> {
    let result = state.sales.add_item(ctx, sale_id, req).await?;
    Ok(result.into())
}

/// PATCH /v1/sales/:sale_id/sale_items/:id
pub async fn update_sale_item(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
    item_id: &str,
    req: UpdateSaleItemInput,
) -> ApiResult<SaleResponse> {
    let result = state.sales.update_item(ctx, sale_id, item_id, req).await?;
    Ok(result.into())
}

/// DELETE /v1/sales/:sale_id/sale_items/:id
pub async fn remove_sale_item(
    state: &AppState,
    ctx: &AuthContext,
    sale_id: &str,
    item_id: &str,
) -> ApiResult<SaleResponse> {
    let result = state.sales.remove_item(ctx, sale_id, item_id).await?;
    Ok(result.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::sales::create_sale;
    use crate::services::sale_service::CreateSaleInput;
    use crate::testing::{seed_product, seed_user, test_state};
    use hive_core::PaymentMethod;

    #[tokio::test]
    async fn test_item_adjustment_reprices_sale() {
        let (state, db) = test_state().await;
        let user = seed_user(&db, "clerk@example.com", "Str0ng!pass").await;
        let ctx = AuthContext::Authenticated(user);
        let honey = seed_product(&db, "HONEY500", 10.0, 50).await;

        let created = create_sale(
            &state,
            &ctx,
            CreateSaleInput {
                customer_id: None,
                payment_method: PaymentMethod::Cash,
                status: None,
                discount_amount: None,
                tax_amount: None,
                notes: None,
                items: vec![],
            },
        )
        .await
        .unwrap();
        let sale_id = created.sale.sale.id.clone();

        let resp = add_sale_item(
            &state,
            &ctx,
            &sale_id,
            SaleItemInput {
                product_id: honey.id.clone(),
                quantity: 2,
                unit_price: None,
                discount_amount: None,
                applied_offers: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.sale.items.len(), 1);
        assert_eq!(resp.sale.sale.subtotal, 20.0);

        let item_id = resp.sale.items[0].id.clone();
        let resp = update_sale_item(
            &state,
            &ctx,
            &sale_id,
            &item_id,
            UpdateSaleItemInput {
                quantity: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.sale.sale.subtotal, 50.0);

        let resp = remove_sale_item(&state, &ctx, &sale_id, &item_id).await.unwrap();
        assert!(resp.sale.items.is_empty());
        assert_eq!(resp.sale.sale.subtotal, 0.0);
    }
}
