//! Basket endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{AddBasketItemRequest, Basket, BasketCheckoutRequest, Order};

use super::{ApiResult, ok};
use crate::auth::CurrentUser;
use crate::state::AppState;

/// GET /api/basket
pub async fn get_basket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Basket> {
    ok(state.baskets.get_basket(&user.user_id)?)
}

/// POST /api/basket/items
pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<AddBasketItemRequest>,
) -> ApiResult<Basket> {
    ok(state.baskets.add_to_basket(&user.user_id, request)?)
}

/// DELETE /api/basket/items/{id}
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(basket_item_id): Path<i64>,
) -> ApiResult<Basket> {
    ok(state.baskets.remove_basket_item(&user.user_id, basket_item_id)?)
}

/// DELETE /api/basket
pub async fn clear_basket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Basket> {
    ok(state.baskets.clear_basket(&user.user_id)?)
}

/// POST /api/basket/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<BasketCheckoutRequest>,
) -> ApiResult<Order> {
    let order = state.orders.checkout_basket(&user.user_id, request).await?;
    ok(order)
}
