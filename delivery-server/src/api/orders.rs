//! Buyer order endpoints: checkout, list, detail

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{CheckoutRequest, Order};

use super::{ApiResult, ok};
use crate::auth::CurrentUser;
use crate::state::AppState;

/// POST /api/orders
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Order> {
    let order = state.orders.checkout(&user.user_id, request).await?;
    ok(order)
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Order>> {
    ok(state.orders.my_orders(&user.user_id)?)
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    ok(state.orders.my_order(&user.user_id, order_id)?)
}
