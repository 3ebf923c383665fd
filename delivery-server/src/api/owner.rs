//! Store owner endpoints: incoming orders, accept/cancel, sales stats

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{Order, StatusUpdateRequest, StoreSalesStats};
use shared::util::now_millis;

use super::{ApiResult, ok};
use crate::auth::CurrentUser;
use crate::state::AppState;

/// GET /api/owner/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Order>> {
    ok(state.orders.store_orders(&user.user_id)?)
}

/// PUT /api/owner/orders/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .change_status(&user.user_id, order_id, request.status)
        .await?;
    ok(order)
}

/// GET /api/owner/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StoreSalesStats> {
    ok(state.orders.store_stats(&user.user_id, now_millis())?)
}
