//! HTTP API
//!
//! | Prefix | Auth |
//! |--------|------|
//! | `/health` | none |
//! | `/api/orders`, `/api/basket` | Bearer |
//! | `/api/owner` | Bearer, owner role |
//! | `/api/notifications/subscribe` | token query parameter (SSE) |

pub mod basket;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod owner;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use shared::error::{ApiResponse, AppError};
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, require_owner};
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Wrap a payload in the success envelope
pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let owner = Router::new()
        .route("/api/owner/orders", get(owner::list_orders))
        .route("/api/owner/orders/{id}/status", put(owner::change_status))
        .route("/api/owner/stats", get(owner::stats))
        .layer(middleware::from_fn(require_owner));

    let authenticated = Router::new()
        .route("/api/orders", post(orders::checkout).get(orders::list_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/basket", get(basket::get_basket).delete(basket::clear_basket))
        .route("/api/basket/items", post(basket::add_item))
        .route("/api/basket/items/{id}", delete(basket::remove_item))
        .route("/api/basket/checkout", post(basket::checkout))
        .merge(owner)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/notifications/subscribe",
            get(notifications::subscribe),
        )
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
