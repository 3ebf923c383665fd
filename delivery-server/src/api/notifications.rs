//! SSE subscription for live order notifications
//!
//! EventSource cannot send headers, so the token travels as a query
//! parameter. Anything that does not resolve to an active buyer gets a
//! stream that ends immediately.

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use shared::models::Role;
use std::convert::Infallible;

use crate::auth::decode_token;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubscribeQuery {
    pub token: Option<String>,
}

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// GET /api/notifications/subscribe?token=
pub async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
) -> Sse<EventStream> {
    let Some(user_id) = authorize(&state, query.token.as_deref()) else {
        return Sse::new(stream::empty().boxed());
    };

    let events = state.registry.subscribe(&user_id).map(|notification| {
        Ok(Event::default()
            .event(notification.event_name())
            .data(notification.data()))
    });
    Sse::new(events.boxed())
}

/// User id of an active buyer holding a valid token
fn authorize(state: &AppState, token: Option<&str>) -> Option<String> {
    let user = match decode_token(token?, &state.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "SSE subscribe rejected");
            return None;
        }
    };

    match state.storage.get_account(&user.user_id) {
        Ok(Some(account)) if account.is_active() && account.role == Role::User => {
            Some(account.user_id)
        }
        Ok(_) => {
            tracing::debug!(user_id = %user.user_id, "SSE subscribe rejected: not an active buyer");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "SSE subscribe account lookup failed");
            None
        }
    }
}
