//! Calendar endpoint: feed occurrences merged with stored events.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use gamefy_core::{DateRange, assemble};
use serde::Deserialize;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/calendar/events", get(list_events))
}

/// Window bounds, each RFC 3339 or YYYY-MM-DD. Missing bounds use the
/// configured default window around now.
#[derive(Deserialize)]
pub struct EventsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// GET /calendar/events - merged calendar items, sorted by start
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let defaults = state.default_range(Utc::now());
    let range = DateRange::from_args(query.start.as_deref(), query.end.as_deref(), &defaults)?;

    let feed = state.feed_occurrences(&range).await;
    let view = assemble(feed, state.store.as_ref(), &range)?;

    let cache_control = format!("public, max-age={}", state.cache_ttl().as_secs());

    Ok(([(header::CACHE_CONTROL, cache_control)], Json(view.items)))
}
