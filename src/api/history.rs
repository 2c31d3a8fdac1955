//! Audit trail endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::history::{HistoryQuery, IssueHistory},
    AppState,
};

/// Query the lending history (members only see their own entries)
#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses((status = 200, description = "History entries, oldest first", body = Vec<IssueHistory>))
)]
pub async fn list_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<IssueHistory>>> {
    let entries = state.services.history.query(&user.actor(), &query).await?;
    Ok(Json(entries))
}
