//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::fine::{Fine, FineQuery},
    AppState,
};

/// List fines (members only see their own)
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses((status = 200, description = "Matching fines", body = Vec<Fine>))
)]
pub async fn list_fines(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.fines.list_fines(&user.actor(), &query).await?;
    Ok(Json(fines))
}

#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine details", body = Fine),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_fine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.get_fine(&user.actor(), id).await?;
    Ok(Json(fine))
}

/// Fine of an issue, brought up to date while the book is still out
#[utoipa::path(
    get,
    path = "/issues/{id}/fine",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "The fine, or null when nothing is owed", body = Fine),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn fine_for_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(issue_id): Path<i64>,
) -> AppResult<Json<Option<Fine>>> {
    let fine = state.services.fines.fine_for_issue(&user.actor(), issue_id).await?;
    Ok(Json(fine))
}

/// Record payment of a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 409, description = "Already paid", body = crate::error::ErrorResponse),
        (status = 422, description = "Book not returned yet", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.pay_fine(&user.actor(), id).await?;
    Ok(Json(fine))
}
