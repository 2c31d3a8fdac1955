//! Lending endpoints: issue, return, renew, overdue sweep

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use super::AuthenticatedUser;
use crate::{
    clock::ClockExt,
    error::AppResult,
    models::issue::{Issue, IssueQuery},
    services::lending::ReturnOutcome,
    AppState,
};

/// Issue book request
#[derive(Deserialize, ToSchema)]
pub struct IssueBookRequest {
    /// Borrower; defaults to the caller
    pub user_id: Option<i64>,
    pub book_id: i64,
    /// Loan period in days; defaults to the configured period
    pub loan_period_days: Option<u32>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct RenewRequest {
    /// Days to add to the due date; defaults to the configured renewal
    pub extension_days: Option<u32>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct SweepRequest {
    /// Reference day; defaults to today
    pub today: Option<NaiveDate>,
}

/// List loans (members only see their own)
#[utoipa::path(
    get,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(IssueQuery),
    responses((status = 200, description = "Matching issues", body = Vec<Issue>))
)]
pub async fn list_issues(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<Vec<Issue>>> {
    let issues = state.services.lending.list_issues(&user.actor(), &query).await?;
    Ok(Json(issues))
}

/// Get an issue, recording it as overdue if it has gone stale
#[utoipa::path(
    get,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue details", body = Issue),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_issue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Issue>> {
    let issue = state.services.lending.get_issue(&user.actor(), id).await?;
    Ok(Json(issue))
}

/// Lend a copy of a book
#[utoipa::path(
    post,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = IssueBookRequest,
    responses(
        (status = 201, description = "Book issued", body = Issue),
        (status = 404, description = "User or book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "No copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<IssueBookRequest>,
) -> AppResult<(StatusCode, Json<Issue>)> {
    let actor = user.actor();
    let issue = state
        .services
        .lending
        .issue_book(
            &actor,
            request.user_id.unwrap_or(actor.user_id),
            request.book_id,
            request.loan_period_days,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Return a book
#[utoipa::path(
    post,
    path = "/issues/{id}/return",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnOutcome),
        (status = 404, description = "Issue not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReturnOutcome>> {
    let outcome = state.services.lending.return_book(&user.actor(), id).await?;
    Ok(Json(outcome))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/issues/{id}/renew",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Loan renewed", body = Issue),
        (status = 422, description = "Renewal not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    request: Option<Json<RenewRequest>>,
) -> AppResult<Json<Issue>> {
    let Json(request) = request.unwrap_or_default();
    let issue = state
        .services
        .lending
        .renew(&user.actor(), id, request.extension_days)
        .await?;
    Ok(Json(issue))
}

/// Mark every stale loan overdue
#[utoipa::path(
    post,
    path = "/issues/overdue-sweep",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = SweepRequest,
    responses(
        (status = 200, description = "Issues marked overdue by this run", body = Vec<Issue>),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn overdue_sweep(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    request: Option<Json<SweepRequest>>,
) -> AppResult<Json<Vec<Issue>>> {
    let Json(request) = request.unwrap_or_default();
    let today = request.today.unwrap_or_else(|| state.clock.today());
    let marked = state
        .services
        .lending
        .mark_overdue_sweep(&user.actor(), today)
        .await?;
    Ok(Json(marked))
}
