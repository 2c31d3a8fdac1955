//! Dashboard projections

use axum::{extract::State, Json};

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::{issue::Issue, reservation::Reservation},
    services::dashboard::{LendingStats, MyBookings},
    AppState,
};

/// The caller's open loans and active reservations
#[utoipa::path(
    get,
    path = "/me/bookings",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Current bookings", body = MyBookings))
)]
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MyBookings>> {
    Ok(Json(state.services.dashboard.my_bookings(&user.actor()).await?))
}

/// Reservations waiting for a copy
#[utoipa::path(
    get,
    path = "/pendings",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active reservations in queue order", body = Vec<Reservation>),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn pendings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<Reservation>>> {
    Ok(Json(state.services.dashboard.pendings(&user.actor()).await?))
}

/// Loans currently out
#[utoipa::path(
    get,
    path = "/approved",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open issues", body = Vec<Issue>),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn approved(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<Vec<Issue>>> {
    Ok(Json(state.services.dashboard.approved(&user.actor()).await?))
}

/// Lending statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counters", body = LendingStats),
        (status = 403, description = "Staff only", body = crate::error::ErrorResponse)
    )
)]
pub async fn stats(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<LendingStats>> {
    Ok(Json(state.services.dashboard.stats(&user.actor()).await?))
}
