//! Reservation queue endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationQuery},
    services::lending::Promotion,
    AppState,
};

/// Reserve book request
#[derive(Deserialize, ToSchema)]
pub struct ReserveRequest {
    /// Reserving user; defaults to the caller
    pub user_id: Option<i64>,
    pub book_id: i64,
}

/// List reservations in queue order
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses((status = 200, description = "Matching reservations", body = Vec<Reservation>))
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list(&user.actor(), &query).await?;
    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(&user.actor(), id).await?;
    Ok(Json(reservation))
}

/// Join the queue for a book with no copy on the shelf
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 409, description = "Already reserved by this user", body = crate::error::ErrorResponse),
        (status = 422, description = "Copies are available, issue directly", body = crate::error::ErrorResponse)
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ReserveRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let actor = user.actor();
    let reservation = state
        .services
        .reservations
        .reserve(&actor, request.user_id.unwrap_or(actor.user_id), request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel an active reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 422, description = "Reservation is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(&user.actor(), id).await?;
    Ok(Json(reservation))
}

/// Issue a free copy to the longest-waiting reservation
#[utoipa::path(
    post,
    path = "/books/{id}/promote",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Promotion made, or null when nobody waits", body = Promotion),
        (status = 422, description = "No copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn promote_next(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(book_id): Path<i64>,
) -> AppResult<Json<Option<Promotion>>> {
    let promotion = state
        .services
        .reservations
        .promote_next(&user.actor(), book_id)
        .await?;
    Ok(Json(promotion))
}
