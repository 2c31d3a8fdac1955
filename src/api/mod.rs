//! API handlers for the Libris REST endpoints

pub mod books;
pub mod dashboard;
pub mod fines;
pub mod health;
pub mod history;
pub mod issues;
pub mod openapi;
pub mod reservations;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};

use crate::{
    error::AppError,
    models::user::{Actor, UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Routes mounted under `/api/v1`
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id/stock", post(books::restock))
        .route("/books/:id/promote", post(reservations::promote_next))
        .route("/categories", get(books::list_categories).post(books::create_category))
        .route("/authors", get(books::list_authors).post(books::create_author))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user))
        // Issues
        .route("/issues", get(issues::list_issues).post(issues::issue_book))
        .route("/issues/:id", get(issues::get_issue))
        .route("/issues/:id/return", post(issues::return_book))
        .route("/issues/:id/renew", post(issues::renew))
        .route("/issues/:id/fine", get(fines::fine_for_issue))
        .route("/issues/overdue-sweep", post(issues::overdue_sweep))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_reservations).post(reservations::reserve),
        )
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/reservations/:id/cancel", post(reservations::cancel))
        // Fines
        .route("/fines", get(fines::list_fines))
        .route("/fines/:id", get(fines::get_fine))
        .route("/fines/:id/pay", post(fines::pay_fine))
        // History
        .route("/history", get(history::list_history))
        // Dashboard
        .route("/me/bookings", get(dashboard::my_bookings))
        .route("/pendings", get(dashboard::pendings))
        .route("/approved", get(dashboard::approved))
        .route("/stats", get(dashboard::stats))
        .with_state(state)
}
