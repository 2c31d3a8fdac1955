//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, dashboard, fines, health, history, issues, reservations, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.3.0",
        description = "Library lending REST API: catalog, loans, reservations and fines"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        books::list_books,
        books::get_book,
        books::create_book,
        books::restock,
        books::list_categories,
        books::create_category,
        books::list_authors,
        books::create_author,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        // Issues
        issues::list_issues,
        issues::get_issue,
        issues::issue_book,
        issues::return_book,
        issues::renew,
        issues::overdue_sweep,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::reserve,
        reservations::cancel,
        reservations::promote_next,
        // Fines
        fines::list_fines,
        fines::get_fine,
        fines::fine_for_issue,
        fines::pay_fine,
        // History
        history::list_history,
        // Dashboard
        dashboard::my_bookings,
        dashboard::pendings,
        dashboard::approved,
        dashboard::stats,
    ),
    components(
        schemas(
            // Catalog
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::BookQuery,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            books::RestockRequest,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::enums::Role,
            // Lending
            crate::models::issue::Issue,
            crate::models::issue::IssueQuery,
            crate::models::enums::IssueStatus,
            issues::IssueBookRequest,
            issues::RenewRequest,
            issues::SweepRequest,
            crate::services::lending::ReturnOutcome,
            crate::services::lending::RestockOutcome,
            crate::services::lending::Promotion,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationQuery,
            crate::models::enums::ReservationStatus,
            reservations::ReserveRequest,
            // Fines
            crate::models::fine::Fine,
            crate::models::fine::FineQuery,
            // History
            crate::models::history::IssueHistory,
            crate::models::history::HistoryQuery,
            crate::models::enums::HistoryAction,
            // Dashboard
            crate::services::dashboard::MyBookings,
            crate::services::dashboard::LendingStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog: books, categories, authors"),
        (name = "users", description = "User management"),
        (name = "issues", description = "Loans and overdue handling"),
        (name = "reservations", description = "Reservation queues"),
        (name = "fines", description = "Overdue fines"),
        (name = "history", description = "Lending audit trail"),
        (name = "dashboard", description = "Bookings, pendings, approvals and statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
