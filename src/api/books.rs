//! Catalog endpoints: books, categories, authors

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
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookQuery, CreateBook},
        category::{Category, CreateCategory},
    },
    services::lending::RestockOutcome,
    AppState,
};

/// Change the number of owned copies
#[derive(Deserialize, ToSchema)]
pub struct RestockRequest {
    pub total_copies: i32,
}

/// List books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books(&query).await?;
    Ok(Json(books))
}

/// Get a book with its copy counts
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown category or author", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already in the catalog", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(&user.actor(), &request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Change a book's stock; freed copies go to waiting reservations
#[utoipa::path(
    post,
    path = "/books/{id}/stock",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock updated", body = RestockOutcome),
        (status = 422, description = "Fewer copies than loans out", body = crate::error::ErrorResponse)
    )
)]
pub async fn restock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<RestockRequest>,
) -> AppResult<Json<RestockOutcome>> {
    let outcome = state
        .services
        .lending
        .restock(&user.actor(), id, request.total_copies)
        .await?;
    Ok(Json(outcome))
}

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "books",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All categories", body = Vec<Category>))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.services.catalog.list_categories().await?))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.services.catalog.create_category(&user.actor(), &request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// List authors
#[utoipa::path(
    get,
    path = "/authors",
    tag = "books",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "All authors", body = Vec<Author>))
)]
pub async fn list_authors(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Author>>> {
    Ok(Json(state.services.catalog.list_authors().await?))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses((status = 201, description = "Author created", body = Author))
)]
pub async fn create_author(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let author = state.services.catalog.create_author(&user.actor(), &request).await?;
    Ok((StatusCode::CREATED, Json(author)))
}
