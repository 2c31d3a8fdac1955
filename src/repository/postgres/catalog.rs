//! Category, author and book queries

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookQuery, CreateBook},
        category::{Category, CreateCategory},
    },
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.isbn, b.title, b.publisher, b.edition, b.category_id,
           ARRAY(
               SELECT ba.author_id FROM book_authors ba
               WHERE ba.book_id = b.id ORDER BY ba.author_id
           ) AS author_ids,
           b.total_copies, b.available_copies, b.created_at
    FROM books b
"#;

pub(super) async fn insert_category(conn: &mut PgConnection, category: &CreateCategory) -> AppResult<Category> {
    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id, name, description",
    )
    .bind(&category.name)
    .bind(&category.description)
    .fetch_one(conn)
    .await
    .map_err(|e| unique_violation(e, || format!("Category '{}' already exists", category.name)))
}

pub(super) async fn get_category(conn: &mut PgConnection, id: i64) -> AppResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(category)
}

pub(super) async fn find_category_by_name(conn: &mut PgConnection, name: &str) -> AppResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(category)
}

pub(super) async fn list_categories(conn: &mut PgConnection) -> AppResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories ORDER BY name")
        .fetch_all(conn)
        .await?;
    Ok(categories)
}

pub(super) async fn insert_author(conn: &mut PgConnection, author: &CreateAuthor) -> AppResult<Author> {
    let author = sqlx::query_as::<_, Author>(
        "INSERT INTO authors (name, biography) VALUES ($1, $2) RETURNING id, name, biography",
    )
    .bind(&author.name)
    .bind(&author.biography)
    .fetch_one(conn)
    .await?;
    Ok(author)
}

pub(super) async fn get_author(conn: &mut PgConnection, id: i64) -> AppResult<Option<Author>> {
    let author = sqlx::query_as::<_, Author>("SELECT id, name, biography FROM authors WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(author)
}

pub(super) async fn list_authors(conn: &mut PgConnection) -> AppResult<Vec<Author>> {
    let authors = sqlx::query_as::<_, Author>("SELECT id, name, biography FROM authors ORDER BY name")
        .fetch_all(conn)
        .await?;
    Ok(authors)
}

pub(super) async fn insert_book(conn: &mut PgConnection, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
    let book_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO books (isbn, title, publisher, edition, category_id,
                           total_copies, available_copies, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.publisher)
    .bind(&book.edition)
    .bind(book.category_id)
    .bind(book.total_copies)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| unique_violation(e, || format!("ISBN {} already exists", book.isbn)))?;

    sqlx::query(
        r#"
        INSERT INTO book_authors (book_id, author_id)
        SELECT $1, author_id FROM UNNEST($2::BIGINT[]) AS author_id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(book_id)
    .bind(&book.author_ids)
    .execute(&mut *conn)
    .await?;

    let created = get_book(conn, book_id, false).await?;
    created.ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", book_id)))
}

pub(super) async fn get_book(conn: &mut PgConnection, id: i64, for_update: bool) -> AppResult<Option<Book>> {
    let lock = if for_update { "FOR UPDATE OF b" } else { "" };
    let book = sqlx::query_as::<_, Book>(&format!("{BOOK_SELECT} WHERE b.id = $1 {lock}"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

pub(super) async fn find_book_by_isbn(conn: &mut PgConnection, isbn: &str) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!("{BOOK_SELECT} WHERE b.isbn = $1"))
        .bind(isbn)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

pub(super) async fn update_book_copies(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    sqlx::query("UPDATE books SET total_copies = $1, available_copies = $2 WHERE id = $3")
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(book.id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(super) async fn list_books(conn: &mut PgConnection, query: &BookQuery) -> AppResult<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(&format!(
        r#"
        {BOOK_SELECT}
        WHERE ($1::BIGINT IS NULL OR b.category_id = $1)
          AND ($2::BIGINT IS NULL OR EXISTS (
                SELECT 1 FROM book_authors ba WHERE ba.book_id = b.id AND ba.author_id = $2))
          AND ($3::TEXT IS NULL OR b.title ILIKE '%' || $3 || '%')
          AND ($4::BOOLEAN IS NOT TRUE OR b.available_copies > 0)
        ORDER BY b.title, b.id
        "#
    ))
    .bind(query.category_id)
    .bind(query.author_id)
    .bind(&query.title)
    .bind(query.available)
    .fetch_all(conn)
    .await?;
    Ok(books)
}
