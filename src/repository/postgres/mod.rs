//! PostgreSQL storage backend
//!
//! Row locks (`SELECT ... FOR UPDATE`) taken by `lock_*` are held until the
//! surrounding transaction commits or rolls back.

mod catalog;
mod fines;
mod history;
mod issues;
mod reservations;
mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{Repository, Transaction};
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookQuery, CreateBook},
        category::{Category, CreateCategory},
        fine::{Fine, FineQuery},
        history::{HistoryQuery, IssueHistory, NewHistoryEntry},
        issue::{Issue, IssueQuery, NewIssue},
        reservation::{Reservation, ReservationQuery},
        user::{CreateUser, User},
    },
};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

/// Turn unique-constraint violations into conflicts, keep everything else
pub(crate) fn unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    let is_unique = err
        .as_database_error()
        .and_then(|e| e.code())
        .map_or(false, |code| code == "23505");
    if is_unique {
        AppError::Conflict(message())
    } else {
        AppError::Database(err)
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn insert_user(&mut self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        users::insert(&mut self.tx, user, now).await
    }

    async fn get_user(&mut self, id: i64) -> AppResult<Option<User>> {
        users::get(&mut self.tx, id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        users::find_by_username(&mut self.tx, username).await
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        users::list(&mut self.tx).await
    }

    async fn insert_category(&mut self, category: &CreateCategory) -> AppResult<Category> {
        catalog::insert_category(&mut self.tx, category).await
    }

    async fn get_category(&mut self, id: i64) -> AppResult<Option<Category>> {
        catalog::get_category(&mut self.tx, id).await
    }

    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
        catalog::find_category_by_name(&mut self.tx, name).await
    }

    async fn list_categories(&mut self) -> AppResult<Vec<Category>> {
        catalog::list_categories(&mut self.tx).await
    }

    async fn insert_author(&mut self, author: &CreateAuthor) -> AppResult<Author> {
        catalog::insert_author(&mut self.tx, author).await
    }

    async fn get_author(&mut self, id: i64) -> AppResult<Option<Author>> {
        catalog::get_author(&mut self.tx, id).await
    }

    async fn list_authors(&mut self) -> AppResult<Vec<Author>> {
        catalog::list_authors(&mut self.tx).await
    }

    async fn insert_book(&mut self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
        catalog::insert_book(&mut self.tx, book, now).await
    }

    async fn get_book(&mut self, id: i64) -> AppResult<Option<Book>> {
        catalog::get_book(&mut self.tx, id, false).await
    }

    async fn find_book_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        catalog::find_book_by_isbn(&mut self.tx, isbn).await
    }

    async fn lock_book(&mut self, id: i64) -> AppResult<Option<Book>> {
        catalog::get_book(&mut self.tx, id, true).await
    }

    async fn update_book_copies(&mut self, book: &Book) -> AppResult<()> {
        catalog::update_book_copies(&mut self.tx, book).await
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        catalog::list_books(&mut self.tx, query).await
    }

    async fn insert_issue(&mut self, issue: &NewIssue) -> AppResult<Issue> {
        issues::insert(&mut self.tx, issue).await
    }

    async fn get_issue(&mut self, id: i64) -> AppResult<Option<Issue>> {
        issues::get(&mut self.tx, id, false).await
    }

    async fn lock_issue(&mut self, id: i64) -> AppResult<Option<Issue>> {
        issues::get(&mut self.tx, id, true).await
    }

    async fn update_issue(&mut self, issue: &Issue) -> AppResult<()> {
        issues::update(&mut self.tx, issue).await
    }

    async fn find_issues(&mut self, query: &IssueQuery) -> AppResult<Vec<Issue>> {
        issues::find(&mut self.tx, query).await
    }

    async fn insert_reservation(
        &mut self,
        user_id: i64,
        book_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        reservations::insert(&mut self.tx, user_id, book_id, now).await
    }

    async fn get_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>> {
        reservations::get(&mut self.tx, id, false).await
    }

    async fn lock_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>> {
        reservations::get(&mut self.tx, id, true).await
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        reservations::update(&mut self.tx, reservation).await
    }

    async fn find_reservations(&mut self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        reservations::find(&mut self.tx, query).await
    }

    async fn insert_fine(&mut self, issue_id: i64, amount: Decimal) -> AppResult<Fine> {
        fines::insert(&mut self.tx, issue_id, amount).await
    }

    async fn get_fine(&mut self, id: i64) -> AppResult<Option<Fine>> {
        fines::get(&mut self.tx, id, false).await
    }

    async fn lock_fine(&mut self, id: i64) -> AppResult<Option<Fine>> {
        fines::get(&mut self.tx, id, true).await
    }

    async fn fine_for_issue(&mut self, issue_id: i64) -> AppResult<Option<Fine>> {
        fines::for_issue(&mut self.tx, issue_id).await
    }

    async fn update_fine(&mut self, fine: &Fine) -> AppResult<()> {
        fines::update(&mut self.tx, fine).await
    }

    async fn find_fines(&mut self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        fines::find(&mut self.tx, query).await
    }

    async fn insert_history(&mut self, entry: &NewHistoryEntry) -> AppResult<IssueHistory> {
        history::insert(&mut self.tx, entry).await
    }

    async fn find_history(&mut self, query: &HistoryQuery) -> AppResult<Vec<IssueHistory>> {
        history::find(&mut self.tx, query).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
