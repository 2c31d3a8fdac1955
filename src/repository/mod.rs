//! Repository layer for persistence
//!
//! Every service operation runs inside one [`Transaction`]. Nothing it wrote
//! is visible to others until [`Transaction::commit`]; dropping the
//! transaction discards its writes. `lock_*` reads take the row lock that
//! serializes concurrent lending operations on the same book or issue.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
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

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Entry point of a storage backend
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>>;

    /// Connectivity check behind the readiness endpoint
    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
pub trait Transaction: Send {
    // Users
    async fn insert_user(&mut self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User>;
    async fn get_user(&mut self, id: i64) -> AppResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;
    async fn list_users(&mut self) -> AppResult<Vec<User>>;

    // Catalog
    async fn insert_category(&mut self, category: &CreateCategory) -> AppResult<Category>;
    async fn get_category(&mut self, id: i64) -> AppResult<Option<Category>>;
    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>>;
    async fn list_categories(&mut self) -> AppResult<Vec<Category>>;
    async fn insert_author(&mut self, author: &CreateAuthor) -> AppResult<Author>;
    async fn get_author(&mut self, id: i64) -> AppResult<Option<Author>>;
    async fn list_authors(&mut self) -> AppResult<Vec<Author>>;
    async fn insert_book(&mut self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book>;
    async fn get_book(&mut self, id: i64) -> AppResult<Option<Book>>;
    async fn find_book_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Book>>;
    /// Read a book and hold its row lock until the transaction ends
    async fn lock_book(&mut self, id: i64) -> AppResult<Option<Book>>;
    async fn update_book_copies(&mut self, book: &Book) -> AppResult<()>;
    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>>;

    // Issues
    async fn insert_issue(&mut self, issue: &NewIssue) -> AppResult<Issue>;
    async fn get_issue(&mut self, id: i64) -> AppResult<Option<Issue>>;
    async fn lock_issue(&mut self, id: i64) -> AppResult<Option<Issue>>;
    async fn update_issue(&mut self, issue: &Issue) -> AppResult<()>;
    /// Ordered by issue date, then id
    async fn find_issues(&mut self, query: &IssueQuery) -> AppResult<Vec<Issue>>;

    // Reservations
    async fn insert_reservation(
        &mut self,
        user_id: i64,
        book_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation>;
    async fn get_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>>;
    async fn lock_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>>;
    async fn update_reservation(&mut self, reservation: &Reservation) -> AppResult<()>;
    /// Ordered by reservation date, then id
    async fn find_reservations(&mut self, query: &ReservationQuery) -> AppResult<Vec<Reservation>>;

    // Fines
    async fn insert_fine(&mut self, issue_id: i64, amount: Decimal) -> AppResult<Fine>;
    async fn get_fine(&mut self, id: i64) -> AppResult<Option<Fine>>;
    async fn lock_fine(&mut self, id: i64) -> AppResult<Option<Fine>>;
    async fn fine_for_issue(&mut self, issue_id: i64) -> AppResult<Option<Fine>>;
    async fn update_fine(&mut self, fine: &Fine) -> AppResult<()>;
    async fn find_fines(&mut self, query: &FineQuery) -> AppResult<Vec<Fine>>;

    // History
    async fn insert_history(&mut self, entry: &NewHistoryEntry) -> AppResult<IssueHistory>;
    /// Ordered by action date, then id
    async fn find_history(&mut self, query: &HistoryQuery) -> AppResult<Vec<IssueHistory>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
