//! In-memory storage backend
//!
//! Transactions are serialized behind one async mutex and work on a private
//! copy of the state that replaces the shared one on commit. Used for tests
//! and for running the server without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Repository, Transaction};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookQuery, CreateBook},
        category::{Category, CreateCategory},
        enums::ReservationStatus,
        fine::{Fine, FineQuery},
        history::{HistoryQuery, IssueHistory, NewHistoryEntry},
        issue::{Issue, IssueQuery, NewIssue},
        reservation::{Reservation, ReservationQuery},
        user::{CreateUser, User},
    },
};

#[derive(Debug, Default, Clone)]
struct Sequences {
    users: i64,
    categories: i64,
    authors: i64,
    books: i64,
    issues: i64,
    reservations: i64,
    fines: i64,
    history: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    issues: BTreeMap<i64, Issue>,
    reservations: BTreeMap<i64, Reservation>,
    fines: BTreeMap<i64, Fine>,
    history: Vec<IssueHistory>,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn missing(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", what, id))
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn insert_user(&mut self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        if self.working.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", user.username)));
        }
        let id = next(&mut self.working.seq.users);
        let created = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            created_at: now,
        };
        self.working.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_user(&mut self, id: i64) -> AppResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(self.working.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        Ok(self.working.users.values().cloned().collect())
    }

    async fn insert_category(&mut self, category: &CreateCategory) -> AppResult<Category> {
        if self.working.categories.values().any(|c| c.name == category.name) {
            return Err(AppError::Conflict(format!("Category '{}' already exists", category.name)));
        }
        let id = next(&mut self.working.seq.categories);
        let created = Category {
            id,
            name: category.name.clone(),
            description: category.description.clone(),
        };
        self.working.categories.insert(id, created.clone());
        Ok(created)
    }

    async fn get_category(&mut self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.working.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
        Ok(self.working.categories.values().find(|c| c.name == name).cloned())
    }

    async fn list_categories(&mut self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.working.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_author(&mut self, author: &CreateAuthor) -> AppResult<Author> {
        let id = next(&mut self.working.seq.authors);
        let created = Author {
            id,
            name: author.name.clone(),
            biography: author.biography.clone(),
        };
        self.working.authors.insert(id, created.clone());
        Ok(created)
    }

    async fn get_author(&mut self, id: i64) -> AppResult<Option<Author>> {
        Ok(self.working.authors.get(&id).cloned())
    }

    async fn list_authors(&mut self) -> AppResult<Vec<Author>> {
        let mut authors: Vec<Author> = self.working.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    async fn insert_book(&mut self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
        if self.working.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::Conflict(format!("ISBN {} already exists", book.isbn)));
        }
        let id = next(&mut self.working.seq.books);
        let mut author_ids = book.author_ids.clone();
        author_ids.sort_unstable();
        author_ids.dedup();
        let created = Book {
            id,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            edition: book.edition.clone(),
            category_id: book.category_id,
            author_ids,
            total_copies: book.total_copies,
            available_copies: book.total_copies,
            created_at: now,
        };
        self.working.books.insert(id, created.clone());
        Ok(created)
    }

    async fn get_book(&mut self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.working.books.get(&id).cloned())
    }

    async fn find_book_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.working.books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn lock_book(&mut self, id: i64) -> AppResult<Option<Book>> {
        // The whole store is already held exclusively
        self.get_book(id).await
    }

    async fn update_book_copies(&mut self, book: &Book) -> AppResult<()> {
        let stored = self
            .working
            .books
            .get_mut(&book.id)
            .ok_or_else(|| missing("Book", book.id))?;
        stored.total_copies = book.total_copies;
        stored.available_copies = book.available_copies;
        Ok(())
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .working
            .books
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn insert_issue(&mut self, issue: &NewIssue) -> AppResult<Issue> {
        let id = next(&mut self.working.seq.issues);
        let created = Issue {
            id,
            user_id: issue.user_id,
            book_id: issue.book_id,
            issue_date: issue.issue_date,
            due_date: issue.due_date,
            return_date: None,
            status: crate::models::IssueStatus::Issued,
            renewals: 0,
        };
        self.working.issues.insert(id, created.clone());
        Ok(created)
    }

    async fn get_issue(&mut self, id: i64) -> AppResult<Option<Issue>> {
        Ok(self.working.issues.get(&id).cloned())
    }

    async fn lock_issue(&mut self, id: i64) -> AppResult<Option<Issue>> {
        self.get_issue(id).await
    }

    async fn update_issue(&mut self, issue: &Issue) -> AppResult<()> {
        let stored = self
            .working
            .issues
            .get_mut(&issue.id)
            .ok_or_else(|| missing("Issue", issue.id))?;
        *stored = issue.clone();
        Ok(())
    }

    async fn find_issues(&mut self, query: &IssueQuery) -> AppResult<Vec<Issue>> {
        let mut issues: Vec<Issue> = self
            .working
            .issues
            .values()
            .filter(|i| query.matches(i))
            .cloned()
            .collect();
        issues.sort_by_key(|i| (i.issue_date, i.id));
        Ok(issues)
    }

    async fn insert_reservation(
        &mut self,
        user_id: i64,
        book_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let id = next(&mut self.working.seq.reservations);
        let created = Reservation {
            id,
            user_id,
            book_id,
            reservation_date: now,
            status: ReservationStatus::Active,
        };
        self.working.reservations.insert(id, created.clone());
        Ok(created)
    }

    async fn get_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>> {
        Ok(self.working.reservations.get(&id).cloned())
    }

    async fn lock_reservation(&mut self, id: i64) -> AppResult<Option<Reservation>> {
        self.get_reservation(id).await
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        let stored = self
            .working
            .reservations
            .get_mut(&reservation.id)
            .ok_or_else(|| missing("Reservation", reservation.id))?;
        *stored = reservation.clone();
        Ok(())
    }

    async fn find_reservations(&mut self, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        reservations.sort_by_key(Reservation::queue_key);
        Ok(reservations)
    }

    async fn insert_fine(&mut self, issue_id: i64, amount: Decimal) -> AppResult<Fine> {
        if self.working.fines.values().any(|f| f.issue_id == issue_id) {
            return Err(AppError::Conflict(format!("Issue {} already has a fine", issue_id)));
        }
        let id = next(&mut self.working.seq.fines);
        let created = Fine {
            id,
            issue_id,
            amount,
            is_paid: false,
            paid_date: None,
        };
        self.working.fines.insert(id, created.clone());
        Ok(created)
    }

    async fn get_fine(&mut self, id: i64) -> AppResult<Option<Fine>> {
        Ok(self.working.fines.get(&id).cloned())
    }

    async fn lock_fine(&mut self, id: i64) -> AppResult<Option<Fine>> {
        self.get_fine(id).await
    }

    async fn fine_for_issue(&mut self, issue_id: i64) -> AppResult<Option<Fine>> {
        Ok(self.working.fines.values().find(|f| f.issue_id == issue_id).cloned())
    }

    async fn update_fine(&mut self, fine: &Fine) -> AppResult<()> {
        let stored = self
            .working
            .fines
            .get_mut(&fine.id)
            .ok_or_else(|| missing("Fine", fine.id))?;
        *stored = fine.clone();
        Ok(())
    }

    async fn find_fines(&mut self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let issues = &self.working.issues;
        Ok(self
            .working
            .fines
            .values()
            .filter(|f| query.is_paid.map_or(true, |p| f.is_paid == p))
            .filter(|f| {
                query.user_id.map_or(true, |u| {
                    issues.get(&f.issue_id).map_or(false, |i| i.user_id == u)
                })
            })
            .cloned()
            .collect())
    }

    async fn insert_history(&mut self, entry: &NewHistoryEntry) -> AppResult<IssueHistory> {
        let id = next(&mut self.working.seq.history);
        let created = IssueHistory {
            id,
            issue_id: entry.issue_id,
            book_id: entry.book_id,
            user_id: entry.user_id,
            action: entry.action,
            action_date: entry.action_date,
            remarks: entry.remarks.clone(),
        };
        self.working.history.push(created.clone());
        Ok(created)
    }

    async fn find_history(&mut self, query: &HistoryQuery) -> AppResult<Vec<IssueHistory>> {
        let mut entries: Vec<IssueHistory> = self
            .working
            .history
            .iter()
            .filter(|h| query.matches(h))
            .cloned()
            .collect();
        entries.sort_by_key(|h| (h.action_date, h.id));
        Ok(entries)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
