//! Lending ledger: issue, return, renewal, overdue and stock changes
//!
//! The ledger is the only writer of `Issue.status` and
//! `Book.available_copies`. Every operation locks the book row first, then
//! re-reads the issue under lock before checking its state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::{fines, found, history, reservations};
use crate::{
    clock::{Clock, ClockExt},
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        book::Book,
        enums::{HistoryAction, IssueStatus},
        fine::Fine,
        history::NewHistoryEntry,
        issue::{Issue, IssueQuery, NewIssue},
        reservation::Reservation,
        user::Actor,
    },
    repository::{Repository, Transaction},
};

/// A reservation turned into a loan
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Promotion {
    pub reservation: Reservation,
    pub issue: Issue,
}

/// Everything a return changed
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub issue: Issue,
    /// Set when the book came back late
    pub fine: Option<Fine>,
    /// Set when the freed copy went straight to a waiting reservation
    pub promotion: Option<Promotion>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RestockOutcome {
    pub book: Book,
    pub promotions: Vec<Promotion>,
}

#[derive(Clone)]
pub struct LendingService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    config: LendingConfig,
}

/// Longest loan period or renewal extension accepted from a caller
pub const MAX_PERIOD_DAYS: u32 = 3650;

fn positive_days(days: Option<u32>, default: u32, what: &str) -> AppResult<u32> {
    match days.unwrap_or(default) {
        0 => Err(AppError::Validation(format!("{} must be at least one day", what))),
        days if days > MAX_PERIOD_DAYS => Err(AppError::Validation(format!(
            "{} cannot exceed {} days",
            what, MAX_PERIOD_DAYS
        ))),
        days => Ok(days),
    }
}

impl LendingService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>, config: LendingConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Lend a copy of `book_id` to `user_id`.
    ///
    /// Fails with `NoCopiesAvailable` when the shelf is empty; the borrower
    /// should join the reservation queue instead.
    pub async fn issue_book(
        &self,
        actor: &Actor,
        user_id: i64,
        book_id: i64,
        loan_period_days: Option<u32>,
    ) -> AppResult<Issue> {
        actor.require_self_or_staff(user_id)?;
        let period = positive_days(loan_period_days, self.config.loan_period_days, "loan_period_days")?;

        let mut tx = self.repository.begin().await?;
        found(tx.get_user(user_id).await?, "User", user_id)?;
        let mut book = found(tx.lock_book(book_id).await?, "Book", book_id)?;

        let issue = self
            .issue_locked(tx.as_mut(), user_id, &mut book, period, None)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Issued book {} to user {} (issue {}, due {})",
            book.id,
            user_id,
            issue.id,
            issue.due_date
        );
        Ok(issue)
    }

    /// Take a copy off the locked `book` and open a loan for it
    pub(crate) async fn issue_locked(
        &self,
        tx: &mut dyn Transaction,
        user_id: i64,
        book: &mut Book,
        loan_period_days: u32,
        remarks: Option<String>,
    ) -> AppResult<Issue> {
        book.checkout_copy()?;
        tx.update_book_copies(book).await?;

        let today = self.clock.today();
        let issue = tx
            .insert_issue(&NewIssue::new(user_id, book.id, today, loan_period_days)?)
            .await?;

        let mut entry = NewHistoryEntry::for_issue(HistoryAction::Issued, &issue, self.clock.now());
        if let Some(remarks) = remarks {
            entry = entry.remarks(remarks);
        }
        history::append(tx, entry).await?;

        Ok(issue)
    }

    /// Close a loan. A late return settles the fine amount; the freed copy
    /// goes to the longest-waiting reservation if there is one.
    pub async fn return_book(&self, actor: &Actor, issue_id: i64) -> AppResult<ReturnOutcome> {
        let today = self.clock.today();
        let mut tx = self.repository.begin().await?;

        let issue = found(tx.get_issue(issue_id).await?, "Issue", issue_id)?;
        actor.require_self_or_staff(issue.user_id)?;

        let mut book = found(tx.lock_book(issue.book_id).await?, "Book", issue.book_id)?;
        let mut issue = found(tx.lock_issue(issue_id).await?, "Issue", issue_id)?;

        // A stale loan the sweep has not reached yet is recorded as overdue first
        if issue.mark_overdue(today) {
            history::append(
                tx.as_mut(),
                NewHistoryEntry::for_issue(HistoryAction::Overdue, &issue, self.clock.now())
                    .remarks(format!("due {}", issue.due_date)),
            )
            .await?;
        }

        issue.mark_returned(today)?;
        tx.update_issue(&issue).await?;

        let overdue_days = issue.overdue_days(today);
        let fine = if overdue_days > 0 {
            let amount = fines::compute(&issue, today, self.config.fine_per_day);
            Some(fines::record_fine(tx.as_mut(), &issue, amount).await?)
        } else {
            None
        };

        book.checkin_copy()?;
        tx.update_book_copies(&book).await?;

        let mut entry = NewHistoryEntry::for_issue(HistoryAction::Returned, &issue, self.clock.now());
        if overdue_days > 0 {
            entry = entry.remarks(format!("returned {} days late", overdue_days));
        }
        history::append(tx.as_mut(), entry).await?;

        let promotion = self.promote_locked(tx.as_mut(), &mut book).await?;
        tx.commit().await?;

        tracing::info!(
            "Returned issue {} (book {}, user {}, {} days late)",
            issue.id,
            issue.book_id,
            issue.user_id,
            overdue_days
        );
        if let Some(promotion) = &promotion {
            tracing::info!(
                "Reservation {} promoted to issue {} for user {}",
                promotion.reservation.id,
                promotion.issue.id,
                promotion.issue.user_id
            );
        }

        Ok(ReturnOutcome {
            issue,
            fine,
            promotion,
        })
    }

    /// Hand a free copy of the locked `book` to the head of its queue.
    ///
    /// Returns `None` when nobody is waiting. A non-empty queue with no
    /// copy on the shelf is `NoCopiesAvailable`.
    pub(crate) async fn promote_locked(
        &self,
        tx: &mut dyn Transaction,
        book: &mut Book,
    ) -> AppResult<Option<Promotion>> {
        let queue = reservations::waiting(tx, book.id).await?;
        if queue.is_empty() {
            return Ok(None);
        }
        if book.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable(book.id));
        }

        for candidate in queue {
            let Some(mut reservation) = tx.lock_reservation(candidate.id).await? else {
                continue;
            };
            // Cancelled since the queue was read
            if reservation.complete().is_err() {
                continue;
            }
            tx.update_reservation(&reservation).await?;

            let issue = self
                .issue_locked(
                    tx,
                    reservation.user_id,
                    book,
                    self.config.loan_period_days,
                    Some(format!("from reservation {}", reservation.id)),
                )
                .await?;

            return Ok(Some(Promotion { reservation, issue }));
        }

        Ok(None)
    }

    /// Push the due date of a loan in good standing
    pub async fn renew(&self, actor: &Actor, issue_id: i64, extension_days: Option<u32>) -> AppResult<Issue> {
        let today = self.clock.today();
        let extension = positive_days(extension_days, self.config.renewal_days, "extension_days")?;
        let mut tx = self.repository.begin().await?;

        let issue = found(tx.get_issue(issue_id).await?, "Issue", issue_id)?;
        actor.require_self_or_staff(issue.user_id)?;

        // Holding the book lock keeps a concurrent reservation from slipping in
        found(tx.lock_book(issue.book_id).await?, "Book", issue.book_id)?;
        let mut issue = found(tx.lock_issue(issue_id).await?, "Issue", issue_id)?;

        if issue.is_late(today) {
            return Err(AppError::RenewalNotAllowed(format!(
                "issue {} was due on {}",
                issue.id, issue.due_date
            )));
        }
        if reservations::has_waiting(tx.as_mut(), issue.book_id).await? {
            tracing::warn!(
                "Renewal of issue {} refused: book {} is reserved",
                issue.id,
                issue.book_id
            );
            return Err(AppError::RenewalNotAllowed(format!(
                "book {} has active reservations",
                issue.book_id
            )));
        }

        issue.extend(extension, self.config.max_renewals)?;
        tx.update_issue(&issue).await?;

        history::append(
            tx.as_mut(),
            NewHistoryEntry::for_issue(HistoryAction::Renewed, &issue, self.clock.now())
                .remarks(format!("due {}", issue.due_date)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Renewed issue {} until {} ({} renewals)",
            issue.id,
            issue.due_date,
            issue.renewals
        );
        Ok(issue)
    }

    /// Staff-triggered overdue sweep
    pub async fn mark_overdue_sweep(&self, actor: &Actor, today: NaiveDate) -> AppResult<Vec<Issue>> {
        actor.require_staff()?;
        self.run_overdue_sweep(today).await
    }

    /// Move every stale `issued` loan to `overdue`. Each issue commits on
    /// its own, and issues already overdue or returned are left alone.
    pub async fn run_overdue_sweep(&self, today: NaiveDate) -> AppResult<Vec<Issue>> {
        let candidates = {
            let mut tx = self.repository.begin().await?;
            let query = IssueQuery {
                status: Some(IssueStatus::Issued),
                due_before: Some(today),
                ..Default::default()
            };
            let candidates = tx.find_issues(&query).await?;
            tx.commit().await?;
            candidates
        };

        let mut marked = Vec::new();
        for candidate in candidates {
            if let Some(issue) = self.mark_overdue(candidate.id, today, self.clock.now()).await? {
                marked.push(issue);
            }
        }

        if !marked.is_empty() {
            tracing::info!("Overdue sweep for {}: {} issues marked overdue", today, marked.len());
        }
        Ok(marked)
    }

    async fn mark_overdue(&self, issue_id: i64, today: NaiveDate, now: DateTime<Utc>) -> AppResult<Option<Issue>> {
        let mut tx = self.repository.begin().await?;
        let Some(mut issue) = tx.lock_issue(issue_id).await? else {
            return Ok(None);
        };
        if !issue.mark_overdue(today) {
            return Ok(None);
        }
        tx.update_issue(&issue).await?;
        history::append(
            tx.as_mut(),
            NewHistoryEntry::for_issue(HistoryAction::Overdue, &issue, now)
                .remarks(format!("due {}", issue.due_date)),
        )
        .await?;
        tx.commit().await?;
        Ok(Some(issue))
    }

    /// Change the number of owned copies. Copies added to the shelf are
    /// offered to waiting reservations straight away.
    pub async fn restock(&self, actor: &Actor, book_id: i64, total_copies: i32) -> AppResult<RestockOutcome> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let mut book = found(tx.lock_book(book_id).await?, "Book", book_id)?;
        let previous = book.total_copies;

        book.set_total_copies(total_copies)?;
        tx.update_book_copies(&book).await?;

        let mut promotions = Vec::new();
        while book.available_copies > 0 {
            match self.promote_locked(tx.as_mut(), &mut book).await? {
                Some(promotion) => promotions.push(promotion),
                None => break,
            }
        }
        tx.commit().await?;

        tracing::info!(
            "Restocked book {}: {} -> {} copies, {} reservations promoted",
            book.id,
            previous,
            book.total_copies,
            promotions.len()
        );
        Ok(RestockOutcome { book, promotions })
    }

    /// Read one loan, recording it as overdue if it has gone stale
    pub async fn get_issue(&self, actor: &Actor, issue_id: i64) -> AppResult<Issue> {
        let mut tx = self.repository.begin().await?;
        let issue = found(tx.get_issue(issue_id).await?, "Issue", issue_id)?;
        tx.commit().await?;
        actor.require_self_or_staff(issue.user_id)?;

        let today = self.clock.today();
        if issue.status == IssueStatus::Issued && issue.due_date < today {
            if let Some(marked) = self.mark_overdue(issue.id, today, self.clock.now()).await? {
                return Ok(marked);
            }
        }
        Ok(issue)
    }

    /// List loans. Members only see their own.
    pub async fn list_issues(&self, actor: &Actor, query: &IssueQuery) -> AppResult<Vec<Issue>> {
        let mut query = query.clone();
        if !actor.is_staff() {
            query.user_id = Some(actor.user_id);
        }

        let mut tx = self.repository.begin().await?;
        let issues = tx.find_issues(&query).await?;
        tx.commit().await?;
        Ok(issues)
    }
}
