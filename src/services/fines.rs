//! Fine calculator: overdue penalties and their payment

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::{found, history};
use crate::{
    clock::{Clock, ClockExt},
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        enums::{HistoryAction, IssueStatus},
        fine::{Fine, FineQuery},
        history::NewHistoryEntry,
        issue::Issue,
        user::Actor,
    },
    repository::{Repository, Transaction},
};

/// Fine owed for `issue` as of `as_of`: overdue days times the daily rate.
///
/// Zero up to and including the due date, then grows linearly.
pub fn compute(issue: &Issue, as_of: NaiveDate, per_day_rate: Decimal) -> Decimal {
    (Decimal::from(issue.overdue_days(as_of)) * per_day_rate).round_dp(2)
}

/// Create the issue's fine or refresh its amount. Paid fines are final.
pub(crate) async fn record_fine(tx: &mut dyn Transaction, issue: &Issue, amount: Decimal) -> AppResult<Fine> {
    match tx.fine_for_issue(issue.id).await? {
        Some(fine) if fine.is_paid => Err(AppError::DuplicateFine(issue.id)),
        Some(mut fine) => {
            fine.amount = amount;
            tx.update_fine(&fine).await?;
            Ok(fine)
        }
        None => tx.insert_fine(issue.id, amount).await,
    }
}

#[derive(Clone)]
pub struct FinesService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    config: LendingConfig,
}

impl FinesService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>, config: LendingConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Fine of an issue. An unreturned late issue gets its fine created or
    /// brought up to date with today's amount.
    pub async fn fine_for_issue(&self, actor: &Actor, issue_id: i64) -> AppResult<Option<Fine>> {
        let today = self.clock.today();
        let mut tx = self.repository.begin().await?;

        // Serializes with return_book, which holds the same row lock while it records the fine
        let mut issue = found(tx.lock_issue(issue_id).await?, "Issue", issue_id)?;
        actor.require_self_or_staff(issue.user_id)?;

        if issue.mark_overdue(today) {
            tx.update_issue(&issue).await?;
            history::append(
                tx.as_mut(),
                NewHistoryEntry::for_issue(HistoryAction::Overdue, &issue, self.clock.now())
                    .remarks(format!("due {}", issue.due_date)),
            )
            .await?;
        }

        let fine = match tx.fine_for_issue(issue.id).await? {
            Some(fine) if fine.is_paid => Some(fine),
            existing if issue.is_late(today) => {
                let amount = compute(&issue, today, self.config.fine_per_day);
                if existing.as_ref().map(|f| f.amount) == Some(amount) {
                    existing
                } else {
                    Some(record_fine(tx.as_mut(), &issue, amount).await?)
                }
            }
            existing => existing,
        };

        tx.commit().await?;
        Ok(fine)
    }

    /// Settle a fine. Only the desk takes payments, and only once the loan
    /// is closed and the amount final.
    pub async fn pay_fine(&self, actor: &Actor, fine_id: i64) -> AppResult<Fine> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let mut fine = found(tx.lock_fine(fine_id).await?, "Fine", fine_id)?;
        if fine.is_paid {
            return Err(AppError::AlreadyPaid(fine.id));
        }

        let issue = found(tx.get_issue(fine.issue_id).await?, "Issue", fine.issue_id)?;
        if issue.status != IssueStatus::Returned {
            return Err(AppError::InvalidState(format!(
                "issue {} must be returned before its fine is paid",
                issue.id
            )));
        }

        fine.is_paid = true;
        fine.paid_date = Some(self.clock.today());
        tx.update_fine(&fine).await?;

        history::append(
            tx.as_mut(),
            NewHistoryEntry::for_issue(HistoryAction::FinePaid, &issue, self.clock.now())
                .remarks(format!("paid {}", fine.amount)),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Fine {} of {} paid for issue {} (received by user {})",
            fine.id,
            fine.amount,
            issue.id,
            actor.user_id
        );
        Ok(fine)
    }

    pub async fn get_fine(&self, actor: &Actor, fine_id: i64) -> AppResult<Fine> {
        let mut tx = self.repository.begin().await?;
        let fine = found(tx.get_fine(fine_id).await?, "Fine", fine_id)?;
        let issue = found(tx.get_issue(fine.issue_id).await?, "Issue", fine.issue_id)?;
        tx.commit().await?;

        actor.require_self_or_staff(issue.user_id)?;
        Ok(fine)
    }

    /// List fines. Members only see their own.
    pub async fn list_fines(&self, actor: &Actor, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let mut query = query.clone();
        if !actor.is_staff() {
            query.user_id = Some(actor.user_id);
        }

        let mut tx = self.repository.begin().await?;
        let fines = tx.find_fines(&query).await?;
        tx.commit().await?;
        Ok(fines)
    }
}
