//! Issue (loan) model and its state transitions

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::IssueStatus;
use crate::error::{AppError, AppResult};

/// A single loan of one copy to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Issue {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: IssueStatus,
    pub renewals: i32,
}

/// Issue row to insert
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub user_id: i64,
    pub book_id: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// `date + days`, or `Validation` when that falls off the calendar
fn add_days(date: NaiveDate, days: u32) -> AppResult<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| AppError::Validation(format!("{} days after {} is out of range", days, date)))
}

impl NewIssue {
    pub fn new(user_id: i64, book_id: i64, today: NaiveDate, loan_period_days: u32) -> AppResult<Self> {
        Ok(Self {
            user_id,
            book_id,
            issue_date: today,
            due_date: add_days(today, loan_period_days)?,
        })
    }
}

impl Issue {
    /// Days past the due date as of `as_of`, zero when not late
    pub fn overdue_days(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.due_date).num_days().max(0)
    }

    /// Still out and past its due date, whatever the sweep has recorded
    pub fn is_late(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date < today
    }

    /// `issued -> overdue`. Returns false when nothing changed.
    pub fn mark_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == IssueStatus::Issued && self.due_date < today {
            self.status = IssueStatus::Overdue;
            true
        } else {
            false
        }
    }

    /// `issued | overdue -> returned`
    pub fn mark_returned(&mut self, today: NaiveDate) -> AppResult<()> {
        if self.status == IssueStatus::Returned {
            return Err(AppError::AlreadyReturned(self.id));
        }
        self.status = IssueStatus::Returned;
        self.return_date = Some(today);
        Ok(())
    }

    /// Push the due date back; only loans in good standing can be renewed
    pub fn extend(&mut self, extension_days: u32, max_renewals: u32) -> AppResult<()> {
        if self.status != IssueStatus::Issued {
            return Err(AppError::RenewalNotAllowed(format!(
                "issue {} is {}",
                self.id, self.status
            )));
        }
        if self.renewals as u32 >= max_renewals {
            return Err(AppError::RenewalNotAllowed(format!(
                "maximum renewals reached ({}/{})",
                self.renewals, max_renewals
            )));
        }
        self.due_date = add_days(self.due_date, extension_days)?;
        self.renewals += 1;
        Ok(())
    }
}

/// Issue query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct IssueQuery {
    pub book_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<IssueStatus>,
    /// Only loans still out (issued or overdue)
    pub open: Option<bool>,
    /// Issued on or after this day
    pub from: Option<NaiveDate>,
    /// Issued on or before this day
    pub to: Option<NaiveDate>,
    /// Due strictly before this day
    pub due_before: Option<NaiveDate>,
}

impl IssueQuery {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.book_id.map_or(true, |b| issue.book_id == b)
            && self.user_id.map_or(true, |u| issue.user_id == u)
            && self.status.map_or(true, |s| issue.status == s)
            && self.open.map_or(true, |o| issue.status.is_open() == o)
            && self.from.map_or(true, |d| issue.issue_date >= d)
            && self.to.map_or(true, |d| issue.issue_date <= d)
            && self.due_before.map_or(true, |d| issue.due_date < d)
    }
}
