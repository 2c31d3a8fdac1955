//! Issue history (audit trail) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{enums::HistoryAction, issue::Issue};

/// Append-only audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IssueHistory {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub book_id: i64,
    pub user_id: i64,
    pub action: HistoryAction,
    pub action_date: DateTime<Utc>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub issue_id: Option<i64>,
    pub book_id: i64,
    pub user_id: i64,
    pub action: HistoryAction,
    pub action_date: DateTime<Utc>,
    pub remarks: Option<String>,
}

impl NewHistoryEntry {
    pub fn new(action: HistoryAction, book_id: i64, user_id: i64, at: DateTime<Utc>) -> Self {
        Self {
            issue_id: None,
            book_id,
            user_id,
            action,
            action_date: at,
            remarks: None,
        }
    }

    /// Entry about a loan, borrower and book taken from the issue
    pub fn for_issue(action: HistoryAction, issue: &Issue, at: DateTime<Utc>) -> Self {
        Self {
            issue_id: Some(issue.id),
            ..Self::new(action, issue.book_id, issue.user_id, at)
        }
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// History query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    pub issue_id: Option<i64>,
    pub book_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: Option<HistoryAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn matches(&self, entry: &IssueHistory) -> bool {
        self.issue_id.map_or(true, |i| entry.issue_id == Some(i))
            && self.book_id.map_or(true, |b| entry.book_id == b)
            && self.user_id.map_or(true, |u| entry.user_id == u)
            && self.action.map_or(true, |a| entry.action == a)
            && self.from.map_or(true, |d| entry.action_date >= d)
            && self.to.map_or(true, |d| entry.action_date <= d)
    }
}
