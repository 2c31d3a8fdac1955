//! History recorder: the append-only audit trail

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        history::{HistoryQuery, IssueHistory, NewHistoryEntry},
        user::Actor,
    },
    repository::{Repository, Transaction},
};

/// Append an entry inside the caller's transaction.
///
/// Entries are never updated or deleted; a storage failure here aborts the
/// whole operation that produced it.
pub(crate) async fn append(tx: &mut dyn Transaction, entry: NewHistoryEntry) -> AppResult<IssueHistory> {
    let recorded = tx.insert_history(&entry).await?;
    tracing::debug!(
        "History: {} book={} user={} issue={:?}",
        recorded.action,
        recorded.book_id,
        recorded.user_id,
        recorded.issue_id
    );
    Ok(recorded)
}

#[derive(Clone)]
pub struct HistoryService {
    repository: Arc<dyn Repository>,
}

impl HistoryService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Read-only query over the trail. Members only see their own entries.
    pub async fn query(&self, actor: &Actor, query: &HistoryQuery) -> AppResult<Vec<IssueHistory>> {
        let mut query = query.clone();
        if !actor.is_staff() {
            query.user_id = Some(actor.user_id);
        }

        let mut tx = self.repository.begin().await?;
        let entries = tx.find_history(&query).await?;
        tx.commit().await?;
        Ok(entries)
    }
}
