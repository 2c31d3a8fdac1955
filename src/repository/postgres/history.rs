//! Issue history queries. The table is insert-only.

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::history::{HistoryQuery, IssueHistory, NewHistoryEntry},
};

const COLUMNS: &str = "id, issue_id, book_id, user_id, action, action_date, remarks";

pub(super) async fn insert(conn: &mut PgConnection, entry: &NewHistoryEntry) -> AppResult<IssueHistory> {
    let created = sqlx::query_as::<_, IssueHistory>(&format!(
        r#"
        INSERT INTO issue_history (issue_id, book_id, user_id, action, action_date, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(entry.issue_id)
    .bind(entry.book_id)
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.action_date)
    .bind(&entry.remarks)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub(super) async fn find(conn: &mut PgConnection, query: &HistoryQuery) -> AppResult<Vec<IssueHistory>> {
    let entries = sqlx::query_as::<_, IssueHistory>(&format!(
        r#"
        SELECT {COLUMNS} FROM issue_history
        WHERE ($1::BIGINT IS NULL OR issue_id = $1)
          AND ($2::BIGINT IS NULL OR book_id = $2)
          AND ($3::BIGINT IS NULL OR user_id = $3)
          AND ($4::TEXT IS NULL OR action = $4)
          AND ($5::TIMESTAMPTZ IS NULL OR action_date >= $5)
          AND ($6::TIMESTAMPTZ IS NULL OR action_date <= $6)
        ORDER BY action_date, id
        "#
    ))
    .bind(query.issue_id)
    .bind(query.book_id)
    .bind(query.user_id)
    .bind(query.action)
    .bind(query.from)
    .bind(query.to)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
