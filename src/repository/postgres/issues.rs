//! Issue queries

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::issue::{Issue, IssueQuery, NewIssue},
};

const COLUMNS: &str = "id, user_id, book_id, issue_date, due_date, return_date, status, renewals";

pub(super) async fn insert(conn: &mut PgConnection, issue: &NewIssue) -> AppResult<Issue> {
    let created = sqlx::query_as::<_, Issue>(&format!(
        r#"
        INSERT INTO issues (user_id, book_id, issue_date, due_date, status, renewals)
        VALUES ($1, $2, $3, $4, 'issued', 0)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(issue.user_id)
    .bind(issue.book_id)
    .bind(issue.issue_date)
    .bind(issue.due_date)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub(super) async fn get(conn: &mut PgConnection, id: i64, for_update: bool) -> AppResult<Option<Issue>> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let issue = sqlx::query_as::<_, Issue>(&format!("SELECT {COLUMNS} FROM issues WHERE id = $1 {lock}"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(issue)
}

pub(super) async fn update(conn: &mut PgConnection, issue: &Issue) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE issues
        SET due_date = $1, return_date = $2, status = $3, renewals = $4
        WHERE id = $5
        "#,
    )
    .bind(issue.due_date)
    .bind(issue.return_date)
    .bind(issue.status)
    .bind(issue.renewals)
    .bind(issue.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub(super) async fn find(conn: &mut PgConnection, query: &IssueQuery) -> AppResult<Vec<Issue>> {
    let issues = sqlx::query_as::<_, Issue>(&format!(
        r#"
        SELECT {COLUMNS} FROM issues
        WHERE ($1::BIGINT IS NULL OR book_id = $1)
          AND ($2::BIGINT IS NULL OR user_id = $2)
          AND ($3::TEXT IS NULL OR status = $3)
          AND ($4::BOOLEAN IS NULL OR (status <> 'returned') = $4)
          AND ($5::DATE IS NULL OR issue_date >= $5)
          AND ($6::DATE IS NULL OR issue_date <= $6)
          AND ($7::DATE IS NULL OR due_date < $7)
        ORDER BY issue_date, id
        "#
    ))
    .bind(query.book_id)
    .bind(query.user_id)
    .bind(query.status)
    .bind(query.open)
    .bind(query.from)
    .bind(query.to)
    .bind(query.due_before)
    .fetch_all(conn)
    .await?;
    Ok(issues)
}
