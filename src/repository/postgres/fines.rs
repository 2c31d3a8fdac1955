//! Fine queries

use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::unique_violation;
use crate::{
    error::AppResult,
    models::fine::{Fine, FineQuery},
};

const COLUMNS: &str = "f.id, f.issue_id, f.amount, f.is_paid, f.paid_date";

pub(super) async fn insert(conn: &mut PgConnection, issue_id: i64, amount: Decimal) -> AppResult<Fine> {
    sqlx::query_as::<_, Fine>(
        r#"
        INSERT INTO fines AS f (issue_id, amount, is_paid)
        VALUES ($1, $2, FALSE)
        RETURNING f.id, f.issue_id, f.amount, f.is_paid, f.paid_date
        "#,
    )
    .bind(issue_id)
    .bind(amount)
    .fetch_one(conn)
    .await
    .map_err(|e| unique_violation(e, || format!("Issue {} already has a fine", issue_id)))
}

pub(super) async fn get(conn: &mut PgConnection, id: i64, for_update: bool) -> AppResult<Option<Fine>> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let fine = sqlx::query_as::<_, Fine>(&format!("SELECT {COLUMNS} FROM fines f WHERE f.id = $1 {lock}"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(fine)
}

pub(super) async fn for_issue(conn: &mut PgConnection, issue_id: i64) -> AppResult<Option<Fine>> {
    let fine = sqlx::query_as::<_, Fine>(&format!(
        "SELECT {COLUMNS} FROM fines f WHERE f.issue_id = $1 FOR UPDATE"
    ))
    .bind(issue_id)
    .fetch_optional(conn)
    .await?;
    Ok(fine)
}

pub(super) async fn update(conn: &mut PgConnection, fine: &Fine) -> AppResult<()> {
    sqlx::query("UPDATE fines SET amount = $1, is_paid = $2, paid_date = $3 WHERE id = $4")
        .bind(fine.amount)
        .bind(fine.is_paid)
        .bind(fine.paid_date)
        .bind(fine.id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(super) async fn find(conn: &mut PgConnection, query: &FineQuery) -> AppResult<Vec<Fine>> {
    let fines = sqlx::query_as::<_, Fine>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM fines f
        JOIN issues i ON i.id = f.issue_id
        WHERE ($1::BIGINT IS NULL OR i.user_id = $1)
          AND ($2::BOOLEAN IS NULL OR f.is_paid = $2)
        ORDER BY f.id
        "#
    ))
    .bind(query.user_id)
    .bind(query.is_paid)
    .fetch_all(conn)
    .await?;
    Ok(fines)
}
