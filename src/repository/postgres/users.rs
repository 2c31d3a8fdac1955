//! User queries

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::unique_violation;
use crate::{
    error::AppResult,
    models::user::{CreateUser, User},
};

const COLUMNS: &str = "id, username, email, first_name, last_name, phone, role, created_at";

pub(super) async fn insert(conn: &mut PgConnection, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, first_name, last_name, phone, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone)
    .bind(user.role)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| unique_violation(e, || format!("Username '{}' already exists", user.username)))
}

pub(super) async fn get(conn: &mut PgConnection, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub(super) async fn find_by_username(conn: &mut PgConnection, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub(super) async fn list(conn: &mut PgConnection) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))
        .fetch_all(conn)
        .await?;
    Ok(users)
}
