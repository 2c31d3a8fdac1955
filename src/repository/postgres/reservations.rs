//! Reservation queries

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationQuery},
};

const COLUMNS: &str = "id, user_id, book_id, reservation_date, status";

pub(super) async fn insert(
    conn: &mut PgConnection,
    user_id: i64,
    book_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Reservation> {
    let created = sqlx::query_as::<_, Reservation>(&format!(
        r#"
        INSERT INTO reservations (user_id, book_id, reservation_date, status)
        VALUES ($1, $2, $3, 'active')
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(book_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub(super) async fn get(conn: &mut PgConnection, id: i64, for_update: bool) -> AppResult<Option<Reservation>> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let reservation =
        sqlx::query_as::<_, Reservation>(&format!("SELECT {COLUMNS} FROM reservations WHERE id = $1 {lock}"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(reservation)
}

pub(super) async fn update(conn: &mut PgConnection, reservation: &Reservation) -> AppResult<()> {
    sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
        .bind(reservation.status)
        .bind(reservation.id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(super) async fn find(conn: &mut PgConnection, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
    let reservations = sqlx::query_as::<_, Reservation>(&format!(
        r#"
        SELECT {COLUMNS} FROM reservations
        WHERE ($1::BIGINT IS NULL OR book_id = $1)
          AND ($2::BIGINT IS NULL OR user_id = $2)
          AND ($3::TEXT IS NULL OR status = $3)
        ORDER BY reservation_date, id
        "#
    ))
    .bind(query.book_id)
    .bind(query.user_id)
    .bind(query.status)
    .fetch_all(conn)
    .await?;
    Ok(reservations)
}
