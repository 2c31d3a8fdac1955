//! Reservation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::ReservationStatus;
use crate::error::{AppError, AppResult};

/// A standing request for a book with no copy on the shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub reservation_date: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    fn require_active(&self) -> AppResult<()> {
        if self.status != ReservationStatus::Active {
            return Err(AppError::InvalidState(format!(
                "reservation {} is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        self.require_active()?;
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }

    pub fn complete(&mut self) -> AppResult<()> {
        self.require_active()?;
        self.status = ReservationStatus::Completed;
        Ok(())
    }

    /// Queue position key: longest waiting first, insertion order on ties
    pub fn queue_key(&self) -> (DateTime<Utc>, i64) {
        (self.reservation_date, self.id)
    }
}

/// Reservation query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub book_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<ReservationStatus>,
}

impl ReservationQuery {
    pub fn active_for_book(book_id: i64) -> Self {
        Self {
            book_id: Some(book_id),
            status: Some(ReservationStatus::Active),
            ..Default::default()
        }
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        self.book_id.map_or(true, |b| reservation.book_id == b)
            && self.user_id.map_or(true, |u| reservation.user_id == u)
            && self.status.map_or(true, |s| reservation.status == s)
    }
}
