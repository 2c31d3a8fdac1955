//! Read-only projections for the desk and for members

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        book::BookQuery,
        enums::{IssueStatus, ReservationStatus},
        fine::FineQuery,
        issue::{Issue, IssueQuery},
        reservation::{Reservation, ReservationQuery},
        user::Actor,
    },
    repository::Repository,
};

/// What a member currently has out or is waiting for
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyBookings {
    pub issues: Vec<Issue>,
    pub reservations: Vec<Reservation>,
}

/// Library-wide counters
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LendingStats {
    pub books: i64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub open_issues: i64,
    pub overdue_issues: i64,
    pub active_reservations: i64,
    pub unpaid_fines: Decimal,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn Repository>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub async fn my_bookings(&self, actor: &Actor) -> AppResult<MyBookings> {
        let mut tx = self.repository.begin().await?;
        let issues = tx
            .find_issues(&IssueQuery {
                user_id: Some(actor.user_id),
                open: Some(true),
                ..Default::default()
            })
            .await?;
        let mut reservations = tx
            .find_reservations(&ReservationQuery {
                user_id: Some(actor.user_id),
                status: Some(ReservationStatus::Active),
                ..Default::default()
            })
            .await?;
        tx.commit().await?;

        reservations.sort_by_key(Reservation::queue_key);
        Ok(MyBookings {
            issues,
            reservations,
        })
    }

    /// Every active reservation, in queue order
    pub async fn pendings(&self, actor: &Actor) -> AppResult<Vec<Reservation>> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let mut reservations = tx
            .find_reservations(&ReservationQuery {
                status: Some(ReservationStatus::Active),
                ..Default::default()
            })
            .await?;
        tx.commit().await?;

        reservations.sort_by_key(Reservation::queue_key);
        Ok(reservations)
    }

    /// Every loan still out
    pub async fn approved(&self, actor: &Actor) -> AppResult<Vec<Issue>> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let issues = tx
            .find_issues(&IssueQuery {
                open: Some(true),
                ..Default::default()
            })
            .await?;
        tx.commit().await?;
        Ok(issues)
    }

    pub async fn stats(&self, actor: &Actor) -> AppResult<LendingStats> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let books = tx.list_books(&BookQuery::default()).await?;
        let open = tx
            .find_issues(&IssueQuery {
                open: Some(true),
                ..Default::default()
            })
            .await?;
        let reservations = tx
            .find_reservations(&ReservationQuery {
                status: Some(ReservationStatus::Active),
                ..Default::default()
            })
            .await?;
        let unpaid = tx
            .find_fines(&FineQuery {
                is_paid: Some(false),
                ..Default::default()
            })
            .await?;
        tx.commit().await?;

        Ok(LendingStats {
            books: books.len() as i64,
            total_copies: books.iter().map(|b| i64::from(b.total_copies)).sum(),
            available_copies: books.iter().map(|b| i64::from(b.available_copies)).sum(),
            open_issues: open.len() as i64,
            overdue_issues: open.iter().filter(|i| i.status == IssueStatus::Overdue).count() as i64,
            active_reservations: reservations.len() as i64,
            unpaid_fines: unpaid.iter().map(|f| f.amount).sum(),
        })
    }
}
