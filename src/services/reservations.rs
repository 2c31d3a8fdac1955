//! Reservation queue: per-book FIFO of users waiting for a copy

use std::sync::Arc;

use super::{found, history, lending::{LendingService, Promotion}};
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        enums::HistoryAction,
        history::NewHistoryEntry,
        reservation::{Reservation, ReservationQuery},
        user::Actor,
    },
    repository::{Repository, Transaction},
};

/// Active reservations for a book, longest waiting first
pub(crate) async fn waiting(tx: &mut dyn Transaction, book_id: i64) -> AppResult<Vec<Reservation>> {
    let mut queue = tx
        .find_reservations(&ReservationQuery::active_for_book(book_id))
        .await?;
    queue.sort_by_key(Reservation::queue_key);
    Ok(queue)
}

pub(crate) async fn has_waiting(tx: &mut dyn Transaction, book_id: i64) -> AppResult<bool> {
    Ok(!waiting(tx, book_id).await?.is_empty())
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    lending: LendingService,
}

impl ReservationsService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>, lending: LendingService) -> Self {
        Self {
            repository,
            clock,
            lending,
        }
    }

    /// Join the queue for a book that has no copy on the shelf
    pub async fn reserve(&self, actor: &Actor, user_id: i64, book_id: i64) -> AppResult<Reservation> {
        actor.require_self_or_staff(user_id)?;

        let mut tx = self.repository.begin().await?;
        found(tx.get_user(user_id).await?, "User", user_id)?;
        let book = found(tx.lock_book(book_id).await?, "Book", book_id)?;

        if book.available_copies > 0 {
            return Err(AppError::CopiesAvailable(book.id));
        }

        let duplicate = tx
            .find_reservations(&ReservationQuery {
                user_id: Some(user_id),
                ..ReservationQuery::active_for_book(book_id)
            })
            .await?;
        if !duplicate.is_empty() {
            return Err(AppError::Conflict(format!(
                "User {} already has an active reservation for book {}",
                user_id, book_id
            )));
        }

        let now = self.clock.now();
        let reservation = tx.insert_reservation(user_id, book_id, now).await?;
        history::append(
            tx.as_mut(),
            NewHistoryEntry::new(HistoryAction::Reserved, book_id, user_id, now)
                .remarks(format!("reservation {}", reservation.id)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "User {} reserved book {} (reservation {})",
            user_id,
            book_id,
            reservation.id
        );
        Ok(reservation)
    }

    pub async fn cancel(&self, actor: &Actor, reservation_id: i64) -> AppResult<Reservation> {
        let mut tx = self.repository.begin().await?;
        let mut reservation = found(
            tx.lock_reservation(reservation_id).await?,
            "Reservation",
            reservation_id,
        )?;
        actor.require_self_or_staff(reservation.user_id)?;

        reservation.cancel()?;
        tx.update_reservation(&reservation).await?;

        history::append(
            tx.as_mut(),
            NewHistoryEntry::new(
                HistoryAction::ReservationCancelled,
                reservation.book_id,
                reservation.user_id,
                self.clock.now(),
            )
            .remarks(format!("reservation {}", reservation.id)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Reservation {} cancelled by user {}", reservation.id, actor.user_id);
        Ok(reservation)
    }

    /// Issue a free copy to the head of the queue. `None` when nobody waits.
    pub async fn promote_next(&self, actor: &Actor, book_id: i64) -> AppResult<Option<Promotion>> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let mut book = found(tx.lock_book(book_id).await?, "Book", book_id)?;
        let promotion = self.lending.promote_locked(tx.as_mut(), &mut book).await?;
        tx.commit().await?;

        if let Some(promotion) = &promotion {
            tracing::info!(
                "Reservation {} promoted to issue {} for user {}",
                promotion.reservation.id,
                promotion.issue.id,
                promotion.issue.user_id
            );
        }
        Ok(promotion)
    }

    pub async fn get(&self, actor: &Actor, reservation_id: i64) -> AppResult<Reservation> {
        let mut tx = self.repository.begin().await?;
        let reservation = found(
            tx.get_reservation(reservation_id).await?,
            "Reservation",
            reservation_id,
        )?;
        tx.commit().await?;

        actor.require_self_or_staff(reservation.user_id)?;
        Ok(reservation)
    }

    /// List reservations in queue order. Members only see their own.
    pub async fn list(&self, actor: &Actor, query: &ReservationQuery) -> AppResult<Vec<Reservation>> {
        let mut query = query.clone();
        if !actor.is_staff() {
            query.user_id = Some(actor.user_id);
        }

        let mut tx = self.repository.begin().await?;
        let mut reservations = tx.find_reservations(&query).await?;
        tx.commit().await?;

        reservations.sort_by_key(Reservation::queue_key);
        Ok(reservations)
    }
}
