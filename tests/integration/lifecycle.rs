//! Lending lifecycle scenarios against the in-memory store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use libris_server::{
    models::{
        enums::{HistoryAction, IssueStatus, ReservationStatus},
        history::HistoryQuery,
        issue::IssueQuery,
    },
    AppError,
};

use crate::common::{day, Library};

fn go_to(lib: &Library, date: NaiveDate) {
    lib.clock.set(date.and_hms_opt(10, 0, 0).unwrap().and_utc());
}

#[tokio::test]
async fn late_return_fines_and_hands_copy_to_waiting_reader() {
    let mut lib = Library::open().await;
    let book = lib.book("The Left Hand of Darkness", 1).await;
    let (a, _) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    assert_eq!(issue.due_date, day(15));
    assert_eq!(lib.reload(&book).await.available_copies, 0);

    let err = lib
        .services
        .lending
        .issue_book(&lib.librarian, b.id, book.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));

    let reservation = lib
        .services
        .reservations
        .reserve(&b_actor, b.id, book.id)
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Active);

    go_to(&lib, day(20));
    let outcome = lib
        .services
        .lending
        .return_book(&lib.librarian, issue.id)
        .await
        .unwrap();

    assert_eq!(outcome.issue.status, IssueStatus::Returned);
    assert_eq!(outcome.issue.return_date, Some(day(20)));
    assert_eq!(outcome.fine.unwrap().amount, dec!(10));

    let promotion = outcome.promotion.unwrap();
    assert_eq!(promotion.reservation.id, reservation.id);
    assert_eq!(promotion.reservation.status, ReservationStatus::Completed);
    assert_eq!(promotion.issue.user_id, b.id);
    assert_eq!(promotion.issue.status, IssueStatus::Issued);
    assert_eq!(promotion.issue.issue_date, day(20));

    let reloaded = lib.reload(&book).await;
    assert_eq!(reloaded.available_copies, 0);
    assert_eq!(reloaded.total_copies, 1);

    let b_issues = lib
        .services
        .lending
        .list_issues(&b_actor, &IssueQuery::default())
        .await
        .unwrap();
    assert_eq!(b_issues.len(), 1);
}

#[tokio::test]
async fn issuing_with_no_copy_creates_nothing() {
    let mut lib = Library::open().await;
    let book = lib.book("Out of print", 0).await;
    let (a, _) = lib.member("alice").await;

    let err = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));

    let issues = lib
        .services
        .lending
        .list_issues(&lib.librarian, &IssueQuery::default())
        .await
        .unwrap();
    assert!(issues.is_empty());

    let history = lib
        .services
        .history
        .query(&lib.librarian, &HistoryQuery::default())
        .await
        .unwrap();
    assert!(history.is_empty());
    assert_eq!(lib.reload(&book).await.available_copies, 0);
}

#[tokio::test]
async fn second_return_is_rejected_without_extra_copy() {
    let mut lib = Library::open().await;
    let book = lib.book("Solaris", 2).await;
    let (a, _) = lib.member("alice").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    lib.services
        .lending
        .return_book(&lib.librarian, issue.id)
        .await
        .unwrap();
    assert_eq!(lib.reload(&book).await.available_copies, 2);

    let err = lib
        .services
        .lending
        .return_book(&lib.librarian, issue.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyReturned(_)));
    assert_eq!(lib.reload(&book).await.available_copies, 2);

    let returns = lib
        .services
        .history
        .query(
            &lib.librarian,
            &HistoryQuery {
                action: Some(HistoryAction::Returned),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(returns.len(), 1);
}

#[tokio::test]
async fn copies_stay_within_bounds() {
    let mut lib = Library::open().await;
    let book = lib.book("Hyperion", 3).await;
    let (a, _) = lib.member("alice").await;

    let mut open = Vec::new();
    // issue x5 (two fail), return x2, issue x3 (one fails), return all
    let script = [true, true, true, true, true, false, false, true, true, true];
    for step in script {
        if step {
            match lib
                .services
                .lending
                .issue_book(&lib.librarian, a.id, book.id, None)
                .await
            {
                Ok(issue) => open.push(issue.id),
                Err(e) => assert!(matches!(e, AppError::NoCopiesAvailable(_))),
            }
        } else if let Some(id) = open.pop() {
            lib.services.lending.return_book(&lib.librarian, id).await.unwrap();
        }

        let current = lib.reload(&book).await;
        assert!(current.available_copies >= 0);
        assert!(current.available_copies <= current.total_copies);
        assert_eq!(current.copies_on_loan() as usize, open.len());
    }

    for id in open.drain(..) {
        lib.services.lending.return_book(&lib.librarian, id).await.unwrap();
    }
    assert_eq!(lib.reload(&book).await.available_copies, 3);
}

#[tokio::test]
async fn concurrent_issues_never_overdraw() {
    let mut lib = Library::open().await;
    let book = lib.book("Foundation", 3).await;
    let (a, _) = lib.member("alice").await;

    let (user_id, book_id) = (a.id, book.id);
    let mut handles = Vec::new();
    for _ in 0..10 {
        let lending = lib.services.lending.clone();
        let librarian = lib.librarian;
        handles.push(tokio::spawn(async move {
            lending.issue_book(&librarian, user_id, book_id, None).await
        }));
    }

    let mut issued = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            issued += 1;
        }
    }

    assert_eq!(issued, 3);
    assert_eq!(lib.reload(&book).await.available_copies, 0);
}

#[tokio::test]
async fn promotion_follows_reservation_order() {
    let mut lib = Library::open().await;
    let book = lib.book("Neuromancer", 1).await;
    let (holder, _) = lib.member("holder").await;
    let (first, first_actor) = lib.member("first").await;
    let (second, second_actor) = lib.member("second").await;
    let (third, third_actor) = lib.member("third").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, holder.id, book.id, None)
        .await
        .unwrap();

    let r1 = lib.services.reservations.reserve(&first_actor, first.id, book.id).await.unwrap();
    lib.clock.advance_days(1);
    let r2 = lib.services.reservations.reserve(&second_actor, second.id, book.id).await.unwrap();
    lib.clock.advance_days(1);
    lib.services.reservations.reserve(&third_actor, third.id, book.id).await.unwrap();

    let pendings = lib.services.dashboard.pendings(&lib.librarian).await.unwrap();
    let queue: Vec<i64> = pendings.iter().map(|r| r.user_id).collect();
    assert_eq!(queue, vec![first.id, second.id, third.id]);

    let outcome = lib.services.lending.return_book(&lib.librarian, issue.id).await.unwrap();
    let promotion = outcome.promotion.unwrap();
    assert_eq!(promotion.reservation.id, r1.id);
    assert_eq!(promotion.issue.user_id, first.id);

    // second gives up; the next copy goes to third
    lib.services.reservations.cancel(&second_actor, r2.id).await.unwrap();
    let outcome = lib
        .services
        .lending
        .return_book(&first_actor, promotion.issue.id)
        .await
        .unwrap();
    assert_eq!(outcome.promotion.unwrap().issue.user_id, third.id);

    let completed = lib
        .services
        .reservations
        .list(&lib.librarian, &Default::default())
        .await
        .unwrap();
    let statuses: Vec<ReservationStatus> = completed.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ReservationStatus::Completed,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed
        ]
    );

    let third_issues = lib
        .services
        .lending
        .list_issues(
            &lib.librarian,
            &IssueQuery {
                user_id: Some(third.id),
                book_id: Some(book.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(third_issues.len(), 1);
}

#[tokio::test]
async fn promote_next_without_free_copy_fails() {
    let mut lib = Library::open().await;
    let book = lib.book("Ubik", 1).await;
    let (a, _) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;

    let empty = lib.services.reservations.promote_next(&lib.librarian, book.id).await.unwrap();
    assert!(empty.is_none());

    lib.services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap();

    let err = lib
        .services
        .reservations
        .promote_next(&lib.librarian, book.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));

    let waiting = lib.services.dashboard.pendings(&lib.librarian).await.unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].status, ReservationStatus::Active);
}

#[tokio::test]
async fn reservations_are_only_for_empty_shelves() {
    let mut lib = Library::open().await;
    let book = lib.book("Kindred", 1).await;
    let (a, _) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;

    let err = lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::CopiesAvailable(_)));

    lib.services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    let reservation = lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap();

    let err = lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    lib.services.reservations.cancel(&b_actor, reservation.id).await.unwrap();
    let err = lib.services.reservations.cancel(&b_actor, reservation.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn reservations_block_renewal() {
    let mut lib = Library::open().await;
    let book = lib.book("Dhalgren", 1).await;
    let (a, a_actor) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    let renewed = lib.services.lending.renew(&a_actor, issue.id, None).await.unwrap();
    assert_eq!(renewed.due_date, day(29));

    let reservation = lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap();
    let err = lib.services.lending.renew(&a_actor, issue.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::RenewalNotAllowed(_)));

    lib.services.reservations.cancel(&b_actor, reservation.id).await.unwrap();
    let renewed = lib.services.lending.renew(&a_actor, issue.id, Some(3)).await.unwrap();
    assert_eq!(renewed.due_date, day(1) + chrono::Duration::days(31));
    assert_eq!(renewed.renewals, 2);
}

#[tokio::test]
async fn overdue_issues_cannot_be_renewed() {
    let mut lib = Library::open().await;
    let book = lib.book("Blindsight", 1).await;
    let (a, a_actor) = lib.member("alice").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();

    go_to(&lib, day(16));
    let err = lib.services.lending.renew(&a_actor, issue.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::RenewalNotAllowed(_)));

    lib.services.lending.mark_overdue_sweep(&lib.librarian, day(16)).await.unwrap();
    let err = lib.services.lending.renew(&a_actor, issue.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::RenewalNotAllowed(_)));
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let mut lib = Library::open().await;
    let book = lib.book("Anathem", 2).await;
    let (a, _) = lib.member("alice").await;

    let stale = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    go_to(&lib, day(10));
    let fresh = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();

    let first = lib.services.lending.mark_overdue_sweep(&lib.librarian, day(16)).await.unwrap();
    let second = lib.services.lending.mark_overdue_sweep(&lib.librarian, day(16)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, stale.id);
    assert!(second.is_empty());

    let overdue = lib
        .services
        .history
        .query(
            &lib.librarian,
            &HistoryQuery {
                action: Some(HistoryAction::Overdue),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].issue_id, Some(stale.id));

    let fresh = lib.services.lending.get_issue(&lib.librarian, fresh.id).await.unwrap();
    assert_eq!(fresh.status, IssueStatus::Issued);
    // the sweep never moves copies
    assert_eq!(lib.reload(&book).await.available_copies, 0);
}

#[tokio::test]
async fn fine_is_paid_once_after_return() {
    let mut lib = Library::open().await;
    let book = lib.book("Gideon the Ninth", 1).await;
    let (a, a_actor) = lib.member("alice").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();

    go_to(&lib, day(18));
    let lazy = lib
        .services
        .fines
        .fine_for_issue(&a_actor, issue.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lazy.amount, dec!(6));
    let stale = lib.services.lending.get_issue(&lib.librarian, issue.id).await.unwrap();
    assert_eq!(stale.status, IssueStatus::Overdue);

    let err = lib.services.fines.pay_fine(&lib.librarian, lazy.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    go_to(&lib, day(19));
    let refreshed = lib
        .services
        .fines
        .fine_for_issue(&a_actor, issue.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.id, lazy.id);
    assert_eq!(refreshed.amount, dec!(8));

    go_to(&lib, day(20));
    let outcome = lib.services.lending.return_book(&a_actor, issue.id).await.unwrap();
    let fine = outcome.fine.unwrap();
    assert_eq!(fine.id, lazy.id);
    assert_eq!(fine.amount, dec!(10));

    let err = lib.services.fines.pay_fine(&a_actor, fine.id).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let paid = lib.services.fines.pay_fine(&lib.librarian, fine.id).await.unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.paid_date, Some(day(20)));

    let err = lib.services.fines.pay_fine(&lib.librarian, fine.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyPaid(_)));

    // a paid fine is final
    go_to(&lib, day(25));
    let later = lib
        .services
        .fines
        .fine_for_issue(&a_actor, issue.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.amount, dec!(10));

    let trail: Vec<HistoryAction> = lib
        .services
        .history
        .query(
            &a_actor,
            &HistoryQuery {
                issue_id: Some(issue.id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        trail,
        vec![
            HistoryAction::Issued,
            HistoryAction::Overdue,
            HistoryAction::Returned,
            HistoryAction::FinePaid
        ]
    );
}

#[tokio::test]
async fn on_time_return_owes_nothing() {
    let mut lib = Library::open().await;
    let book = lib.book("Piranesi", 1).await;
    let (a, a_actor) = lib.member("alice").await;

    let issue = lib
        .services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, Some(7))
        .await
        .unwrap();
    assert_eq!(issue.due_date, day(8));

    go_to(&lib, day(8));
    let outcome = lib.services.lending.return_book(&a_actor, issue.id).await.unwrap();
    assert!(outcome.fine.is_none());
    assert!(outcome.promotion.is_none());

    let fines = lib
        .services
        .fines
        .list_fines(&a_actor, &Default::default())
        .await
        .unwrap();
    assert!(fines.is_empty());
}

#[tokio::test]
async fn restock_serves_the_queue() {
    let mut lib = Library::open().await;
    let book = lib.book("The Dispossessed", 1).await;
    let (a, _) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;
    let (c, c_actor) = lib.member("carol").await;

    lib.services
        .lending
        .issue_book(&lib.librarian, a.id, book.id, None)
        .await
        .unwrap();
    lib.services.reservations.reserve(&b_actor, b.id, book.id).await.unwrap();
    lib.services.reservations.reserve(&c_actor, c.id, book.id).await.unwrap();

    let outcome = lib.services.lending.restock(&lib.librarian, book.id, 4).await.unwrap();
    let served: Vec<i64> = outcome.promotions.iter().map(|p| p.issue.user_id).collect();
    assert_eq!(served, vec![b.id, c.id]);
    assert_eq!(outcome.book.total_copies, 4);
    assert_eq!(outcome.book.available_copies, 1);

    let stats = lib.services.dashboard.stats(&lib.librarian).await.unwrap();
    assert_eq!(stats.open_issues, 3);
    assert_eq!(stats.active_reservations, 0);
    assert_eq!(stats.unpaid_fines, Decimal::ZERO);
}

#[tokio::test]
async fn members_see_only_their_bookings() {
    let mut lib = Library::open().await;
    let book = lib.book("Lud-in-the-Mist", 1).await;
    let other = lib.book("Little, Big", 1).await;
    let (a, a_actor) = lib.member("alice").await;
    let (b, b_actor) = lib.member("bob").await;

    lib.services
        .lending
        .issue_book(&a_actor, a.id, book.id, None)
        .await
        .unwrap();
    lib.services
        .lending
        .issue_book(&b_actor, b.id, other.id, None)
        .await
        .unwrap();
    lib.services.reservations.reserve(&a_actor, a.id, other.id).await.unwrap();

    let err = lib
        .services
        .lending
        .issue_book(&a_actor, b.id, book.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let mine = lib.services.dashboard.my_bookings(&a_actor).await.unwrap();
    assert_eq!(mine.issues.len(), 1);
    assert_eq!(mine.issues[0].book_id, book.id);
    assert_eq!(mine.reservations.len(), 1);
    assert_eq!(mine.reservations[0].book_id, other.id);

    let visible = lib
        .services
        .lending
        .list_issues(&a_actor, &IssueQuery::default())
        .await
        .unwrap();
    assert!(visible.iter().all(|i| i.user_id == a.id));

    assert!(lib.services.dashboard.approved(&a_actor).await.is_err());
    assert_eq!(lib.services.dashboard.approved(&lib.librarian).await.unwrap().len(), 2);
}
