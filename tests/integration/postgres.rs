//! Same lifecycle against PostgreSQL
//!
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use libris_server::{
    clock::FixedClock,
    config::{DatabaseConfig, StorageBackend},
    models::{
        book::CreateBook,
        category::CreateCategory,
        enums::{IssueStatus, Role},
        user::Actor,
    },
    repository::PgRepository,
    services::Services,
    AppError,
};

use crate::common::{lending_config, user_request};

async fn connect() -> PgRepository {
    let config = DatabaseConfig {
        backend: StorageBackend::Postgres,
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        min_connections: 1,
    };
    let repository = PgRepository::connect(&config).await.unwrap();
    repository.migrate().await.unwrap();
    repository
}

#[tokio::test]
#[ignore]
async fn late_return_promotes_reservation_in_postgres() {
    let repository = Arc::new(connect().await);
    let clock = Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    let services = Services::new(repository.clone(), clock.clone(), lending_config());

    // Unique names so reruns against the same database do not collide
    let run = Utc::now().timestamp_micros().to_string();
    let bootstrap = Actor::new(0, Role::Admin);
    let desk = services
        .users
        .register(&bootstrap, &user_request(&format!("desk{}", run), Role::Librarian))
        .await
        .unwrap();
    let desk = Actor::new(desk.id, Role::Librarian);
    let a = services
        .users
        .register(&bootstrap, &user_request(&format!("a{}", run), Role::Member))
        .await
        .unwrap();
    let b = services
        .users
        .register(&bootstrap, &user_request(&format!("b{}", run), Role::Member))
        .await
        .unwrap();

    let category = services
        .catalog
        .create_category(
            &desk,
            &CreateCategory {
                name: format!("cat{}", run),
                description: None,
            },
        )
        .await
        .unwrap();
    let book = services
        .catalog
        .create_book(
            &desk,
            &CreateBook {
                isbn: run[run.len() - 13..].to_string(),
                title: "Postgres lifecycle".to_string(),
                category_id: category.id,
                total_copies: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let issue = services.lending.issue_book(&desk, a.id, book.id, None).await.unwrap();
    let err = services.lending.issue_book(&desk, b.id, book.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));
    services.reservations.reserve(&desk, b.id, book.id).await.unwrap();

    clock.set(Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap());
    let outcome = services.lending.return_book(&desk, issue.id).await.unwrap();
    assert_eq!(outcome.fine.unwrap().amount, rust_decimal_macros::dec!(10));

    let promotion = outcome.promotion.unwrap();
    assert_eq!(promotion.issue.user_id, b.id);
    assert_eq!(promotion.issue.status, IssueStatus::Issued);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 0);
}
