//! Shared fixtures: services over the in-memory store with a manual clock

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use libris_server::{
    clock::FixedClock,
    config::{AppConfig, LendingConfig},
    models::{
        book::{Book, CreateBook},
        category::CreateCategory,
        enums::Role,
        user::{Actor, CreateUser, User},
    },
    repository::MemoryRepository,
    services::Services,
    AppState,
};

pub const SECRET: &str = "integration-secret";

pub struct Library {
    pub services: Services,
    pub clock: Arc<FixedClock>,
    pub repository: Arc<MemoryRepository>,
    pub admin: Actor,
    pub librarian: Actor,
    category_id: i64,
    next_isbn: u64,
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn lending_config() -> LendingConfig {
    LendingConfig {
        loan_period_days: 14,
        renewal_days: 14,
        max_renewals: 2,
        fine_per_day: dec!(2),
        sweep_interval_secs: 0,
    }
}

impl Library {
    /// Empty library on 2024-01-01 with one admin and one librarian
    pub async fn open() -> Self {
        let repository = Arc::new(MemoryRepository::new());
        let clock = Arc::new(FixedClock::at_date(day(1)));
        let services = Services::new(repository.clone(), clock.clone(), lending_config());

        // Registration needs an admin; the very first one comes from the token issuer
        let bootstrap = Actor::new(0, Role::Admin);
        let admin = services
            .users
            .register(&bootstrap, &user_request("admin", Role::Admin))
            .await
            .unwrap();
        let librarian = services
            .users
            .register(&bootstrap, &user_request("desk", Role::Librarian))
            .await
            .unwrap();
        let librarian = Actor::new(librarian.id, Role::Librarian);

        let category = services
            .catalog
            .create_category(
                &librarian,
                &CreateCategory {
                    name: "General".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        Self {
            services,
            clock,
            repository,
            admin: Actor::new(admin.id, Role::Admin),
            librarian,
            category_id: category.id,
            next_isbn: 9_780_000_000_000,
        }
    }

    pub async fn member(&self, username: &str) -> (User, Actor) {
        let user = self
            .services
            .users
            .register(&self.admin, &user_request(username, Role::Member))
            .await
            .unwrap();
        let actor = Actor::new(user.id, Role::Member);
        (user, actor)
    }

    pub async fn book(&mut self, title: &str, copies: i32) -> Book {
        self.next_isbn += 1;
        self.services
            .catalog
            .create_book(
                &self.librarian,
                &CreateBook {
                    isbn: self.next_isbn.to_string(),
                    title: title.to_string(),
                    category_id: self.category_id,
                    total_copies: copies,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn reload(&self, book: &Book) -> Book {
        self.services.catalog.get_book(book.id).await.unwrap()
    }

    pub fn state(&self) -> AppState {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.lending = lending_config();
        AppState {
            config: Arc::new(config),
            services: Arc::new(self.services.clone()),
            repository: self.repository.clone(),
            clock: self.clock.clone(),
        }
    }
}

pub fn user_request(username: &str, role: Role) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        first_name: username.to_string(),
        role,
        ..Default::default()
    }
}
