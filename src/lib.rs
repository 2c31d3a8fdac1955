//! Libris Library Lending Server
//!
//! REST JSON API around the book-lending lifecycle: catalog, loans,
//! reservation queues, overdue fines and the audit trail behind them.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub repository: Arc<dyn repository::Repository>,
    pub clock: Arc<dyn clock::Clock>,
}
