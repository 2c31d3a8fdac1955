//! Business logic services

pub mod catalog;
pub mod dashboard;
pub mod fines;
pub mod history;
pub mod lending;
pub mod reservations;
pub mod sweep;
pub mod users;

use std::sync::Arc;
use validator::Validate;

use crate::{
    clock::Clock,
    config::LendingConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub lending: lending::LendingService,
    pub reservations: reservations::ReservationsService,
    pub fines: fines::FinesService,
    pub history: history::HistoryService,
    pub dashboard: dashboard::DashboardService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>, config: LendingConfig) -> Self {
        let lending = lending::LendingService::new(repository.clone(), clock.clone(), config.clone());
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            users: users::UsersService::new(repository.clone(), clock.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                clock.clone(),
                lending.clone(),
            ),
            fines: fines::FinesService::new(repository.clone(), clock, config),
            history: history::HistoryService::new(repository.clone()),
            dashboard: dashboard::DashboardService::new(repository),
            lending,
        }
    }
}

/// Turn a missing row into `NotFound`
pub(crate) fn found<T>(value: Option<T>, what: &str, id: i64) -> AppResult<T> {
    value.ok_or_else(|| AppError::NotFound(format!("{} with id {} not found", what, id)))
}

/// Run derive-based request validation
pub(crate) fn validate<T: Validate>(request: &T) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}
