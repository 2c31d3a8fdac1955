//! User registry
//!
//! Authentication happens upstream; this only keeps the accounts that loans
//! and reservations refer to.

use std::sync::Arc;

use super::{found, validate};
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::user::{Actor, CreateUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl UsersService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Create an account. Admin only.
    pub async fn register(&self, actor: &Actor, user: &CreateUser) -> AppResult<User> {
        actor.require_admin()?;
        validate(user)?;

        let mut tx = self.repository.begin().await?;
        if tx.find_user_by_username(&user.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        let created = tx.insert_user(user, self.clock.now()).await?;
        tx.commit().await?;

        tracing::info!("User {} '{}' registered as {}", created.id, created.username, created.role);
        Ok(created)
    }

    pub async fn get(&self, actor: &Actor, id: i64) -> AppResult<User> {
        actor.require_self_or_staff(id)?;

        let mut tx = self.repository.begin().await?;
        let user = found(tx.get_user(id).await?, "User", id)?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<User>> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;
        let users = tx.list_users().await?;
        tx.commit().await?;
        Ok(users)
    }
}
