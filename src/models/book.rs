//! Book model and copy accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Catalog entry with its copy counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub publisher: String,
    pub edition: String,
    pub category_id: i64,
    pub author_ids: Vec<i64>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently out on loan
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Take one copy off the shelf
    pub fn checkout_copy(&mut self) -> AppResult<()> {
        if self.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable(self.id));
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put one copy back on the shelf
    pub fn checkin_copy(&mut self) -> AppResult<()> {
        if self.available_copies >= self.total_copies {
            return Err(AppError::InvalidState(format!(
                "Book {} has no copy out on loan",
                self.id
            )));
        }
        self.available_copies += 1;
        Ok(())
    }

    /// Change the number of owned copies, keeping loans intact
    pub fn set_total_copies(&mut self, total: i32) -> AppResult<()> {
        if total < 0 {
            return Err(AppError::Validation("total_copies cannot be negative".to_string()));
        }
        let on_loan = self.copies_on_loan();
        if total < on_loan {
            return Err(AppError::InvalidState(format!(
                "Book {} has {} copies on loan, cannot reduce stock to {}",
                self.id, on_loan, total
            )));
        }
        self.total_copies = total;
        self.available_copies = total - on_loan;
        Ok(())
    }
}

/// Create book request
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10 to 13 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(max = 150, message = "Publisher is at most 150 characters"))]
    #[serde(default)]
    pub publisher: String,
    #[validate(length(max = 50, message = "Edition is at most 50 characters"))]
    #[serde(default)]
    pub edition: String,
    pub category_id: i64,
    #[serde(default)]
    pub author_ids: Vec<i64>,
    #[validate(range(min = 0, message = "total_copies cannot be negative"))]
    pub total_copies: i32,
}

/// Book query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Case-insensitive title substring
    pub title: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        self.category_id.map_or(true, |c| book.category_id == c)
            && self.author_id.map_or(true, |a| book.author_ids.contains(&a))
            && self.title.as_ref().map_or(true, |t| {
                book.title.to_lowercase().contains(&t.to_lowercase())
            })
            && self.available.map_or(true, |a| !a || book.available_copies > 0)
    }
}
