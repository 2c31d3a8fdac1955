//! Fine model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Monetary penalty tied 1:1 to an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i64,
    pub issue_id: i64,
    pub amount: Decimal,
    pub is_paid: bool,
    pub paid_date: Option<NaiveDate>,
}

/// Fine query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct FineQuery {
    /// Borrower of the fined issue
    pub user_id: Option<i64>,
    pub is_paid: Option<bool>,
}
