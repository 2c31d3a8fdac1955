//! Data models for Libris

pub mod author;
pub mod book;
pub mod category;
pub mod enums;
pub mod fine;
pub mod history;
pub mod issue;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use category::Category;
pub use enums::{HistoryAction, IssueStatus, ReservationStatus, Role};
pub use fine::Fine;
pub use history::IssueHistory;
pub use issue::Issue;
pub use reservation::Reservation;
pub use user::{Actor, User};
