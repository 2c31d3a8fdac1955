//! Catalog management service

use std::sync::Arc;

use super::{found, validate};
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookQuery, CreateBook},
        category::{Category, CreateCategory},
        user::Actor,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn create_category(&self, actor: &Actor, category: &CreateCategory) -> AppResult<Category> {
        actor.require_staff()?;
        validate(category)?;

        let mut tx = self.repository.begin().await?;
        if tx.find_category_by_name(&category.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }
        let created = tx.insert_category(category).await?;
        tx.commit().await?;

        tracing::info!("Category {} '{}' created", created.id, created.name);
        Ok(created)
    }

    pub async fn create_author(&self, actor: &Actor, author: &CreateAuthor) -> AppResult<Author> {
        actor.require_staff()?;
        validate(author)?;

        let mut tx = self.repository.begin().await?;
        let created = tx.insert_author(author).await?;
        tx.commit().await?;

        tracing::info!("Author {} '{}' created", created.id, created.name);
        Ok(created)
    }

    /// Add a book to the catalog with all its copies on the shelf
    pub async fn create_book(&self, actor: &Actor, book: &CreateBook) -> AppResult<Book> {
        actor.require_staff()?;
        validate(book)?;

        let mut tx = self.repository.begin().await?;
        if tx.find_book_by_isbn(&book.isbn).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                book.isbn
            )));
        }
        found(tx.get_category(book.category_id).await?, "Category", book.category_id)?;
        for author_id in &book.author_ids {
            found(tx.get_author(*author_id).await?, "Author", *author_id)?;
        }

        let created = tx.insert_book(book, self.clock.now()).await?;
        tx.commit().await?;

        tracing::info!(
            "Book {} '{}' created with {} copies",
            created.id,
            created.title,
            created.total_copies
        );
        Ok(created)
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        let mut tx = self.repository.begin().await?;
        let book = found(tx.get_book(id).await?, "Book", id)?;
        tx.commit().await?;
        Ok(book)
    }

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut tx = self.repository.begin().await?;
        let books = tx.list_books(query).await?;
        tx.commit().await?;
        Ok(books)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut tx = self.repository.begin().await?;
        let categories = tx.list_categories().await?;
        tx.commit().await?;
        Ok(categories)
    }

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let mut tx = self.repository.begin().await?;
        let authors = tx.list_authors().await?;
        tx.commit().await?;
        Ok(authors)
    }
}
