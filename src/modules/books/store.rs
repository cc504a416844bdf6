//! Persistence for the `books` table.

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

use super::models::{Book, NewBook};

/// Errors raised by a [`BookStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("book {id} vanished before it could be written")]
    RowMissing { id: i64 },
}

/// A `LIMIT`/`OFFSET` pair over the id-ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

/// Datastore contract used by the catalog.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Books ordered by ascending id, restricted to `window`.
    async fn page(&self, window: Window) -> Result<Vec<Book>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Books whose title contains `term`, ignoring case, ordered by id.
    async fn search(&self, term: &str, window: Window) -> Result<Vec<Book>, StoreError>;

    async fn count_matching(&self, term: &str) -> Result<i64, StoreError>;

    async fn find(&self, id: i64) -> Result<Option<Book>, StoreError>;

    /// Insert a row and return its new id.
    async fn insert(&self, book: &NewBook) -> Result<i64, StoreError>;

    async fn update_rating(&self, id: i64, rating: i32) -> Result<(), StoreError>;

    /// Remove a row; `false` when nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// SQLite-backed [`BookStore`].
#[derive(Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Titled books whose title contains `term` under Unicode lowercasing,
    /// in id order. SQLite's `lower()` and `LIKE` only fold ASCII.
    async fn matching(&self, term: &str) -> Result<Vec<Book>, StoreError> {
        let needle = term.to_lowercase();

        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, rating FROM books WHERE title IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books
            .into_iter()
            .filter(|book| title_matches(book.title.as_deref(), &needle))
            .collect())
    }
}

fn title_matches(title: Option<&str>, needle: &str) -> bool {
    title.is_some_and(|title| title.to_lowercase().contains(needle))
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn page(&self, window: Window) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, rating FROM books ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn search(&self, term: &str, window: Window) -> Result<Vec<Book>, StoreError> {
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(0);

        Ok(self
            .matching(term)
            .await?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count_matching(&self, term: &str) -> Result<i64, StoreError> {
        let hits = self.matching(term).await?.len();
        Ok(i64::try_from(hits).unwrap_or(i64::MAX))
    }

    async fn find(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, rating FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn insert(&self, book: &NewBook) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO books (title, author, rating) VALUES (?, ?, ?)")
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.rating)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_rating(&self, id: i64, rating: i32) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE books SET rating = ? WHERE id = ?")
            .bind(rating)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowMissing { id });
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
