//! Request-to-query mapping and pagination for the book catalog.

use std::sync::Arc;

use bookshelf_http::error::AppError;
use bookshelf_kernel::settings::CatalogSettings;
use sqlx::SqlitePool;

use super::models::{Book, BookRequest, NewBook, RatingUpdate};
use super::store::{BookStore, SqliteBookStore, StoreError, Window};

/// A 1-indexed page number as requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

impl Page {
    pub const FIRST: Page = Page(1);

    pub fn new(number: i64) -> Self {
        Self(number)
    }

    /// Parse the `page` query parameter; absent or non-numeric means page 1.
    /// Integers too large for `i64` saturate so they still land past the last page.
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::FIRST;
        };

        if let Ok(number) = value.parse() {
            return Page(number);
        }

        let (negative, digits) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::FIRST;
        }

        if negative {
            Page(i64::MIN)
        } else {
            Page(i64::MAX)
        }
    }

    pub fn number(&self) -> i64 {
        self.0
    }

    /// The rows this page covers, or `None` when it cannot hold any.
    pub fn window(&self, page_size: u32) -> Option<Window> {
        if self.0 < 1 {
            return None;
        }
        let limit = i64::from(page_size);
        let offset = (self.0 - 1).checked_mul(limit)?;
        Some(Window { limit, offset })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::FIRST
    }
}

/// One page of books plus the size of the collection it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
}

/// What `search_or_create` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOrCreate {
    Found(BookPage),
    Created { id: i64, page: BookPage },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub id: i64,
    pub page: BookPage,
}

/// The book catalog service. Cheap to clone; clones share one store.
#[derive(Clone)]
pub struct BookCatalog {
    store: Arc<dyn BookStore>,
    page_size: u32,
}

impl BookCatalog {
    pub fn new(store: Arc<dyn BookStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Catalog over the SQLite `books` table.
    pub fn from_pool(pool: SqlitePool, settings: &CatalogSettings) -> Self {
        Self::new(Arc::new(SqliteBookStore::new(pool)), settings.page_size)
    }

    /// A page of all books by ascending id. Empty pages are `NotFound`.
    pub async fn list(&self, page: Page) -> Result<BookPage, AppError> {
        tracing::debug!(page = page.number(), "listing books");

        let shelf = self
            .all_books(page)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("listing failed: {e}")))?;

        if shelf.books.is_empty() {
            return Err(AppError::not_found(format!(
                "page {} holds no books",
                page.number()
            )));
        }

        Ok(shelf)
    }

    /// Search titles when the request carries a search term, insert otherwise.
    pub async fn search_or_create(
        &self,
        request: BookRequest,
        page: Page,
    ) -> Result<SearchOrCreate, AppError> {
        if let Some(term) = request.search_term() {
            return self.search(term, page).await.map(SearchOrCreate::Found);
        }

        let (id, page) = self.create(request.into_new_book(), page).await?;
        Ok(SearchOrCreate::Created { id, page })
    }

    /// Case-insensitive title search. An empty result page is not an error.
    pub async fn search(&self, term: &str, page: Page) -> Result<BookPage, AppError> {
        tracing::debug!(term, page = page.number(), "searching books");

        let books = match page.window(self.page_size) {
            Some(window) => self.store.search(term, window).await,
            None => Ok(Vec::new()),
        };
        let unprocessable = |e: StoreError| AppError::unprocessable(format!("search failed: {e}"));

        Ok(BookPage {
            books: books.map_err(unprocessable)?,
            total: self
                .store
                .count_matching(term)
                .await
                .map_err(unprocessable)?,
        })
    }

    /// Insert a book and return its id with the requested page afterwards.
    pub async fn create(&self, book: NewBook, page: Page) -> Result<(i64, BookPage), AppError> {
        let unprocessable = |e: StoreError| AppError::unprocessable(format!("create failed: {e}"));

        let id = self.store.insert(&book).await.map_err(unprocessable)?;
        tracing::info!(book_id = id, "book created");

        let shelf = self.all_books(page).await.map_err(unprocessable)?;
        Ok((id, shelf))
    }

    /// Set a book's rating. A missing book is a `BadRequest`, as is any
    /// rating that does not coerce to an integer.
    pub async fn update_rating(&self, id: i64, update: RatingUpdate) -> Result<(), AppError> {
        let bad_request = |e: StoreError| AppError::bad_request(format!("update failed: {e}"));

        if self.store.find(id).await.map_err(bad_request)?.is_none() {
            return Err(AppError::bad_request(format!("book {id} does not exist")));
        }

        let rating = update
            .rating()
            .map_err(|e| AppError::bad_request(e.to_string()))?;

        if let Some(rating) = rating {
            self.store
                .update_rating(id, rating)
                .await
                .map_err(bad_request)?;
            tracing::info!(book_id = id, rating, "book rating updated");
        }

        Ok(())
    }

    /// Delete a book and return the requested page of what remains.
    /// A missing book is a `BadRequest`.
    pub async fn delete(&self, id: i64, page: Page) -> Result<Deleted, AppError> {
        let bad_request = |e: StoreError| AppError::bad_request(format!("delete failed: {e}"));

        if self.store.find(id).await.map_err(bad_request)?.is_none() {
            return Err(AppError::bad_request(format!("book {id} does not exist")));
        }

        if !self.store.delete(id).await.map_err(bad_request)? {
            return Err(AppError::bad_request(format!("book {id} was already gone")));
        }
        tracing::info!(book_id = id, "book deleted");

        let shelf = self.all_books(page).await.map_err(bad_request)?;
        Ok(Deleted { id, page: shelf })
    }

    async fn all_books(&self, page: Page) -> Result<BookPage, StoreError> {
        let books = match page.window(self.page_size) {
            Some(window) => self.store.page(window).await?,
            None => Vec::new(),
        };

        Ok(BookPage {
            books,
            total: self.store.count().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::BOOKS_SCHEMA;
    use bookshelf_kernel::settings::DatabaseSettings;
    use serde_json::json;

    async fn catalog() -> BookCatalog {
        let pool = bookshelf_db::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        sqlx::raw_sql(BOOKS_SCHEMA).execute(&pool).await.unwrap();
        BookCatalog::from_pool(pool, &CatalogSettings::default())
    }

    async fn seed(catalog: &BookCatalog, titles: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        for title in titles {
            let book = NewBook {
                title: Some(title.to_string()),
                author: Some("Anonymous".to_string()),
                rating: Some(3),
            };
            let (id, _) = catalog.create(book, Page::FIRST).await.unwrap();
            ids.push(id);
        }
        ids
    }

    fn rating(value: serde_json::Value) -> RatingUpdate {
        serde_json::from_value(json!({ "rating": value })).unwrap()
    }

    #[test]
    fn page_from_query_defaults_to_first() {
        assert_eq!(Page::from_query(None), Page::FIRST);
        assert_eq!(Page::from_query(Some("abc")), Page::FIRST);
        assert_eq!(Page::from_query(Some("3")), Page::new(3));
        assert_eq!(Page::from_query(Some("-2")), Page::new(-2));
        assert_eq!(Page::from_query(Some("+")), Page::FIRST);
        assert_eq!(Page::from_query(Some("12abc")), Page::FIRST);
    }

    #[test]
    fn oversized_page_numbers_saturate() {
        let huge = Page::from_query(Some("99999999999999999999"));
        assert_eq!(huge, Page::new(i64::MAX));
        assert_eq!(huge.window(8), None);

        assert_eq!(
            Page::from_query(Some("-99999999999999999999")),
            Page::new(i64::MIN)
        );
    }

    #[test]
    fn page_window_math() {
        assert_eq!(
            Page::new(3).window(8),
            Some(Window {
                limit: 8,
                offset: 16
            })
        );
        assert_eq!(Page::new(0).window(8), None);
        assert_eq!(Page::new(i64::MAX).window(8), None);
    }

    #[tokio::test]
    async fn list_pages_are_bounded_and_ordered() {
        let catalog = catalog().await;
        let titles: Vec<String> = (1..=11).map(|i| format!("Book {i}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        seed(&catalog, &refs).await;

        let first = catalog.list(Page::FIRST).await.unwrap();
        assert_eq!(first.books.len(), 8);
        assert_eq!(first.total, 11);
        assert!(first.books.windows(2).all(|w| w[0].id < w[1].id));

        let second = catalog.list(Page::new(2)).await.unwrap();
        assert_eq!(second.books.len(), 3);
        assert!(second.books[0].id > first.books[7].id);
    }

    #[tokio::test]
    async fn list_past_the_last_page_is_not_found() {
        let catalog = catalog().await;
        seed(&catalog, &["Only one"]).await;

        for page in [Page::new(2), Page::new(123456), Page::new(0)] {
            let err = catalog.list(page).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn list_of_empty_catalog_is_not_found() {
        let err = catalog().await.list(Page::FIRST).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let catalog = catalog().await;
        let request: BookRequest = serde_json::from_value(json!({
            "title": "O'tgan kunlar",
            "author": "Abdulla Qodiriy",
            "rating": 5
        }))
        .unwrap();

        let SearchOrCreate::Created { id, page } = catalog
            .search_or_create(request, Page::FIRST)
            .await
            .unwrap()
        else {
            panic!("expected a create");
        };
        assert_eq!(page.total, 1);

        let listed = catalog.list(Page::FIRST).await.unwrap();
        assert_eq!(
            listed.books,
            vec![Book {
                id,
                title: Some("O'tgan kunlar".to_string()),
                author: Some("Abdulla Qodiriy".to_string()),
                rating: Some(5),
            }]
        );
    }

    #[tokio::test]
    async fn search_only_returns_matching_titles() {
        let catalog = catalog().await;
        seed(&catalog, &["The Novel", "a novel idea", "Poems", "Essays"]).await;

        let request: BookRequest = serde_json::from_value(json!({"search": "Novel"})).unwrap();
        let SearchOrCreate::Found(found) = catalog
            .search_or_create(request, Page::FIRST)
            .await
            .unwrap()
        else {
            panic!("expected a search");
        };

        assert_eq!(found.total, 2);
        assert!(found.books.iter().all(|book| book
            .title
            .as_deref()
            .unwrap()
            .to_lowercase()
            .contains("novel")));
    }

    #[tokio::test]
    async fn search_without_hits_is_empty_not_an_error() {
        let catalog = catalog().await;
        seed(&catalog, &["Poems"]).await;

        let found = catalog.search("Novel", Page::FIRST).await.unwrap();
        assert!(found.books.is_empty());
        assert_eq!(found.total, 0);
    }

    #[tokio::test]
    async fn update_rating_persists() {
        let catalog = catalog().await;
        let ids = seed(&catalog, &["Rated"]).await;

        catalog.update_rating(ids[0], rating(json!(1))).await.unwrap();

        let listed = catalog.list(Page::FIRST).await.unwrap();
        assert_eq!(listed.books[0].rating, Some(1));
    }

    #[tokio::test]
    async fn update_without_rating_changes_nothing() {
        let catalog = catalog().await;
        let ids = seed(&catalog, &["Untouched"]).await;

        catalog
            .update_rating(ids[0], RatingUpdate::default())
            .await
            .unwrap();

        let listed = catalog.list(Page::FIRST).await.unwrap();
        assert_eq!(listed.books[0].rating, Some(3));
    }

    #[tokio::test]
    async fn update_of_missing_book_is_bad_request() {
        let catalog = catalog().await;
        let err = catalog
            .update_rating(123456, rating(json!(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn update_with_uncoercible_rating_is_bad_request() {
        let catalog = catalog().await;
        let ids = seed(&catalog, &["Rated"]).await;

        let err = catalog
            .update_rating(ids[0], rating(json!("excellent")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn delete_removes_row_and_reports_id() {
        let catalog = catalog().await;
        let ids = seed(&catalog, &["Keep", "Drop"]).await;

        let deleted = catalog.delete(ids[1], Page::FIRST).await.unwrap();
        assert_eq!(deleted.id, ids[1]);
        assert_eq!(deleted.page.total, 1);
        assert!(deleted.page.books.iter().all(|book| book.id != ids[1]));

        let err = catalog.delete(ids[1], Page::FIRST).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn delete_of_missing_book_is_bad_request() {
        let err = catalog()
            .await
            .delete(123456, Page::FIRST)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn list_reports_store_failure_as_internal() {
        let pool = bookshelf_db::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        sqlx::raw_sql(BOOKS_SCHEMA).execute(&pool).await.unwrap();
        let catalog = BookCatalog::from_pool(pool.clone(), &CatalogSettings::default());
        pool.close().await;

        let err = catalog.list(Page::FIRST).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let err = catalog.search("any", Page::FIRST).await.unwrap_err();
        assert!(matches!(err, AppError::Unprocessable { .. }));
    }

    #[tokio::test]
    async fn page_size_is_configurable() {
        let pool = bookshelf_db::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        sqlx::raw_sql(BOOKS_SCHEMA).execute(&pool).await.unwrap();
        let catalog = BookCatalog::from_pool(pool, &CatalogSettings { page_size: 2 });
        seed(&catalog, &["a", "b", "c"]).await;

        assert_eq!(catalog.list(Page::FIRST).await.unwrap().books.len(), 2);
        assert_eq!(catalog.list(Page::new(2)).await.unwrap().books.len(), 1);
    }
}
