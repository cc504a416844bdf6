//! HTTP handlers for `/books`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde::Deserialize;

use super::models::{
    BookRequest, BooksResponse, CreatedResponse, DeletedResponse, RatingUpdate, UpdatedResponse,
};
use super::service::{BookCatalog, Page, SearchOrCreate};

/// Creates report `success: false` on the wire; existing clients depend on it.
const CREATE_SUCCESS_FLAG: bool = false;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

/// The requested page; an unreadable query string falls back to page 1.
fn requested_page(query: Result<Query<PageQuery>, QueryRejection>) -> Page {
    match query {
        Ok(Query(query)) => Page::from_query(query.page.as_deref()),
        Err(_) => Page::FIRST,
    }
}

/// Routes served by the books module.
pub fn router(catalog: BookCatalog) -> Router {
    Router::new()
        .route("/books", get(list_books).post(search_or_create_book))
        .route("/books/{id}", patch(update_book).delete(delete_book))
        .with_state(catalog)
}

async fn list_books(
    State(catalog): State<BookCatalog>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<BooksResponse>, AppError> {
    let shelf = catalog.list(requested_page(query)).await?;

    Ok(Json(BooksResponse {
        success: true,
        books: shelf.books,
        total_books: shelf.total,
    }))
}

async fn search_or_create_book(
    State(catalog): State<BookCatalog>,
    query: Result<Query<PageQuery>, QueryRejection>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body.map_err(|e| AppError::unprocessable(e.body_text()))?;

    let response = match catalog.search_or_create(request, requested_page(query)).await? {
        SearchOrCreate::Found(shelf) => Json(BooksResponse {
            success: true,
            books: shelf.books,
            total_books: shelf.total,
        })
        .into_response(),
        SearchOrCreate::Created { id, page } => Json(CreatedResponse {
            success: CREATE_SUCCESS_FLAG,
            created: id,
            books: page.books,
            total_books: page.total,
        })
        .into_response(),
    };

    Ok(response)
}

async fn update_book(
    State(catalog): State<BookCatalog>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<RatingUpdate>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Path(id) = id.map_err(|e| AppError::not_found(e.body_text()))?;
    let Json(update) = body.map_err(|e| AppError::bad_request(e.body_text()))?;

    catalog.update_rating(id, update).await?;

    Ok(Json(UpdatedResponse { success: true }))
}

async fn delete_book(
    State(catalog): State<BookCatalog>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let Path(id) = id.map_err(|e| AppError::not_found(e.body_text()))?;

    let deleted = catalog.delete(id, requested_page(query)).await?;

    Ok(Json(DeletedResponse {
        success: true,
        deleted: deleted.id,
        books: deleted.page.books,
        total_books: deleted.page.total,
    }))
}
