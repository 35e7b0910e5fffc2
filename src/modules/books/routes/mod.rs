//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bookshelf_http::AppError;
use serde_json::Value;

use super::models::{Book, BookFields, BookPatch};
use super::repository::BookRepository;

pub type SharedRepository = Arc<dyn BookRepository>;

/// Routes for the books resource, relative to the module mount point.
pub fn router(repository: SharedRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(show_book)
                .put(update_book)
                .patch(patch_book)
                .delete(delete_book),
        )
        .with_state(repository)
}

/// Book id taken from the path. Ids that are not integers cannot name a
/// book, so they are rejected as not found.
pub struct BookId(pub i64);

impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::not_found("Book not found"))?;

        raw.parse::<i64>()
            .map(BookId)
            .map_err(|_| not_found(&raw))
    }
}

fn not_found(id: impl std::fmt::Display) -> AppError {
    AppError::not_found(format!("Book {} not found", id))
}

async fn list_books(State(repo): State<SharedRepository>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(repo.list().await?))
}

async fn show_book(
    State(repo): State<SharedRepository>,
    BookId(id): BookId,
) -> Result<Json<Book>, AppError> {
    repo.find(id).await?.map(Json).ok_or_else(|| not_found(id))
}

async fn create_book(
    State(repo): State<SharedRepository>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let fields = BookFields::validate(&body)?;

    let book = repo.create(fields).await?;
    tracing::info!(book_id = book.id, "book created");

    let location = format!("/api/books/{}", book.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(book)))
}

async fn update_book(
    State(repo): State<SharedRepository>,
    BookId(id): BookId,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    // An unknown id wins over a bad body.
    if repo.find(id).await?.is_none() {
        return Err(not_found(id));
    }

    let Json(body) = body?;
    let fields = BookFields::validate(&body)?;

    let book = repo.replace(id, fields).await?.ok_or_else(|| not_found(id))?;
    tracing::info!(book_id = id, "book replaced");
    Ok(Json(book))
}

async fn patch_book(
    State(repo): State<SharedRepository>,
    BookId(id): BookId,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    if repo.find(id).await?.is_none() {
        return Err(not_found(id));
    }

    let Json(body) = body?;
    let patch = BookPatch::validate(&body)?;

    let book = repo.patch(id, patch).await?.ok_or_else(|| not_found(id))?;
    tracing::info!(book_id = id, "book patched");
    Ok(Json(book))
}

async fn delete_book(
    State(repo): State<SharedRepository>,
    BookId(id): BookId,
) -> Result<StatusCode, AppError> {
    if repo.delete(id).await? {
        tracing::info!(book_id = id, "book deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
