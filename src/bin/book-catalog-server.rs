//! book-catalog REST server.
//!
//! All book routes live under `/api/v1/book`:
//!
//! - `POST   /` — create a book (409 when already catalogued)
//! - `GET    /` — list books; query parameters are filter parameters
//! - `GET    /byNameAndAuthor?work_title=..&primary_author=..` — exact lookup
//! - `GET    /{id}` — one book
//! - `PUT    /{id}` — replace a book's fields
//! - `PATCH  /{id}/{column}` — set one column (JSON string or integer body)
//! - `DELETE /{id}` — delete a book
//! - `GET    /image/{id}` — cover or placeholder, picture base64-encoded
//! - `PUT    /image/{id}` — attach a cover from `{"picture": "<base64>"}`
//!
//! Plus `GET /health`.
//!
//! Build and run: `cargo run --features server --bin book-catalog-server`

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use book_catalog::config::{CatalogConfig, CatalogPaths};
use book_catalog::error::StoreError;
use book_catalog::model::{AssociatedImage, Book, BookDraft, ColumnValue};
use book_catalog::service::{BookService, CreateOutcome};

type ApiError = (StatusCode, String);

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    service: BookService,
}

fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::UnknownColumn { .. } | StoreError::ColumnTypeMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => {
            tracing::error!(error = %e, "catalog request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

fn rows_or_not_found(rows: usize, id: Uuid) -> Result<Json<RowsResponse>, ApiError> {
    if rows == 0 {
        Err((StatusCode::NOT_FOUND, format!("no book with id {id}")))
    } else {
        Ok(Json(RowsResponse { rows }))
    }
}

/// Run synchronous catalog work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "catalog task did not complete");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("catalog task failed: {e}"),
        )
    })?
}

// ── Request/response types ────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    books: i64,
    covers_in_flight: usize,
}

#[derive(Serialize)]
struct RowsResponse {
    rows: usize,
}

#[derive(Deserialize)]
struct ImageUpload {
    picture: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServerState>>) -> Result<Json<HealthResponse>, ApiError> {
    let books = blocking({
        let state = Arc::clone(&state);
        move || state.service.store().book_count().map_err(store_error)
    })
    .await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        books,
        covers_in_flight: state.service.covers().in_flight(),
    }))
}

async fn create_book(
    State(state): State<Arc<ServerState>>,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<CreateOutcome>), ApiError> {
    let outcome = blocking(move || state.service.create(&draft).map_err(store_error)).await?;
    let status = match outcome {
        CreateOutcome::Created { .. } => StatusCode::CREATED,
        CreateOutcome::Duplicate => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)))
}

async fn list_books(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    blocking(move || state.service.list(&params).map_err(store_error))
        .await
        .map(Json)
}

async fn book_by_name_and_author(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Book>, ApiError> {
    let found = blocking(move || {
        state
            .service
            .get_by_title_and_author(&params)
            .map_err(store_error)
    })
    .await?;
    match found {
        Some(book) => Ok(Json(book)),
        None => Err((StatusCode::NOT_FOUND, "no matching book".to_string())),
    }
}

async fn get_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    match blocking(move || state.service.get_by_id(id).map_err(store_error)).await? {
        Some(book) => Ok(Json(book)),
        None => Err((StatusCode::NOT_FOUND, format!("no book with id {id}"))),
    }
}

async fn update_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<BookDraft>,
) -> Result<Json<RowsResponse>, ApiError> {
    let rows = blocking(move || state.service.update(id, &draft).map_err(store_error)).await?;
    rows_or_not_found(rows, id)
}

async fn patch_column(
    State(state): State<Arc<ServerState>>,
    Path((id, column)): Path<(Uuid, String)>,
    Json(value): Json<ColumnValue>,
) -> Result<Json<RowsResponse>, ApiError> {
    let rows = blocking(move || {
        state
            .service
            .update_column(id, &column, value)
            .map_err(store_error)
    })
    .await?;
    rows_or_not_found(rows, id)
}

async fn delete_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RowsResponse>, ApiError> {
    let rows = blocking(move || state.service.delete(id).map_err(store_error)).await?;
    rows_or_not_found(rows, id)
}

async fn get_image(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssociatedImage>, ApiError> {
    blocking(move || Ok(state.service.image(id))).await.map(Json)
}

async fn put_image(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
    Json(upload): Json<ImageUpload>,
) -> Result<Json<RowsResponse>, ApiError> {
    let bytes = BASE64
        .decode(upload.picture.trim())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("picture is not valid base64: {e}")))?;
    let rows = blocking(move || {
        state
            .service
            .attach_image(id, &bytes)
            .map_err(store_error)
    })
    .await?;
    rows_or_not_found(rows, id)
}

// ── Main ──────────────────────────────────────────────────────────────────

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = CatalogPaths::resolve()?;
    let config_file = std::env::var("BOOK_CATALOG_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| paths.config_file());
    let config = CatalogConfig::load_or_default(&config_file)?;
    let database = config.database_path(&paths);

    let service = BookService::open(&config, &database, tokio::runtime::Handle::current())?;
    let state = Arc::new(ServerState { service });

    let books = Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/byNameAndAuthor", get(book_by_name_and_author))
        .route("/image/{id}", get(get_image).put(put_image))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .route("/{id}/{column}", patch(patch_column));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1/book", books)
        .layer(CorsLayer::permissive())
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .into_diagnostic()?;
    tracing::info!(addr = %config.bind_address, database = %database.display(), "book-catalog server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    state.service.covers().shutdown().await;
    tracing::info!("book-catalog server stopped");
    Ok(())
}
