//! Caller-facing catalog operations.
//!
//! [`BookService`] owns a [`BookStore`] handle and a [`CoverFetcher`]. Text
//! input from callers is normalized here, once, before it reaches the store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::cover::{CoverFetcher, CoverLookup, HttpCoverLookup};
use crate::error::{CatalogResult, StoreError, StoreResult};
use crate::filter::{self, keys, normalize_param, normalize_text};
use crate::model::{AssociatedImage, Book, BookColumn, BookDraft, ColumnValue};
use crate::store::BookStore;

/// Result of [`BookService::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreateOutcome {
    /// The book was inserted under `id`; `rows` is the affected-row count.
    Created { id: Uuid, rows: usize },
    /// A book with the same normalized title and author already exists.
    /// Nothing was written and no cover fetch was started.
    Duplicate,
}

impl CreateOutcome {
    /// Affected-row count, zero for a duplicate.
    pub fn rows(&self) -> usize {
        match self {
            Self::Created { rows, .. } => *rows,
            Self::Duplicate => 0,
        }
    }
}

/// The book catalog.
#[derive(Debug)]
pub struct BookService {
    store: BookStore,
    covers: CoverFetcher,
}

impl BookService {
    pub fn new(store: BookStore, covers: CoverFetcher) -> Self {
        Self { store, covers }
    }

    /// Open the database at `database` and wire the HTTP cover lookup from
    /// `config`. Cover fetches run on `runtime`.
    pub fn open(config: &CatalogConfig, database: &Path, runtime: Handle) -> CatalogResult<Self> {
        let store = BookStore::open(database)?;
        let lookup: Arc<dyn CoverLookup> = Arc::new(HttpCoverLookup::from_config(config));
        let covers = CoverFetcher::new(runtime, lookup, store.clone(), config.cover_max_in_flight);
        Ok(Self::new(store, covers))
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    pub fn covers(&self) -> &CoverFetcher {
        &self.covers
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a book unless one with the same title and author exists.
    ///
    /// On insert, a cover fetch is queued and the call returns without
    /// waiting for it. The uniqueness check is not atomic with the insert:
    /// concurrent creates of the same book can both succeed.
    pub fn create(&self, draft: &BookDraft) -> StoreResult<CreateOutcome> {
        let work_title = normalize_text(&draft.work_title);
        let primary_author = normalize_text(&draft.primary_author);

        if let Some(existing) = self
            .store
            .select_by_title_and_author(&work_title, &primary_author)?
        {
            tracing::info!(
                existing = %existing.id,
                title = %work_title,
                author = %primary_author,
                "book already catalogued, skipping create"
            );
            return Ok(CreateOutcome::Duplicate);
        }

        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            work_title,
            primary_author,
            year_published: draft.year_published,
            word_count: draft.word_count,
            picture_id: None,
            created_at: now,
            updated_at: now,
            genres: draft.genres.clone(),
        };
        let rows = self.store.insert(&book)?;
        tracing::info!(id = %book.id, title = %book.work_title, "book created");

        if rows > 0 {
            self.covers
                .submit(book.id, &book.work_title, &book.primary_author);
        }
        Ok(CreateOutcome::Created { id: book.id, rows })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Book>> {
        self.store.select_by_id(id)
    }

    /// Exact lookup from raw `work_title` / `primary_author` parameters.
    /// Missing keys count as empty strings.
    pub fn get_by_title_and_author(
        &self,
        params: &HashMap<String, String>,
    ) -> StoreResult<Option<Book>> {
        let title = normalize_param(params.get(keys::WORK_TITLE).map(String::as_str));
        let author = normalize_param(params.get(keys::PRIMARY_AUTHOR).map(String::as_str));
        self.store.select_by_title_and_author(&title, &author)
    }

    /// Exact lookup by title and author.
    pub fn find_by_title_and_author(&self, title: &str, author: &str) -> StoreResult<Option<Book>> {
        self.store
            .select_by_title_and_author(&normalize_text(title), &normalize_text(author))
    }

    /// Books matching the filter parameters. Unknown or malformed parameters
    /// are ignored.
    pub fn list(&self, params: &HashMap<String, String>) -> StoreResult<Vec<Book>> {
        let compiled = filter::compile_params(params);
        self.store
            .select_many(&compiled.where_fragments, compiled.order_by.as_ref())
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Replace title, author, year, word count and genres.
    pub fn update(&self, id: Uuid, draft: &BookDraft) -> StoreResult<usize> {
        let normalized = BookDraft {
            work_title: normalize_text(&draft.work_title),
            primary_author: normalize_text(&draft.primary_author),
            ..draft.clone()
        };
        let rows = self.store.update_by_id(id, &normalized, Utc::now())?;
        if rows == 0 {
            tracing::debug!(%id, "update matched no book");
        }
        Ok(rows)
    }

    /// Patch one column by name.
    pub fn update_column(&self, id: Uuid, column: &str, value: ColumnValue) -> StoreResult<usize> {
        let column = BookColumn::from_name(column).ok_or_else(|| StoreError::UnknownColumn {
            column: column.to_string(),
        })?;
        let value = match value {
            ColumnValue::Text(text) => ColumnValue::Text(normalize_text(&text)),
            other => other,
        };
        self.store.update_column(id, column, &value, Utc::now())
    }

    pub fn delete(&self, id: Uuid) -> StoreResult<usize> {
        let rows = self.store.delete_by_id(id)?;
        if rows > 0 {
            tracing::info!(%id, "book deleted");
        }
        Ok(rows)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// The book's cover, or the placeholder. Never fails.
    pub fn image(&self, id: Uuid) -> AssociatedImage {
        self.store.get_image_for_book(id)
    }

    /// Store `bytes` as the book's cover.
    pub fn attach_image(&self, id: Uuid, bytes: &[u8]) -> StoreResult<usize> {
        self.store.insert_image(id, bytes)
    }
}
