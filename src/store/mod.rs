//! Persistence gateway for the book catalog, backed by SQLite.
//!
//! [`BookStore`] is a cheap-to-clone handle around one shared connection.
//! Every value reaches SQLite as a bound parameter; the only SQL text built at
//! runtime is compiler fragments and allow-listed column names.
//!
//! Outcome conventions:
//! - reads return `Ok(None)` for a missing row and [`StoreError::LookupFailed`]
//!   for anything else that goes wrong;
//! - writes return the affected row count, where 0 means "target not found";
//! - [`BookStore::get_image_for_book`] never fails and falls back to the
//!   placeholder image.

pub mod rows;
pub mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use uuid::Uuid;

pub use crate::error::StoreResult;
use crate::error::StoreError;
use crate::filter::{Fragment, OrderBy};
use crate::model::{
    AssociatedImage, Book, BookColumn, BookDraft, ColumnKind, ColumnValue, MISSING_IMAGE_ID,
    PLACEHOLDER_COVER,
};

use rows::{load_genres, parse_book_row, parse_image_row};
use schema::BOOK_COLUMNS;

/// SQLite-backed book store.
#[derive(Clone)]
pub struct BookStore {
    conn: Arc<Mutex<Connection>>,
}

impl BookStore {
    /// Open or create a catalog database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), books = store.book_count()?, "opened book catalog");
        Ok(store)
    }

    /// Fresh in-memory catalog, used by tests and dry runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of books in the catalog.
    pub fn book_count(&self) -> StoreResult<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM book", [], |r| r.get(0))
            .map_err(lookup_failed("book count"))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert `book` under its own identifier, timestamps as supplied.
    ///
    /// Returns the affected row count. An identifier collision is a
    /// [`StoreError::Sqlite`] constraint error.
    pub fn insert(&self, book: &Book) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO book (id, work_title, primary_author, year_published, word_count,
                               picture_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                book.id.to_string(),
                book.work_title,
                book.primary_author,
                book.year_published,
                book.word_count,
                book.picture_id.map(|p| p.to_string()),
                book.created_at,
                book.updated_at,
            ],
        )?;
        replace_genres(&tx, book.id, &book.genres)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Delete a book and its genres. A cover image no other book links to is
    /// deleted with it; the placeholder never is.
    pub fn delete_by_id(&self, id: Uuid) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let picture_id: Option<String> = tx
            .query_row(
                "SELECT picture_id FROM book WHERE id = ?1",
                params![id.to_string()],
                |r| r.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        tx.execute("DELETE FROM book_genre WHERE book_id = ?1", params![id.to_string()])?;
        let deleted = tx.execute("DELETE FROM book WHERE id = ?1", params![id.to_string()])?;
        if let Some(picture_id) = picture_id {
            delete_orphan_picture(&tx, &picture_id)?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Replace every mutable field of a book, genres included.
    pub fn update_by_id(
        &self,
        id: Uuid,
        draft: &BookDraft,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE book
             SET work_title = ?1, primary_author = ?2, year_published = ?3,
                 word_count = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                draft.work_title,
                draft.primary_author,
                draft.year_published,
                draft.word_count,
                updated_at,
                id.to_string(),
            ],
        )?;
        if updated > 0 {
            replace_genres(&tx, id, &draft.genres)?;
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Patch a single content column and bump `updated_at`.
    pub fn update_column(
        &self,
        id: Uuid,
        column: BookColumn,
        value: &ColumnValue,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<usize> {
        if !column.is_patchable() {
            return Err(StoreError::UnknownColumn {
                column: column.to_string(),
            });
        }
        let bound: rusqlite::types::Value = match (column.kind(), value) {
            (ColumnKind::Text, ColumnValue::Text(text)) => text.clone().into(),
            (ColumnKind::Integer, ColumnValue::Integer(n)) => {
                let n = i32::try_from(*n).map_err(|_| StoreError::ColumnTypeMismatch {
                    column: column.to_string(),
                    expected: "32-bit integer",
                })?;
                i64::from(n).into()
            }
            (ColumnKind::Integer, _) => {
                return Err(StoreError::ColumnTypeMismatch {
                    column: column.to_string(),
                    expected: "integer",
                });
            }
            _ => {
                return Err(StoreError::ColumnTypeMismatch {
                    column: column.to_string(),
                    expected: "text",
                });
            }
        };

        let conn = self.lock()?;
        let sql = format!("UPDATE book SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
        Ok(conn.execute(&sql, params![bound, updated_at, id.to_string()])?)
    }

    /// Store `image` as a new picture and link it to the book.
    ///
    /// Both steps run in one transaction: the result is 1 when the picture was
    /// stored and linked, 0 (with nothing written) when the book is missing.
    /// A previously linked picture left without owner is removed.
    pub fn insert_image(&self, book_id: Uuid, image: &[u8]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT picture_id FROM book WHERE id = ?1",
                params![book_id.to_string()],
                |r| r.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        let picture_id = Uuid::new_v4().to_string();
        let stored = tx.execute(
            "INSERT INTO picture (id, picture) VALUES (?1, ?2)",
            params![picture_id, image],
        )?;
        let linked = tx.execute(
            "UPDATE book SET picture_id = ?1 WHERE id = ?2",
            params![picture_id, book_id.to_string()],
        )?;
        if stored == 0 || linked == 0 {
            // Dropping the transaction rolls back the picture insert.
            return Ok(0);
        }
        if let Some(previous) = previous {
            delete_orphan_picture(&tx, &previous)?;
        }
        tx.commit()?;
        Ok(1)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn select_by_id(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = ?1");
        let book = conn
            .query_row(&sql, params![id.to_string()], parse_book_row)
            .optional()
            .map_err(lookup_failed(format!("book {id}")))?;
        with_genres(&conn, book)
    }

    /// Exact (not substring) match on title and author.
    ///
    /// Should concurrent creation have produced duplicates, the oldest row wins.
    pub fn select_by_title_and_author(
        &self,
        work_title: &str,
        primary_author: &str,
    ) -> StoreResult<Option<Book>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM book
             WHERE work_title = ?1 AND primary_author = ?2
             ORDER BY rowid LIMIT 1"
        );
        let book = conn
            .query_row(&sql, params![work_title, primary_author], parse_book_row)
            .optional()
            .map_err(lookup_failed(format!(
                "book \"{work_title}\" by \"{primary_author}\""
            )))?;
        with_genres(&conn, book)
    }

    /// Books matching every fragment, in `order_by` order or insertion order.
    pub fn select_many(
        &self,
        where_fragments: &[Fragment],
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<Book>> {
        let sql = select_sql(where_fragments, order_by);
        tracing::debug!(%sql, params = where_fragments.len(), "selecting books");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(lookup_failed("book listing"))?;
        let mut books = stmt
            .query_map(
                params_from_iter(where_fragments.iter().map(Fragment::param)),
                parse_book_row,
            )
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(lookup_failed("book listing"))?;

        for book in &mut books {
            book.genres =
                load_genres(&conn, book.id).map_err(lookup_failed(format!("genres of {}", book.id)))?;
        }
        Ok(books)
    }

    /// The image linked to a book, or the placeholder.
    ///
    /// Any failure to resolve the link (no such book, no picture linked, a
    /// query error, a poisoned lock) serves the placeholder row; if that row
    /// cannot be read either, the built-in placeholder payload is served.
    pub fn get_image_for_book(&self, book_id: Uuid) -> AssociatedImage {
        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, book = %book_id, "serving built-in placeholder image");
                return builtin_placeholder();
            }
        };

        let linked = conn
            .query_row(
                "SELECT p.id, p.picture
                 FROM book b
                 JOIN picture p ON b.picture_id = p.id
                 WHERE b.id = ?1",
                params![book_id.to_string()],
                parse_image_row,
            )
            .optional();
        match linked {
            Ok(Some(image)) => return image,
            Ok(None) => tracing::info!(book = %book_id, "no linked image, serving placeholder"),
            Err(e) => {
                tracing::info!(book = %book_id, error = %e, "image lookup failed, serving placeholder")
            }
        }

        conn.query_row(
            "SELECT id, picture FROM picture WHERE id = ?1",
            params![MISSING_IMAGE_ID.to_string()],
            parse_image_row,
        )
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "placeholder row unreadable, serving built-in placeholder");
            builtin_placeholder()
        })
    }
}

impl std::fmt::Debug for BookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore").finish_non_exhaustive()
    }
}

/// Assemble the listing query. Ties and unordered listings fall back to
/// insertion order.
pub fn select_sql(where_fragments: &[Fragment], order_by: Option<&OrderBy>) -> String {
    let mut sql = format!("SELECT {BOOK_COLUMNS} FROM book");
    if !where_fragments.is_empty() {
        let conditions: Vec<&str> = where_fragments.iter().map(Fragment::sql).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    match order_by {
        Some(order_by) => {
            sql.push(' ');
            sql.push_str(&order_by.sql());
            sql.push_str(", rowid");
        }
        None => sql.push_str(" ORDER BY rowid"),
    }
    sql
}

fn lookup_failed(what: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> StoreError {
    let what = what.into();
    move |source| StoreError::LookupFailed { what, source }
}

fn with_genres(conn: &Connection, book: Option<Book>) -> StoreResult<Option<Book>> {
    let Some(mut book) = book else {
        return Ok(None);
    };
    book.genres =
        load_genres(conn, book.id).map_err(lookup_failed(format!("genres of {}", book.id)))?;
    Ok(Some(book))
}

fn replace_genres(tx: &Transaction<'_>, book_id: Uuid, genres: &[String]) -> rusqlite::Result<()> {
    let id = book_id.to_string();
    tx.execute("DELETE FROM book_genre WHERE book_id = ?1", params![id])?;
    let mut stmt =
        tx.prepare_cached("INSERT OR IGNORE INTO book_genre (book_id, genre) VALUES (?1, ?2)")?;
    for genre in genres {
        stmt.execute(params![id, genre])?;
    }
    Ok(())
}

fn delete_orphan_picture(tx: &Transaction<'_>, picture_id: &str) -> rusqlite::Result<usize> {
    tx.execute(
        "DELETE FROM picture
         WHERE id = ?1 AND id <> ?2
           AND NOT EXISTS (SELECT 1 FROM book WHERE picture_id = ?1)",
        params![picture_id, MISSING_IMAGE_ID.to_string()],
    )
}

fn builtin_placeholder() -> AssociatedImage {
    AssociatedImage {
        id: MISSING_IMAGE_ID,
        picture: PLACEHOLDER_COVER.to_vec(),
    }
}
