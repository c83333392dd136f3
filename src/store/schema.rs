//! Catalog schema and placeholder seeding.

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, params};

use crate::model::{MISSING_IMAGE_ID, PLACEHOLDER_COVER};

/// Columns selected for every book read, in `parse_book_row` order.
pub const BOOK_COLUMNS: &str =
    "id, work_title, primary_author, year_published, word_count, picture_id, created_at, updated_at";

// (title, author) is indexed but deliberately not UNIQUE: uniqueness is a
// pre-insert check in the service.
const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS picture (
        id          TEXT PRIMARY KEY,
        picture     BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS book (
        id              TEXT PRIMARY KEY,
        work_title      TEXT NOT NULL,
        primary_author  TEXT NOT NULL,
        year_published  INTEGER NOT NULL,
        word_count      INTEGER NOT NULL,
        picture_id      TEXT REFERENCES picture(id),
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS book_genre (
        book_id     TEXT NOT NULL REFERENCES book(id) ON DELETE CASCADE,
        genre       TEXT NOT NULL,
        PRIMARY KEY (book_id, genre)
    );

    CREATE INDEX IF NOT EXISTS idx_book_title_author
        ON book(work_title, primary_author);
";

/// Unicode-aware lowercase SQL function. SQLite's own `lower()` folds ASCII only.
pub const FOLD_CASE: &str = "fold_case";

/// Register connection-local SQL functions. Must run on every connection.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
}

/// Create tables if missing, register SQL functions and make sure the
/// placeholder image exists.
pub fn init(conn: &Connection) -> rusqlite::Result<()> {
    register_functions(conn)?;
    conn.execute_batch(SCHEMA)?;
    let seeded = conn.execute(
        "INSERT OR IGNORE INTO picture (id, picture) VALUES (?1, ?2)",
        params![MISSING_IMAGE_ID.to_string(), PLACEHOLDER_COVER],
    )?;
    if seeded > 0 {
        tracing::info!(id = %MISSING_IMAGE_ID, "seeded placeholder image");
    }
    Ok(())
}
