//! Row decoding helpers.

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::model::{AssociatedImage, Book};

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Uuid::parse_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Parse a book from a row selected with `BOOK_COLUMNS`. Genres are left empty.
pub fn parse_book_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: uuid_at(row, 0)?,
        work_title: row.get(1)?,
        primary_author: row.get(2)?,
        year_published: row.get(3)?,
        word_count: row.get(4)?,
        picture_id: optional_uuid_at(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        genres: Vec::new(),
    })
}

/// Parse an image from an `(id, picture)` row.
pub fn parse_image_row(row: &Row<'_>) -> rusqlite::Result<AssociatedImage> {
    Ok(AssociatedImage {
        id: uuid_at(row, 0)?,
        picture: row.get(1)?,
    })
}

/// Genre tags of a book in the order they were stored.
pub fn load_genres(conn: &Connection, book_id: Uuid) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT genre FROM book_genre WHERE book_id = ?1 ORDER BY rowid")?;
    stmt.query_map(params![book_id.to_string()], |r| r.get(0))?
        .collect()
}
