//! Core data types for the book catalog.
//!
//! A [`Book`] is the persisted record; a [`BookDraft`] is the set of fields a
//! caller supplies on create and full update. [`BookColumn`] is the allow-list
//! of column names that may ever be embedded into SQL text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved identifier of the placeholder image row seeded into every store.
pub const MISSING_IMAGE_ID: Uuid = Uuid::from_u128(0x018f4078_a5d6_75b7_8848_bfdc3a7775e4);

/// Payload of the placeholder image: a 1x1 transparent PNG.
pub const PLACEHOLDER_COVER: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Immutable identifier assigned at creation.
    pub id: Uuid,
    pub work_title: String,
    pub primary_author: String,
    pub year_published: i32,
    pub word_count: i32,
    /// Linked cover image, if one has been attached.
    pub picture_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Caller-supplied fields for creating or fully replacing a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub work_title: String,
    pub primary_author: String,
    pub year_published: i32,
    pub word_count: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl BookDraft {
    pub fn new(work_title: &str, primary_author: &str, year_published: i32, word_count: i32) -> Self {
        Self {
            work_title: work_title.to_string(),
            primary_author: primary_author.to_string(),
            year_published,
            word_count,
            genres: Vec::new(),
        }
    }

    /// Attach genre tags.
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }
}

/// Image row linked to a book. Serialized with a base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedImage {
    pub id: Uuid,
    #[serde(with = "base64_bytes")]
    pub picture: Vec<u8>,
}

impl AssociatedImage {
    /// Whether this is the seeded placeholder rather than a real cover.
    pub fn is_placeholder(&self) -> bool {
        self.id == MISSING_IMAGE_ID
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Value type stored in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Timestamp,
}

/// Allow-list of `book` columns.
///
/// Column names cannot be bound as query parameters, so any fragment that
/// names a column must obtain it from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookColumn {
    Id,
    WorkTitle,
    PrimaryAuthor,
    YearPublished,
    WordCount,
    PictureId,
    CreatedAt,
    UpdatedAt,
}

impl BookColumn {
    pub const ALL: [BookColumn; 8] = [
        Self::Id,
        Self::WorkTitle,
        Self::PrimaryAuthor,
        Self::YearPublished,
        Self::WordCount,
        Self::PictureId,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// SQL column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::WorkTitle => "work_title",
            Self::PrimaryAuthor => "primary_author",
            Self::YearPublished => "year_published",
            Self::WordCount => "word_count",
            Self::PictureId => "picture_id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Exact, case-sensitive lookup of a column name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Id | Self::WorkTitle | Self::PrimaryAuthor | Self::PictureId => ColumnKind::Text,
            Self::YearPublished | Self::WordCount => ColumnKind::Integer,
            Self::CreatedAt | Self::UpdatedAt => ColumnKind::Timestamp,
        }
    }

    /// Whether callers may patch this column directly.
    pub fn is_patchable(&self) -> bool {
        matches!(
            self,
            Self::WorkTitle | Self::PrimaryAuthor | Self::YearPublished | Self::WordCount
        )
    }
}

impl std::fmt::Display for BookColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New value for a single-column patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Integer(i64),
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_roundtrip() {
        for column in BookColumn::ALL {
            assert_eq!(BookColumn::from_name(column.as_str()), Some(column));
        }
        assert_eq!(BookColumn::from_name("WORK_TITLE"), None);
        assert_eq!(BookColumn::from_name("year_published; DROP TABLE book"), None);
    }

    #[test]
    fn only_content_columns_are_patchable() {
        let patchable: Vec<_> = BookColumn::ALL
            .into_iter()
            .filter(BookColumn::is_patchable)
            .collect();
        assert_eq!(
            patchable,
            vec![
                BookColumn::WorkTitle,
                BookColumn::PrimaryAuthor,
                BookColumn::YearPublished,
                BookColumn::WordCount,
            ]
        );
    }

    #[test]
    fn missing_image_id_matches_reserved_value() {
        assert_eq!(
            MISSING_IMAGE_ID.to_string(),
            "018f4078-a5d6-75b7-8848-bfdc3a7775e4"
        );
    }

    #[test]
    fn image_serializes_picture_as_base64() {
        let image = AssociatedImage {
            id: MISSING_IMAGE_ID,
            picture: b"cover".to_vec(),
        };
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["picture"], "Y292ZXI=");
        let back: AssociatedImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
        assert!(back.is_placeholder());
    }

    #[test]
    fn column_value_accepts_text_or_integer() {
        let text: ColumnValue = serde_json::from_str("\"Emma\"").unwrap();
        let int: ColumnValue = serde_json::from_str("1815").unwrap();
        assert_eq!(text, ColumnValue::Text("Emma".into()));
        assert_eq!(int, ColumnValue::Integer(1815));
    }
}
