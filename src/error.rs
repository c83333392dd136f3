//! Rich diagnostic error types for the book catalog.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Not-found and
//! duplicate outcomes are never errors: they come back as `None`, a zero row
//! count, or [`CreateOutcome::Duplicate`](crate::service::CreateOutcome).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the catalog.
///
/// Cover lookup failures never reach callers: the background pool logs and
/// drops them, so [`CoverError`] has no variant here.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("SQLite error: {source}")]
    #[diagnostic(
        code(catalog::store::sqlite),
        help(
            "The catalog database rejected the statement. Check that the database \
             file is writable and was created by this version of book-catalog."
        )
    )]
    Sqlite {
        #[source]
        source: rusqlite::Error,
    },

    #[error("lookup failed for {what}: {source}")]
    #[diagnostic(
        code(catalog::store::lookup_failed),
        help(
            "A read against the catalog failed for a reason other than a missing row. \
             Check database connectivity and integrity."
        )
    )]
    LookupFailed {
        what: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("catalog connection lock poisoned")]
    #[diagnostic(
        code(catalog::store::poisoned),
        help("A previous operation panicked while holding the connection. Restart the process.")
    )]
    Poisoned,

    #[error("column \"{column}\" cannot be patched")]
    #[diagnostic(
        code(catalog::store::unknown_column),
        help(
            "Patchable columns are: work_title, primary_author, year_published, word_count. \
             Identifiers and timestamps are managed by the catalog."
        )
    )]
    UnknownColumn { column: String },

    #[error("column \"{column}\" expects a {expected} value")]
    #[diagnostic(
        code(catalog::store::type_mismatch),
        help("Text columns take text patches and integer columns take integer patches.")
    )]
    ColumnTypeMismatch {
        column: String,
        expected: &'static str,
    },

    #[error("failed to create database directory: {path}")]
    #[diagnostic(
        code(catalog::store::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Sqlite { source }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Cover lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CoverError {
    #[error("cover request to \"{url}\" failed: {message}")]
    #[diagnostic(
        code(catalog::cover::request),
        help("Check that the cover API is reachable and `cover_api_url` is correct.")
    )]
    Request { url: String, message: String },

    #[error("no cover found for \"{title}\" by \"{author}\"")]
    #[diagnostic(
        code(catalog::cover::not_found),
        help("The cover API has no image for this book. The placeholder will be served instead.")
    )]
    NotFound { title: String, author: String },

    #[error("unable to parse cover API reply: {message}")]
    #[diagnostic(
        code(catalog::cover::parse),
        help("The cover API is expected to answer with JSON of the form {{\"url\": \"...\"}}.")
    )]
    Parse { message: String },

    #[error("cover image at \"{url}\" exceeds {limit} bytes")]
    #[diagnostic(
        code(catalog::cover::too_large),
        help("Raise `cover_max_bytes` in the catalog config if larger covers are expected.")
    )]
    TooLarge { url: String, limit: u64 },
}

pub type CoverResult<T> = std::result::Result<T, CoverError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(catalog::config::no_home),
        help("Set the HOME environment variable or pass explicit paths.")
    )]
    NoHome,

    #[error("failed to read catalog config: {path}")]
    #[diagnostic(
        code(catalog::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog config: {path}: {message}")]
    #[diagnostic(
        code(catalog::config::parse),
        help("Check the TOML syntax in the catalog config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write catalog config: {path}")]
    #[diagnostic(
        code(catalog::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_catalog_error() {
        let err = StoreError::UnknownColumn {
            column: "id".into(),
        };
        let top: CatalogError = err.into();
        assert!(matches!(
            top,
            CatalogError::Store(StoreError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn config_error_converts_to_catalog_error() {
        let top: CatalogError = ConfigError::NoHome.into();
        assert!(matches!(top, CatalogError::Config(ConfigError::NoHome)));
    }

    #[test]
    fn sqlite_error_wraps_into_store_error() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite { .. }));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = CoverError::NotFound {
            title: "Beloved".into(),
            author: "Toni Morrison".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Beloved"));
        assert!(msg.contains("Toni Morrison"));
    }
}
