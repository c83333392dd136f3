//! Cover image lookup.
//!
//! A [`CoverLookup`] resolves a normalized title and author to raw image
//! bytes. [`HttpCoverLookup`] talks to the external cover API;
//! [`CoverFetcher`] runs lookups off the request path on a bounded pool and
//! links the result to the book.
//!
//! Lookups are best effort. Nothing in this module can fail a book creation.

mod fetcher;
mod http;

pub use fetcher::CoverFetcher;
pub use http::{HttpCoverLookup, lookup_url};

use crate::error::CoverResult;

/// Resolves a cover image for a book.
pub trait CoverLookup: Send + Sync {
    /// Fetch the cover bytes for `title` by `author`.
    ///
    /// Returns [`CoverError::NotFound`](crate::error::CoverError::NotFound)
    /// when the service has no image for the book.
    fn find_cover(&self, title: &str, author: &str) -> CoverResult<Vec<u8>>;
}
