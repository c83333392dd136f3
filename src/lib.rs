// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # book-catalog
//!
//! A book catalog over SQLite with a safe filter compiler and background
//! cover fetching.
//!
//! ## Architecture
//!
//! - **Filter compiler** (`filter`): request parameters to parameterized WHERE fragments
//! - **Store** (`store`): SQLite persistence gateway with placeholder-image fallback
//! - **Covers** (`cover`): external cover lookup on a bounded background pool
//! - **Service** (`service`): create-unless-duplicate workflow and caller-facing operations
//!
//! ## Library usage
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use book_catalog::config::CatalogConfig;
//! use book_catalog::cover::{CoverFetcher, HttpCoverLookup};
//! use book_catalog::model::BookDraft;
//! use book_catalog::service::BookService;
//! use book_catalog::store::BookStore;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let store = BookStore::open_in_memory().unwrap();
//! let lookup = Arc::new(HttpCoverLookup::from_config(&CatalogConfig::default()));
//! let covers = CoverFetcher::new(runtime.handle().clone(), lookup, store.clone(), 8);
//! let service = BookService::new(store, covers);
//!
//! service.create(&BookDraft::new("Emma", "Jane Austen", 1815, 160_996)).unwrap();
//! let params = HashMap::from([("primary_author".to_string(), "austen".to_string())]);
//! let books = service.list(&params).unwrap();
//! runtime.block_on(service.covers().drain());
//! ```

pub mod config;
pub mod cover;
pub mod error;
pub mod filter;
pub mod model;
pub mod service;
pub mod store;
