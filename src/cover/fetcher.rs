//! Bounded background pool for cover fetches.
//!
//! Each accepted submission holds one semaphore permit from the moment it is
//! queued until its image write finishes, so `max_in_flight` caps queued and
//! running tasks together. A full pool rejects the submission instead of
//! queueing it: the book keeps the placeholder image.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::CoverLookup;
use crate::error::CoverError;
use crate::store::BookStore;

/// Runs cover lookups off the request path and links the results.
pub struct CoverFetcher {
    runtime: Handle,
    lookup: Arc<dyn CoverLookup>,
    store: BookStore,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl CoverFetcher {
    /// Create a pool running on `runtime`'s blocking threads.
    ///
    /// `max_in_flight` is clamped to at least one.
    pub fn new(
        runtime: Handle,
        lookup: Arc<dyn CoverLookup>,
        store: BookStore,
        max_in_flight: usize,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            runtime,
            lookup,
            store,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue a cover fetch for `book_id`. Returns immediately.
    ///
    /// Returns `false` when the task was not accepted, either because the
    /// pool is full or because it has been shut down.
    pub fn submit(&self, book_id: Uuid, title: &str, author: &str) -> bool {
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!(book = %book_id, "cover pool is shut down, skipping cover fetch");
            return false;
        }
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    book = %book_id,
                    max_in_flight = self.max_in_flight,
                    "cover pool saturated, skipping cover fetch"
                );
                return false;
            }
        };

        let lookup = Arc::clone(&self.lookup);
        let store = self.store.clone();
        let title = title.to_string();
        let author = author.to_string();

        // `shutdown` flips `closed` before draining, and `drain` takes this
        // lock, so a submit that sees `closed == false` here is awaited.
        let mut tasks = self.tasks();
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!(book = %book_id, "cover pool is shut down, skipping cover fetch");
            return false;
        }
        while tasks.try_join_next().is_some() {}
        tasks.spawn_blocking_on(
            move || {
                let _permit = permit;
                fetch_and_link(lookup.as_ref(), &store, book_id, &title, &author);
            },
            &self.runtime,
        );
        true
    }

    /// Number of accepted tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Wait for every accepted task to finish. New submissions are still
    /// accepted while draining and are awaited too.
    pub async fn drain(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks());
            if pending.is_empty() {
                return;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "cover task did not complete");
                }
            }
        }
    }

    /// Stop accepting submissions and wait for pending ones.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let pending = self.in_flight();
        if pending > 0 {
            tracing::info!(pending, "draining cover fetches");
        }
        self.drain().await;
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CoverFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverFetcher")
            .field("max_in_flight", &self.max_in_flight)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Look up a cover and link it. Every failure is logged and swallowed.
fn fetch_and_link(lookup: &dyn CoverLookup, store: &BookStore, book_id: Uuid, title: &str, author: &str) {
    let image = match lookup.find_cover(title, author) {
        Ok(image) => image,
        Err(CoverError::NotFound { .. }) => {
            tracing::warn!(book = %book_id, title, author, "no cover available");
            return;
        }
        Err(e) => {
            tracing::warn!(book = %book_id, title, error = %e, "cover lookup failed");
            return;
        }
    };

    match store.insert_image(book_id, &image) {
        Ok(0) => tracing::warn!(book = %book_id, "book vanished before its cover was stored"),
        Ok(_) => tracing::info!(book = %book_id, bytes = image.len(), "cover attached"),
        Err(e) => tracing::warn!(book = %book_id, error = %e, "failed to store cover"),
    }
}
