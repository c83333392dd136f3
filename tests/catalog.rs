//! End-to-end catalog tests over an on-disk database.
//!
//! A five-book fixture is created through the service and then queried with
//! the same parameter maps a REST caller would send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use book_catalog::cover::{CoverFetcher, CoverLookup};
use book_catalog::error::{CoverError, CoverResult};
use book_catalog::model::{BookDraft, MISSING_IMAGE_ID, PLACEHOLDER_COVER};
use book_catalog::service::{BookService, CreateOutcome};
use book_catalog::store::BookStore;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Serves a cover for every title except those listed as missing.
#[derive(Default)]
struct FakeCovers {
    missing: Vec<&'static str>,
    calls: Mutex<usize>,
}

impl CoverLookup for FakeCovers {
    fn find_cover(&self, title: &str, author: &str) -> CoverResult<Vec<u8>> {
        *self.calls.lock().unwrap() += 1;
        if self.missing.iter().any(|m| *m == title) {
            return Err(CoverError::NotFound {
                title: title.into(),
                author: author.into(),
            });
        }
        Ok(format!("{title}.png").into_bytes())
    }
}

struct Catalog {
    _dir: tempfile::TempDir,
    runtime: Runtime,
    service: BookService,
    covers: Arc<FakeCovers>,
}

impl Catalog {
    fn new(covers: FakeCovers) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let runtime = Runtime::new().unwrap();
        let store = BookStore::open(&dir.path().join("catalog.db")).unwrap();
        let covers = Arc::new(covers);
        let fetcher = CoverFetcher::new(runtime.handle().clone(), covers.clone(), store.clone(), 8);
        Self {
            _dir: dir,
            runtime,
            service: BookService::new(store, fetcher),
            covers,
        }
    }

    /// The five fixture books, created in this order.
    fn with_fixture() -> Self {
        let catalog = Self::new(FakeCovers {
            missing: vec!["Meditations"],
            ..Default::default()
        });
        for draft in [
            BookDraft::new("Pride and Prejudice", "Jane Austen", 1813, 122_189),
            BookDraft::new("The Adventures of Huckleberry Finn", "Mark Twain", 1884, 109_571),
            BookDraft::new("Meditations", "Marcus Aurelius", 180, 46_000),
            BookDraft::new("Paradise Lost", "John Milton", 1667, 48_000),
            BookDraft::new("The Old Man and the Sea", "Ernest Hemingway", 1952, 26_601),
        ] {
            assert_eq!(catalog.service.create(&draft).unwrap().rows(), 1);
        }
        catalog.drain();
        catalog
    }

    fn drain(&self) {
        self.runtime.block_on(self.service.covers().drain());
    }

    fn titles(&self, pairs: &[(&str, &str)]) -> Vec<String> {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.service
            .list(&params)
            .unwrap()
            .into_iter()
            .map(|b| b.work_title)
            .collect()
    }
}

#[test]
fn unfiltered_list_is_in_insertion_order() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[]),
        vec![
            "Pride and Prejudice",
            "The Adventures of Huckleberry Finn",
            "Meditations",
            "Paradise Lost",
            "The Old Man and the Sea",
        ]
    );
}

#[test]
fn word_count_range_is_inclusive_and_conjunctive() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[
            ("word_count_upper_limit", "100000"),
            ("word_count_lower_limit", "40000"),
        ]),
        vec!["Meditations", "Paradise Lost"]
    );
    assert_eq!(
        catalog.titles(&[
            ("word_count_upper_limit", "125000"),
            ("word_count_lower_limit", "50000"),
        ]),
        vec!["Pride and Prejudice", "The Adventures of Huckleberry Finn"]
    );
    assert_eq!(
        catalog.titles(&[("word_count_upper_limit", "26601")]),
        vec!["The Old Man and the Sea"]
    );
}

#[test]
fn year_range() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[
            ("year_published_lower_limit", "1800"),
            ("year_published_upper_limit", "1900"),
        ]),
        vec!["Pride and Prejudice", "The Adventures of Huckleberry Finn"]
    );
}

#[test]
fn contradictory_bounds_return_nothing() {
    let catalog = Catalog::with_fixture();
    assert!(catalog
        .titles(&[
            ("word_count_lower_limit", "100000"),
            ("word_count_upper_limit", "40000"),
        ])
        .is_empty());
}

#[test]
fn unparseable_bound_is_dropped_and_the_rest_applies() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[
            ("year_published_lower_limit", "1k800"),
            ("word_count_upper_limit", "50000"),
        ]),
        vec!["Meditations", "Paradise Lost", "The Old Man and the Sea"]
    );
}

#[test]
fn substring_search_is_case_insensitive_and_combined() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[("work_title", "a"), ("primary_author", "o")]),
        vec!["Paradise Lost"]
    );
    assert_eq!(
        catalog.titles(&[("primary_author", "TWAIN")]),
        vec!["The Adventures of Huckleberry Finn"]
    );
    assert!(catalog.titles(&[("work_title", "%")]).is_empty());
}

#[test]
fn sorting() {
    let catalog = Catalog::with_fixture();
    let ascending = vec![
        "Meditations",
        "Paradise Lost",
        "Pride and Prejudice",
        "The Adventures of Huckleberry Finn",
        "The Old Man and the Sea",
    ];
    let descending: Vec<&str> = ascending.iter().rev().copied().collect();

    assert_eq!(
        catalog.titles(&[("sort_by", "year_published"), ("sorting_order", "ASC")]),
        ascending
    );
    assert_eq!(
        catalog.titles(&[("sort_by", "year_published"), ("sorting_order", "DESC")]),
        descending
    );
    assert_eq!(catalog.titles(&[("sort_by", "year_published")]), ascending);
    assert_eq!(
        catalog.titles(&[("sort_by", "year_published"), ("sorting_order", "sideways")]),
        ascending
    );
}

#[test]
fn sort_combines_with_filters() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog.titles(&[
            ("word_count_lower_limit", "40000"),
            ("sort_by", "word_count"),
            ("sorting_order", "desc"),
        ]),
        vec![
            "Pride and Prejudice",
            "The Adventures of Huckleberry Finn",
            "Paradise Lost",
            "Meditations",
        ]
    );
}

#[test]
fn injection_attempts_are_inert() {
    let catalog = Catalog::with_fixture();
    assert!(catalog
        .titles(&[("work_title", "x') > 0 OR 1=1; --")])
        .is_empty());
    assert_eq!(
        catalog
            .titles(&[("sort_by", "year_published; DROP TABLE book")])
            .len(),
        5
    );
    assert_eq!(catalog.service.store().book_count().unwrap(), 5);
}

#[test]
fn duplicate_create_is_a_no_op() {
    let catalog = Catalog::with_fixture();
    let calls_before = *catalog.covers.calls.lock().unwrap();

    let outcome = catalog
        .service
        .create(&BookDraft::new("Pride and Prejudice", "Jane Austen", 1813, 1))
        .unwrap();
    catalog.drain();

    assert_eq!(outcome, CreateOutcome::Duplicate);
    assert_eq!(catalog.titles(&[("work_title", "Pride and Prejudice")]).len(), 1);
    assert_eq!(*catalog.covers.calls.lock().unwrap(), calls_before);
}

#[test]
fn created_book_round_trips() {
    let catalog = Catalog::new(FakeCovers::default());
    let draft = BookDraft::new("Sense and Sensibility", "Jane Austen", 1811, 122_646)
        .with_genres(["romance", "satire"]);
    let CreateOutcome::Created { id, rows } = catalog.service.create(&draft).unwrap() else {
        panic!("expected a created book");
    };
    assert_eq!(rows, 1);
    catalog.drain();

    let book = catalog.service.get_by_id(id).unwrap().unwrap();
    assert_eq!(book.id, id);
    assert_eq!(book.work_title, draft.work_title);
    assert_eq!(book.primary_author, draft.primary_author);
    assert_eq!(book.year_published, 1811);
    assert_eq!(book.word_count, 122_646);
    assert_eq!(book.genres, vec!["romance".to_string(), "satire".to_string()]);
    assert_eq!(book.created_at, book.updated_at);

    let found = catalog
        .service
        .find_by_title_and_author("Sense and Sensibility", "Jane Austen")
        .unwrap();
    assert_eq!(found, Some(book));
}

#[test]
fn covers_attach_in_background_and_misses_fall_back() {
    let catalog = Catalog::with_fixture();
    let pride = catalog
        .service
        .find_by_title_and_author("Pride and Prejudice", "Jane Austen")
        .unwrap()
        .unwrap();
    let meditations = catalog
        .service
        .find_by_title_and_author("Meditations", "Marcus Aurelius")
        .unwrap()
        .unwrap();

    assert_eq!(catalog.service.image(pride.id).picture, b"Pride and Prejudice.png");
    assert!(meditations.picture_id.is_none());

    let fallback = catalog.service.image(meditations.id);
    assert_eq!(fallback.id, MISSING_IMAGE_ID);
    assert_eq!(fallback.picture, PLACEHOLDER_COVER);

    let unknown = catalog.service.image(Uuid::new_v4());
    assert_eq!(unknown.id, MISSING_IMAGE_ID);
}

#[test]
fn not_found_is_a_value_not_an_error() {
    let catalog = Catalog::with_fixture();
    let id = Uuid::new_v4();
    assert!(catalog.service.get_by_id(id).unwrap().is_none());
    assert_eq!(catalog.service.delete(id).unwrap(), 0);
    assert_eq!(
        catalog
            .service
            .update(id, &BookDraft::new("Ulysses", "James Joyce", 1922, 265_222))
            .unwrap(),
        0
    );
    assert_eq!(catalog.service.attach_image(id, b"png").unwrap(), 0);
}

#[test]
fn search_folds_case_beyond_ascii() {
    let catalog = Catalog::new(FakeCovers::default());
    for draft in [
        BookDraft::new("Émile", "Jean-Jacques Rousseau", 1762, 180_000),
        BookDraft::new("Война и мир", "Лев Толстой", 1869, 587_287),
    ] {
        assert_eq!(catalog.service.create(&draft).unwrap().rows(), 1);
    }
    catalog.drain();

    assert_eq!(catalog.titles(&[("work_title", "Émile")]), vec!["Émile"]);
    assert_eq!(catalog.titles(&[("work_title", "émile")]), vec!["Émile"]);
    assert_eq!(catalog.titles(&[("work_title", "ÉMILE")]), vec!["Émile"]);
    assert_eq!(
        catalog.titles(&[("primary_author", "Лев Толстой")]),
        vec!["Война и мир"]
    );
    assert_eq!(
        catalog.titles(&[("primary_author", "толстой")]),
        vec!["Война и мир"]
    );
    assert_eq!(catalog.titles(&[("work_title", "ВОЙНА")]), vec!["Война и мир"]);
}

#[test]
fn out_of_range_bound_is_dropped() {
    let catalog = Catalog::with_fixture();
    assert_eq!(
        catalog
            .titles(&[("word_count_lower_limit", "3000000000")])
            .len(),
        5
    );
}
