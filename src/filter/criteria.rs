//! Typed filter criteria parsed from a raw request parameter map.
//!
//! Parsing is the only step that looks at parameter names. Everything after
//! it works on the closed [`FilterCriterion`] set.

use std::collections::HashMap;

use crate::model::BookColumn;

use super::normalize::normalize_text;

/// Parameter names recognized by the compiler.
pub mod keys {
    pub const WORK_TITLE: &str = "work_title";
    pub const PRIMARY_AUTHOR: &str = "primary_author";
    pub const WORD_COUNT_UPPER: &str = "word_count_upper_limit";
    pub const WORD_COUNT_LOWER: &str = "word_count_lower_limit";
    pub const YEAR_PUBLISHED_UPPER: &str = "year_published_upper_limit";
    pub const YEAR_PUBLISHED_LOWER: &str = "year_published_lower_limit";
    pub const SORT_BY: &str = "sort_by";
    pub const SORTING_ORDER: &str = "sorting_order";
}

/// Which side of a range a bound constrains. Both sides are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Upper,
    Lower,
}

impl RangeBound {
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Upper => "<=",
            Self::Lower => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse of `ASC` / `DESC`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A single validated filter, produced transiently for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCriterion {
    /// Case-insensitive substring match. `needle` is already normalized.
    TextMatch { column: BookColumn, needle: String },
    /// Inclusive numeric bound.
    Range {
        column: BookColumn,
        bound: RangeBound,
        value: i32,
    },
    /// Ordering. `None` direction leaves the store default (ascending).
    Sort {
        column: BookColumn,
        direction: Option<SortDirection>,
    },
}

/// Text parameters in fragment order.
const TEXT_PARAMS: [(&str, BookColumn); 2] = [
    (keys::PRIMARY_AUTHOR, BookColumn::PrimaryAuthor),
    (keys::WORK_TITLE, BookColumn::WorkTitle),
];

/// Range parameters in fragment order.
const RANGE_PARAMS: [(&str, BookColumn, RangeBound); 4] = [
    (keys::WORD_COUNT_UPPER, BookColumn::WordCount, RangeBound::Upper),
    (keys::WORD_COUNT_LOWER, BookColumn::WordCount, RangeBound::Lower),
    (keys::YEAR_PUBLISHED_UPPER, BookColumn::YearPublished, RangeBound::Upper),
    (keys::YEAR_PUBLISHED_LOWER, BookColumn::YearPublished, RangeBound::Lower),
];

/// Parse a raw parameter map into criteria.
///
/// Output order is fixed regardless of map iteration order: author, title,
/// word-count bounds (upper then lower), year bounds (upper then lower),
/// then at most one sort. Unknown keys, blank values, unparseable bounds and
/// unknown sort columns are dropped.
pub fn parse_criteria(params: &HashMap<String, String>) -> Vec<FilterCriterion> {
    let mut criteria = Vec::new();

    for (key, column) in TEXT_PARAMS {
        let Some(raw) = params.get(key) else { continue };
        let needle = normalize_text(raw);
        if needle.trim().is_empty() {
            continue;
        }
        criteria.push(FilterCriterion::TextMatch { column, needle });
    }

    for (key, column, bound) in RANGE_PARAMS {
        let Some(raw) = params.get(key) else { continue };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match raw.parse::<i32>() {
            Ok(value) => criteria.push(FilterCriterion::Range {
                column,
                bound,
                value,
            }),
            Err(e) => {
                tracing::info!(param = key, value = raw, error = %e, "dropping unparseable range bound");
            }
        }
    }

    if let Some(sort) = parse_sort(params) {
        criteria.push(sort);
    }

    criteria
}

fn parse_sort(params: &HashMap<String, String>) -> Option<FilterCriterion> {
    let raw = params.get(keys::SORT_BY)?.trim();
    if raw.is_empty() {
        return None;
    }
    let Some(column) = BookColumn::from_name(raw) else {
        tracing::debug!(sort_by = raw, "ignoring sort on unknown column");
        return None;
    };

    let direction = match params.get(keys::SORTING_ORDER).map(|s| s.trim()) {
        None | Some("") => None,
        Some(order) => {
            let parsed = SortDirection::parse(order);
            if parsed.is_none() {
                tracing::debug!(sorting_order = order, "ignoring unknown sort direction");
            }
            parsed
        }
    };

    Some(FilterCriterion::Sort { column, direction })
}
