//! Predicate compiler: raw request parameters to safe, composable SQL.
//!
//! Two explicit steps. [`parse_criteria`] turns an open-ended
//! `name -> value` map into a closed list of [`FilterCriterion`] values,
//! dropping anything it does not recognize. [`compile`] turns that list into
//! WHERE fragments with bound parameters and at most one ORDER BY clause.
//! Neither step can fail.

pub mod compile;
pub mod criteria;
pub mod normalize;

use std::collections::HashMap;

pub use compile::{CompiledFilter, Fragment, OrderBy, compile};
pub use criteria::{FilterCriterion, RangeBound, SortDirection, keys, parse_criteria};
pub use normalize::{CANONICAL_APOSTROPHE, normalize_param, normalize_text};

/// Parse and compile in one step.
pub fn compile_params(params: &HashMap<String, String>) -> CompiledFilter {
    compile(&parse_criteria(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn search_by_author_and_title() {
        let compiled = compile_params(&map(&[
            ("work_title", "War and Peace"),
            ("primary_author", "Leo Tolstoy"),
        ]));
        assert!(compiled.order_by.is_none());
        assert_eq!(
            compiled.where_sql(),
            vec![
                "instr(fold_case(primary_author), ?) > 0",
                "instr(fold_case(work_title), ?) > 0",
            ]
        );
        assert_eq!(
            compiled.where_fragments[0].param,
            Value::Text("leo tolstoy".into())
        );
    }

    #[test]
    fn apostrophes_are_canonicalized_in_bound_values() {
        let compiled = compile_params(&map(&[
            ("work_title", "\u{2019}\u{2019}''\u{2019}\u{2019}"),
            ("primary_author", "John O'Hara"),
        ]));
        assert_eq!(
            compiled.where_fragments[0].param,
            Value::Text("john o\u{2019}hara".into())
        );
        assert_eq!(
            compiled.where_fragments[1].param,
            Value::Text("\u{2019}".repeat(6))
        );
    }

    #[test]
    fn range_fragments_follow_word_then_year_order() {
        let compiled = compile_params(&map(&[
            ("year_published_lower_limit", "1800"),
            ("word_count_upper_limit", "50000"),
        ]));
        assert!(compiled.order_by.is_none());
        assert_eq!(
            compiled.where_sql(),
            vec!["word_count <= ?", "year_published >= ?"]
        );
    }

    #[test]
    fn invalid_integers_produce_no_fragments() {
        let compiled = compile_params(&map(&[
            ("year_published_lower_limit", "1k800"),
            ("word_count_upper_limit", "50i000"),
        ]));
        assert!(compiled.is_empty());
    }

    #[test]
    fn sort_only() {
        let compiled = compile_params(&map(&[("sort_by", "word_count"), ("sorting_order", "ASC")]));
        assert!(compiled.where_fragments.is_empty());
        assert_eq!(
            compiled.order_by.map(|o| o.sql()),
            Some("ORDER BY word_count ASC".to_string())
        );
    }

    #[test]
    fn compiling_twice_is_idempotent() {
        let params = map(&[
            ("primary_author", "austen"),
            ("word_count_lower_limit", "1000"),
            ("year_published_upper_limit", "1900"),
            ("sort_by", "year_published"),
            ("sorting_order", "DESC"),
        ]);
        assert_eq!(compile_params(&params), compile_params(&params));
    }
}
