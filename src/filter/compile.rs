//! Compile criteria into parameterized SQL fragments.
//!
//! Fragment text only ever contains allow-listed column names, fixed
//! operators and `?` placeholders. Caller values travel in [`Fragment::param`]
//! and are bound by the store.

use rusqlite::types::Value;

use crate::model::BookColumn;
use crate::store::schema::FOLD_CASE;

use super::criteria::{FilterCriterion, SortDirection};

/// One condition of the WHERE clause together with its bound value.
///
/// Only [`compile`] constructs fragments, so every fragment reaching the
/// store carries compiler-generated SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub(crate) sql: String,
    pub(crate) param: Value,
}

impl Fragment {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn param(&self) -> &Value {
        &self.param
    }
}

/// The single ORDER BY clause a query may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: BookColumn,
    pub direction: Option<SortDirection>,
}

impl OrderBy {
    pub fn sql(&self) -> String {
        match self.direction {
            Some(direction) => format!("ORDER BY {} {}", self.column, direction.as_str()),
            None => format!("ORDER BY {}", self.column),
        }
    }
}

/// Output of the compiler: conjunctive WHERE fragments plus optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFilter {
    pub where_fragments: Vec<Fragment>,
    pub order_by: Option<OrderBy>,
}

impl CompiledFilter {
    /// Fragment texts in order, for inspection and logging.
    pub fn where_sql(&self) -> Vec<&str> {
        self.where_fragments.iter().map(|f| f.sql.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.where_fragments.is_empty() && self.order_by.is_none()
    }
}

/// Compile criteria in order. The first `Sort` wins.
pub fn compile(criteria: &[FilterCriterion]) -> CompiledFilter {
    let mut compiled = CompiledFilter::default();

    for criterion in criteria {
        match criterion {
            FilterCriterion::TextMatch { column, needle } => {
                compiled.where_fragments.push(Fragment {
                    sql: format!("instr({FOLD_CASE}({column}), ?) > 0"),
                    param: Value::Text(needle.to_lowercase()),
                });
            }
            FilterCriterion::Range {
                column,
                bound,
                value,
            } => {
                compiled.where_fragments.push(Fragment {
                    sql: format!("{column} {} ?", bound.operator()),
                    param: Value::Integer(i64::from(*value)),
                });
            }
            FilterCriterion::Sort { column, direction } => {
                if compiled.order_by.is_none() {
                    compiled.order_by = Some(OrderBy {
                        column: *column,
                        direction: *direction,
                    });
                }
            }
        }
    }

    compiled
}
