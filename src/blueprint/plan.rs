//! # Query Plan
//!
//! The per-request description of a find: filter, pagination, sort order,
//! relation expansion and projection.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::filter::{compare_values, QueryFilter};

/// Default page size when `limit` is absent
pub const DEFAULT_LIMIT: usize = 30;

/// Maximum page size accepted from a request
pub const MAX_LIMIT: usize = 1000;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse `ASC`/`DESC` (any case) or `1`/`-1`
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ASC" | "1" => Some(SortDirection::Asc),
            "DESC" | "-1" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One `(field, direction)` sort clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
}

impl SortClause {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Compare two records by an ordered list of sort clauses.
///
/// Missing and null values sort after present ones in ascending order.
/// Values of different kinds order by kind: bool, number, string, array,
/// object.
pub fn compare_records(a: &Value, b: &Value, sort: &[SortClause]) -> Ordering {
    for clause in sort {
        let va = a.get(&clause.field).filter(|v| !v.is_null());
        let vb = b.get(&clause.field).filter(|v| !v.is_null());

        let cmp = match (va, vb) {
            (Some(x), Some(y)) => order_values(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        let cmp = match clause.direction {
            SortDirection::Asc => cmp,
            SortDirection::Desc => cmp.reverse(),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values, kind first
fn order_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    rank(a).cmp(&rank(b)).then_with(|| {
        compare_values(a, b).unwrap_or_else(|| a.to_string().cmp(&b.to_string()))
    })
}

/// Everything the record store needs to run the fetch branch.
///
/// The count branch only reads `filter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub filter: QueryFilter,
    pub limit: usize,
    pub offset: usize,
    pub sort: Vec<SortClause>,

    /// Associations to expand in fetched records
    pub populate: Vec<String>,

    /// Attributes to keep (None = all)
    pub select: Option<Vec<String>>,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self {
            filter: QueryFilter::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: Vec::new(),
            populate: Vec::new(),
            select: None,
        }
    }
}

impl QueryPlan {
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_sort(mut self, clause: SortClause) -> Self {
        self.sort.push(clause);
        self
    }
}
