//! # Query Filter
//!
//! Conjunction of field constraints parsed from request criteria.

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on the compiled size of one `like` pattern
pub const LIKE_SIZE_LIMIT: usize = 1 << 20;

/// Constraint operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Value in list
    In,
    /// Value not in list
    Nin,
    /// Pattern match (`%` any run, `_` single char)
    Like,
    /// Substring match
    Contains,
    /// Prefix match
    StartsWith,
    /// Suffix match
    EndsWith,
}

impl FilterOperator {
    /// Resolve a `where` modifier key
    pub fn from_modifier(modifier: &str) -> Option<Self> {
        let op = match modifier {
            "=" | "==" | "equals" => FilterOperator::Eq,
            "!" | "!=" | "not" => FilterOperator::Neq,
            ">" | "greaterThan" => FilterOperator::Gt,
            ">=" | "greaterThanOrEqual" => FilterOperator::Gte,
            "<" | "lessThan" => FilterOperator::Lt,
            "<=" | "lessThanOrEqual" => FilterOperator::Lte,
            "in" => FilterOperator::In,
            "nin" => FilterOperator::Nin,
            "like" => FilterOperator::Like,
            "contains" => FilterOperator::Contains,
            "startsWith" => FilterOperator::StartsWith,
            "endsWith" => FilterOperator::EndsWith,
            _ => return None,
        };
        Some(op)
    }

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Nin => "nin",
            FilterOperator::Like => "like",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
        }
    }

    /// Whether the operand must be a list
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::Nin)
    }

    /// Whether the operand must be a string
    pub fn takes_string(&self) -> bool {
        matches!(
            self,
            FilterOperator::Like
                | FilterOperator::Contains
                | FilterOperator::StartsWith
                | FilterOperator::EndsWith
        )
    }
}

/// A single field constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,

    /// Compiled operand of a `like` constraint
    #[serde(skip)]
    pattern: Option<LikePattern>,
}

impl FilterExpr {
    /// Create a new filter expression.
    ///
    /// A `like` operand that does not compile matches nothing; use
    /// [`FilterExpr::like`] to surface the error instead.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        let pattern = match (operator, value.as_str()) {
            (FilterOperator::Like, Some(raw)) => LikePattern::new(raw).ok(),
            _ => None,
        };
        Self {
            field: field.into(),
            operator,
            value,
            pattern,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a `like` filter, failing when the pattern is too large to compile
    pub fn like(field: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field: field.into(),
            operator: FilterOperator::Like,
            value: Value::String(pattern.to_string()),
            pattern: Some(LikePattern::new(pattern)?),
        })
    }

    /// Check if a record matches this constraint. Missing fields read as null.
    pub fn matches(&self, record: &Value) -> bool {
        let field_value = record.get(&self.field).unwrap_or(&Value::Null);

        match self.operator {
            FilterOperator::Eq => loosely_equal(field_value, &self.value),
            FilterOperator::Neq => !loosely_equal(field_value, &self.value),
            FilterOperator::Gt => compare_values(field_value, &self.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(
                compare_values(field_value, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => compare_values(field_value, &self.value) == Some(Ordering::Less),
            FilterOperator::Lte => matches!(
                compare_values(field_value, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::In => self
                .value
                .as_array()
                .map(|items| items.iter().any(|v| loosely_equal(field_value, v)))
                .unwrap_or(false),
            FilterOperator::Nin => self
                .value
                .as_array()
                .map(|items| !items.iter().any(|v| loosely_equal(field_value, v)))
                .unwrap_or(false),
            FilterOperator::Like => match (field_value.as_str(), &self.pattern) {
                (Some(text), Some(pattern)) => pattern.is_match(text),
                _ => false,
            },
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                let (Some(text), Some(needle)) = (field_value.as_str(), self.value.as_str()) else {
                    return false;
                };
                match self.operator {
                    FilterOperator::Contains => text.contains(needle),
                    FilterOperator::StartsWith => text.starts_with(needle),
                    _ => text.ends_with(needle),
                }
            }
        }
    }
}

/// SQL-style LIKE pattern: `%` matches any run, `_` a single character.
///
/// Compiled to an anchored regex, so matching is linear in the input.
#[derive(Debug, Clone)]
pub struct LikePattern(Regex);

impl LikePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push_str("(?s)^");

        let mut buf = [0u8; 4];
        let mut after_any_run = false;
        for c in pattern.chars() {
            match c {
                // Consecutive `%` collapse into one run
                '%' if after_any_run => {}
                '%' => {
                    source.push_str(".*");
                    after_any_run = true;
                }
                '_' => {
                    source.push('.');
                    after_any_run = false;
                }
                c => {
                    source.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                    after_any_run = false;
                }
            }
        }
        source.push('$');

        RegexBuilder::new(&source)
            .size_limit(LIKE_SIZE_LIMIT)
            .build()
            .map(LikePattern)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

/// Conjunction of constraints over a record collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryFilter {
    pub constraints: Vec<FilterExpr>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, constraint: FilterExpr) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn push(&mut self, constraint: FilterExpr) {
        self.constraints.push(constraint);
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Check if a record matches all constraints
    pub fn matches(&self, record: &Value) -> bool {
        self.constraints.iter().all(|c| c.matches(record))
    }
}

/// Equality that treats `1` and `1.0` as the same number
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Order two JSON values of the same kind. Mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return Some(a.cmp(&b));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
