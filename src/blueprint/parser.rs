//! # Criteria Parser
//!
//! Turns request parameters into a [`QueryPlan`]. Pure: every error is
//! raised here, before any query is issued.
//!
//! Pagination policy: `limit` and `skip`/`offset` must be non-negative
//! integers and `limit` must not exceed the configured maximum. Anything
//! else is rejected, never clamped.

use std::collections::HashMap;

use serde_json::Value;

use super::config::BlueprintConfig;
use super::errors::{FindError, FindResult};
use super::filter::{FilterExpr, FilterOperator, QueryFilter};
use super::model::ModelDef;
use super::plan::{QueryPlan, SortClause, SortDirection};
use super::request::RequestContext;

/// Parameters never treated as loose equality filters
pub const RESERVED_PARAMS: &[&str] = &[
    "where", "limit", "skip", "offset", "sort", "populate", "select", "callback", "_csrf",
];

/// Primary key addressed by the request, if any.
///
/// A path key wins over a query parameter named after the primary key.
pub fn parse_pk(model: &ModelDef, ctx: &RequestContext) -> Option<Value> {
    ctx.path_key
        .as_deref()
        .or_else(|| ctx.params.get(&model.primary_key).map(String::as_str))
        .filter(|raw| !raw.is_empty())
        .map(parse_scalar)
}

/// Build the full query plan for a multi-record find
pub fn parse_plan(
    model: &ModelDef,
    params: &HashMap<String, String>,
    config: &BlueprintConfig,
) -> FindResult<QueryPlan> {
    Ok(QueryPlan {
        filter: parse_criteria(params)?,
        limit: parse_limit(params, config)?,
        offset: parse_skip(params)?,
        sort: parse_sort(model, params)?,
        populate: parse_populate(model, params, config)?,
        select: parse_select(model, params)?,
    })
}

/// Build the filter from `where` and the loose parameters.
///
/// Loose parameters are applied in key order so the filter is
/// deterministic for a given request. Filter fields need not be declared
/// attributes: a record without the field reads it as null.
pub fn parse_criteria(params: &HashMap<String, String>) -> FindResult<QueryFilter> {
    let mut filter = QueryFilter::new();

    if let Some(raw) = params.get("where") {
        parse_where(raw, &mut filter)?;
    }

    let mut loose: Vec<(&String, &String)> = params
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
        .collect();
    loose.sort_by(|a, b| a.0.cmp(b.0));

    for (field, raw) in loose {
        push_constraints(field, parse_loose_value(field, raw)?, &mut filter)?;
    }

    Ok(filter)
}

/// Parse `limit`, falling back to the configured default
pub fn parse_limit(params: &HashMap<String, String>, config: &BlueprintConfig) -> FindResult<usize> {
    let Some(raw) = params.get("limit") else {
        return Ok(config.default_limit);
    };

    let limit: usize = raw
        .trim()
        .parse()
        .map_err(|_| FindError::InvalidQueryParam(format!("Invalid limit: {}", raw)))?;

    if limit > config.max_limit {
        return Err(FindError::LimitExceeded(limit, config.max_limit));
    }
    Ok(limit)
}

/// Parse `skip` (or its alias `offset`; `skip` wins when both are present)
pub fn parse_skip(params: &HashMap<String, String>) -> FindResult<usize> {
    let Some((name, raw)) = params
        .get_key_value("skip")
        .or_else(|| params.get_key_value("offset"))
    else {
        return Ok(0);
    };

    raw.trim()
        .parse()
        .map_err(|_| FindError::InvalidQueryParam(format!("Invalid {}: {}", name, raw)))
}

/// Parse `sort` as `"field dir, field dir"` or a JSON field → direction map
pub fn parse_sort(model: &ModelDef, params: &HashMap<String, String>) -> FindResult<Vec<SortClause>> {
    let Some(raw) = params.get("sort") else {
        return Ok(Vec::new());
    };
    let raw = raw.trim();

    let clauses = if raw.starts_with('{') {
        parse_sort_map(raw)?
    } else {
        parse_sort_string(raw)?
    };

    for clause in &clauses {
        model.require_attribute(&clause.field)?;
    }
    Ok(clauses)
}

fn parse_sort_map(raw: &str) -> FindResult<Vec<SortClause>> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(raw)
        .map_err(|e| FindError::InvalidSort(format!("sort is not a valid JSON object: {}", e)))?;

    map.into_iter()
        .map(|(field, direction)| {
            let token = match &direction {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            let direction = SortDirection::parse(&token).ok_or_else(|| {
                FindError::InvalidSort(format!("Invalid direction for '{}': {}", field, token))
            })?;
            Ok(SortClause { field, direction })
        })
        .collect()
}

fn parse_sort_string(raw: &str) -> FindResult<Vec<SortClause>> {
    let mut clauses = Vec::new();

    for part in raw.split(',') {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let clause = match tokens.as_slice() {
            [] => continue,
            [field] => SortClause::asc(*field),
            [field, direction] => SortClause {
                field: field.to_string(),
                direction: SortDirection::parse(direction).ok_or_else(|| {
                    FindError::InvalidSort(format!("Invalid direction for '{}': {}", field, direction))
                })?,
            },
            _ => return Err(FindError::InvalidSort(part.trim().to_string())),
        };
        clauses.push(clause);
    }

    Ok(clauses)
}

/// Parse `populate`: a comma list of associations, `true`/`false`, or absent
pub fn parse_populate(
    model: &ModelDef,
    params: &HashMap<String, String>,
    config: &BlueprintConfig,
) -> FindResult<Vec<String>> {
    let all = || -> Vec<String> { model.associations.iter().map(|a| a.name.clone()).collect() };

    let Some(raw) = params.get("populate") else {
        return Ok(if config.populate_by_default { all() } else { Vec::new() });
    };

    match raw.trim() {
        "" | "false" => Ok(Vec::new()),
        "true" => Ok(all()),
        list => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| match model.association(name) {
                Some(association) => Ok(association.name.clone()),
                None => Err(FindError::UnknownAssociation {
                    model: model.identity.clone(),
                    association: name.to_string(),
                }),
            })
            .collect(),
    }
}

/// Parse `select`; the primary key is always kept
pub fn parse_select(model: &ModelDef, params: &HashMap<String, String>) -> FindResult<Option<Vec<String>>> {
    let Some(raw) = params.get("select") else {
        return Ok(None);
    };
    if raw.trim() == "*" {
        return Ok(None);
    }

    let mut fields: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if fields.is_empty() {
        return Err(FindError::InvalidQueryParam("select cannot be empty".to_string()));
    }

    for field in &fields {
        if !model.has_attribute(field) && model.association(field).is_none() {
            return Err(FindError::UnknownAttribute {
                model: model.identity.clone(),
                attribute: field.clone(),
            });
        }
    }

    if !fields.contains(&model.primary_key) {
        fields.insert(0, model.primary_key.clone());
    }
    Ok(Some(fields))
}

fn parse_where(raw: &str, filter: &mut QueryFilter) -> FindResult<()> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| FindError::InvalidFilter(format!("where is not valid JSON: {}", e)))?;

    let Value::Object(clauses) = value else {
        return Err(FindError::InvalidFilter("where must be a JSON object".to_string()));
    };

    for (field, constraint) in clauses {
        push_constraints(&field, constraint, filter)?;
    }
    Ok(())
}

/// Loose parameter values are typed scalars, or JSON when they look like it
fn parse_loose_value(field: &str, raw: &str) -> FindResult<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| FindError::InvalidFilter(format!("Invalid value for '{}': {}", field, e)));
    }
    Ok(parse_scalar(raw))
}

/// Expand one `field: constraint` pair into filter expressions
fn push_constraints(field: &str, constraint: Value, filter: &mut QueryFilter) -> FindResult<()> {
    match constraint {
        Value::Array(items) => {
            filter.push(FilterExpr::new(field, FilterOperator::In, Value::Array(items)));
        }
        Value::Object(modifiers) => {
            if modifiers.is_empty() {
                return Err(FindError::InvalidFilter(format!(
                    "Empty modifier object for '{}'",
                    field
                )));
            }
            for (modifier, operand) in modifiers {
                let operator = FilterOperator::from_modifier(&modifier).ok_or_else(|| {
                    FindError::InvalidFilter(format!("Unknown modifier '{}' on '{}'", modifier, field))
                })?;
                filter.push(build_constraint(field, operator, operand)?);
            }
        }
        scalar => filter.push(FilterExpr::eq(field, scalar)),
    }
    Ok(())
}

fn build_constraint(field: &str, operator: FilterOperator, operand: Value) -> FindResult<FilterExpr> {
    // `{"!": [..]}` reads as "not in"
    let operator = match (operator, &operand) {
        (FilterOperator::Eq, Value::Array(_)) => FilterOperator::In,
        (FilterOperator::Neq, Value::Array(_)) => FilterOperator::Nin,
        (op, _) => op,
    };

    if operator.takes_list() && !operand.is_array() {
        return Err(FindError::InvalidFilter(format!(
            "'{}' on '{}' expects a list",
            operator.as_str(),
            field
        )));
    }
    if !operator.takes_list() && operand.is_array() {
        return Err(FindError::InvalidFilter(format!(
            "'{}' on '{}' does not take a list",
            operator.as_str(),
            field
        )));
    }
    if operator.takes_string() && !operand.is_string() {
        return Err(FindError::InvalidFilter(format!(
            "'{}' on '{}' expects a string",
            operator.as_str(),
            field
        )));
    }
    if operand.is_object() {
        return Err(FindError::InvalidFilter(format!(
            "Nested object operand for '{}'",
            field
        )));
    }

    match (operator, operand.as_str()) {
        (FilterOperator::Like, Some(pattern)) => FilterExpr::like(field, pattern).map_err(|e| {
            FindError::InvalidFilter(format!("Invalid like pattern for '{}': {}", field, e))
        }),
        _ => Ok(FilterExpr::new(field, operator, operand)),
    }
}

/// Type a raw parameter: null, booleans and numbers, else string
pub fn parse_scalar(raw: &str) -> Value {
    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = raw.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(raw.to_string())
}
