//! In-memory evaluation of `where` documents against serialized rows.
//!
//! Mirrors the SQL produced by [`FilterWhere`](super::filter_where::FilterWhere)
//! so the memory store and Postgres agree on which rows a filter selects.

use serde_json::Value;
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{FilterOp, FilterOrderInfo, SortDirection};

pub fn matches(where_data: &Value, record: &Value) -> Result<bool, FilterError> {
    let obj = match where_data {
        Value::Null => return Ok(true),
        Value::Object(obj) => obj,
        _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
    };

    for (key, value) in obj {
        let ok = if key.starts_with('$') {
            logical(key, value, record)?
        } else {
            field(key, value, record)?
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical(op: &str, value: &Value, record: &Value) -> Result<bool, FilterError> {
    match op {
        "$and" | "$or" => {
            let arr = value
                .as_array()
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
            let mut results = Vec::with_capacity(arr.len());
            for v in arr {
                results.push(matches(v, record)?);
            }
            Ok(if op == "$and" { results.iter().all(|r| *r) } else { results.iter().any(|r| *r) })
        }
        "$not" => Ok(!matches(value, record)?),
        _ => Err(FilterError::UnsupportedOperator(op.to_string())),
    }
}

fn field(column: &str, value: &Value, record: &Value) -> Result<bool, FilterError> {
    let actual = record.get(column).unwrap_or(&Value::Null);
    match value {
        Value::Object(ops) => {
            for (op_key, op_val) in ops {
                if !condition(actual, FilterOp::parse(op_key)?, op_val)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => condition(actual, FilterOp::Eq, value),
    }
}

fn condition(actual: &Value, op: FilterOp, data: &Value) -> Result<bool, FilterError> {
    Ok(match op {
        FilterOp::Eq if data.is_null() => actual.is_null(),
        FilterOp::Neq if data.is_null() => !actual.is_null(),
        // SQL three-valued logic: comparisons with NULL never match
        _ if actual.is_null() => false,
        FilterOp::Eq => compare(actual, data) == Some(Ordering::Equal),
        FilterOp::Neq => matches!(compare(actual, data), Some(o) if o != Ordering::Equal),
        FilterOp::Gt => compare(actual, data) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(compare(actual, data), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => compare(actual, data) == Some(Ordering::Less),
        FilterOp::Lte => matches!(compare(actual, data), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Like | FilterOp::ILike => {
            let pattern = data.as_str().ok_or_else(|| {
                FilterError::InvalidOperatorData("LIKE pattern must be a string".to_string())
            })?;
            let Some(text) = actual.as_str() else { return Ok(false) };
            if op == FilterOp::ILike {
                like(&text.to_lowercase(), &pattern.to_lowercase())
            } else {
                like(text, pattern)
            }
        }
        FilterOp::In => {
            let values = data
                .as_array()
                .ok_or_else(|| FilterError::InvalidOperatorData("$in requires array".to_string()))?;
            values.iter().any(|v| compare(actual, v) == Some(Ordering::Equal))
        }
    })
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// SQL LIKE: `%` any run, `_` one char, `\` escapes the next char.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let tokens = tokenize(pattern);

    // dp[j]: pattern prefix of length j matches the text consumed so far
    let mut dp = vec![false; tokens.len() + 1];
    dp[0] = true;
    for (j, token) in tokens.iter().enumerate() {
        if *token == LikeToken::AnyRun {
            dp[j + 1] = dp[j];
        }
    }

    for c in &text {
        let mut next = vec![false; tokens.len() + 1];
        for (j, token) in tokens.iter().enumerate() {
            next[j + 1] = match token {
                LikeToken::AnyRun => next[j] || dp[j + 1],
                LikeToken::AnyChar => dp[j],
                LikeToken::Literal(l) => dp[j] && l == c,
            };
        }
        dp = next;
    }
    dp[tokens.len()]
}

#[derive(Debug, PartialEq)]
enum LikeToken {
    AnyRun,
    AnyChar,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// Order two serialized rows; nulls sort last like Postgres ASC.
pub fn compare_rows(a: &Value, b: &Value, order: &[FilterOrderInfo]) -> Ordering {
    for info in order {
        let left = a.get(&info.column).unwrap_or(&Value::Null);
        let right = b.get(&info.column).unwrap_or(&Value::Null);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
        };
        let ordering = match info.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
