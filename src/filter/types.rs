use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Result<Self, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Neq,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }
}

/// A filter document: JSON `where` conditions plus an optional ordering.
///
/// ```json
/// { "where": { "$or": [ { "first_name": { "$ilike": "%an%" } } ] }, "order": "id asc" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where")]
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
}

impl FilterData {
    pub fn with_where(where_clause: Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            order: None,
        }
    }

    /// Combine two filters with AND. Ordering of `self` wins.
    pub fn and(self, other: FilterData) -> FilterData {
        let where_clause = match (self.where_clause, other.where_clause) {
            (Some(a), Some(b)) => Some(json!({ "$and": [a, b] })),
            (a, b) => a.or(b),
        };
        FilterData {
            where_clause,
            order: self.order.or(other.order),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// Escape `%`, `_` and `\` so user text matches literally inside a LIKE pattern.
pub fn like_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring filter over several columns, OR-combined.
pub fn icontains_any(columns: &[&str], needle: &str) -> FilterData {
    let pattern = format!("%{}%", like_escape(needle));
    let alternatives: Vec<Value> = columns
        .iter()
        .map(|column| {
            let mut condition = serde_json::Map::new();
            condition.insert(column.to_string(), json!({ "$ilike": pattern }));
            Value::Object(condition)
        })
        .collect();
    FilterData::with_where(json!({ "$or": alternatives }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(like_escape("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(like_escape("anna"), "anna");
    }

    #[test]
    fn icontains_builds_or_of_ilike() {
        let filter = icontains_any(&["first_name", "last_name"], "an");
        assert_eq!(
            filter.where_clause,
            Some(json!({ "$or": [
                { "first_name": { "$ilike": "%an%" } },
                { "last_name": { "$ilike": "%an%" } }
            ]}))
        );
    }

    #[test]
    fn and_merges_where_clauses() {
        let a = FilterData::with_where(json!({ "owner_id": 1 }));
        let b = FilterData::with_where(json!({ "sex": "female" }));
        assert_eq!(
            a.clone().and(b).where_clause,
            Some(json!({ "$and": [{ "owner_id": 1 }, { "sex": "female" }] }))
        );
        assert_eq!(a.clone().and(FilterData::default()), a);
    }
}
