use serde_json::Value;

use super::error::FilterError;
use super::filter::is_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["last_name asc", "id desc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)); }
                }
                out
            }
            Value::Object(obj) => {
                // { "last_name": "asc", "id": "desc" }
                obj.iter()
                    .map(|(k, v)| FilterOrderInfo {
                        column: k.clone(),
                        sort: Self::direction(v.as_str().unwrap_or("asc")),
                    })
                    .collect()
            }
            _ => vec![],
        };

        if let Some(bad) = infos.iter().find(|i| !is_identifier(&i.column)) {
            return Err(FilterError::InvalidColumn(bad.column.clone()));
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                out.push(FilterOrderInfo { column: col.to_string(), sort: Self::direction(it.next().unwrap_or("asc")) });
            }
        }
        out
    }

    fn direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() { return Ok(String::new()); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
