use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, SqlResult};

/// Compiles a [`FilterData`] document into a parameterized Postgres query.
pub struct Filter {
    table_name: String,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", table_name)));
        }
        Ok(Self {
            table_name,
            where_data: None,
            order_data: vec![],
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data)?;

        let query = [
            format!("SELECT * FROM \"{}\"", self.table_name),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            order_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        match self.where_data {
            Some(ref where_data) => {
                let (query, params) = FilterWhere::generate(where_data, 0)?;
                Ok(SqlResult { query, params })
            }
            None => Ok(SqlResult { query: String::new(), params: vec![] }),
        }
    }
}

/// Letters, digits and underscores, not starting with a digit.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("owned_persons").is_ok());
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1teams").is_err());
        assert!(Filter::new("teams; DROP TABLE users").is_err());
    }

    #[test]
    fn builds_select_with_where_and_order() {
        let mut filter = Filter::new("owned_persons").unwrap();
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "owner_id": 3 })),
                order: Some(json!("id asc")),
            })
            .unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"owned_persons\" WHERE \"owner_id\" = $1 ORDER BY \"id\" ASC"
        );
        assert_eq!(sql.params, vec![json!(3)]);
    }

    #[test]
    fn select_without_where_has_no_clause() {
        let filter = Filter::new("teams").unwrap();
        assert_eq!(filter.to_sql().unwrap().query, "SELECT * FROM \"teams\"");
    }
}
