use serde_json::Value;

use super::error::FilterError;
use super::filter::is_identifier;
use super::types::FilterOp;

/// Translates JSON `where` documents into SQL with positional parameters.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_offset: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql_conditions = vec![];
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.logical_operator(key, value)?);
            } else {
                sql_conditions.extend(self.field_conditions(key, value)?);
            }
        }

        Ok(if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") })
    }

    fn logical_operator(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty conjunction is true, empty disjunction is false
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.build(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field_conditions(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        if !is_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(ops) => {
                let mut out = Vec::with_capacity(ops.len());
                for (op_key, op_val) in ops {
                    let operator = FilterOp::parse(op_key)?;
                    out.push(self.condition(field, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.condition(field, FilterOp::Eq, value)?]),
        }
    }

    fn condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        match operator {
            FilterOp::Eq => {
                if data.is_null() { Ok(format!("{} IS NULL", quoted_column)) }
                else { Ok(format!("{} = {}", quoted_column, self.scalar_param(data)?)) }
            }
            FilterOp::Neq => {
                if data.is_null() { Ok(format!("{} IS NOT NULL", quoted_column)) }
                else { Ok(format!("{} <> {}", quoted_column, self.scalar_param(data)?)) }
            }
            FilterOp::Gt => Ok(format!("{} > {}", quoted_column, self.scalar_param(data)?)),
            FilterOp::Gte => Ok(format!("{} >= {}", quoted_column, self.scalar_param(data)?)),
            FilterOp::Lt => Ok(format!("{} < {}", quoted_column, self.scalar_param(data)?)),
            FilterOp::Lte => Ok(format!("{} <= {}", quoted_column, self.scalar_param(data)?)),
            FilterOp::Like | FilterOp::ILike => {
                if !data.is_string() {
                    return Err(FilterError::InvalidOperatorData(format!("LIKE pattern for '{}' must be a string", column)));
                }
                let keyword = if operator == FilterOp::Like { "LIKE" } else { "ILIKE" };
                Ok(format!("{} {} {}", quoted_column, keyword, self.param(data.clone())))
            }
            FilterOp::In => {
                let values = data.as_array().ok_or_else(|| FilterError::InvalidOperatorData("$in requires array".to_string()))?;
                if values.is_empty() { return Ok("1=0".to_string()); }
                let mut params = Vec::with_capacity(values.len());
                for v in values {
                    params.push(self.scalar_param(v)?);
                }
                Ok(format!("{} IN ({})", quoted_column, params.join(", ")))
            }
        }
    }

    fn scalar_param(&mut self, value: &Value) -> Result<String, FilterError> {
        match value {
            Value::Array(_) | Value::Object(_) => Err(FilterError::InvalidOperatorData(
                "comparison value must be a scalar".to_string(),
            )),
            _ => Ok(self.param(value.clone())),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.param_offset + self.param_values.len())
    }
}
