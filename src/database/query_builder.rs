use serde_json::Value;
use sqlx::{self, postgres::{PgArguments, PgRow}, query::QueryAs, FromRow, PgPool, Postgres};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData, FilterError};

pub struct QueryBuilder<T> {
    table_name: String,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(&name)?;
        Ok(Self {
            table_name: name,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(&self.table_name)?;
        filter.assign(filter_data)?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(pool).await?;
        Ok(row)
    }

    fn sql_result(&self) -> Result<SqlResult, DatabaseError> {
        match &self.filter {
            Some(filter) => Ok(filter.to_sql()?),
            None => Ok(SqlResult { query: format!("SELECT * FROM \"{}\"", self.table_name), params: vec![] }),
        }
    }
}

/// Bind one filter parameter by its JSON type. Arrays are expanded by the
/// filter before they get here and objects are rejected there.
fn bind_param_query_as<'q, O>(
    q: QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
