use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::QueryAs,
    FromRow, PgPool, Postgres,
};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;

/// A table-backed record with an `i64` primary key.
///
/// `Draft` carries the writable columns; `COLUMNS` lists them in the order
/// [`Entity::bind`] binds them.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Clone + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    type Draft: Send + Sync + 'static;

    const TABLE: &'static str;
    const NAME: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_draft(id: i64, draft: Self::Draft) -> Self;

    fn apply(&mut self, draft: Self::Draft);

    fn bind<'q>(
        draft: &'q Self::Draft,
        query: QueryAs<'q, Postgres, Self, PgArguments>,
    ) -> QueryAs<'q, Postgres, Self, PgArguments>;
}

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Rows matching the filter, ordered by id unless the filter says otherwise.
    async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError>;

    async fn select_one(&self, id: i64) -> Result<Option<T>, DatabaseError>;

    async fn select_404(&self, id: i64) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", T::NAME, id)))
    }

    async fn exists(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.select_one(id).await?.is_some())
    }

    async fn insert(&self, draft: T::Draft) -> Result<T, DatabaseError>;

    /// Full replacement of the writable columns. `None` when the row is gone.
    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, DatabaseError>;

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Null out `column` wherever it references `id`. Returns the rows touched.
    async fn clear_reference(&self, column: &str, id: i64) -> Result<u64, DatabaseError>;
}

pub(crate) fn default_order(mut filter_data: FilterData) -> FilterData {
    if filter_data.order.is_none() {
        filter_data.order = Some(json!("id asc"));
    }
    filter_data
}

pub(crate) fn writable_column<T: Entity>(column: &str) -> Result<&'static str, DatabaseError> {
    T::COLUMNS
        .iter()
        .copied()
        .find(|c| *c == column)
        .ok_or_else(|| DatabaseError::QueryError(format!("{} has no writable column '{}'", T::TABLE, column)))
}

/// Postgres-backed repository.
pub struct PgRepository<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Entity> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    fn insert_sql() -> String {
        let columns: Vec<String> = T::COLUMNS.iter().map(|c| format!("\"{}\"", c)).collect();
        let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            T::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn update_sql() -> String {
        let assignments: Vec<String> = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect();
        format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ${} RETURNING *",
            T::TABLE,
            assignments.join(", "),
            T::COLUMNS.len() + 1
        )
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for PgRepository<T> {
    async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        QueryBuilder::<T>::new(T::TABLE)?
            .filter(default_order(filter_data))?
            .select_all(&self.pool)
            .await
    }

    async fn select_one(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        QueryBuilder::<T>::new(T::TABLE)?
            .filter(FilterData::with_where(json!({ "id": id })))?
            .select_optional(&self.pool)
            .await
    }

    async fn insert(&self, draft: T::Draft) -> Result<T, DatabaseError> {
        let sql = Self::insert_sql();
        let row = T::bind(&draft, sqlx::query_as::<_, T>(&sql))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, DatabaseError> {
        let sql = Self::update_sql();
        let row = T::bind(&draft, sqlx::query_as::<_, T>(&sql))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_reference(&self, column: &str, id: i64) -> Result<u64, DatabaseError> {
        let column = writable_column::<T>(column)?;
        let sql = format!("UPDATE \"{}\" SET \"{}\" = NULL WHERE \"{}\" = $1", T::TABLE, column, column);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
