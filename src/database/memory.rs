//! In-memory store backend, used when no database is configured and by the
//! integration tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::repository::{default_order, writable_column, Entity, Repository};
use crate::filter::filter_order::FilterOrder;
use crate::filter::{matcher, FilterData};

pub struct MemoryRepository<T> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn to_value<T: Entity>(row: &T) -> Result<Value, DatabaseError> {
    serde_json::to_value(row).map_err(|e| DatabaseError::QueryError(e.to_string()))
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        let filter_data = default_order(filter_data);
        let where_clause = filter_data.where_clause.unwrap_or(Value::Null);
        let order = match filter_data.order {
            Some(ref order) => FilterOrder::validate_and_parse(order)?,
            None => vec![],
        };

        let rows = self.rows.read().await;
        let mut selected = Vec::new();
        for row in rows.values() {
            let value = to_value(row)?;
            if matcher::matches(&where_clause, &value)? {
                selected.push((value, row.clone()));
            }
        }
        drop(rows);

        selected.sort_by(|a, b| matcher::compare_rows(&a.0, &b.0, &order));
        Ok(selected.into_iter().map(|(_, row)| row).collect())
    }

    async fn select_one(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, draft: T::Draft) -> Result<T, DatabaseError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = T::from_draft(id, draft);
        self.rows.write().await.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, DatabaseError> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&id).map(|row| {
            row.apply(draft);
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn clear_reference(&self, column: &str, id: i64) -> Result<u64, DatabaseError> {
        let column = writable_column::<T>(column)?;
        let mut rows = self.rows.write().await;
        let mut touched = 0;
        for row in rows.values_mut() {
            let mut value = to_value(row)?;
            if value.get(column).and_then(Value::as_i64) == Some(id) {
                value[column] = Value::Null;
                *row = serde_json::from_value(value).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
                touched += 1;
            }
        }
        Ok(touched)
    }
}
