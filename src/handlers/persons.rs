use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;

use super::pk;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{authorize, Action, Principal};
use crate::serializer::{person_draft, represent_all, Represent};
use crate::state::AppState;

/// GET /api/persons - every person, no authentication
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    authorize(Action::ListPersons, None)?;
    let persons = state.store.persons.select_any(FilterData::default()).await?;
    Ok(ApiResponse::success(represent_all(&persons)))
}

/// GET /api/persons/:pk - token authentication
pub async fn show(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    authorize(Action::ShowPerson, Some(&principal))?;
    let person = state.store.persons.select_404(pk(path)?).await?;
    Ok(ApiResponse::success(person.represent()))
}

/// PUT /api/persons/:pk/update - session or basic authentication
///
/// Full replacement of `name`. Optional fields left out of the body keep
/// their stored values.
///
/// ```json
/// { "name": "Ola", "shirt_size": "M", "month_added": 4, "team": 2 }
/// ```
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    authorize(Action::UpdatePerson, Some(&principal))?;
    let pk = pk(path)?;
    let existing = state.store.persons.select_404(pk).await?;

    let Json(body) = body?;
    let draft = person_draft(&state.store, &body, Some(&existing)).await?;
    let person = state
        .store
        .persons
        .update(pk, draft)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Person {} not found", pk)))?;

    info!("Person {} updated by '{}'", pk, principal.username);
    Ok(ApiResponse::success(person.represent()))
}

/// DELETE /api/persons/:pk/delete - token authentication
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    authorize(Action::DeletePerson, Some(&principal))?;
    let pk = pk(path)?;
    state.store.persons.select_404(pk).await?;
    state.store.persons.delete(pk).await?;

    info!("Person {} deleted by '{}'", pk, principal.username);
    Ok(ApiResponse::no_content())
}
