use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::pk;
use crate::filter::icontains_any;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{authorize, owned_person_scope, Action, Principal};
use crate::serializer::{owned_person_draft, represent_all, Represent};
use crate::state::AppState;

const NAME_COLUMNS: [&str; 2] = ["first_name", "last_name"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of the first or last name
    pub q: Option<String>,
}

/// GET /api/owned-persons - session or basic authentication
///
/// Only the caller's own records unless they hold `view_person_other_owner`.
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    authorize(Action::ListOwnedPersons, Some(&principal))?;

    let mut filter = owned_person_scope(&principal).unwrap_or_default();
    if let Some(needle) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter = filter.and(icontains_any(&NAME_COLUMNS, needle));
    }

    let rows = state.store.owned_persons.select_any(filter).await?;
    Ok(ApiResponse::success(represent_all(&rows)))
}

/// POST /api/owned-persons - session or basic authentication
///
/// The caller becomes the owner; an `owner` in the body is ignored.
///
/// ```json
/// { "first_name": "Anna", "last_name": "Nowak", "sex": "female", "position": 1 }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    authorize(Action::CreateOwnedPerson, Some(&principal))?;
    let Json(body) = body?;

    let draft = owned_person_draft(&state.store, &body, principal.user_id).await?;
    let created = state.store.owned_persons.insert(draft).await?;

    info!("Owned person {} created by '{}'", created.id, principal.username);
    Ok(ApiResponse::created(created.represent()))
}

/// GET /api/owned-persons/:pk - no authentication
pub async fn show(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<Value> {
    authorize(Action::ShowOwnedPerson, None)?;
    let row = state.store.owned_persons.select_404(pk(path)?).await?;
    Ok(ApiResponse::success(row.represent()))
}

/// DELETE /api/owned-persons/:pk - no authentication
pub async fn delete(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<()> {
    authorize(Action::DeleteOwnedPerson, None)?;
    let pk = pk(path)?;
    state.store.owned_persons.select_404(pk).await?;
    state.store.owned_persons.delete(pk).await?;

    info!("Owned person {} deleted", pk);
    Ok(ApiResponse::no_content())
}

/// GET /api/search/owned-persons/:substring - no authentication, no ownership scope
pub async fn search(State(state): State<AppState>, Path(substring): Path<String>) -> ApiResult<Value> {
    authorize(Action::SearchOwnedPersons, None)?;
    let rows = state
        .store
        .owned_persons
        .select_any(icontains_any(&NAME_COLUMNS, &substring))
        .await?;
    Ok(ApiResponse::success(represent_all(&rows)))
}
