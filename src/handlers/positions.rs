use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::pk;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{authorize, Action, Principal};
use crate::serializer::{position_draft, represent_all, Represent};
use crate::state::AppState;

/// GET /api/positions
pub async fn list(State(state): State<AppState>) -> ApiResult<Value> {
    authorize(Action::ListPositions, None)?;
    let positions = state.store.positions.select_any(FilterData::default()).await?;
    Ok(ApiResponse::success(represent_all(&positions)))
}

/// POST /api/positions
///
/// ```json
/// { "name": "Goalkeeper", "description": "Stands in the goal" }
/// ```
pub async fn create(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> ApiResult<Value> {
    authorize(Action::CreatePosition, None)?;
    let Json(body) = body?;

    let draft = position_draft(&body)?;
    let position = state.store.positions.insert(draft).await?;

    info!("Position {} created", position.id);
    Ok(ApiResponse::created(position.represent()))
}

/// GET /api/positions/:pk
pub async fn show(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<Value> {
    authorize(Action::ShowPosition, None)?;
    let position = state.store.positions.select_404(pk(path)?).await?;
    Ok(ApiResponse::success(position.represent()))
}

/// DELETE /api/positions/:pk - owned persons holding it lose their position
pub async fn delete(State(state): State<AppState>, path: Result<Path<i64>, PathRejection>) -> ApiResult<()> {
    authorize(Action::DeletePosition, None)?;
    let pk = pk(path)?;
    state.store.positions.select_404(pk).await?;

    let detached = state.store.owned_persons.clear_reference("position_id", pk).await?;
    state.store.positions.delete(pk).await?;

    info!("Position {} deleted ({} owned persons detached)", pk, detached);
    Ok(ApiResponse::no_content())
}

/// GET /api/positions/:pk/members - token authentication
pub async fn members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    authorize(Action::ListPositionMembers, Some(&principal))?;
    let pk = pk(path)?;
    state.store.positions.select_404(pk).await?;

    let members = state
        .store
        .owned_persons
        .select_any(FilterData::with_where(json!({ "position_id": pk })))
        .await?;
    Ok(ApiResponse::success(represent_all(&members)))
}
