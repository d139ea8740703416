use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension,
};
use serde_json::Value;
use tracing::info;

use super::pk;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{authorize, Action, Principal};
use crate::serializer::Represent;
use crate::state::AppState;

/// GET /api/teams/:pk - basic authentication
pub async fn show(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    authorize(Action::ShowTeam, Some(&principal))?;
    let team = state.store.teams.select_404(pk(path)?).await?;
    Ok(ApiResponse::success(team.represent()))
}

/// DELETE /api/teams/:pk - basic authentication plus `delete_team`
///
/// The permission is checked before the lookup, so a caller without it gets
/// 403 whether or not the team exists.
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    authorize(Action::DeleteTeam, Some(&principal))?;
    let pk = pk(path)?;
    state.store.teams.select_404(pk).await?;

    let detached = state.store.persons.clear_reference("team_id", pk).await?;
    state.store.teams.delete(pk).await?;

    info!("Team {} deleted by '{}' ({} persons detached)", pk, principal.username, detached);
    Ok(ApiResponse::no_content())
}
