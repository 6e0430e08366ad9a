use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{debug, info};

use super::models::{
    CreateCommandRequest, CreatedResponse, UpdateAccessRequest, UpdateCommandRequest, decode_body,
    parse_id,
};
use super::{AdministratorAccess, AppState, RestrictedAccess, Result};
use crate::core::Command;

pub async fn create_command(
    AdministratorAccess(caller): AdministratorAccess,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreatedResponse>> {
    state.ensure_management()?;

    let payload: CreateCommandRequest = decode_body(&body)?;
    payload.validate()?;

    let command = state.store.create_command(payload.into_command()).await?;
    info!(id = %command.id, name = %command.name, user = %caller.username, "command created");

    Ok(Json(CreatedResponse { id: command.id }))
}

pub async fn list_commands(
    RestrictedAccess(_): RestrictedAccess,
    State(state): State<AppState>,
) -> Result<Json<Vec<Command>>> {
    Ok(Json(state.store.commands().await?))
}

pub async fn get_command(
    AdministratorAccess(_): AdministratorAccess,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Command>> {
    let id = parse_id(&raw_id)?;
    Ok(Json(state.store.command(id).await?))
}

pub async fn update_command(
    AdministratorAccess(caller): AdministratorAccess,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode> {
    state.ensure_management()?;

    let id = parse_id(&raw_id)?;
    let payload: UpdateCommandRequest = decode_body(&body)?;

    let mut command = state.store.command(id).await?;
    payload.apply_to(&mut command);
    state.store.update_command(id, &command).await?;

    info!(%id, user = %caller.username, "command updated");
    Ok(StatusCode::OK)
}

/// Accepts new access lists and writes the command back.
///
/// The submitted lists are decoded but not merged into the stored command,
/// so the stored access lists are left as they were.
pub async fn update_command_access(
    AdministratorAccess(_): AdministratorAccess,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode> {
    let id = parse_id(&raw_id)?;
    let payload: UpdateAccessRequest = decode_body(&body)?;

    let command = state.store.command(id).await?;
    debug!(
        %id,
        users = payload.authorized_users.len(),
        teams = payload.authorized_teams.len(),
        "access update received"
    );
    state.store.update_command(id, &command).await?;

    Ok(StatusCode::OK)
}

/// Tears down the command's proxy routes, then removes it from the store.
pub async fn delete_command(
    AdministratorAccess(caller): AdministratorAccess,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode> {
    state.ensure_management()?;

    let id = parse_id(&raw_id)?;
    let key = id.to_string();

    state.proxy.delete_proxy(&key).await;
    state.proxy.delete_extension_proxies(&key).await;
    state.store.delete_command(id).await?;

    info!(%id, user = %caller.username, "command deleted");
    Ok(StatusCode::OK)
}
