//! Collaboration Handlers
//!
//! REST paths into live collaboration sessions. Queries never create a
//! session; updates do.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::application::dto::request::{CollabSyncRequest, CursorUpdateRequest};
use crate::application::dto::response::{
    CollabParticipantsResponse, DeliveryResponse, VersionListResponse, VersionResponse,
};
use crate::domain::{CursorPosition, Identity};
use crate::presentation::middleware::AuthUser;
use crate::shared::delivery::FanOut;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// `GET /api/collab/{document_id}/participants`
pub async fn get_participants(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Json<CollabParticipantsResponse> {
    let users = state
        .collaboration
        .get(&document_id)
        .map(|session| state.collaboration.list_participants(&session))
        .unwrap_or_default();

    Json(CollabParticipantsResponse::new(document_id, users))
}

/// `POST /api/collab/sync`
pub async fn sync_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CollabSyncRequest>,
) -> Result<Json<DeliveryResponse>, AppError> {
    request.validate()?;

    let session = state.collaboration.get_or_create(&request.document_id);
    let tally = state
        .collaboration
        .broadcast_update(&session, &auth.identity, request.update);

    tracing::debug!(
        document_id = %request.document_id,
        user_id = %auth.identity,
        delivered = tally.delivered,
        "Collaboration update accepted over REST"
    );

    Ok(Json(tally.into()))
}

/// `POST /api/collab/{document_id}/cursor`
pub async fn update_cursor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(document_id): Path<String>,
    Json(request): Json<CursorUpdateRequest>,
) -> Result<Json<DeliveryResponse>, AppError> {
    request.validate()?;

    let tally = match state.collaboration.get(&document_id) {
        Some(session) => state.collaboration.broadcast_cursor(
            &session,
            &auth.identity,
            CursorPosition {
                user_id: Identity::default(),
                username: request.username,
                x: request.x,
                y: request.y,
                color: request.color,
            },
        ),
        None => FanOut::default(),
    };

    Ok(Json(tally.into()))
}

/// `GET /api/collab/{document_id}/versions`
pub async fn list_versions(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<VersionListResponse>, AppError> {
    let versions = state
        .snapshots
        .list_versions(&document_id)
        .await?
        .into_iter()
        .map(VersionResponse::from)
        .collect();

    Ok(Json(VersionListResponse {
        document_id,
        versions,
    }))
}
