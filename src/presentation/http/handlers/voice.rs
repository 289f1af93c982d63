//! Voice Roster Handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::dto::response::VoiceParticipantsResponse;
use crate::startup::AppState;

/// `GET /api/voice/channels/{channel_id}/participants`
pub async fn get_participants(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Json<VoiceParticipantsResponse> {
    let participants = state.voice.get_participants(&channel_id);
    Json(VoiceParticipantsResponse::new(channel_id, participants))
}
